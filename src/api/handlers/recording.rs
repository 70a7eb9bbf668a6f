use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::dom::Page;
use crate::error::{AppError, Result};
use crate::models::{
    CaptureRequest, ContextRequest, Event, EventsResponse, GenericResponse, PageEvent,
    ReplaceEventsRequest, SessionStatusResponse, StartRecordingRequest, StartRecordingResponse,
    StopRecordingRequest, StopRecordingResponse,
};

use super::super::state::{AppState, WsEvent};

/// Start a new recording session, replacing any session already running
pub async fn start_recording(
    State(state): State<Arc<AppState>>,
    body: Option<Json<StartRecordingRequest>>,
) -> Result<Json<StartRecordingResponse>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    // Use provided URL or blank tab
    let start_url = request
        .start_url
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| "about:blank".to_string());

    let session = state
        .coordinator
        .start(&start_url, request.client_id)
        .await;

    let status = session.status().to_string();
    Ok(Json(StartRecordingResponse {
        session_id: session.id,
        status,
    }))
}

/// Stop a recording session and render its script
pub async fn stop_recording(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    body: Option<Json<StopRecordingRequest>>,
) -> Result<Json<StopRecordingResponse>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let rendered = state
        .coordinator
        .stop(Some(&session_id), request.title.as_deref(), request.format)
        .await?;

    Ok(Json(StopRecordingResponse {
        session_id: rendered.session_id,
        script: rendered.script,
        event_count: rendered.event_count,
    }))
}

/// Cancel a recording session without rendering
pub async fn cancel_recording(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<GenericResponse>> {
    state.coordinator.cancel(Some(&session_id)).await?;
    tracing::info!("Cancelled recording session {}", session_id);

    Ok(Json(GenericResponse {
        status: "cancelled".to_string(),
    }))
}

pub async fn get_recording_status(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionStatusResponse>> {
    let session = state.coordinator.session(Some(&session_id)).await?;

    Ok(Json(SessionStatusResponse {
        session_id: session.id.clone(),
        status: session.status().to_string(),
        start_url: session.start_url.clone(),
        event_count: session.events.len(),
    }))
}

pub async fn get_events(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<EventsResponse>> {
    let session = state.coordinator.session(Some(&session_id)).await?;

    Ok(Json(EventsResponse {
        events: session.events.to_vec(),
        active: session.active,
    }))
}

/// Replace the whole log, as the page recorder does after every change
pub async fn replace_events(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(request): Json<ReplaceEventsRequest>,
) -> Result<Json<EventsResponse>> {
    state
        .coordinator
        .replace_events(Some(&session_id), request.events)
        .await?;
    events_of(&state, &session_id).await
}

/// Append a single event, coalescing repeated input on the same field
pub async fn append_event(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(event): Json<Event>,
) -> Result<Json<EventsResponse>> {
    if matches!(event, Event::Unknown) {
        let error = AppError::ValidationError("unknown event type".to_string());
        return Err(report(&state, &session_id, error));
    }
    state.coordinator.append(Some(&session_id), event).await?;
    events_of(&state, &session_id).await
}

/// Replay one DOM event on a page snapshot
pub async fn capture_event(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(request): Json<CaptureRequest>,
) -> Result<Json<EventsResponse>> {
    state
        .coordinator
        .record_with(Some(&session_id), |recorder| {
            let page = snapshot(&request.html, request.url.as_deref());
            let element = page
                .element_at(&request.path)
                .ok_or_else(|| missing_element(&request.path))?;
            Ok(match &request.event {
                PageEvent::Click => recorder.on_click(&page, element),
                PageEvent::Input { value } => recorder.on_input(&page, element, value),
                PageEvent::Keypress { text } => recorder.on_keypress(&page, element, text),
                PageEvent::Change { value } => recorder.on_change(&page, element, value),
            })
        })
        .await
        .map_err(|e| reject(&state, &session_id, e))?;

    events_of(&state, &session_id).await
}

/// Apply a context-menu action on a page snapshot
pub async fn context_action(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(request): Json<ContextRequest>,
) -> Result<Json<EventsResponse>> {
    state
        .coordinator
        .record_with(Some(&session_id), |recorder| {
            let page = snapshot(&request.html, request.url.as_deref());
            if let Some(path) = &request.path {
                let element = page.element_at(path).ok_or_else(|| missing_element(path))?;
                recorder.on_context_menu(&page, element);
            }
            Ok(recorder.apply(&page, &request.action))
        })
        .await
        .map_err(|e| reject(&state, &session_id, e))?;

    events_of(&state, &session_id).await
}

fn snapshot(html: &str, url: Option<&str>) -> Page {
    let page = Page::parse(html);
    match url {
        Some(url) => page.with_url(url),
        None => page,
    }
}

/// Tell WebSocket clients about a page event that could not be applied.
/// Session lookup failures pass through untouched.
fn reject(state: &AppState, session_id: &str, error: AppError) -> AppError {
    if matches!(error, AppError::SessionNotFound(_) | AppError::NoActiveSession) {
        return error;
    }
    report(state, session_id, error)
}

/// Tell WebSocket clients about a rejected page event
fn report(state: &AppState, session_id: &str, error: AppError) -> AppError {
    tracing::warn!("Rejected page event for {}: {}", session_id, error);
    state.broadcast(WsEvent::Error {
        session_id: session_id.to_string(),
        error: error.to_string(),
    });
    error
}

fn missing_element(path: &[usize]) -> AppError {
    AppError::ValidationError(format!("no element at path {:?}", path))
}

async fn events_of(state: &AppState, session_id: &str) -> Result<Json<EventsResponse>> {
    let session = state.coordinator.session(Some(session_id)).await?;
    Ok(Json(EventsResponse {
        events: session.events.to_vec(),
        active: session.active,
    }))
}
