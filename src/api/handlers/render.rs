use axum::{extract::State, Json};
use std::sync::Arc;

use crate::dom::{Page, SelectorResolver};
use crate::error::{AppError, Result};
use crate::models::{RenderRequest, ResolveSelectorRequest, ScriptResponse, SelectorResponse};

use super::super::state::AppState;

/// Render a log without touching the live session
pub async fn render_script(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RenderRequest>,
) -> Json<ScriptResponse> {
    let title = request
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| state.coordinator.default_title().to_string());

    let script = state
        .coordinator
        .renderer()
        .render_as(&request.events, &title, request.format);

    Json(ScriptResponse { script })
}

pub async fn resolve_selector(
    Json(request): Json<ResolveSelectorRequest>,
) -> Result<Json<SelectorResponse>> {
    let page = Page::parse(&request.html);
    let element = page.element_at(&request.path).ok_or_else(|| {
        AppError::ValidationError(format!("no element at path {:?}", request.path))
    })?;

    let selector = SelectorResolver::new().resolve(&page, element);
    let unique = page.is_unique(&selector);

    Ok(Json(SelectorResponse { selector, unique }))
}
