use serde::Serialize;

use super::event::Event;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    /// Whether a recording session is live
    pub recording: bool,
    /// Open WebSocket connections
    pub connections: usize,
}

#[derive(Debug, Serialize)]
pub struct StartRecordingResponse {
    pub session_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StopRecordingResponse {
    pub session_id: String,
    pub script: String,
    pub event_count: usize,
}

#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub status: String,
    pub start_url: String,
    pub event_count: usize,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<Event>,
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct ScriptResponse {
    pub script: String,
}

#[derive(Debug, Serialize)]
pub struct SelectorResponse {
    pub selector: String,
    /// Whether the selector matched exactly one element of the snapshot
    pub unique: bool,
}

#[derive(Debug, Serialize)]
pub struct GenericResponse {
    pub status: String,
}
