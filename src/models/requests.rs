use serde::Deserialize;

use super::event::{deserialize_events, Event};
use crate::protocol::ContextAction;
use crate::render::ScriptFormat;

#[derive(Debug, Deserialize, Default)]
pub struct StartRecordingRequest {
    /// Page the recording starts on - defaults to a blank tab
    pub start_url: Option<String>,
    /// Optional client ID for tracking which client started the recording
    /// Used for cleanup when client disconnects
    pub client_id: Option<String>,
}

/// Request to stop a recording session and render its script
#[derive(Debug, Deserialize, Default)]
pub struct StopRecordingRequest {
    /// Test name - falls back to the configured default title
    pub title: Option<String>,
    #[serde(default)]
    pub format: ScriptFormat,
}

/// Render an event log without touching the live session
#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    #[serde(deserialize_with = "deserialize_events")]
    pub events: Vec<Event>,
    pub title: Option<String>,
    #[serde(default)]
    pub format: ScriptFormat,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceEventsRequest {
    #[serde(deserialize_with = "deserialize_events")]
    pub events: Vec<Event>,
}

/// Resolve a selector for one element of an HTML snapshot
#[derive(Debug, Deserialize)]
pub struct ResolveSelectorRequest {
    pub html: String,
    /// Element child indices from `<html>` down to the target
    pub path: Vec<usize>,
}

/// DOM event replayed on a page snapshot
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PageEvent {
    Click,
    Input { value: String },
    Keypress { text: String },
    Change { value: String },
}

#[derive(Debug, Deserialize)]
pub struct CaptureRequest {
    pub html: String,
    /// Address the snapshot was taken from
    pub url: Option<String>,
    /// Element child indices from `<html>` down to the event target
    pub path: Vec<usize>,
    #[serde(flatten)]
    pub event: PageEvent,
}

#[derive(Debug, Deserialize)]
pub struct ContextRequest {
    pub html: String,
    pub url: Option<String>,
    /// Element the context menu was opened on; `<body>` when absent
    pub path: Option<Vec<usize>>,
    #[serde(flatten)]
    pub action: ContextAction,
}
