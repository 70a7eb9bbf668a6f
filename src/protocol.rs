//! Messages exchanged between the page recorder and the coordinator that
//! keeps the log alive across navigations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{deserialize_events, Event};

/// Requests handled by the coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    /// Fetch the in-progress log after the page script (re)attaches
    GetEvents,
    /// Full replacement log, pushed after every append or coalesce. Rejected
    /// unless `session_id` names the live session.
    Events {
        session_id: String,
        #[serde(deserialize_with = "deserialize_events")]
        events: Vec<Event>,
    },
    /// Begin a new session; any stale log is dropped
    Start { url: String },
    /// Navigate the recorded tab, logged as `openUrl`
    Open { url: String },
    /// End the session and render its script
    Stop {
        #[serde(default)]
        title: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum Reply {
    Events {
        /// Live session the log belongs to
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        events: Vec<Event>,
        active: bool,
    },
    Started { session_id: String },
    Script { script: String },
    Ack,
}

/// Context-menu commands delivered to the page recorder. Each one becomes at
/// most one event, built from the element the menu was opened on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ContextAction {
    AddComment { text: String },
    TakeScreenshot,
    /// `text` is the selected text
    CheckText { text: String },
    CheckElement,
    CheckElementValue,
    CheckSelectValue,
    CheckEnabled,
    CheckDisabled,
    CheckImage,
    CheckLink,
    CheckHref,
    CheckPageTitle,
    CheckPageLocation,
}

/// Request/response transport to the coordinator
#[async_trait]
pub trait MessageChannel: Send + Sync {
    async fn send(&self, request: Request) -> Result<Reply>;
}
