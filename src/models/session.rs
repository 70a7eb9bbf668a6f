use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::Event;
use super::log::EventLog;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub start_url: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub events: EventLog,
    /// Client that started the recording, for cleanup when it disconnects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(start_url: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            start_url,
            active: false,
            events: EventLog::new(),
            client_id: None,
            started_at: None,
            stopped_at: None,
        }
    }

    /// Begin recording. The log always opens with the start event.
    pub fn start(&mut self) {
        self.active = true;
        self.started_at = Some(Utc::now());
        self.events.clear();
        self.events.append(Event::Start {
            url: self.start_url.clone(),
        });
    }

    pub fn stop(&mut self) {
        self.active = false;
        self.stopped_at = Some(Utc::now());
    }

    pub fn status(&self) -> &'static str {
        match (self.active, self.stopped_at) {
            (true, _) => "recording",
            (false, Some(_)) => "stopped",
            (false, None) => "pending",
        }
    }
}
