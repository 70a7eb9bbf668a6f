use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex};

use crate::error::{AppError, Result};
use crate::models::{Event, Session};
use crate::protocol::{MessageChannel, Reply, Request};
use crate::render::{ScriptFormat, ScriptRenderer};

use super::Recorder;

/// Change notifications for subscribers such as WebSocket clients
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    Started {
        session_id: String,
        start_url: String,
    },
    LogChanged {
        session_id: String,
        events: Vec<Event>,
    },
    Stopped {
        session_id: String,
        event_count: usize,
    },
}

/// Script produced when a session stops
#[derive(Debug, Clone)]
pub struct RenderedScript {
    pub session_id: String,
    pub script: String,
    pub event_count: usize,
}

/// Long-lived owner of the one live recording session.
///
/// The page recorder is torn down on every navigation; it pushes its full
/// log here after each change and pulls it back when it reattaches, so this
/// copy is the one that survives.
pub struct Coordinator {
    session: Mutex<Option<Session>>,
    renderer: ScriptRenderer,
    default_title: String,
    updates: broadcast::Sender<SessionUpdate>,
}

impl Coordinator {
    pub fn new(renderer: ScriptRenderer, default_title: impl Into<String>) -> Self {
        let (updates, _) = broadcast::channel(256);
        Self {
            session: Mutex::new(None),
            renderer,
            default_title: default_title.into(),
            updates,
        }
    }

    pub fn renderer(&self) -> &ScriptRenderer {
        &self.renderer
    }

    pub fn default_title(&self) -> &str {
        &self.default_title
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.updates.subscribe()
    }

    /// Start a fresh session, dropping whatever was being recorded before
    pub async fn start(&self, start_url: &str, client_id: Option<String>) -> Session {
        let mut session = Session::new(start_url.to_string());
        session.client_id = client_id;
        session.start();

        let mut slot = self.session.lock().await;
        if let Some(previous) = slot.take() {
            tracing::warn!(
                "Replacing recording session {} ({} events discarded)",
                previous.id,
                previous.events.len()
            );
        }
        *slot = Some(session.clone());
        drop(slot);

        tracing::info!("Recording started: {} on {}", session.id, start_url);
        self.publish(SessionUpdate::Started {
            session_id: session.id.clone(),
            start_url: start_url.to_string(),
        });
        session
    }

    /// Current log and whether a session is live
    pub async fn events(&self) -> (Vec<Event>, bool) {
        match self.session.lock().await.as_ref() {
            Some(session) => (session.events.to_vec(), session.active),
            None => (Vec::new(), false),
        }
    }

    /// The reply a reattaching page recorder gets: the live log tagged with
    /// the session it belongs to.
    pub async fn snapshot(&self) -> Reply {
        match self.session.lock().await.as_ref() {
            Some(session) => Reply::Events {
                session_id: Some(session.id.clone()),
                events: session.events.to_vec(),
                active: session.active,
            },
            None => Reply::Events {
                session_id: None,
                events: Vec::new(),
                active: false,
            },
        }
    }

    /// Run one page capture against the live log.
    ///
    /// `capture` gets a recorder attached to the session's current log and
    /// returns whether it recorded something. The session stays locked for
    /// the whole read-capture-write, so concurrent captures never overwrite
    /// each other.
    pub async fn record_with<F>(&self, session_id: Option<&str>, capture: F) -> Result<bool>
    where
        F: FnOnce(&mut Recorder) -> Result<bool>,
    {
        let mut slot = self.session.lock().await;
        let session = active_session(&mut slot, session_id)?;
        if !session.active {
            return Err(AppError::RecordingError(format!(
                "session {} is not recording",
                session.id
            )));
        }

        let mut recorder = Recorder::with_renderer(self.renderer.clone());
        recorder.attach(Reply::Events {
            session_id: Some(session.id.clone()),
            events: session.events.to_vec(),
            active: true,
        });
        if !capture(&mut recorder)? {
            return Ok(false);
        }

        session.events.replace_all(recorder.events());
        let update = SessionUpdate::LogChanged {
            session_id: session.id.clone(),
            events: session.events.to_vec(),
        };
        drop(slot);

        self.publish(update);
        Ok(true)
    }

    /// Adopt the page's full log
    pub async fn replace_events(&self, session_id: Option<&str>, events: Vec<Event>) -> Result<usize> {
        let mut slot = self.session.lock().await;
        let session = active_session(&mut slot, session_id)?;
        session.events.replace_all(events);

        let count = session.events.len();
        let update = SessionUpdate::LogChanged {
            session_id: session.id.clone(),
            events: session.events.to_vec(),
        };
        drop(slot);

        tracing::debug!("Log replaced ({} events)", count);
        self.publish(update);
        Ok(count)
    }

    /// Append one event, with input coalescing
    pub async fn append(&self, session_id: Option<&str>, event: Event) -> Result<usize> {
        let mut slot = self.session.lock().await;
        let session = active_session(&mut slot, session_id)?;
        tracing::debug!("Appending {} to {}", event.kind(), session.id);
        session.events.append(event);

        let count = session.events.len();
        let update = SessionUpdate::LogChanged {
            session_id: session.id.clone(),
            events: session.events.to_vec(),
        };
        drop(slot);

        self.publish(update);
        Ok(count)
    }

    /// End the session and render its script
    pub async fn stop(
        &self,
        session_id: Option<&str>,
        title: Option<&str>,
        format: ScriptFormat,
    ) -> Result<RenderedScript> {
        let mut slot = self.session.lock().await;
        active_session(&mut slot, session_id)?;
        let mut session = slot.take().ok_or(AppError::NoActiveSession)?;
        drop(slot);

        session.stop();
        let title = title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.default_title);
        let script = self
            .renderer
            .render_as(session.events.as_slice(), title, format);
        let event_count = session.events.len();

        tracing::info!(
            "Recording stopped: {} ({} events rendered)",
            session.id,
            event_count
        );
        self.publish(SessionUpdate::Stopped {
            session_id: session.id.clone(),
            event_count,
        });

        Ok(RenderedScript {
            session_id: session.id,
            script,
            event_count,
        })
    }

    /// Drop the session without rendering
    pub async fn cancel(&self, session_id: Option<&str>) -> Result<String> {
        let mut slot = self.session.lock().await;
        active_session(&mut slot, session_id)?;
        let session = slot.take().ok_or(AppError::NoActiveSession)?;
        drop(slot);

        tracing::info!("Recording cancelled: {}", session.id);
        self.publish(SessionUpdate::Stopped {
            session_id: session.id.clone(),
            event_count: session.events.len(),
        });
        Ok(session.id)
    }

    /// Cancel the session if `client_id` started it. Returns whether one was
    /// cancelled.
    pub async fn cancel_owned_by(&self, client_id: &str) -> bool {
        let owned = {
            let slot = self.session.lock().await;
            slot.as_ref()
                .map(|s| s.client_id.as_deref() == Some(client_id))
                .unwrap_or(false)
        };
        if !owned {
            return false;
        }
        match self.cancel(None).await {
            Ok(session_id) => {
                tracing::info!("Cleaning up orphaned recording session: {}", session_id);
                true
            }
            Err(_) => false,
        }
    }

    /// Snapshot of the live session
    pub async fn session(&self, session_id: Option<&str>) -> Result<Session> {
        let mut slot = self.session.lock().await;
        active_session(&mut slot, session_id).map(|s| s.clone())
    }

    fn publish(&self, update: SessionUpdate) {
        // No subscribers is fine
        let _ = self.updates.send(update);
    }
}

fn active_session<'a>(
    slot: &'a mut Option<Session>,
    session_id: Option<&str>,
) -> Result<&'a mut Session> {
    let matches = match (slot.as_ref(), session_id) {
        (Some(session), Some(id)) => session.id == id,
        (Some(_), None) => true,
        (None, _) => false,
    };
    if !matches {
        return Err(match session_id {
            Some(id) => AppError::SessionNotFound(id.to_string()),
            None => AppError::NoActiveSession,
        });
    }
    slot.as_mut().ok_or(AppError::NoActiveSession)
}

#[async_trait]
impl MessageChannel for Coordinator {
    async fn send(&self, request: Request) -> Result<Reply> {
        match request {
            Request::GetEvents => Ok(self.snapshot().await),
            Request::Events { session_id, events } => {
                self.replace_events(Some(&session_id), events).await?;
                Ok(Reply::Ack)
            }
            Request::Open { url } => {
                self.append(None, Event::OpenUrl { url }).await?;
                Ok(Reply::Ack)
            }
            Request::Start { url } => {
                let session = self.start(&url, None).await;
                Ok(Reply::Started {
                    session_id: session.id,
                })
            }
            Request::Stop { title } => {
                let rendered = self.stop(None, title.as_deref(), ScriptFormat::Text).await?;
                Ok(Reply::Script {
                    script: rendered.script,
                })
            }
        }
    }
}
