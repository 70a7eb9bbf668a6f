use serde::{Deserialize, Serialize};

use super::event::Event;

/// Ordered events of one recording session.
///
/// The only rewrite performed on append is input coalescing: typing into a
/// field fires one `input` event per keystroke, and only the last value is
/// worth replaying.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event. An `input` directly following an `input` on the same
    /// target replaces it.
    pub fn append(&mut self, event: Event) {
        if let Event::Input { target, .. } = &event {
            if let Some(Event::Input { target: last, .. }) = self.events.last() {
                if last == target {
                    tracing::debug!("Coalesced input event for {}", target);
                    self.events.pop();
                }
            }
        }
        self.events.push(event);
    }

    /// Last event, without removing it
    pub fn peek(&self) -> Option<&Event> {
        self.events.last()
    }

    /// Overwrite the last event, or append when the log is empty
    pub fn replace_last(&mut self, event: Event) {
        match self.events.last_mut() {
            Some(last) => *last = event,
            None => self.events.push(event),
        }
    }

    /// Adopt a full log pushed from elsewhere. Entries go through
    /// [`EventLog::append`] so the pushed log is coalesced too.
    pub fn replace_all(&mut self, events: Vec<Event>) {
        self.events.clear();
        for event in events {
            self.append(event);
        }
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    pub fn as_slice(&self) -> &[Event] {
        &self.events
    }

    pub fn to_vec(&self) -> Vec<Event> {
        self.events.clone()
    }
}

impl From<Vec<Event>> for EventLog {
    fn from(events: Vec<Event>) -> Self {
        Self { events }
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(target: &str, value: &str) -> Event {
        Event::Input {
            target: target.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_consecutive_inputs_on_same_target_coalesce() {
        let mut log = EventLog::new();
        log.append(input("#q", "r"));
        log.append(input("#q", "ru"));
        log.append(input("#q", "rust"));

        assert_eq!(log.len(), 1);
        assert_eq!(log.peek(), Some(&input("#q", "rust")));
    }

    #[test]
    fn test_inputs_on_different_targets_are_kept() {
        let mut log = EventLog::new();
        log.append(input("#first", "a"));
        log.append(input("#last", "b"));
        log.append(input("#first", "c"));
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_only_adjacent_inputs_coalesce() {
        let mut log = EventLog::new();
        log.append(input("#q", "a"));
        log.append(Event::Click { target: "#go".to_string() });
        log.append(input("#q", "b"));
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_clicks_and_checks_never_merge() {
        let mut log = EventLog::new();
        log.append(Event::Click { target: "#go".to_string() });
        log.append(Event::Click { target: "#go".to_string() });
        log.append(Event::CheckElement { target: "#ok".to_string() });
        log.append(Event::CheckElement { target: "#ok".to_string() });
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn test_replace_last() {
        let mut log = EventLog::new();
        log.replace_last(Event::Submit);
        assert_eq!(log.len(), 1);

        log.append(Event::Screenshot);
        log.replace_last(Event::Comment { text: "x".to_string() });
        assert_eq!(log.as_slice(), &[Event::Submit, Event::Comment { text: "x".to_string() }]);
    }

    #[test]
    fn test_replace_all_coalesces_pushed_log() {
        let mut log = EventLog::from(vec![Event::Screenshot]);
        log.replace_all(vec![
            Event::Start { url: "http://x/".to_string() },
            input("#q", "a"),
            input("#q", "b"),
        ]);
        assert_eq!(
            log.as_slice(),
            &[Event::Start { url: "http://x/".to_string() }, input("#q", "b")]
        );
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let log = EventLog::from(vec![Event::Screenshot]);
        assert_eq!(serde_json::to_string(&log).unwrap(), r#"[{"type":"screenshot"}]"#);
    }
}
