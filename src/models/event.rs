use serde::{Deserialize, Deserializer, Serialize};

/// A single recorded interaction or check.
///
/// Targets are selectors resolved when the event was captured; the page they
/// were resolved against may be gone by the time the log is rendered.
///
/// The `#[serde(alias)]` names are the ones the browser extension used, so
/// logs pushed by older page scripts still deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    /// Recording began on this URL
    Start {
        #[serde(alias = "value")]
        url: String,
    },
    /// Explicit navigation after the start page
    OpenUrl { url: String },
    #[serde(alias = "doClick")]
    Click { target: String },
    /// Final value of a text field
    #[serde(alias = "doInput")]
    Input {
        target: String,
        #[serde(default)]
        value: String,
    },
    /// Characters typed into one field, batched keystroke by keystroke
    Keypress { target: String, text: String },
    #[serde(alias = "doSelectChange")]
    SelectChange {
        target: String,
        #[serde(default)]
        value: String,
    },
    Submit,
    /// Page finished loading; kept for history, renders nothing
    PageLoad { url: String },
    /// Text check scoped to an element when `target` is known, otherwise
    /// anywhere in the page
    CheckText {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
        #[serde(alias = "value")]
        text: String,
    },
    CheckTextPresent { text: String },
    CheckElement { target: String },
    CheckElementValue {
        target: String,
        #[serde(default)]
        value: String,
        #[serde(default)]
        text: String,
    },
    CheckSelectValue {
        target: String,
        #[serde(default)]
        value: String,
    },
    CheckEnabled { target: String },
    CheckDisabled { target: String },
    CheckImage {
        target: String,
        #[serde(alias = "value")]
        src: String,
    },
    #[serde(alias = "checkHref")]
    CheckLink {
        target: String,
        #[serde(alias = "value")]
        href: String,
    },
    CheckPageTitle { title: String },
    CheckPageLocation { url: String },
    #[serde(alias = "takeScreenshot")]
    Screenshot,
    #[serde(alias = "addComment")]
    Comment {
        #[serde(alias = "value")]
        text: String,
    },
    /// Anything this version does not know how to render
    #[serde(other)]
    Unknown,
}

impl Event {
    /// Wire name of the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Start { .. } => "start",
            Event::OpenUrl { .. } => "openUrl",
            Event::Click { .. } => "click",
            Event::Input { .. } => "input",
            Event::Keypress { .. } => "keypress",
            Event::SelectChange { .. } => "selectChange",
            Event::Submit => "submit",
            Event::PageLoad { .. } => "pageLoad",
            Event::CheckText { .. } => "checkText",
            Event::CheckTextPresent { .. } => "checkTextPresent",
            Event::CheckElement { .. } => "checkElement",
            Event::CheckElementValue { .. } => "checkElementValue",
            Event::CheckSelectValue { .. } => "checkSelectValue",
            Event::CheckEnabled { .. } => "checkEnabled",
            Event::CheckDisabled { .. } => "checkDisabled",
            Event::CheckImage { .. } => "checkImage",
            Event::CheckLink { .. } => "checkLink",
            Event::CheckPageTitle { .. } => "checkPageTitle",
            Event::CheckPageLocation { .. } => "checkPageLocation",
            Event::Screenshot => "screenshot",
            Event::Comment { .. } => "comment",
            Event::Unknown => "unknown",
        }
    }

    /// Selector of the element the event refers to, if any
    pub fn target(&self) -> Option<&str> {
        match self {
            Event::Click { target }
            | Event::Input { target, .. }
            | Event::Keypress { target, .. }
            | Event::SelectChange { target, .. }
            | Event::CheckElement { target }
            | Event::CheckElementValue { target, .. }
            | Event::CheckSelectValue { target, .. }
            | Event::CheckEnabled { target }
            | Event::CheckDisabled { target }
            | Event::CheckImage { target, .. }
            | Event::CheckLink { target, .. } => Some(target),
            Event::CheckText { target, .. } => target.as_deref(),
            _ => None,
        }
    }

    pub fn is_check(&self) -> bool {
        matches!(
            self,
            Event::CheckText { .. }
                | Event::CheckTextPresent { .. }
                | Event::CheckElement { .. }
                | Event::CheckElementValue { .. }
                | Event::CheckSelectValue { .. }
                | Event::CheckEnabled { .. }
                | Event::CheckDisabled { .. }
                | Event::CheckImage { .. }
                | Event::CheckLink { .. }
                | Event::CheckPageTitle { .. }
                | Event::CheckPageLocation { .. }
        )
    }

    /// Checks and screenshots are triggered from the context menu, and the
    /// browser reports the click that dismisses the menu right after them.
    pub fn is_context_menu_action(&self) -> bool {
        self.is_check() || matches!(self, Event::Screenshot)
    }
}

/// Deserialize a list of events one entry at a time. An entry that does not
/// parse becomes [`Event::Unknown`] instead of failing the whole list.
pub fn deserialize_events<'de, D>(deserializer: D) -> Result<Vec<Event>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::debug!("Skipping malformed event at {}: {}", index, e);
                Event::Unknown
            })
        })
        .collect())
}
