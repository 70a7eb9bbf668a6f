use std::sync::OnceLock;

use scraper::{ElementRef, Selector};

use crate::dom::{closest_ancestor, Page, SelectorResolver};
use crate::error::Result;
use crate::models::{Event, EventLog};
use crate::protocol::{ContextAction, MessageChannel, Reply, Request};
use crate::render::ScriptRenderer;

/// Elements whose clicks are worth recording
const CLICKABLES: &str = r#"a, button, [type="submit"], [type="button"]"#;

fn clickables() -> &'static Selector {
    static CLICKABLES_SELECTOR: OnceLock<Selector> = OnceLock::new();
    CLICKABLES_SELECTOR
        .get_or_init(|| Selector::parse(CLICKABLES).expect("static selector parses"))
}

/// Page-side recorder.
///
/// Lives as long as one page does. Each capture method turns a DOM event into
/// at most one log entry and returns whether it recorded something; callers
/// push the log to the coordinator with [`Recorder::mirror`] afterwards.
pub struct Recorder {
    log: EventLog,
    started: bool,
    /// Coordinator session the log belongs to, set on attach
    session_id: Option<String>,
    /// Element the context menu was last opened on, as a child-index path
    context_element: Option<Vec<usize>>,
    resolver: SelectorResolver,
    renderer: ScriptRenderer,
}

impl Recorder {
    pub fn new() -> Self {
        Self::with_renderer(ScriptRenderer::default())
    }

    pub fn with_renderer(renderer: ScriptRenderer) -> Self {
        Self {
            log: EventLog::new(),
            started: false,
            session_id: None,
            context_element: None,
            resolver: SelectorResolver::new(),
            renderer,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.to_vec()
    }

    pub fn start(&mut self, url: &str) {
        self.log.clear();
        self.session_id = None;
        self.context_element = None;
        self.started = true;
        self.log.append(Event::Start {
            url: url.to_string(),
        });
        tracing::info!("Recorder started on {}", url);
    }

    /// Render the log and reset
    pub fn stop(&mut self, title: &str) -> String {
        let script = self.renderer.render(self.log.as_slice(), title);
        tracing::info!("Recorder stopped ({} events)", self.log.len());
        self.started = false;
        self.session_id = None;
        self.context_element = None;
        self.log.clear();
        script
    }

    /// Adopt the coordinator's log if a session is live
    pub fn attach(&mut self, reply: Reply) {
        match reply {
            Reply::Events {
                session_id,
                events,
                active: true,
            } => {
                tracing::debug!(
                    "Reattached to session {:?} ({} events)",
                    session_id,
                    events.len()
                );
                self.log.replace_all(events);
                self.session_id = session_id;
                self.started = true;
            }
            Reply::Events { active: false, .. } => {
                self.started = false;
                self.session_id = None;
                self.log.clear();
            }
            other => tracing::warn!("Unexpected reply while attaching: {:?}", other),
        }
    }

    /// Pull the in-progress log after a navigation tore the last page down
    pub async fn resume(&mut self, channel: &dyn MessageChannel) -> Result<()> {
        let reply = channel.send(Request::GetEvents).await?;
        self.attach(reply);
        Ok(())
    }

    /// Push the full log to the coordinator session it was attached to.
    ///
    /// A recorder that never attached has nothing to push to. If that
    /// session has since been replaced the coordinator rejects the push.
    pub async fn mirror(&self, channel: &dyn MessageChannel) -> Result<()> {
        let Some(session_id) = self.session_id.clone().filter(|_| self.started) else {
            return Ok(());
        };
        channel
            .send(Request::Events {
                session_id,
                events: self.log.to_vec(),
            })
            .await?;
        Ok(())
    }

    pub fn on_click(&mut self, page: &Page, element: ElementRef<'_>) -> bool {
        // A plain click closes any open context menu
        self.context_element = None;
        if !self.started {
            return false;
        }

        let Some(clickable) = closest_clickable(element) else {
            tracing::trace!("Ignoring click on <{}>", element.value().name());
            return false;
        };
        let target = self.resolver.resolve(page, clickable);
        self.record(Event::Click { target })
    }

    pub fn on_input(&mut self, page: &Page, element: ElementRef<'_>, value: &str) -> bool {
        if !self.started || is_select(element) {
            return false;
        }
        let target = self.resolver.resolve(page, element);
        self.record(Event::Input {
            target,
            value: value.to_string(),
        })
    }

    /// Keystrokes on one target batch into a single entry
    pub fn on_keypress(&mut self, page: &Page, element: ElementRef<'_>, text: &str) -> bool {
        if !self.started {
            return false;
        }
        let target = self.resolver.resolve(page, element);

        if let Some(Event::Keypress {
            target: last_target,
            text: typed,
        }) = self.log.peek()
        {
            if *last_target == target {
                let batched = Event::Keypress {
                    target,
                    text: format!("{}{}", typed, text),
                };
                self.log.replace_last(batched);
                return true;
            }
        }

        self.record(Event::Keypress {
            target,
            text: text.to_string(),
        })
    }

    pub fn on_change(&mut self, page: &Page, element: ElementRef<'_>, value: &str) -> bool {
        if !self.started || !is_select(element) {
            return false;
        }
        let target = self.resolver.resolve(page, element);
        self.record(Event::SelectChange {
            target,
            value: value.to_string(),
        })
    }

    pub fn on_context_menu(&mut self, page: &Page, element: ElementRef<'_>) {
        self.context_element = Some(page.path_of(element));
    }

    /// Record a context-menu command against the element the menu was
    /// opened on, or `<body>` when there is none.
    pub fn apply(&mut self, page: &Page, action: &ContextAction) -> bool {
        if !self.started {
            return false;
        }

        let explicit = self
            .context_element
            .as_deref()
            .and_then(|path| page.element_at(path));
        let has_context = explicit.is_some();
        let element = explicit
            .or_else(|| page.body())
            .unwrap_or_else(|| page.root());

        let event = match action {
            ContextAction::AddComment { text } => {
                if text.trim().is_empty() {
                    return false;
                }
                Event::Comment { text: text.clone() }
            }
            ContextAction::TakeScreenshot => Event::Screenshot,
            ContextAction::CheckText { text } => Event::CheckText {
                target: has_context.then(|| self.resolver.resolve(page, element)),
                text: text.clone(),
            },
            ContextAction::CheckElement => Event::CheckElement {
                target: self.resolver.resolve(page, element),
            },
            ContextAction::CheckElementValue => Event::CheckElementValue {
                target: self.resolver.resolve(page, element),
                value: element.value().attr("value").unwrap_or_default().to_string(),
                text: element.text().collect::<String>().trim().to_string(),
            },
            ContextAction::CheckSelectValue => Event::CheckSelectValue {
                target: self.resolver.resolve(page, element),
                value: selected_value(element).unwrap_or_default(),
            },
            ContextAction::CheckEnabled => Event::CheckEnabled {
                target: self.resolver.resolve(page, element),
            },
            ContextAction::CheckDisabled => Event::CheckDisabled {
                target: self.resolver.resolve(page, element),
            },
            ContextAction::CheckImage => Event::CheckImage {
                target: self.resolver.resolve(page, element),
                src: element.value().attr("src").unwrap_or_default().to_string(),
            },
            ContextAction::CheckLink | ContextAction::CheckHref => {
                let link = if element.value().name() == "a" {
                    element
                } else {
                    closest_ancestor(element, "a").unwrap_or(element)
                };
                Event::CheckLink {
                    target: self.resolver.resolve(page, link),
                    href: link.value().attr("href").unwrap_or_default().to_string(),
                }
            }
            ContextAction::CheckPageTitle => Event::CheckPageTitle {
                title: page.title().unwrap_or_default(),
            },
            ContextAction::CheckPageLocation => match page.url() {
                Some(url) => Event::CheckPageLocation {
                    url: url.to_string(),
                },
                None => {
                    tracing::warn!("Page location check without a known page address");
                    return false;
                }
            },
        };

        self.record(event)
    }

    fn record(&mut self, event: Event) -> bool {
        tracing::debug!("Recorded {}", event.kind());
        self.log.append(event);
        true
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

fn is_select(element: ElementRef<'_>) -> bool {
    element.value().name() == "select"
}

fn closest_clickable(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .find(|candidate| clickables().matches(candidate))
}

/// Value of the selected `<option>`, falling back to the first one
fn selected_value(select: ElementRef<'_>) -> Option<String> {
    let options: Vec<ElementRef<'_>> = select
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "option")
        .collect();
    let chosen = options
        .iter()
        .find(|o| o.value().attr("selected").is_some())
        .or_else(|| options.first())?;
    Some(
        chosen
            .value()
            .attr("value")
            .map(str::to_string)
            .unwrap_or_else(|| chosen.text().collect::<String>().trim().to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORM: &str = r#"
        <html>
        <head><title>Checkout</title></head>
        <body>
            <form id="order">
                <input name="email" type="email">
                <select name="size">
                    <option value="s">Small</option>
                    <option value="m" selected>Medium</option>
                </select>
                <button type="submit"><span>Buy</span></button>
            </form>
            <p id="note">Thanks</p>
            <a id="home" href="/home"><img id="logo" src="/logo.png"></a>
        </body>
        </html>
    "#;

    fn started() -> Recorder {
        let mut recorder = Recorder::new();
        recorder.start("http://shop.test/");
        recorder
    }

    #[test]
    fn test_nothing_recorded_before_start() {
        let page = Page::parse(FORM);
        let mut recorder = Recorder::new();
        let button = page.query("button").unwrap();
        assert!(!recorder.on_click(&page, button));
        assert!(recorder.log().is_empty());
    }

    #[test]
    fn test_click_uses_closest_clickable() {
        let page = Page::parse(FORM);
        let mut recorder = started();
        let span = page.query("button span").unwrap();
        assert!(recorder.on_click(&page, span));
        assert_eq!(
            recorder.log().peek(),
            Some(&Event::Click {
                target: r#"button[type="submit"]"#.to_string()
            })
        );
    }

    #[test]
    fn test_click_on_plain_text_is_ignored() {
        let page = Page::parse(FORM);
        let mut recorder = started();
        assert!(!recorder.on_click(&page, page.query("#note").unwrap()));
        assert_eq!(recorder.log().len(), 1);
    }

    #[test]
    fn test_input_coalesces_and_skips_select() {
        let page = Page::parse(FORM);
        let mut recorder = started();
        let email = page.query("input").unwrap();
        recorder.on_input(&page, email, "a");
        recorder.on_input(&page, email, "a@b");
        assert!(!recorder.on_input(&page, page.query("select").unwrap(), "m"));

        assert_eq!(recorder.log().len(), 2);
        assert_eq!(
            recorder.log().peek(),
            Some(&Event::Input {
                target: r#"#order [name="email"]"#.to_string(),
                value: "a@b".to_string()
            })
        );
    }

    #[test]
    fn test_change_only_for_select() {
        let page = Page::parse(FORM);
        let mut recorder = started();
        assert!(!recorder.on_change(&page, page.query("input").unwrap(), "x"));
        assert!(recorder.on_change(&page, page.query("select").unwrap(), "s"));
        assert_eq!(
            recorder.log().peek(),
            Some(&Event::SelectChange {
                target: r#"#order [name="size"]"#.to_string(),
                value: "s".to_string()
            })
        );
    }

    #[test]
    fn test_keypresses_batch_per_target() {
        let page = Page::parse(FORM);
        let mut recorder = started();
        let email = page.query("input").unwrap();
        recorder.on_keypress(&page, email, "a");
        recorder.on_keypress(&page, email, "b");
        assert_eq!(recorder.log().len(), 2);
        assert_eq!(
            recorder.log().peek(),
            Some(&Event::Keypress {
                target: r#"#order [name="email"]"#.to_string(),
                text: "ab".to_string()
            })
        );
    }

    #[test]
    fn test_check_text_without_context_has_no_target() {
        let page = Page::parse(FORM);
        let mut recorder = started();
        recorder.apply(
            &page,
            &ContextAction::CheckText {
                text: "Thanks".to_string(),
            },
        );
        assert_eq!(
            recorder.log().peek(),
            Some(&Event::CheckText {
                target: None,
                text: "Thanks".to_string()
            })
        );
    }

    #[test]
    fn test_context_element_targets_checks() {
        let page = Page::parse(FORM);
        let mut recorder = started();
        recorder.on_context_menu(&page, page.query("#note").unwrap());
        recorder.apply(&page, &ContextAction::CheckElementValue);
        assert_eq!(
            recorder.log().peek(),
            Some(&Event::CheckElementValue {
                target: "#note".to_string(),
                value: String::new(),
                text: "Thanks".to_string()
            })
        );

        recorder.on_context_menu(&page, page.query("select").unwrap());
        recorder.apply(&page, &ContextAction::CheckSelectValue);
        assert_eq!(
            recorder.log().peek(),
            Some(&Event::CheckSelectValue {
                target: r#"#order [name="size"]"#.to_string(),
                value: "m".to_string()
            })
        );
    }

    #[test]
    fn test_link_check_walks_up_to_anchor() {
        let page = Page::parse(FORM);
        let mut recorder = started();
        recorder.on_context_menu(&page, page.query("#logo").unwrap());
        recorder.apply(&page, &ContextAction::CheckHref);
        assert_eq!(
            recorder.log().peek(),
            Some(&Event::CheckLink {
                target: "#home".to_string(),
                href: "/home".to_string()
            })
        );

        recorder.apply(&page, &ContextAction::CheckImage);
        assert_eq!(
            recorder.log().peek(),
            Some(&Event::CheckImage {
                target: "#logo".to_string(),
                src: "/logo.png".to_string()
            })
        );
    }

    #[test]
    fn test_click_clears_context_element() {
        let page = Page::parse(FORM);
        let mut recorder = started();
        recorder.on_context_menu(&page, page.query("#note").unwrap());
        recorder.on_click(&page, page.query("#home").unwrap());
        recorder.apply(&page, &ContextAction::CheckElement);
        assert_eq!(
            recorder.log().peek(),
            Some(&Event::CheckElement {
                target: "body".to_string()
            })
        );
    }

    #[test]
    fn test_page_checks() {
        let page = Page::parse(FORM).with_url("http://shop.test/checkout");
        let mut recorder = started();
        recorder.apply(&page, &ContextAction::CheckPageTitle);
        recorder.apply(&page, &ContextAction::CheckPageLocation);
        assert!(!recorder.apply(
            &page,
            &ContextAction::AddComment {
                text: "  ".to_string()
            }
        ));

        let events = recorder.events();
        assert_eq!(
            events[1],
            Event::CheckPageTitle {
                title: "Checkout".to_string()
            }
        );
        assert_eq!(
            events[2],
            Event::CheckPageLocation {
                url: "http://shop.test/checkout".to_string()
            }
        );
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn test_stop_renders_and_clears() {
        let page = Page::parse(FORM);
        let mut recorder = started();
        recorder.on_click(&page, page.query("#home").unwrap());
        let script = recorder.stop("Shop");
        assert!(script.contains("casper.start('http://shop.test/');"));
        assert!(script.contains("this.click('#home');"));
        assert!(!recorder.is_started());
        assert!(recorder.log().is_empty());
    }

    #[test]
    fn test_attach_adopts_live_log() {
        let mut recorder = Recorder::new();
        let events = vec![Event::Start {
            url: "http://x/".to_string(),
        }];
        recorder.attach(Reply::Events {
            session_id: Some("s1".to_string()),
            events: events.clone(),
            active: true,
        });
        assert!(recorder.is_started());
        assert_eq!(recorder.session_id(), Some("s1"));
        assert_eq!(recorder.events(), events);

        recorder.attach(Reply::Events {
            session_id: None,
            events: vec![],
            active: false,
        });
        assert!(!recorder.is_started());
        assert_eq!(recorder.session_id(), None);
    }

    #[test]
    fn test_mirror_round_trips_through_coordinator() {
        use crate::recording::Coordinator;

        let coordinator = Coordinator::new(ScriptRenderer::default(), "Recorded test");
        let page = Page::parse(FORM);

        let mut recorder = Recorder::new();
        tokio_test::block_on(coordinator.start("http://shop.test/", None));
        tokio_test::block_on(recorder.resume(&coordinator)).unwrap();
        recorder.on_click(&page, page.query("#home").unwrap());
        tokio_test::block_on(recorder.mirror(&coordinator)).unwrap();

        let (events, active) = tokio_test::block_on(coordinator.events());
        assert!(active);
        assert_eq!(events, recorder.events());
    }

    #[test]
    fn test_stale_recorder_cannot_overwrite_new_session() {
        use crate::error::AppError;
        use crate::recording::Coordinator;

        let coordinator = Coordinator::new(ScriptRenderer::default(), "Recorded test");
        let page = Page::parse(FORM);

        let old = tokio_test::block_on(coordinator.start("http://old.test/", None));
        let mut stale = Recorder::new();
        tokio_test::block_on(stale.resume(&coordinator)).unwrap();
        assert_eq!(stale.session_id(), Some(old.id.as_str()));
        stale.on_click(&page, page.query("#home").unwrap());

        tokio_test::block_on(coordinator.start("http://new.test/", None));
        let result = tokio_test::block_on(stale.mirror(&coordinator));
        assert!(matches!(result, Err(AppError::SessionNotFound(id)) if id == old.id));

        let (events, _) = tokio_test::block_on(coordinator.events());
        assert_eq!(
            events,
            vec![Event::Start {
                url: "http://new.test/".to_string()
            }]
        );
    }

    #[test]
    fn test_locally_started_recorder_does_not_push() {
        use crate::recording::Coordinator;

        let coordinator = Coordinator::new(ScriptRenderer::default(), "Recorded test");
        tokio_test::block_on(coordinator.start("http://x/", None));

        let recorder = started();
        tokio_test::block_on(recorder.mirror(&coordinator)).unwrap();
        let (events, _) = tokio_test::block_on(coordinator.events());
        assert_eq!(events, vec![Event::Start { url: "http://x/".to_string() }]);
    }
}
