//! Turns a recorded event log into a CasperJS test script.
//!
//! Rendering is a single pass over the log with no state carried between
//! calls: the same events and title always give the same text.

pub mod escape;

use serde::{Deserialize, Serialize};

use crate::dom::selector::css_string;
use crate::models::Event;
use escape::{
    html_escape, js_string, normalize_whitespace, regex_escape, short_url, xpath_literal,
    xpath_selector,
};

/// How the `screenshotN.png` suffix is chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenshotNumbering {
    /// 1, 2, 3... in emission order
    #[default]
    Sequential,
    /// Position of the screenshot event in the log
    #[serde(alias = "index")]
    EventIndex,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptFormat {
    #[default]
    Text,
    /// Script escaped inside a `<pre>` block, for display in a tab
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Pause before each screenshot so the page can settle
    pub screenshot_wait_ms: u64,
    pub screenshot_numbering: ScreenshotNumbering,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            viewport_width: 1280,
            viewport_height: 720,
            screenshot_wait_ms: 1000,
            screenshot_numbering: ScreenshotNumbering::Sequential,
        }
    }
}

/// Render with default options
pub fn render(events: &[Event], title: &str) -> String {
    ScriptRenderer::default().render(events, title)
}

#[derive(Debug, Clone, Default)]
pub struct ScriptRenderer {
    options: RenderOptions,
}

/// Per-pass bookkeeping
struct Pass {
    lines: Vec<String>,
    started: bool,
    screenshots: usize,
    /// Last known page address, for shortening same-origin URLs
    page_url: Option<String>,
}

impl ScriptRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn render_as(&self, events: &[Event], title: &str, format: ScriptFormat) -> String {
        match format {
            ScriptFormat::Text => self.render(events, title),
            ScriptFormat::Html => self.render_html(events, title),
        }
    }

    pub fn render_html(&self, events: &[Event], title: &str) -> String {
        format!("<pre>{}</pre>", html_escape(&self.render(events, title)))
    }

    pub fn render(&self, events: &[Event], title: &str) -> String {
        let mut pass = Pass {
            lines: self.header(title),
            started: false,
            screenshots: 0,
            page_url: None,
        };

        for (index, event) in events.iter().enumerate() {
            if matches!(event, Event::Click { .. })
                && index > 0
                && events[index - 1].is_context_menu_action()
            {
                tracing::trace!("Skipping click after {} at {}", events[index - 1].kind(), index);
                continue;
            }
            self.render_event(&mut pass, index, event);
        }

        pass.lines.push(String::new());
        pass.lines.push("  casper.run(function () {test.done();});".to_string());
        pass.lines.push("});".to_string());

        let mut script = pass.lines.join("\n");
        script.push('\n');
        script
    }

    fn header(&self, title: &str) -> Vec<String> {
        vec![
            "var x = require('casper').selectXPath;".to_string(),
            "casper.on('step.error', function (err) {".to_string(),
            "  casper.page.evaluate(function () {".to_string(),
            "    document.body.bgColor = 'white';".to_string(),
            "  });".to_string(),
            "  casper.captureSelector('error.png', 'html');".to_string(),
            "  this.die('Step failed: ' + err + ' See error.png for more info');".to_string(),
            "});".to_string(),
            format!(
                "casper.options.viewportSize = {{width: {}, height: {}}};",
                self.options.viewport_width, self.options.viewport_height
            ),
            format!("casper.test.begin({}, function (test) {{", js_string(title)),
        ]
    }

    fn render_event(&self, pass: &mut Pass, index: usize, event: &Event) {
        match event {
            Event::Start { url } | Event::OpenUrl { url } => {
                let call = if pass.started { "thenOpen" } else { "start" };
                pass.started = true;
                pass.page_url = Some(url.clone());
                pass.lines.push(format!("  casper.{}({});", call, js_string(url)));
            }
            Event::PageLoad { url } => {
                pass.page_url = Some(url.clone());
            }
            Event::Click { target } => {
                let t = js_string(target);
                block(pass, vec![
                    format!("  casper.waitForSelector({}, function () {{", t),
                    format!("    test.assertExists({});", t),
                    format!("    this.click({});", t),
                    "  });".to_string(),
                ]);
            }
            Event::Input { target, value } => {
                let t = js_string(target);
                block(pass, vec![
                    format!("  casper.waitForSelector({}, function () {{", t),
                    format!("    this.sendKeys({}, {}, {{reset: true}});", t, js_string(value)),
                    "  });".to_string(),
                ]);
            }
            Event::Keypress { target, text } => {
                let t = js_string(target);
                let typed = text.replace('\n', "");
                block(pass, vec![
                    format!("  casper.waitForSelector({}, function () {{", t),
                    format!("    this.sendKeys({}, {});", t, js_string(&typed)),
                    "  });".to_string(),
                ]);
            }
            Event::SelectChange { target, value } => {
                let t = js_string(target);
                block(pass, vec![
                    format!("  casper.waitForSelector({}, function () {{", t),
                    "    this.evaluate(function (selector, value) {".to_string(),
                    "      var element = document.querySelector(selector);".to_string(),
                    "      element.value = value;".to_string(),
                    "      var event = document.createEvent('HTMLEvents');".to_string(),
                    "      event.initEvent('change', true, true);".to_string(),
                    "      element.dispatchEvent(event);".to_string(),
                    format!("    }}, {}, {});", t, js_string(value)),
                    "  });".to_string(),
                ]);
            }
            Event::Submit => {
                ensure_started(pass);
                pass.lines.push("  /* submit form */".to_string());
            }
            Event::CheckText {
                target: Some(target),
                text,
            } => {
                let t = js_string(target);
                block(pass, vec![
                    format!("  casper.waitForSelector({}, function () {{", t),
                    format!("    test.assertSelectorHasText({}, {});", t, js_string(text)),
                    "  });".to_string(),
                ]);
            }
            Event::CheckText { target: None, text } | Event::CheckTextPresent { text } => {
                let xpath = format!(
                    "//*[contains(text(), {})]",
                    xpath_literal(&normalize_whitespace(text))
                );
                wait_and_assert(pass, &xpath_selector(&xpath));
            }
            Event::CheckElement { target } => {
                then(pass, format!("test.assertExists({});", js_string(target)));
            }
            Event::CheckElementValue {
                target,
                value,
                text,
            } => {
                let expected = if value.is_empty() { text.trim() } else { value.as_str() };
                then(
                    pass,
                    format!(
                        "test.assertField({{type: 'css', path: {}}}, {});",
                        js_string(target),
                        js_string(expected)
                    ),
                );
            }
            Event::CheckSelectValue { target, value } => {
                let t = js_string(target);
                block(pass, vec![
                    format!("  casper.waitForSelector({}, function () {{", t),
                    format!(
                        "    test.assertField({{type: 'css', path: {}}}, {});",
                        t,
                        js_string(value)
                    ),
                    "  });".to_string(),
                ]);
            }
            Event::CheckEnabled { target } => {
                wait_and_assert(pass, &js_string(&format!("{}:not([disabled])", target)));
            }
            Event::CheckDisabled { target } => {
                wait_and_assert(pass, &js_string(&format!("{}[disabled]", target)));
            }
            Event::CheckImage { target, src } => {
                let src = short_url(src, pass.page_url.as_deref());
                let selector = format!("{}[src=\"{}\"]", target, css_string(&src));
                then(pass, format!("test.assertExists({});", js_string(&selector)));
            }
            Event::CheckLink { target, href } => {
                let href = short_url(href, pass.page_url.as_deref());
                let selector = format!("{}[href=\"{}\"]", target, css_string(&href));
                then(pass, format!("test.assertExists({});", js_string(&selector)));
            }
            Event::CheckPageTitle { title } => {
                then(pass, format!("test.assertTitle({});", js_string(title)));
            }
            Event::CheckPageLocation { url } => {
                then(pass, format!("test.assertUrlMatch(/^{}$/);", regex_escape(url)));
            }
            Event::Screenshot => {
                pass.screenshots += 1;
                let number = match self.options.screenshot_numbering {
                    ScreenshotNumbering::Sequential => pass.screenshots,
                    ScreenshotNumbering::EventIndex => index,
                };
                block(pass, vec![
                    format!("  casper.wait({});", self.options.screenshot_wait_ms),
                    "  casper.then(function () {".to_string(),
                    format!(
                        "    this.captureSelector({}, 'html');",
                        js_string(&format!("screenshot{}.png", number))
                    ),
                    "  });".to_string(),
                ]);
            }
            Event::Comment { text } => {
                let mut lines = vec!["  casper.then(function () {".to_string()];
                for line in text.split('\n') {
                    lines.push(format!(
                        "    test.comment({});",
                        js_string(line.trim_end_matches('\r'))
                    ));
                }
                lines.push("  });".to_string());
                block(pass, lines);
            }
            Event::Unknown => {
                tracing::debug!("Skipping unknown event at {}", index);
            }
        }
    }
}

/// CasperJS needs `casper.start()` before any step is queued
fn ensure_started(pass: &mut Pass) {
    if !pass.started {
        pass.started = true;
        pass.lines.push("  casper.start();".to_string());
    }
}

fn block(pass: &mut Pass, lines: Vec<String>) {
    ensure_started(pass);
    pass.lines.push(String::new());
    pass.lines.extend(lines);
}

fn then(pass: &mut Pass, statement: String) {
    block(pass, vec![
        "  casper.then(function () {".to_string(),
        format!("    {}", statement),
        "  });".to_string(),
    ]);
}

fn wait_and_assert(pass: &mut Pass, selector: &str) {
    block(pass, vec![
        format!("  casper.waitForSelector({}, function () {{", selector),
        format!("    test.assertExists({});", selector),
        "  });".to_string(),
    ]);
}
