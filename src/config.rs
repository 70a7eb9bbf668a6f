use std::env;
use std::str::FromStr;

use crate::render::{RenderOptions, ScreenshotNumbering};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Test name used when a stop request does not carry one
    pub test_title: String,
    pub screenshot_wait_ms: u64,
    pub screenshot_numbering: ScreenshotNumbering,
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: parsed("PORT").unwrap_or(defaults.port),
            host: env::var("HOST").unwrap_or(defaults.host),
            viewport_width: parsed("VIEWPORT_WIDTH").unwrap_or(defaults.viewport_width),
            viewport_height: parsed("VIEWPORT_HEIGHT").unwrap_or(defaults.viewport_height),
            test_title: env::var("TEST_TITLE")
                .ok()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or(defaults.test_title),
            screenshot_wait_ms: parsed("SCREENSHOT_WAIT_MS").unwrap_or(defaults.screenshot_wait_ms),
            screenshot_numbering: env::var("SCREENSHOT_NUMBERING")
                .ok()
                .and_then(|v| parse_numbering(&v))
                .unwrap_or(defaults.screenshot_numbering),
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            viewport_width: self.viewport_width,
            viewport_height: self.viewport_height,
            screenshot_wait_ms: self.screenshot_wait_ms,
            screenshot_numbering: self.screenshot_numbering,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        let render = RenderOptions::default();
        Self {
            port: 8765,
            host: "127.0.0.1".to_string(),
            viewport_width: render.viewport_width,
            viewport_height: render.viewport_height,
            test_title: "Recorded test".to_string(),
            screenshot_wait_ms: render.screenshot_wait_ms,
            screenshot_numbering: render.screenshot_numbering,
        }
    }
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid {}={:?}", key, raw);
            None
        }
    }
}

fn parse_numbering(value: &str) -> Option<ScreenshotNumbering> {
    match value.trim().to_ascii_lowercase().as_str() {
        "sequential" => Some(ScreenshotNumbering::Sequential),
        "index" | "event_index" => Some(ScreenshotNumbering::EventIndex),
        other => {
            tracing::warn!("Unknown SCREENSHOT_NUMBERING {:?}", other);
            None
        }
    }
}
