//! Quoting helpers for embedding recorded strings into generated JavaScript.

use std::sync::OnceLock;

use regex::Regex;
use url::{Position, Url};

/// Single-quoted JavaScript string literal
pub fn js_string(value: &str) -> String {
    quote(value, '\'')
}

/// Double-quoted JavaScript string literal
pub fn js_double_quoted(value: &str) -> String {
    quote(value, '"')
}

fn quote(value: &str, delimiter: char) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push(delimiter);
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => {}
            '\u{2028}' => quoted.push_str("\\u2028"),
            '\u{2029}' => quoted.push_str("\\u2029"),
            c if c == delimiter => {
                quoted.push('\\');
                quoted.push(c);
            }
            c => quoted.push(c),
        }
    }
    quoted.push(delimiter);
    quoted
}

/// XPath string literal. XPath 1.0 has no escape sequences, so a value that
/// holds both quote characters is spelled out with `concat()`.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    if !value.contains('"') {
        return format!("\"{}\"", value);
    }

    let mut parts = Vec::new();
    let mut run = String::new();
    for c in value.chars() {
        match c {
            '\'' | '"' => {
                if !run.is_empty() {
                    parts.push(format!("'{}'", run));
                    run.clear();
                }
                parts.push(if c == '\'' { "\"'\"".to_string() } else { "'\"'".to_string() });
            }
            c => run.push(c),
        }
    }
    if !run.is_empty() {
        parts.push(format!("'{}'", run));
    }
    format!("concat({})", parts.join(","))
}

/// CasperJS XPath selector wrapper: `x("//...")`
pub fn xpath_selector(xpath: &str) -> String {
    format!("x({})", js_double_quoted(xpath))
}

/// Escape a string for use inside a JavaScript regex literal
pub fn regex_escape(value: &str) -> String {
    static SPECIAL: OnceLock<Regex> = OnceLock::new();
    let special = SPECIAL.get_or_init(|| {
        Regex::new(r"[-\[\]{}()*+?.,\\^$|#\s/]").expect("static pattern compiles")
    });
    special.replace_all(value, r"\$0").into_owned()
}

/// Trim and collapse runs of whitespace to one space
pub fn normalize_whitespace(value: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static pattern compiles"));
    whitespace.replace_all(value.trim(), " ").into_owned()
}

/// Drop scheme and host from `candidate` when it lives on the same origin as
/// `base`. Anything that does not parse as an absolute URL is returned as-is.
pub fn short_url(candidate: &str, base: Option<&str>) -> String {
    let Some(base) = base.and_then(|b| Url::parse(b).ok()) else {
        return candidate.to_string();
    };
    match Url::parse(candidate) {
        Ok(target) if target.origin().is_tuple() && target.origin() == base.origin() => {
            target[Position::BeforePath..].to_string()
        }
        _ => candidate.to_string(),
    }
}

pub fn html_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }
    escaped
}
