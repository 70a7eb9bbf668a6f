use scraper::ElementRef;

use super::{closest_ancestor, css_path, Page};

/// Attribute prefixes that are never used to identify an element. Their
/// values tend to be generated or to change with page state.
const SKIPPED_PREFIXES: [&str; 2] = ["aria-", "data-"];

/// Attributes tried first when accumulating an attribute selector, most
/// stable first. Anything else follows in alphabetical order.
const PREFERRED_ATTRIBUTES: [&str; 11] = [
    "name",
    "type",
    "placeholder",
    "title",
    "alt",
    "for",
    "role",
    "value",
    "src",
    "href",
    "class",
];

/// Maps a DOM element to a short selector that matches only that element.
///
/// Strategies are tried in order and the first one that applies wins:
///
/// 1. form field by name inside a form with an id
/// 2. form field by name inside a form with an action
/// 3. the element id
/// 4. a unique `href`
/// 5. the tag plus as many of its own attributes as needed
/// 6. a unique ancestor followed by the tag
/// 7. the full `tag:nth-child` path, see [`css_path::full_path`]
///
/// Resolution never fails. When nothing is unique the last strategy still
/// returns its best guess.
#[derive(Debug, Clone, Default)]
pub struct SelectorResolver;

impl SelectorResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(&self, page: &Page, element: ElementRef<'_>) -> String {
        if element.id() == page.root().id() {
            return String::new();
        }

        if let Some(selector) = form_field(element) {
            tracing::trace!("Resolved {} by form field", selector);
            return selector;
        }

        if let Some(id) = element.value().attr("id").filter(|id| !id.is_empty()) {
            return id_selector(id);
        }

        if let Some(selector) = unique_href(page, element) {
            tracing::trace!("Resolved {} by href", selector);
            return selector;
        }

        if let Some(selector) = unique_attributes(page, element) {
            tracing::trace!("Resolved {} by attributes", selector);
            return selector;
        }

        if let Some(selector) = unique_under_ancestor(page, element) {
            tracing::trace!("Resolved {} under ancestor", selector);
            return selector;
        }

        let path = css_path::full_path(page, element);
        tracing::trace!("Resolved {} by css path", path);
        path
    }
}

/// Strategies 1-5 applied to an ancestor, where every result has to be
/// checked since nothing is assumed unique one level up.
fn unique_own_selector(page: &Page, element: ElementRef<'_>) -> Option<String> {
    if let Some(selector) = form_field(element).filter(|s| page.is_unique(s)) {
        return Some(selector);
    }
    if let Some(id) = element.value().attr("id").filter(|id| !id.is_empty()) {
        let selector = id_selector(id);
        if page.is_unique(&selector) {
            return Some(selector);
        }
    }
    unique_href(page, element).or_else(|| unique_attributes(page, element))
}

fn form_field(element: ElementRef<'_>) -> Option<String> {
    let name = element.value().attr("name").filter(|n| !n.is_empty())?;
    let form = closest_ancestor(element, "form")?;

    if let Some(form_id) = form.value().attr("id").filter(|id| !id.is_empty()) {
        return Some(format!("{} [name=\"{}\"]", id_selector(form_id), css_string(name)));
    }
    form.value()
        .attr("action")
        .filter(|action| !action.is_empty())
        .map(|action| {
            format!(
                "[action=\"{}\"] [name=\"{}\"]",
                css_string(action),
                css_string(name)
            )
        })
}

fn unique_href(page: &Page, element: ElementRef<'_>) -> Option<String> {
    let href = element.value().attr("href").filter(|h| !h.is_empty())?;
    let selector = format!("[href=\"{}\"]", css_string(href));
    page.is_unique(&selector).then_some(selector)
}

fn unique_attributes(page: &Page, element: ElementRef<'_>) -> Option<String> {
    let mut selector = element.value().name().to_string();
    for (name, value) in identifying_attributes(element) {
        selector.push_str(&format!("[{}=\"{}\"]", name, css_string(value)));
        if page.is_unique(&selector) {
            return Some(selector);
        }
    }
    None
}

fn identifying_attributes<'a>(element: ElementRef<'a>) -> Vec<(&'a str, &'a str)> {
    let mut attributes: Vec<(&str, &str)> = element
        .value()
        .attrs()
        .filter(|(name, value)| {
            !value.is_empty()
                && is_plain_name(name)
                && !SKIPPED_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
        })
        .collect();

    attributes.sort_by_key(|(name, _)| {
        let rank = PREFERRED_ATTRIBUTES
            .iter()
            .position(|preferred| preferred == name)
            .unwrap_or(PREFERRED_ATTRIBUTES.len());
        (rank, *name)
    });
    attributes
}

fn unique_under_ancestor(page: &Page, element: ElementRef<'_>) -> Option<String> {
    let root_id = page.root().id();
    let tag = element.value().name();

    for ancestor in element.ancestors().filter_map(ElementRef::wrap) {
        if ancestor.id() == root_id {
            break;
        }
        if let Some(prefix) = unique_own_selector(page, ancestor) {
            let selector = format!("{} {}", prefix, tag);
            return page.is_unique(&selector).then_some(selector);
        }
    }
    None
}

/// `#id` with the id escaped as a CSS identifier. Plain ids come out as-is.
fn id_selector(id: &str) -> String {
    format!("#{}", css_path::css_ident(id))
}

/// Attribute names that can appear unquoted inside `[...]`
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Escape a value for use inside a double-quoted CSS string
pub(crate) fn css_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\n' => escaped.push_str("\\a "),
            _ => escaped.push(c),
        }
    }
    escaped
}
