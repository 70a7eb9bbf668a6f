//! Last-resort selector: a `>`-joined path of per-level fragments from the
//! element up towards `<body>`, shortened from the front while it stays
//! unique.

use scraper::{ElementRef, Selector};

use super::{element_children, parent_element, sibling_index, Page};

/// One level of the path
#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    selector: String,
    /// Unique on its own; nothing above it is needed
    anchored: bool,
}

pub fn full_path(page: &Page, element: ElementRef<'_>) -> String {
    let root_id = page.root().id();
    let mut segments = Vec::new();
    let mut current = Some(element);

    while let Some(node) = current {
        if node.id() == root_id {
            break;
        }
        let segment = segment_for(page, node);
        let anchored = segment.anchored;
        segments.push(segment);
        if anchored {
            break;
        }
        current = parent_element(node);
    }

    segments.reverse();
    minimize(page, &segments)
}

fn segment_for(page: &Page, element: ElementRef<'_>) -> Segment {
    let value = element.value();

    if let Some(id) = value.attr("id").filter(|id| !id.is_empty()) {
        let selector = format!("#{}", css_ident(id));
        if page.is_unique(&selector) {
            return Segment {
                selector,
                anchored: true,
            };
        }
    }

    let tag = value.name().to_string();
    let mut selector = tag.clone();
    let classes: Vec<String> = value.classes().map(css_ident).collect();
    if !classes.is_empty() {
        let with_classes = format!("{}.{}", tag, classes.join("."));
        if page.count(&with_classes) < page.count(&tag) {
            selector = with_classes;
        }
    }

    if page.is_unique(&selector) {
        return Segment {
            selector,
            anchored: true,
        };
    }

    if same_selector_siblings(element, &selector) > 1 {
        selector = format!("{}:nth-child({})", selector, sibling_index(element) + 1);
    }

    Segment {
        selector,
        anchored: false,
    }
}

/// Children of the element's own parent that also match `selector`,
/// the element included
fn same_selector_siblings(element: ElementRef<'_>, selector: &str) -> usize {
    let Some(parent) = parent_element(element) else {
        return 1;
    };
    let Ok(parsed) = Selector::parse(selector) else {
        return 1;
    };
    element_children(parent)
        .filter(|child| parsed.matches(child))
        .count()
}

fn minimize(page: &Page, segments: &[Segment]) -> String {
    let join = |from: usize| {
        segments[from..]
            .iter()
            .map(|segment| segment.selector.as_str())
            .collect::<Vec<_>>()
            .join(" > ")
    };

    let mut start = 0;
    while start + 1 < segments.len() && page.is_unique(&join(start + 1)) {
        start += 1;
    }
    join(start)
}

/// Escape a value for use as a CSS identifier after `#` or `.`
pub(crate) fn css_ident(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        if c.is_ascii_alphanumeric() && !(i == 0 && c.is_ascii_digit())
            || c == '-'
            || c == '_'
            || !c.is_ascii()
        {
            escaped.push(c);
        } else if c.is_ascii_digit() || c.is_ascii_control() {
            escaped.push_str(&format!("\\{:x} ", c as u32));
        } else {
            escaped.push('\\');
            escaped.push(c);
        }
    }
    escaped
}
