pub mod css_path;
pub mod selector;

use scraper::{ElementRef, Html, Selector};

pub use selector::SelectorResolver;

/// A parsed snapshot of the page the recorder is attached to.
///
/// Every uniqueness question the selector resolver asks is answered against
/// this snapshot, so the selectors it produces are only as fresh as the
/// markup passed to [`Page::parse`].
pub struct Page {
    html: Html,
    url: Option<String>,
}

impl Page {
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
            url: None,
        }
    }

    /// Attach the address the snapshot was taken from
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Text of the first `<title>` element, whitespace-trimmed
    pub fn title(&self) -> Option<String> {
        let title = self.query("title")?;
        let text: String = title.text().collect();
        Some(text.trim().to_string())
    }

    /// The `<html>` element
    pub fn root(&self) -> ElementRef<'_> {
        self.html.root_element()
    }

    pub fn body(&self) -> Option<ElementRef<'_>> {
        self.query("body")
    }

    /// Number of elements matching `selector`. Selectors that fail to parse
    /// match nothing.
    pub fn count(&self, selector: &str) -> usize {
        match Selector::parse(selector) {
            Ok(parsed) => self.html.select(&parsed).count(),
            Err(e) => {
                tracing::warn!("Unparseable selector {:?}: {:?}", selector, e);
                0
            }
        }
    }

    pub fn is_unique(&self, selector: &str) -> bool {
        self.count(selector) == 1
    }

    /// First element matching `selector`
    pub fn query(&self, selector: &str) -> Option<ElementRef<'_>> {
        let parsed = Selector::parse(selector).ok()?;
        self.html.select(&parsed).next()
    }

    /// Resolve a child-index path starting at `<html>`.
    ///
    /// `[]` is the root itself, `[1]` is its second element child (normally
    /// `<body>`), and so on. Text and comment nodes are not counted.
    pub fn element_at(&self, path: &[usize]) -> Option<ElementRef<'_>> {
        let mut current = self.root();
        for &index in path {
            current = element_children(current).nth(index)?;
        }
        Some(current)
    }

    /// Inverse of [`Page::element_at`]
    pub fn path_of(&self, element: ElementRef<'_>) -> Vec<usize> {
        let root_id = self.root().id();
        let mut path = Vec::new();
        let mut current = element;
        while current.id() != root_id {
            path.push(sibling_index(current));
            match parent_element(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        path.reverse();
        path
    }
}

pub(crate) fn element_children<'a>(
    element: ElementRef<'a>,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    element.children().filter_map(ElementRef::wrap)
}

pub(crate) fn parent_element(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.parent().and_then(ElementRef::wrap)
}

/// Zero-based position among the parent's element children
pub(crate) fn sibling_index(element: ElementRef<'_>) -> usize {
    element
        .prev_siblings()
        .filter(|node| node.value().is_element())
        .count()
}

/// Nearest ancestor (excluding the element itself) with the given tag
pub(crate) fn closest_ancestor<'a>(element: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == tag)
}
