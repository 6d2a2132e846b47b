use std::collections::HashSet;

use permit_core::{filename_from_url, DocumentKind, DocumentReference};
use scraper::{ElementRef, Html};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractedLinks {
    /// Unique references in page order.
    pub references: Vec<DocumentReference>,
    /// Anchors dropped because their URL was already seen.
    pub duplicates: usize,
}

/// Finds every anchor on a listing page that points at a document of the
/// configured [`DocumentKind`].
pub struct DocumentLinkExtractor {
    kind: DocumentKind,
}

impl DocumentLinkExtractor {
    pub fn new(kind: DocumentKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> &DocumentKind {
        &self.kind
    }

    /// Relative hrefs are resolved against `base_url` before matching and
    /// dedup. The first anchor for a URL wins.
    pub fn extract(&self, html: &str, base_url: &str) -> ExtractedLinks {
        let document = Html::parse_document(html);
        let base = Url::parse(base_url).ok();
        let mut seen = HashSet::new();
        let mut out = ExtractedLinks::default();

        for node in document.root_element().descendants() {
            let Some(element) = ElementRef::wrap(node) else {
                continue;
            };
            if element.value().name() != "a" {
                continue;
            }
            let Some(url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_url(href, base.as_ref()))
            else {
                continue;
            };
            if !self.kind.matches_path(url.path()) {
                continue;
            }
            if !seen.insert(url.to_string()) {
                out.duplicates += 1;
                continue;
            }
            let title = resolve_title(element, &url);
            out.references.push(DocumentReference::new(&url, Some(title)));
        }

        out
    }
}

/// Anchor text, then the enclosing element's text, then the URL filename.
fn resolve_title(anchor: ElementRef, url: &Url) -> String {
    let own = visible_text(anchor);
    if !own.is_empty() {
        return own;
    }
    let parent = anchor
        .parent()
        .and_then(ElementRef::wrap)
        .map(visible_text)
        .unwrap_or_default();
    if !parent.is_empty() {
        return parent;
    }
    filename_from_url(url)
}

fn visible_text(element: ElementRef) -> String {
    let raw: String = element.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn resolve_url(reference: &str, base: Option<&Url>) -> Option<Url> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with('#') || lower.starts_with("javascript:") || lower.starts_with("mailto:") {
        return None;
    }
    let mut url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(_) => base?.join(trimmed).ok()?,
    };
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}
