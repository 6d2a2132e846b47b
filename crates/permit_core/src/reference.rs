use url::Url;

/// A document link discovered on the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReference {
    /// Absolute URL; unique within a run.
    pub url: String,
    pub title: String,
    pub original_filename: String,
}

impl DocumentReference {
    /// Builds a reference from a resolved URL. An absent or blank title falls
    /// back to the filename portion of the URL.
    pub fn new(url: &Url, title: Option<String>) -> Self {
        let original_filename = filename_from_url(url);
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| original_filename.clone());
        Self {
            url: url.to_string(),
            title,
            original_filename,
        }
    }
}

/// Last path segment of `url`, empty for directory-style or opaque URLs.
pub fn filename_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.last())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_is_last_segment() {
        let url = Url::parse("https://example.gov/forms/a/permit-1.pdf?v=2").unwrap();
        assert_eq!(filename_from_url(&url), "permit-1.pdf");
        let dir = Url::parse("https://example.gov/forms/").unwrap();
        assert_eq!(filename_from_url(&dir), "");
    }

    #[test]
    fn blank_title_falls_back_to_filename() {
        let url = Url::parse("https://example.gov/forms/permit-1.pdf").unwrap();
        let reference = DocumentReference::new(&url, Some("   ".to_string()));
        assert_eq!(reference.title, "permit-1.pdf");
        assert_eq!(reference.original_filename, "permit-1.pdf");

        let titled = DocumentReference::new(&url, Some(" Fence Permit ".to_string()));
        assert_eq!(titled.title, "Fence Permit");
    }
}
