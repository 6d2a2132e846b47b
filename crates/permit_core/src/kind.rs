/// What kind of document a run harvests: which links match and how the
/// resulting objects are tagged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentKind {
    /// Path suffix including the dot, e.g. `.pdf`. Matched case-insensitively.
    pub extension: String,
    pub content_type: String,
    pub document_type: String,
}

impl DocumentKind {
    pub fn new(
        extension: impl Into<String>,
        content_type: impl Into<String>,
        document_type: impl Into<String>,
    ) -> Self {
        Self {
            extension: extension.into(),
            content_type: content_type.into(),
            document_type: document_type.into(),
        }
    }

    pub fn pdf_permit_form() -> Self {
        Self::new(".pdf", "application/pdf", "permit-form")
    }

    /// True when `path` ends with the extension, ignoring ASCII case.
    pub fn matches_path(&self, path: &str) -> bool {
        self.suffix_start(path).is_some()
    }

    /// Returns `name` without a trailing extension, if it has one.
    pub fn strip_extension<'a>(&self, name: &'a str) -> &'a str {
        match self.suffix_start(name) {
            Some(start) => &name[..start],
            None => name,
        }
    }

    /// Appends the extension unless `name` already carries it.
    pub fn with_extension(&self, name: &str) -> String {
        if self.matches_path(name) {
            name.to_string()
        } else {
            format!("{name}{}", self.extension)
        }
    }

    fn suffix_start(&self, name: &str) -> Option<usize> {
        if self.extension.is_empty() || name.len() < self.extension.len() {
            return None;
        }
        let start = name.len() - self.extension.len();
        if !name.is_char_boundary(start) {
            return None;
        }
        name[start..]
            .eq_ignore_ascii_case(&self.extension)
            .then_some(start)
    }
}

impl Default for DocumentKind {
    fn default() -> Self {
        Self::pdf_permit_form()
    }
}
