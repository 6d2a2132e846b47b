use crate::{DocumentKind, DocumentReference};

/// Used when neither the title nor the original filename yields a slug.
pub const FALLBACK_NAME: &str = "document";

/// Key- and filesystem-safe slug: `[a-z0-9-]`, no leading, trailing or doubled dash.
///
/// ASCII alphanumerics are kept (lowercased). Whitespace, `_` and `-` act as
/// separators and collapse into a single dash. Every other character is
/// dropped without separating its neighbours, so `"Rev.2"` becomes `"rev2"`.
/// May return an empty string.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_dash = true;
        }
    }
    slug
}

/// Local file name and object key suffix for a reference.
///
/// Tries the title first, then the original filename, then [`FALLBACK_NAME`].
/// A trailing document extension is removed before slugging so that
/// `form-a.pdf` becomes `form-a.pdf` rather than `form-apdf.pdf`.
pub fn normalized_name(reference: &DocumentReference, kind: &DocumentKind) -> String {
    let mut slug = slugify(kind.strip_extension(&reference.title));
    if slug.is_empty() {
        slug = slugify(kind.strip_extension(&reference.original_filename));
    }
    if slug.is_empty() {
        slug = FALLBACK_NAME.to_string();
    }
    kind.with_extension(&slug)
}
