use serde::{Deserialize, Serialize};

/// File name of the manifest, both locally and as the object key suffix.
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// One archived document. Only documents that were both downloaded and
/// uploaded get an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
    pub title: String,
    pub original_url: String,
    pub original_filename: String,
    pub s3_url: String,
    pub https_url: String,
    pub local_path: String,
    pub file_size_bytes: u64,
    pub file_size_mb: f64,
    pub downloaded_at: String,
    pub jurisdiction: String,
    pub document_type: String,
}

/// Size in MiB rounded to two decimals.
pub fn size_in_mb(bytes: u64) -> f64 {
    let mb = bytes as f64 / (1024.0 * 1024.0);
    (mb * 100.0).round() / 100.0
}

/// Append-only, discovery-ordered list of manifest entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ManifestEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON array of all entries, two-space indented.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.entries)
    }
}
