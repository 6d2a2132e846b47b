use crate::{FailedDocument, RunState};

/// End-of-run counts, folded from the run counters and the manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub found: usize,
    pub downloaded: usize,
    pub uploaded: usize,
    pub total_bytes: u64,
    /// Sum of the per-entry rounded sizes, as recorded in the manifest.
    pub total_mb: f64,
    /// Manifest titles in discovery order.
    pub titles: Vec<String>,
    pub failures: Vec<FailedDocument>,
}

impl RunSummary {
    pub fn from_state(state: &RunState) -> Self {
        let (total_bytes, total_mb, titles) = state.manifest().entries().iter().fold(
            (0u64, 0f64, Vec::new()),
            |(bytes, mb, mut titles), entry| {
                titles.push(entry.title.clone());
                (bytes + entry.file_size_bytes, mb + entry.file_size_mb, titles)
            },
        );
        Self {
            found: state.found(),
            downloaded: state.downloaded(),
            uploaded: state.uploaded(),
            total_bytes,
            total_mb,
            titles,
            failures: state.failures().to_vec(),
        }
    }

    /// The first `limit` titles and how many were left out.
    pub fn title_preview(&self, limit: usize) -> (&[String], usize) {
        let shown = self.titles.len().min(limit);
        (&self.titles[..shown], self.titles.len() - shown)
    }
}
