use crate::{DocumentReference, ObjectLocators};

/// Result of a successful document download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    pub local_path: String,
    pub bytes: u64,
}

/// Outcomes fed back into [`crate::update`]. Failure causes are carried as
/// display strings; the engine keeps the typed errors for its own logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Begin the run.
    Start,
    /// Listing page fetched and parsed, or the fetch failed.
    ListingFetched(Result<Vec<DocumentReference>, String>),
    /// Document download finished.
    DownloadFinished {
        index: usize,
        result: Result<Downloaded, String>,
    },
    /// Document upload finished; `completed_at` stamps the manifest entry.
    UploadFinished {
        index: usize,
        result: Result<ObjectLocators, String>,
        completed_at: String,
    },
    /// Local manifest written to the given path.
    ManifestWritten(Result<String, String>),
    /// Manifest object published.
    ManifestPublished(Result<ObjectLocators, String>),
}
