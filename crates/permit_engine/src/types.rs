use std::fmt;
use std::path::PathBuf;

use permit_core::FailedStep;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub redirect_count: usize,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutput {
    pub path: PathBuf,
    pub final_url: String,
    pub content_type: Option<String>,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Network,
    Io,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => f.write_str("invalid URL"),
            FailureKind::HttpStatus(code) => write!(f, "HTTP {code}"),
            FailureKind::Timeout => f.write_str("timed out"),
            FailureKind::RedirectLimitExceeded => f.write_str("too many redirects"),
            FailureKind::TooLarge {
                max_bytes,
                actual: Some(actual),
            } => write!(f, "{actual} bytes exceeds the {max_bytes} byte limit"),
            FailureKind::TooLarge { max_bytes, .. } => {
                write!(f, "exceeds the {max_bytes} byte limit")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unexpected content type {content_type}")
            }
            FailureKind::Network => f.write_str("network error"),
            FailureKind::Io => f.write_str("file error"),
        }
    }
}

/// Progress notifications emitted by the [`crate::Harvester`] while a run advances.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    ListingRequested { url: String },
    ListingParsed { found: usize, duplicates: usize },
    DocumentStarted { index: usize, total: usize, title: String },
    DocumentDownloaded { index: usize, bytes: u64 },
    DocumentUploaded { index: usize, s3_url: String },
    DocumentFailed { index: usize, step: FailedStep, reason: String },
    ManifestSaved { path: PathBuf },
    ManifestPublished { s3_url: String },
    ManifestFailed { reason: String },
    Aborted { reason: String },
    Finished,
}

/// Receives [`RunEvent`]s. Passed by reference into the run so the pipeline
/// stays independent of any console format.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: RunEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: RunEvent) {}
}
