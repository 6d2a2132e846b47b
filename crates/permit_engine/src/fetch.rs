use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::{DownloadOutput, FailureKind, FetchError, FetchMetadata, FetchOutput};

/// Bytes buffered before each write to the destination file.
const WRITE_CHUNK_SIZE: usize = 8 * 1024;

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    /// `None` disables the size cap.
    pub max_bytes: Option<u64>,
    /// Empty accepts any content type.
    pub allowed_content_types: Vec<String>,
}

impl FetchSettings {
    /// Listing pages: HTML only, 30 s, 5 MiB.
    pub fn listing() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: Some(5 * 1024 * 1024),
            allowed_content_types: vec![
                "text/html".to_string(),
                "application/xhtml+xml".to_string(),
            ],
        }
    }

    /// Documents: any content type, 60 s, no size cap.
    pub fn documents() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            redirect_limit: 5,
            max_bytes: None,
            allowed_content_types: Vec::new(),
        }
    }

    fn is_content_type_allowed(&self, content_type: &str) -> bool {
        if self.allowed_content_types.is_empty() {
            return true;
        }
        let ct = content_type.split(';').next().unwrap_or(content_type).trim();
        self.allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ct))
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self::listing()
    }
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the listing page into memory.
    async fn fetch_listing(&self, url: &str) -> Result<FetchOutput, FetchError>;

    /// Stream a document to `dest`, creating parent directories. On failure no
    /// file is left at `dest`.
    async fn download(&self, url: &str, dest: &Path) -> Result<DownloadOutput, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    listing: FetchSettings,
    documents: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(listing: FetchSettings, documents: FetchSettings) -> Self {
        Self { listing, documents }
    }
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new(FetchSettings::listing(), FetchSettings::documents())
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch_listing(&self, url: &str) -> Result<FetchOutput, FetchError> {
        let (response, redirect_counter) = send_request(&self.listing, url).await?;
        let final_url = response.url().to_string();
        let content_type = content_type_of(&response);

        let bytes = read_capped(response, self.listing.max_bytes).await?;

        let metadata = FetchMetadata {
            original_url: url.to_string(),
            final_url,
            redirect_count: redirect_counter.load(Ordering::Relaxed),
            content_type,
            byte_len: bytes.len() as u64,
        };

        Ok(FetchOutput { bytes, metadata })
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<DownloadOutput, FetchError> {
        let (response, _) = send_request(&self.documents, url).await?;
        let final_url = response.url().to_string();
        let content_type = content_type_of(&response);

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }

        let partial = partial_path(dest);
        let result = match stream_to_file(response, &partial, self.documents.max_bytes).await {
            Ok(bytes) => tokio::fs::rename(&partial, dest)
                .await
                .map(|()| bytes)
                .map_err(io_error),
            Err(err) => Err(err),
        };

        match result {
            Ok(bytes) => Ok(DownloadOutput {
                path: dest.to_path_buf(),
                final_url,
                content_type,
                bytes,
            }),
            Err(err) => {
                let _ = tokio::fs::remove_file(&partial).await;
                Err(err)
            }
        }
    }
}

async fn send_request(
    settings: &FetchSettings,
    url: &str,
) -> Result<(reqwest::Response, Arc<AtomicUsize>), FetchError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
    let redirect_counter = Arc::new(AtomicUsize::new(0));
    let client = build_client(settings, redirect_counter.clone())?;

    let response = client.get(parsed).send().await.map_err(map_reqwest_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::new(
            FailureKind::HttpStatus(status.as_u16()),
            status.canonical_reason().unwrap_or("unexpected status"),
        ));
    }

    if let (Some(max_bytes), Some(content_len)) = (settings.max_bytes, response.content_length()) {
        if content_len > max_bytes {
            return Err(too_large(max_bytes, content_len));
        }
    }

    if let Some(ct) = content_type_of(&response) {
        if !settings.is_content_type_allowed(&ct) {
            return Err(FetchError::new(
                FailureKind::UnsupportedContentType { content_type: ct },
                "listing must be an HTML page",
            ));
        }
    }

    Ok((response, redirect_counter))
}

fn build_client(
    settings: &FetchSettings,
    redirect_counter: Arc<AtomicUsize>,
) -> Result<reqwest::Client, FetchError> {
    let redirect_limit = settings.redirect_limit;
    let policy = reqwest::redirect::Policy::custom(move |attempt| {
        let count = attempt.previous().len();
        redirect_counter.store(count, Ordering::Relaxed);
        if count >= redirect_limit {
            attempt.error("redirect limit exceeded")
        } else {
            attempt.follow()
        }
    });

    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .redirect(policy)
        .build()
        .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
}

async fn read_capped(
    response: reqwest::Response,
    max_bytes: Option<u64>,
) -> Result<Vec<u8>, FetchError> {
    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_reqwest_error)?;
        let len = (bytes.len() + chunk.len()) as u64;
        if let Some(max) = max_bytes.filter(|max| len > *max) {
            return Err(too_large(max, len));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

async fn stream_to_file(
    response: reqwest::Response,
    path: &Path,
    max_bytes: Option<u64>,
) -> Result<u64, FetchError> {
    let file = tokio::fs::File::create(path).await.map_err(io_error)?;
    let mut writer = BufWriter::with_capacity(WRITE_CHUNK_SIZE, file);
    let mut written: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_reqwest_error)?;
        written += chunk.len() as u64;
        if let Some(max_bytes) = max_bytes {
            if written > max_bytes {
                return Err(too_large(max_bytes, written));
            }
        }
        writer.write_all(&chunk).await.map_err(io_error)?;
    }
    writer.flush().await.map_err(io_error)?;
    Ok(written)
}

/// `{dest}.part`, next to the destination so the final rename stays on one filesystem.
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("download"));
    name.push(".part");
    dest.with_file_name(name)
}

fn content_type_of(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

fn too_large(max_bytes: u64, actual: u64) -> FetchError {
    FetchError::new(
        FailureKind::TooLarge {
            max_bytes,
            actual: Some(actual),
        },
        "body over size limit",
    )
}

fn io_error(err: std::io::Error) -> FetchError {
    FetchError::new(FailureKind::Io, err.to_string())
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
