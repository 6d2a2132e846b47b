use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use harvest_logging::{
    clear_document_context, harvest_debug, harvest_error, harvest_info, harvest_warn,
    set_document_context,
};
use permit_core::{
    size_in_mb, update, Downloaded, Effect, FailedStep, Manifest, Msg, ObjectLocators, RunPhase,
    RunState, RunSummary, MANIFEST_FILENAME,
};
use thiserror::Error;

use crate::{
    decode_listing, AtomicFileWriter, DocumentLinkExtractor, FetchError, Fetcher, HarvestConfig,
    PersistError, ProgressSink, Publisher, RunEvent, UploadRequest, MANIFEST_CONTENT_TYPE,
};

/// The conditions that stop a run before any document is processed.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("download directory unusable: {0}")]
    OutputDir(#[from] PersistError),
    #[error("error fetching listing page: {0}")]
    Listing(FetchError),
    #[error("no documents found on {0}")]
    NoDocuments(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub summary: RunSummary,
    pub manifest: Manifest,
    pub manifest_path: Option<PathBuf>,
    pub manifest_locators: Option<ObjectLocators>,
    /// Set when the manifest could not be written or published.
    pub manifest_error: Option<String>,
}

/// Runs one harvest: listing, then every document in discovery order, then
/// the manifest. Strictly sequential; each effect completes before the next
/// one starts.
pub struct Harvester<F, P> {
    config: HarvestConfig,
    fetcher: F,
    publisher: P,
    extractor: DocumentLinkExtractor,
}

impl<F: Fetcher, P: Publisher> Harvester<F, P> {
    pub fn new(config: HarvestConfig, fetcher: F, publisher: P) -> Self {
        let extractor = DocumentLinkExtractor::new(config.plan.kind.clone());
        Self {
            config,
            fetcher,
            publisher,
            extractor,
        }
    }

    pub async fn run(&self, sink: &dyn ProgressSink) -> Result<RunReport, HarvestError> {
        crate::ensure_output_dir(&self.config.download_dir)?;

        let mut state = RunState::new(self.config.plan.clone());
        let mut pending = VecDeque::from([Msg::Start]);
        let mut listing_failure: Option<FetchError> = None;

        while let Some(msg) = pending.pop_front() {
            let (next, effects) = update(state, msg);
            state = next;
            for effect in effects {
                if let Some(msg) = self
                    .execute(&state, effect, sink, &mut listing_failure)
                    .await
                {
                    pending.push_back(msg);
                }
            }
        }
        clear_document_context();

        if state.phase() == RunPhase::Aborted {
            return Err(match listing_failure {
                Some(err) => HarvestError::Listing(err),
                None => HarvestError::NoDocuments(self.config.plan.listing_url.clone()),
            });
        }

        Ok(RunReport {
            summary: state.summary(),
            manifest: state.manifest().clone(),
            manifest_path: state.manifest_path().map(PathBuf::from),
            manifest_locators: state.manifest_locators().cloned(),
            manifest_error: state.manifest_error().map(str::to_string),
        })
    }

    async fn execute(
        &self,
        state: &RunState,
        effect: Effect,
        sink: &dyn ProgressSink,
        listing_failure: &mut Option<FetchError>,
    ) -> Option<Msg> {
        match effect {
            Effect::FetchListing { url } => {
                let result = self.fetch_listing(&url, sink).await;
                Some(Msg::ListingFetched(result.map_err(|err| {
                    let reason = err.to_string();
                    *listing_failure = Some(err);
                    reason
                })))
            }
            Effect::Download {
                index,
                url,
                file_name,
            } => {
                set_document_context(index + 1, state.found());
                let title = state
                    .job(index)
                    .map(|job| job.reference.title.clone())
                    .unwrap_or_default();
                harvest_info!("Processing: {title}");
                sink.emit(RunEvent::DocumentStarted {
                    index,
                    total: state.found(),
                    title,
                });
                if let Some(earlier) = state.earlier_job_with_same_name(index) {
                    harvest_warn!(
                        "{file_name} already used by document {}; the object is overwritten",
                        earlier + 1
                    );
                }
                Some(self.download(index, &url, &file_name, sink).await)
            }
            Effect::Upload {
                index,
                local_path,
                key,
            } => Some(self.upload(index, &local_path, &key, sink).await),
            Effect::WriteManifest => {
                clear_document_context();
                Some(Msg::ManifestWritten(self.write_manifest(state, sink)))
            }
            Effect::PublishManifest { local_path, key } => {
                Some(Msg::ManifestPublished(self.publish_manifest(&local_path, &key, sink).await))
            }
            Effect::Abort { reason } => {
                harvest_error!("{reason}");
                sink.emit(RunEvent::Aborted { reason });
                None
            }
            Effect::Finish => {
                let summary = state.summary();
                harvest_info!(
                    "Run finished: found={} downloaded={} uploaded={}",
                    summary.found,
                    summary.downloaded,
                    summary.uploaded
                );
                sink.emit(RunEvent::Finished);
                None
            }
        }
    }

    async fn fetch_listing(
        &self,
        url: &str,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<permit_core::DocumentReference>, FetchError> {
        harvest_info!("Scraping documents from: {url}");
        sink.emit(RunEvent::ListingRequested {
            url: url.to_string(),
        });

        let output = self.fetcher.fetch_listing(url).await?;
        if output.metadata.redirect_count > 0 {
            harvest_debug!(
                "Listing redirected {} time(s) to {}",
                output.metadata.redirect_count,
                output.metadata.final_url
            );
        }

        let decoded = decode_listing(&output.bytes, output.metadata.content_type.as_deref());
        if decoded.had_errors {
            harvest_warn!(
                "Listing page contained bytes invalid in {}; replaced them",
                decoded.encoding
            );
        }

        let links = self
            .extractor
            .extract(&decoded.html, &output.metadata.final_url);
        harvest_info!(
            "Found {} {} documents",
            links.references.len(),
            self.extractor.kind().extension
        );
        if links.duplicates > 0 {
            harvest_info!("Removed {} duplicates", links.duplicates);
        }
        sink.emit(RunEvent::ListingParsed {
            found: links.references.len(),
            duplicates: links.duplicates,
        });
        Ok(links.references)
    }

    async fn download(
        &self,
        index: usize,
        url: &str,
        file_name: &str,
        sink: &dyn ProgressSink,
    ) -> Msg {
        let dest = self.config.download_dir.join(file_name);
        harvest_debug!("Downloading {url} to {}", dest.display());
        let result = match self.fetcher.download(url, &dest).await {
            Ok(output) => {
                if output.final_url != url {
                    harvest_debug!("Redirected to {}", output.final_url);
                }
                harvest_info!("Downloaded ({:.2} MB)", size_in_mb(output.bytes));
                sink.emit(RunEvent::DocumentDownloaded {
                    index,
                    bytes: output.bytes,
                });
                Ok(Downloaded {
                    local_path: output.path.display().to_string(),
                    bytes: output.bytes,
                })
            }
            Err(err) => {
                harvest_warn!("Download failed for {url}: {err}");
                let reason = err.to_string();
                sink.emit(RunEvent::DocumentFailed {
                    index,
                    step: FailedStep::Download,
                    reason: reason.clone(),
                });
                Err(reason)
            }
        };
        Msg::DownloadFinished { index, result }
    }

    async fn upload(
        &self,
        index: usize,
        local_path: &str,
        key: &str,
        sink: &dyn ProgressSink,
    ) -> Msg {
        let plan = &self.config.plan;
        let request = UploadRequest {
            local_path: Path::new(local_path),
            key,
            content_type: &plan.kind.content_type,
            metadata: vec![
                ("uploaded-date".to_string(), self.config.now()),
                ("jurisdiction".to_string(), plan.jurisdiction.clone()),
                ("document-type".to_string(), plan.kind.document_type.clone()),
            ],
        };
        let result = match self.publisher.put_file(&request).await {
            Ok(locators) => {
                harvest_info!("Uploaded to {}", locators.s3_url);
                sink.emit(RunEvent::DocumentUploaded {
                    index,
                    s3_url: locators.s3_url.clone(),
                });
                Ok(locators)
            }
            Err(err) => {
                harvest_warn!("Upload of {key} failed: {err}; local copy kept at {local_path}");
                let reason = err.to_string();
                sink.emit(RunEvent::DocumentFailed {
                    index,
                    step: FailedStep::Upload,
                    reason: reason.clone(),
                });
                Err(reason)
            }
        };
        Msg::UploadFinished {
            index,
            result,
            completed_at: self.config.now(),
        }
    }

    fn write_manifest(&self, state: &RunState, sink: &dyn ProgressSink) -> Result<String, String> {
        let written = state
            .manifest()
            .to_json_pretty()
            .map_err(|err| err.to_string())
            .and_then(|json| {
                AtomicFileWriter::new(self.config.download_dir.clone())
                    .write(MANIFEST_FILENAME, json.as_bytes())
                    .map_err(|err| err.to_string())
            });
        match written {
            Ok(path) => {
                harvest_info!(
                    "Saved manifest with {} entries to: {}",
                    state.manifest().len(),
                    path.display()
                );
                sink.emit(RunEvent::ManifestSaved { path: path.clone() });
                Ok(path.display().to_string())
            }
            Err(reason) => {
                harvest_warn!("Failed to write manifest: {reason}");
                sink.emit(RunEvent::ManifestFailed {
                    reason: reason.clone(),
                });
                Err(reason)
            }
        }
    }

    async fn publish_manifest(
        &self,
        local_path: &str,
        key: &str,
        sink: &dyn ProgressSink,
    ) -> Result<ObjectLocators, String> {
        let request = UploadRequest {
            local_path: Path::new(local_path),
            key,
            content_type: MANIFEST_CONTENT_TYPE,
            metadata: Vec::new(),
        };
        match self.publisher.put_file(&request).await {
            Ok(locators) => {
                harvest_info!("Uploaded manifest to {}", locators.s3_url);
                sink.emit(RunEvent::ManifestPublished {
                    s3_url: locators.s3_url.clone(),
                });
                Ok(locators)
            }
            Err(err) => {
                harvest_warn!("Failed to upload manifest: {err}");
                let reason = err.to_string();
                sink.emit(RunEvent::ManifestFailed {
                    reason: reason.clone(),
                });
                Err(reason)
            }
        }
    }
}
