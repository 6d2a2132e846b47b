use crate::{DocStage, Effect, FailedStep, Msg, RunPhase, RunState};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages that do not match the current phase or document are ignored, so a
/// stray or repeated outcome can never advance the run twice.
pub fn update(mut state: RunState, msg: Msg) -> (RunState, Vec<Effect>) {
    let effects = match msg {
        Msg::Start => {
            if state.phase() != RunPhase::Idle {
                return (state, Vec::new());
            }
            state.start()
        }
        Msg::ListingFetched(result) => {
            if state.phase() != RunPhase::AwaitingListing {
                return (state, Vec::new());
            }
            match result {
                Err(reason) => state.abort(format!("listing fetch failed: {reason}")),
                Ok(references) if references.is_empty() => {
                    state.abort("no documents found on listing page".to_string())
                }
                Ok(references) => {
                    state.load_references(references);
                    state.begin_document(0)
                }
            }
        }
        Msg::DownloadFinished { index, result } => {
            if !state.is_at(index, DocStage::Normalized) {
                return (state, Vec::new());
            }
            match result {
                Ok(downloaded) => {
                    state.mark_downloaded(index, downloaded.local_path, downloaded.bytes)
                }
                Err(reason) => state.fail_document(index, FailedStep::Download, reason),
            }
        }
        Msg::UploadFinished {
            index,
            result,
            completed_at,
        } => {
            if !state.is_at(index, DocStage::Downloaded) {
                return (state, Vec::new());
            }
            match result {
                Ok(locators) => state.record_upload(index, locators, completed_at),
                Err(reason) => state.fail_document(index, FailedStep::Upload, reason),
            }
        }
        Msg::ManifestWritten(result) => {
            if state.phase() != RunPhase::WritingManifest {
                return (state, Vec::new());
            }
            match result {
                Ok(path) => state.manifest_written(path),
                Err(reason) => {
                    state.finish(None, Some(format!("manifest write failed: {reason}")))
                }
            }
        }
        Msg::ManifestPublished(result) => {
            if state.phase() != RunPhase::PublishingManifest {
                return (state, Vec::new());
            }
            match result {
                Ok(locators) => state.finish(Some(locators), None),
                Err(reason) => {
                    state.finish(None, Some(format!("manifest upload failed: {reason}")))
                }
            }
        }
    };

    (state, effects)
}
