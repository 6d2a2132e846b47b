use crate::{
    normalized_name, DocumentKind, DocumentReference, Effect, Manifest, ManifestEntry,
    ObjectLocators, RunSummary, MANIFEST_FILENAME,
};

/// Fixed inputs of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub listing_url: String,
    /// Object key prefix, normally ending in `/`.
    pub prefix: String,
    pub jurisdiction: String,
    pub kind: DocumentKind,
}

impl RunPlan {
    pub fn object_key(&self, file_name: &str) -> String {
        format!("{}{}", self.prefix, file_name)
    }

    pub fn manifest_key(&self) -> String {
        self.object_key(MANIFEST_FILENAME)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    AwaitingListing,
    Processing,
    WritingManifest,
    PublishingManifest,
    Done,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocStage {
    Discovered,
    Normalized,
    Downloaded,
    Uploaded,
    Recorded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedStep {
    Download,
    Upload,
}

impl std::fmt::Display for FailedStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailedStep::Download => write!(f, "download"),
            FailedStep::Upload => write!(f, "upload"),
        }
    }
}

/// A document that was found but did not make it into the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDocument {
    pub index: usize,
    pub title: String,
    pub url: String,
    pub step: FailedStep,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentJob {
    pub reference: DocumentReference,
    pub stage: DocStage,
    pub file_name: Option<String>,
    pub local_path: Option<String>,
    pub bytes: Option<u64>,
}

impl DocumentJob {
    fn new(reference: DocumentReference) -> Self {
        Self {
            reference,
            stage: DocStage::Discovered,
            file_name: None,
            local_path: None,
            bytes: None,
        }
    }
}

/// Whole-run state. Owns the manifest and the counters; only [`crate::update`]
/// mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    plan: RunPlan,
    phase: RunPhase,
    jobs: Vec<DocumentJob>,
    current: Option<usize>,
    downloaded: usize,
    uploaded: usize,
    manifest: Manifest,
    failures: Vec<FailedDocument>,
    abort_reason: Option<String>,
    manifest_path: Option<String>,
    manifest_locators: Option<ObjectLocators>,
    manifest_error: Option<String>,
}

impl RunState {
    pub fn new(plan: RunPlan) -> Self {
        Self {
            plan,
            phase: RunPhase::Idle,
            jobs: Vec::new(),
            current: None,
            downloaded: 0,
            uploaded: 0,
            manifest: Manifest::new(),
            failures: Vec::new(),
            abort_reason: None,
            manifest_path: None,
            manifest_locators: None,
            manifest_error: None,
        }
    }

    pub fn plan(&self) -> &RunPlan {
        &self.plan
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn job(&self, index: usize) -> Option<&DocumentJob> {
        self.jobs.get(index)
    }

    pub fn found(&self) -> usize {
        self.jobs.len()
    }

    pub fn downloaded(&self) -> usize {
        self.downloaded
    }

    pub fn uploaded(&self) -> usize {
        self.uploaded
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn failures(&self) -> &[FailedDocument] {
        &self.failures
    }

    pub fn abort_reason(&self) -> Option<&str> {
        self.abort_reason.as_deref()
    }

    pub fn manifest_path(&self) -> Option<&str> {
        self.manifest_path.as_deref()
    }

    pub fn manifest_locators(&self) -> Option<&ObjectLocators> {
        self.manifest_locators.as_ref()
    }

    pub fn manifest_error(&self) -> Option<&str> {
        self.manifest_error.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, RunPhase::Done | RunPhase::Aborted)
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::from_state(self)
    }

    /// Earlier document in this run that normalized to the same file name as
    /// `index`; its object will be overwritten.
    pub fn earlier_job_with_same_name(&self, index: usize) -> Option<usize> {
        let name = self.jobs.get(index)?.file_name.as_deref()?;
        self.jobs[..index]
            .iter()
            .position(|job| job.file_name.as_deref() == Some(name))
    }

    pub(crate) fn is_at(&self, index: usize, stage: DocStage) -> bool {
        self.phase == RunPhase::Processing
            && self.current == Some(index)
            && self.jobs.get(index).map(|j| j.stage) == Some(stage)
    }

    pub(crate) fn start(&mut self) -> Vec<Effect> {
        self.phase = RunPhase::AwaitingListing;
        vec![Effect::FetchListing {
            url: self.plan.listing_url.clone(),
        }]
    }

    pub(crate) fn abort(&mut self, reason: String) -> Vec<Effect> {
        self.phase = RunPhase::Aborted;
        self.current = None;
        self.abort_reason = Some(reason.clone());
        vec![Effect::Abort { reason }]
    }

    pub(crate) fn load_references(&mut self, references: Vec<DocumentReference>) {
        self.jobs = references.into_iter().map(DocumentJob::new).collect();
        self.phase = RunPhase::Processing;
    }

    /// Normalizes the document at `index` and requests its download, or moves
    /// on to the manifest once every document has been visited.
    pub(crate) fn begin_document(&mut self, index: usize) -> Vec<Effect> {
        let Some(job) = self.jobs.get_mut(index) else {
            self.current = None;
            self.phase = RunPhase::WritingManifest;
            return vec![Effect::WriteManifest];
        };
        let file_name = normalized_name(&job.reference, &self.plan.kind);
        job.file_name = Some(file_name.clone());
        job.stage = DocStage::Normalized;
        self.current = Some(index);
        vec![Effect::Download {
            index,
            url: job.reference.url.clone(),
            file_name,
        }]
    }

    pub(crate) fn mark_downloaded(
        &mut self,
        index: usize,
        local_path: String,
        bytes: u64,
    ) -> Vec<Effect> {
        self.downloaded += 1;
        let job = &mut self.jobs[index];
        job.stage = DocStage::Downloaded;
        job.local_path = Some(local_path.clone());
        job.bytes = Some(bytes);
        let key = self.plan.object_key(job.file_name.as_deref().unwrap_or_default());
        vec![Effect::Upload {
            index,
            local_path,
            key,
        }]
    }

    pub(crate) fn record_upload(
        &mut self,
        index: usize,
        locators: ObjectLocators,
        completed_at: String,
    ) -> Vec<Effect> {
        self.uploaded += 1;
        let job = &mut self.jobs[index];
        job.stage = DocStage::Uploaded;
        let bytes = job.bytes.unwrap_or_default();
        let entry = ManifestEntry {
            filename: job.file_name.clone().unwrap_or_default(),
            title: job.reference.title.clone(),
            original_url: job.reference.url.clone(),
            original_filename: job.reference.original_filename.clone(),
            s3_url: locators.s3_url,
            https_url: locators.https_url,
            local_path: job.local_path.clone().unwrap_or_default(),
            file_size_bytes: bytes,
            file_size_mb: crate::size_in_mb(bytes),
            downloaded_at: completed_at,
            jurisdiction: self.plan.jurisdiction.clone(),
            document_type: self.plan.kind.document_type.clone(),
        };
        self.manifest.push(entry);
        job.stage = DocStage::Recorded;
        self.begin_document(index + 1)
    }

    pub(crate) fn fail_document(
        &mut self,
        index: usize,
        step: FailedStep,
        reason: String,
    ) -> Vec<Effect> {
        let job = &mut self.jobs[index];
        job.stage = DocStage::Failed;
        self.failures.push(FailedDocument {
            index,
            title: job.reference.title.clone(),
            url: job.reference.url.clone(),
            step,
            reason,
        });
        self.begin_document(index + 1)
    }

    pub(crate) fn manifest_written(&mut self, local_path: String) -> Vec<Effect> {
        self.phase = RunPhase::PublishingManifest;
        self.manifest_path = Some(local_path.clone());
        vec![Effect::PublishManifest {
            local_path,
            key: self.plan.manifest_key(),
        }]
    }

    pub(crate) fn finish(
        &mut self,
        locators: Option<ObjectLocators>,
        error: Option<String>,
    ) -> Vec<Effect> {
        self.phase = RunPhase::Done;
        self.manifest_locators = locators;
        self.manifest_error = error;
        vec![Effect::Finish]
    }
}
