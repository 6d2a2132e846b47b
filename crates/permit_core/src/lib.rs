//! Permit core: pure domain types and the run state machine.
mod effect;
mod kind;
mod locator;
mod manifest;
mod msg;
mod naming;
mod reference;
mod state;
mod summary;
mod update;

pub use effect::Effect;
pub use kind::DocumentKind;
pub use locator::ObjectLocators;
pub use manifest::{size_in_mb, Manifest, ManifestEntry, MANIFEST_FILENAME};
pub use msg::{Downloaded, Msg};
pub use naming::{normalized_name, slugify, FALLBACK_NAME};
pub use reference::{filename_from_url, DocumentReference};
pub use state::{DocStage, DocumentJob, FailedDocument, FailedStep, RunPhase, RunPlan, RunState};
pub use summary::RunSummary;
pub use update::update;
