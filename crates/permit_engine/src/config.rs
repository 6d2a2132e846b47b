use std::path::PathBuf;
use std::sync::Arc;

use permit_core::RunPlan;

/// Produces the timestamps written into object metadata and manifest entries.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

/// Everything a [`crate::Harvester`] needs besides its fetcher and publisher,
/// which carry their own settings.
#[derive(Clone)]
pub struct HarvestConfig {
    pub plan: RunPlan,
    pub download_dir: PathBuf,
    pub clock: Clock,
}

impl HarvestConfig {
    pub fn new(plan: RunPlan, download_dir: PathBuf) -> Self {
        Self {
            plan,
            download_dir,
            clock: Arc::new(utc_now_rfc3339),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub(crate) fn now(&self) -> String {
        (self.clock)()
    }
}

impl std::fmt::Debug for HarvestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HarvestConfig")
            .field("plan", &self.plan)
            .field("download_dir", &self.download_dir)
            .finish_non_exhaustive()
    }
}

pub fn utc_now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
