use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::logging::LogDestination;

/// Download building-permit forms from a listing page and archive them with a manifest.
#[derive(Parser, Debug, Clone)]
#[command(name = "permit-harvester", version)]
pub struct Cli {
    /// Page that links the permit documents [env: PERMIT_LISTING_URL]
    #[arg(long, value_name = "URL")]
    pub listing_url: Option<String>,

    /// Local directory for downloaded documents and the manifest [env: PERMIT_DOWNLOAD_DIR]
    #[arg(long, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Object key prefix inside the bucket [env: PERMIT_S3_PREFIX]
    #[arg(long)]
    pub prefix: Option<String>,

    /// Jurisdiction recorded in object metadata and manifest entries [env: PERMIT_JURISDICTION]
    #[arg(long)]
    pub jurisdiction: Option<String>,

    /// Environment file loaded before reading configuration; missing is fine
    #[arg(long, value_name = "PATH", default_value = ".env.local")]
    pub env_file: PathBuf,

    /// Also write the log to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Terminal log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }
}
