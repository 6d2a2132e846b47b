use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use harvest_logging::{harvest_debug, harvest_warn};
use permit_core::{DocumentKind, RunPlan};
use permit_engine::{HarvestConfig, StaticCredentials, StorageSettings};
use url::Url;

use crate::cli::Cli;

pub const DEFAULT_LISTING_URL: &str =
    "https://www.cincinnati-oh.gov/buildings/building-permit-forms-applications/application-forms/";
pub const DEFAULT_DOWNLOAD_DIR: &str = "data/cincinnati/permits";
pub const DEFAULT_PREFIX: &str = "cincinnati-oh/permits/";
pub const DEFAULT_JURISDICTION: &str = "cincinnati-oh";
pub const DEFAULT_BUCKET: &str = "civix-documents";
pub const DEFAULT_REGION: &str = "us-east-2";

const ENV_BUCKET: &str = "AWS_S3_BUCKET";
const ENV_REGION: &str = "AWS_REGION";
const ENV_ACCESS_KEY_ID: &str = "AWS_S3_ACCESS_KEY_ID";
const ENV_SECRET_ACCESS_KEY: &str = "AWS_S3_SECRET_ACCESS_KEY";
const ENV_ENDPOINT: &str = "AWS_S3_ENDPOINT";
const ENV_LISTING_URL: &str = "PERMIT_LISTING_URL";
const ENV_DOWNLOAD_DIR: &str = "PERMIT_DOWNLOAD_DIR";
const ENV_PREFIX: &str = "PERMIT_S3_PREFIX";
const ENV_JURISDICTION: &str = "PERMIT_JURISDICTION";

/// Resolved run configuration: command-line flags first, then the process
/// environment (including the env file), then built-in defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listing_url: Url,
    pub download_dir: PathBuf,
    /// Always empty or ending in `/`.
    pub prefix: String,
    pub jurisdiction: String,
    pub storage: StorageSettings,
}

impl AppConfig {
    /// Load the env file named on the command line, then resolve every setting.
    pub fn load(cli: &Cli) -> Result<Self> {
        match dotenvy::from_filename(&cli.env_file) {
            Ok(path) => harvest_debug!("Loaded environment from {}", path.display()),
            Err(err) if err.not_found() => {
                harvest_debug!("No env file at {}", cli.env_file.display())
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read {}", cli.env_file.display()))
            }
        }
        Self::from_sources(cli, |key| std::env::var(key).ok())
    }

    /// Resolve settings from `cli` and a variable lookup. Blank values count as unset.
    pub fn from_sources(cli: &Cli, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| non_blank(lookup(key));

        let listing = non_blank(cli.listing_url.clone())
            .or_else(|| var(ENV_LISTING_URL))
            .unwrap_or_else(|| DEFAULT_LISTING_URL.to_string());
        let listing_url = parse_listing_url(&listing)?;

        let download_dir = cli
            .download_dir
            .clone()
            .filter(|dir| !dir.as_os_str().is_empty())
            .or_else(|| var(ENV_DOWNLOAD_DIR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_DIR));

        let prefix = normalize_prefix(
            &non_blank(cli.prefix.clone())
                .or_else(|| var(ENV_PREFIX))
                .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
        );

        let jurisdiction = non_blank(cli.jurisdiction.clone())
            .or_else(|| var(ENV_JURISDICTION))
            .unwrap_or_else(|| DEFAULT_JURISDICTION.to_string());

        let credentials = match (var(ENV_ACCESS_KEY_ID), var(ENV_SECRET_ACCESS_KEY)) {
            (Some(access_key_id), Some(secret_access_key)) => Some(StaticCredentials {
                access_key_id,
                secret_access_key,
            }),
            (None, None) => {
                harvest_warn!(
                    "{ENV_ACCESS_KEY_ID} and {ENV_SECRET_ACCESS_KEY} are not set; uploads will fail"
                );
                None
            }
            (Some(_), None) | (None, Some(_)) => {
                harvest_warn!(
                    "Only one of {ENV_ACCESS_KEY_ID} and {ENV_SECRET_ACCESS_KEY} is set; \
                     uploads will fail"
                );
                None
            }
        };

        let mut storage = StorageSettings::new(
            var(ENV_BUCKET).unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            var(ENV_REGION).unwrap_or_else(|| DEFAULT_REGION.to_string()),
        );
        storage.endpoint = var(ENV_ENDPOINT);
        storage.credentials = credentials;

        Ok(Self {
            listing_url,
            download_dir,
            prefix,
            jurisdiction,
            storage,
        })
    }

    pub fn harvest_config(&self) -> HarvestConfig {
        let plan = RunPlan {
            listing_url: self.listing_url.to_string(),
            prefix: self.prefix.clone(),
            jurisdiction: self.jurisdiction.clone(),
            kind: DocumentKind::default(),
        };
        HarvestConfig::new(plan, self.download_dir.clone())
    }

    /// `s3://bucket/prefix`, as shown to the operator.
    pub fn s3_location(&self) -> String {
        format!("s3://{}/{}", self.storage.bucket, self.prefix)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_listing_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("invalid listing URL {raw:?}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("listing URL must use http or https: {raw}");
    }
    Ok(url)
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}
