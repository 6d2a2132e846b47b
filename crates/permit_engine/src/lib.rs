//! Permit engine: network, storage and filesystem effects plus the run loop.
mod config;
mod decode;
mod fetch;
mod links;
mod persist;
mod publish;
mod runner;
mod types;

pub use config::{utc_now_rfc3339, Clock, HarvestConfig};
pub use decode::{decode_listing, DecodedListing};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use links::{DocumentLinkExtractor, ExtractedLinks};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use publish::{
    PublishError, Publisher, S3Publisher, StaticCredentials, StorageSettings, UploadRequest,
    MANIFEST_CONTENT_TYPE,
};
pub use runner::{HarvestError, Harvester, RunReport};
pub use types::{
    DownloadOutput, FailureKind, FetchError, FetchMetadata, FetchOutput, NullSink, ProgressSink,
    RunEvent,
};
