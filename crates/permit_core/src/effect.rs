#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchListing { url: String },
    Download { index: usize, url: String, file_name: String },
    Upload { index: usize, local_path: String, key: String },
    WriteManifest,
    PublishManifest { local_path: String, key: String },
    Abort { reason: String },
    Finish,
}
