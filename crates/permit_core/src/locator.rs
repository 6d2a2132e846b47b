/// Where a stored object can be found, in the two forms the manifest records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocators {
    pub s3_url: String,
    pub https_url: String,
}

impl ObjectLocators {
    /// Locators are a pure function of bucket, region and key, so publishing the
    /// same key twice always yields the same strings.
    pub fn for_key(bucket: &str, region: &str, key: &str) -> Self {
        Self {
            s3_url: format!("s3://{bucket}/{key}"),
            https_url: format!("https://{bucket}.s3.{region}.amazonaws.com/{key}"),
        }
    }

    /// Path-style locators for an S3-compatible store at `endpoint`.
    pub fn for_endpoint(endpoint: &str, bucket: &str, key: &str) -> Self {
        Self {
            s3_url: format!("s3://{bucket}/{key}"),
            https_url: format!("{}/{bucket}/{key}", endpoint.trim_end_matches('/')),
        }
    }
}
