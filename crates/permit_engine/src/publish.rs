use std::path::Path;
use std::time::Duration;

use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region, SharedCredentialsProvider};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::put_object::PutObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{Client, Config};
use permit_core::ObjectLocators;
use thiserror::Error;

/// Content type used for the manifest object.
pub const MANIFEST_CONTENT_TYPE: &str = "application/json";

#[derive(Clone, PartialEq, Eq)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible stores; enables path-style addressing.
    pub endpoint: Option<String>,
    /// Without credentials every upload fails with [`PublishError::MissingCredentials`].
    pub credentials: Option<StaticCredentials>,
    pub operation_timeout: Duration,
}

impl StorageSettings {
    pub fn new(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            endpoint: None,
            credentials: None,
            operation_timeout: Duration::from_secs(60),
        }
    }

    /// Virtual-hosted AWS locators, or path-style ones under the custom endpoint.
    pub fn locators(&self, key: &str) -> ObjectLocators {
        match &self.endpoint {
            Some(endpoint) => ObjectLocators::for_endpoint(endpoint, &self.bucket, key),
            None => ObjectLocators::for_key(&self.bucket, &self.region, key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest<'a> {
    pub local_path: &'a Path,
    pub key: &'a str,
    pub content_type: &'a str,
    /// Stored as `x-amz-meta-*` object metadata.
    pub metadata: Vec<(String, String)>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("missing storage credentials")]
    MissingCredentials,
    #[error("bucket not found: {0}")]
    BucketNotFound(String),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },
    #[error("storage service error: {0}")]
    Service(String),
}

#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    /// Upload one local file under `request.key`, overwriting any existing object.
    async fn put_file(&self, request: &UploadRequest<'_>) -> Result<ObjectLocators, PublishError>;
}

/// [`Publisher`] backed by the AWS SDK. Single attempt per upload.
#[derive(Debug, Clone)]
pub struct S3Publisher {
    client: Client,
    settings: StorageSettings,
}

impl S3Publisher {
    pub fn new(settings: StorageSettings) -> Self {
        let mut builder = Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .retry_config(RetryConfig::disabled())
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(settings.operation_timeout)
                    .build(),
            );

        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        if let Some(creds) = &settings.credentials {
            let creds = Credentials::new(
                &creds.access_key_id,
                &creds.secret_access_key,
                None,
                None,
                "permit-harvester",
            );
            builder = builder.credentials_provider(SharedCredentialsProvider::new(creds));
        }

        Self {
            client: Client::from_conf(builder.build()),
            settings,
        }
    }
}

#[async_trait::async_trait]
impl Publisher for S3Publisher {
    async fn put_file(&self, request: &UploadRequest<'_>) -> Result<ObjectLocators, PublishError> {
        if self.settings.credentials.is_none() {
            return Err(PublishError::MissingCredentials);
        }

        let body = ByteStream::from_path(request.local_path)
            .await
            .map_err(|err| PublishError::Io {
                path: request.local_path.display().to_string(),
                message: err.to_string(),
            })?;

        let mut put = self
            .client
            .put_object()
            .bucket(&self.settings.bucket)
            .key(request.key)
            .content_type(request.content_type)
            .body(body);
        for (name, value) in &request.metadata {
            put = put.metadata(name, value);
        }

        put.send()
            .await
            .map_err(|err| map_put_error(err, &self.settings.bucket))?;

        Ok(self.settings.locators(request.key))
    }
}

fn map_put_error(err: SdkError<PutObjectError>, bucket: &str) -> PublishError {
    let message = DisplayErrorContext(&err).to_string();
    let status = err.raw_response().map(|raw| raw.status().as_u16());
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => PublishError::Network(message),
        SdkError::ServiceError(service) => match (service.err().code(), status) {
            (Some("NoSuchBucket"), _) | (None, Some(404)) => {
                PublishError::BucketNotFound(bucket.to_string())
            }
            (
                Some(
                    "AccessDenied"
                    | "AllAccessDisabled"
                    | "InvalidAccessKeyId"
                    | "SignatureDoesNotMatch",
                ),
                _,
            )
            | (None, Some(403)) => PublishError::AccessDenied(message),
            _ => PublishError::Service(message),
        },
        _ => PublishError::Service(message),
    }
}
