//! S3 (and S3-compatible, e.g. MinIO) object transfer.
//!
//! Credentials come from the AWS default chain: environment, shared config,
//! web identity (IRSA) and instance metadata.

use std::path::Path;

use async_trait::async_trait;
use object_store::aws::{AmazonS3, AmazonS3Builder, S3ConditionalPut};
use object_store::ClientOptions;

use crate::registry::Location;
use crate::store::{get_object, map_object_error, put_object, wrong_backend, ArtifactStore};
use crate::Result;

#[derive(Clone, Debug)]
pub struct S3Store {
    builder: AmazonS3Builder,
}

impl S3Store {
    /// Create-only uploads are sent with `If-None-Match: *`.
    pub fn new(builder: AmazonS3Builder) -> Self {
        Self { builder: builder.with_conditional_put(S3ConditionalPut::ETagMatch) }
    }

    /// `AWS_*` settings plus `S3_ENDPOINT` for MinIO and friends.
    pub fn from_env(options: ClientOptions) -> Self {
        let mut builder = AmazonS3Builder::from_env().with_client_options(options);
        if let Ok(endpoint) = std::env::var("S3_ENDPOINT") {
            let endpoint = endpoint.trim().to_string();
            if !endpoint.is_empty() {
                builder = builder.with_allow_http(endpoint.starts_with("http://")).with_endpoint(endpoint);
            }
        }
        Self::new(builder)
    }

    fn bucket(&self, bucket: &str, uri: &str) -> Result<AmazonS3> {
        self.builder
            .clone()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| map_object_error(e, uri))
    }
}

#[async_trait]
impl ArtifactStore for S3Store {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn put(&self, local: &Path, remote: &Location) -> Result<()> {
        let Location::S3 { bucket, key } = remote else { return Err(wrong_backend(self.name(), remote)) };
        let uri = format!("s3://{bucket}/{key}");
        let store = self.bucket(bucket, &uri)?;
        put_object(&store, key, local, &uri).await
    }

    async fn get(&self, remote: &Location, local: &Path) -> Result<()> {
        let Location::S3 { bucket, key } = remote else { return Err(wrong_backend(self.name(), remote)) };
        let uri = format!("s3://{bucket}/{key}");
        let store = self.bucket(bucket, &uri)?;
        get_object(&store, key, local, &uri).await
    }
}
