use std::path::Path;

use async_trait::async_trait;
use object_store::gcp::{GoogleCloudStorage, GoogleCloudStorageBuilder};
use object_store::ClientOptions;

use crate::registry::Location;
use crate::store::{get_object, map_object_error, put_object, wrong_backend, ArtifactStore};
use crate::Result;

/// Google Cloud Storage. Credentials follow Application Default Credentials:
/// `GOOGLE_SERVICE_ACCOUNT*`, `GOOGLE_APPLICATION_CREDENTIALS`, gcloud config,
/// then the metadata server.
#[derive(Clone, Debug)]
pub struct GcsStore {
    builder: GoogleCloudStorageBuilder,
}

impl GcsStore {
    pub fn new(builder: GoogleCloudStorageBuilder) -> Self {
        Self { builder }
    }

    pub fn from_env(options: ClientOptions) -> Self {
        Self::new(GoogleCloudStorageBuilder::from_env().with_client_options(options))
    }

    fn bucket(&self, bucket: &str, uri: &str) -> Result<GoogleCloudStorage> {
        self.builder
            .clone()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| map_object_error(e, uri))
    }
}

#[async_trait]
impl ArtifactStore for GcsStore {
    fn name(&self) -> &'static str {
        "gcs"
    }

    async fn put(&self, local: &Path, remote: &Location) -> Result<()> {
        let Location::Gcs { bucket, object } = remote else { return Err(wrong_backend(self.name(), remote)) };
        let uri = format!("gs://{bucket}/{object}");
        let store = self.bucket(bucket, &uri)?;
        put_object(&store, object, local, &uri).await
    }

    async fn get(&self, remote: &Location, local: &Path) -> Result<()> {
        let Location::Gcs { bucket, object } = remote else { return Err(wrong_backend(self.name(), remote)) };
        let uri = format!("gs://{bucket}/{object}");
        let store = self.bucket(bucket, &uri)?;
        get_object(&store, object, local, &uri).await
    }
}
