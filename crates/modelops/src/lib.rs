pub mod error;
pub mod schema;
pub mod registry;
pub mod store;
pub mod s3;
pub mod gcs;
pub mod classifier;
pub mod forest;
pub mod dataset;
pub mod artifact;
pub mod training;

pub use error::*;
pub use schema::*;
pub use registry::{resolve, validate_version, Location, RegistryConfig, RegistryKind, RegistryPath};
pub use store::{ArtifactStore, LocalStore, Registry};
pub use classifier::Classifier;
pub use forest::{ForestParams, RandomForest};
pub use dataset::generate_sample_data;
pub use artifact::Model;
pub use training::{train_and_publish, TrainOptions, TrainOutcome};
