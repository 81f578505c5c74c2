use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::classifier::Classifier;
use crate::forest::RandomForest;
use crate::schema::{FitReport, DEFAULT_VERSION};
use crate::store::write_new_blocking;
use crate::{ModelOpsError, Result};

const MAGIC: [u8; 4] = *b"MOPS";
const FORMAT_VERSION: u32 = 1;

/// On-disk bundle: opaque model payload plus its version tag.
#[derive(Serialize, Deserialize)]
struct Envelope {
    magic: [u8; 4],
    format: u32,
    version: String,
    checksum: String, // blake3(payload), hex
    payload: Vec<u8>, // bincode(classifier)
}

/// Deterministic payload checksum.
pub fn payload_checksum(payload: &[u8]) -> String {
    hex::encode(blake3::hash(payload).as_bytes())
}

/// A classifier together with the version tag it is published under.
#[derive(Clone, Debug, PartialEq)]
pub struct Model<C = RandomForest> {
    pub classifier: C,
    pub version: String,
}

impl Default for Model<RandomForest> {
    fn default() -> Self {
        Self::new(RandomForest::default())
    }
}

impl<C> Model<C>
where
    C: Classifier + Serialize + DeserializeOwned,
{
    pub fn new(classifier: C) -> Self {
        Self { classifier, version: DEFAULT_VERSION.to_string() }
    }

    pub fn train(&mut self, x: &[Vec<f64>], y: &[u32]) -> Result<FitReport> {
        self.classifier.train(x, y)
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<u32>> {
        self.classifier.predict(x)
    }

    pub fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        self.classifier.predict_proba(x)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(&self.classifier)?;
        let env = Envelope {
            magic: MAGIC,
            format: FORMAT_VERSION,
            version: self.version.clone(),
            checksum: payload_checksum(&payload),
            payload,
        };
        Ok(bincode::serialize(&env)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let env: Envelope = bincode::deserialize(bytes)
            .map_err(|e| ModelOpsError::Corrupt(format!("envelope: {e}")))?;
        if env.magic != MAGIC {
            return Err(ModelOpsError::Corrupt("not a model artifact".into()));
        }
        if env.format != FORMAT_VERSION {
            return Err(ModelOpsError::Corrupt(format!("unsupported format {}", env.format)));
        }
        if payload_checksum(&env.payload) != env.checksum {
            return Err(ModelOpsError::Corrupt("checksum mismatch".into()));
        }
        let classifier = bincode::deserialize(&env.payload)
            .map_err(|e| ModelOpsError::Corrupt(format!("payload: {e}")))?;
        Ok(Self { classifier, version: env.version })
    }

    /// Write the artifact, creating parent directories as needed. An
    /// existing file at `path` is left untouched and reported as
    /// `AlreadyExists`.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_new_blocking(path, &self.to_bytes()?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ModelOpsError::NotFound(path.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_bytes(&bytes)
    }
}
