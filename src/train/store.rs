//! YAML persistence for release trains
//!
//! Each device type keeps its history in `packages/<type>/info.yaml`. The
//! document is `{ type, packages: [record, ...] }`, human-readable, rewritten
//! whole on save. A missing or empty document is seeded with the placeholder
//! record and persisted before the first read returns.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::error::{KitResult, ResultExt};
use crate::train::{KitRecord, ReleaseTrain};
use crate::version::Version;

/// On-disk shape of `info.yaml`
#[derive(Debug, Serialize, Deserialize)]
struct TrainFile {
  #[serde(rename = "type")]
  device: String,
  packages: Vec<KitRecord>,
}

/// Loads and saves release trains under a packages directory
pub struct TrainStore {
  packages_dir: PathBuf,
}

impl TrainStore {
  pub fn new(packages_dir: impl Into<PathBuf>) -> Self {
    Self {
      packages_dir: packages_dir.into(),
    }
  }

  pub fn train_path(&self, device: &str) -> PathBuf {
    self.packages_dir.join(device).join("info.yaml")
  }

  /// Load the device's train, seeding and persisting a single-record train
  /// when the document is missing or empty.
  pub fn load(&self, device: &str, init_version: &Version) -> KitResult<ReleaseTrain> {
    let path = self.train_path(device);
    if !path.exists() {
      return self.seed(device, init_version);
    }
    let text = fs::read_to_string(&path)
      .with_context(|| format!("Failed to read release train {}", path.display()))?;
    if text.trim().is_empty() {
      return self.seed(device, init_version);
    }
    let file: TrainFile = serde_yaml::from_str(&text)?;
    Ok(ReleaseTrain::new(file.device, file.packages))
  }

  /// Rewrite the device's train document
  pub fn save(&self, train: &ReleaseTrain) -> KitResult<()> {
    let path = self.train_path(train.device());
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = TrainFile {
      device: train.device().to_string(),
      packages: train.records().to_vec(),
    };
    let text = serde_yaml::to_string(&file)?;
    fs::write(&path, text)
      .with_context(|| format!("Failed to write release train {}", path.display()))?;
    Ok(())
  }

  fn seed(&self, device: &str, init_version: &Version) -> KitResult<ReleaseTrain> {
    let train = ReleaseTrain::seeded(device, init_version);
    self.save(&train)?;
    Ok(train)
  }
}
