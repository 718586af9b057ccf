//! Release trains: per-device append-only version history
//!
//! A train is the ordered list of every kit released for one device type,
//! newest last. Records are immutable once appended; ordering is append
//! order.
//!
//! # Core Invariants
//!
//! 1. **Append-only**: a completed session appends exactly one record; nothing
//!    ever rewrites or removes existing records.
//! 2. **Non-decreasing cores**: record versions never core-compare below their
//!    predecessor. Enforced by construction (the session only appends versions
//!    derived from the current one), not re-validated on load.
//! 3. **The last record defines "current"**: the current version, and the
//!    anchor core for [`ReleaseTrain::latest_run`], always come from the final
//!    record.

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::core::error::{KitError, KitResult};
use crate::version::Version;

pub mod store;

pub use store::TrainStore;

/// Timestamp layout used in train records and kit file names
pub const DATE_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Current local time in the record timestamp layout
pub fn date_stamp() -> String {
  Local::now().format(DATE_FORMAT).to_string()
}

/// One released (or seeded) kit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KitRecord {
  #[serde(rename = "type")]
  pub device: String,
  pub version: String,
  pub date: String,
  pub description: String,
  /// Always null at build time; consumed downstream
  pub updated_at: Option<String>,
  pub versions: Vec<String>,
  pub models: Vec<String>,
  pub apps: Vec<String>,
  pub file_name: String,
  pub file_size: u64,
  pub sha256: String,
  #[serde(default)]
  pub remarks: String,
}

impl KitRecord {
  /// Placeholder record a lazily created train starts with: the device's
  /// initial version, a fresh date stamp, empty metadata.
  pub fn seed(device: &str, init_version: &Version) -> Self {
    Self {
      device: device.to_string(),
      version: init_version.to_string(),
      date: date_stamp(),
      description: String::new(),
      updated_at: None,
      versions: Vec::new(),
      models: Vec::new(),
      apps: Vec::new(),
      file_name: String::new(),
      file_size: 0,
      sha256: String::new(),
      remarks: String::new(),
    }
  }

  pub fn parsed_version(&self) -> KitResult<Version> {
    Version::parse(&self.version)
  }
}

/// Append-only version history for one device type
#[derive(Debug, Clone)]
pub struct ReleaseTrain {
  device: String,
  records: Vec<KitRecord>,
}

impl ReleaseTrain {
  pub fn new(device: impl Into<String>, records: Vec<KitRecord>) -> Self {
    Self {
      device: device.into(),
      records,
    }
  }

  /// A fresh train holding only the placeholder record
  pub fn seeded(device: &str, init_version: &Version) -> Self {
    Self {
      device: device.to_string(),
      records: vec![KitRecord::seed(device, init_version)],
    }
  }

  pub fn device(&self) -> &str {
    &self.device
  }

  pub fn records(&self) -> &[KitRecord] {
    &self.records
  }

  pub fn append(&mut self, record: KitRecord) {
    self.records.push(record);
  }

  /// Version of the last record. A stored train always holds at least the
  /// placeholder record, so an empty train is a corrupt document.
  pub fn current_version(&self) -> KitResult<Version> {
    match self.records.last() {
      Some(record) => record.parsed_version(),
      None => Err(KitError::with_help(
        format!("Release train for '{}' has no records", self.device),
        "Remove the train file to have it recreated from the initial version",
      )),
    }
  }

  /// The most recent contiguous run of records sharing the final record's
  /// core version, newest first, stopping at the first core boundary. With
  /// `only_pre_release`, records without a pre-release token are skipped but
  /// the scan continues within the run.
  pub fn latest_run(&self, only_pre_release: bool) -> KitResult<Vec<&KitRecord>> {
    let Some(last) = self.records.last() else {
      return Ok(Vec::new());
    };
    let anchor = last.parsed_version()?;
    let mut run = Vec::new();
    for record in self.records.iter().rev() {
      let version = record.parsed_version()?;
      if !version.same_core(&anchor) {
        break;
      }
      if !only_pre_release || version.is_pre_release() {
        run.push(record);
      }
    }
    Ok(run)
  }
}
