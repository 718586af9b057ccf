//! Kit assembly: payload digest, kit naming, archive writing
//!
//! A finished kit is a zip next to the device's train file holding two
//! entries: `info.json` (the record) and the payload stored under its kit
//! file name. The record's digest is a SHA-256 hex digest of the payload
//! bytes.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::core::error::{KitResult, ResultExt};
use crate::train::KitRecord;
use crate::ui::progress::ByteProgress;
use crate::version::Version;

const CHUNK_SIZE: usize = 64 * 1024;

/// `<type>_<version>_<date>`, with `_<remarks>` appended when present
pub fn kit_stem(device: &str, version: &Version, date: &str, remarks: &str) -> String {
  let mut stem = format!("{device}_{version}_{date}");
  if !remarks.is_empty() {
    stem.push('_');
    stem.push_str(remarks);
  }
  stem
}

/// The stem plus the payload's original extension
pub fn kit_file_name(stem: &str, payload: &Path) -> String {
  match payload.extension().and_then(|ext| ext.to_str()) {
    Some(ext) => format!("{stem}.{ext}"),
    None => stem.to_string(),
  }
}

/// Digest and size of a payload file
pub struct PayloadDigest {
  pub sha256: String,
  pub size: u64,
}

/// Streaming SHA-256 over the payload, reported with a progress bar
pub fn digest_payload(payload: &Path) -> KitResult<PayloadDigest> {
  let size = fs::metadata(payload)
    .with_context(|| format!("Failed to stat payload {}", payload.display()))?
    .len();
  let mut file = fs::File::open(payload)
    .with_context(|| format!("Failed to open payload {}", payload.display()))?;

  let mut hasher = Sha256::new();
  let mut progress = ByteProgress::new(size, "Digesting payload");
  let mut buffer = [0u8; CHUNK_SIZE];
  loop {
    let read = file
      .read(&mut buffer)
      .with_context(|| format!("Failed to read payload {}", payload.display()))?;
    if read == 0 {
      break;
    }
    hasher.update(&buffer[..read]);
    progress.inc(read);
  }

  Ok(PayloadDigest {
    sha256: format!("{:x}", hasher.finalize()),
    size,
  })
}

/// Writes kit archives into one device's package directory
pub struct Packer {
  device_dir: PathBuf,
}

impl Packer {
  pub fn new(device_dir: impl Into<PathBuf>) -> Self {
    Self {
      device_dir: device_dir.into(),
    }
  }

  pub fn archive_path(&self, stem: &str) -> PathBuf {
    self.device_dir.join(format!("{stem}.zip"))
  }

  /// Assemble `<stem>.zip`: the record as `info.json`, then the payload
  /// stored under the record's kit file name.
  pub fn write_archive(
    &self,
    stem: &str,
    record: &KitRecord,
    payload: &Path,
  ) -> KitResult<PathBuf> {
    fs::create_dir_all(&self.device_dir)
      .with_context(|| format!("Failed to create {}", self.device_dir.display()))?;
    let archive_path = self.archive_path(stem);
    let archive = fs::File::create(&archive_path)
      .with_context(|| format!("Failed to create archive {}", archive_path.display()))?;
    let mut writer = ZipWriter::new(archive);

    writer.start_file("info.json", deflated())?;
    let manifest = serde_json::to_vec(record)?;
    writer
      .write_all(&manifest)
      .with_context(|| format!("Failed to write manifest into {}", archive_path.display()))?;

    writer.start_file(record.file_name.as_str(), deflated())?;
    let mut payload_file = fs::File::open(payload)
      .with_context(|| format!("Failed to open payload {}", payload.display()))?;
    let mut progress = ByteProgress::new(record.file_size, "Writing archive");
    let mut buffer = [0u8; CHUNK_SIZE];
    loop {
      let read = payload_file
        .read(&mut buffer)
        .with_context(|| format!("Failed to read payload {}", payload.display()))?;
      if read == 0 {
        break;
      }
      writer
        .write_all(&buffer[..read])
        .with_context(|| format!("Failed to write payload into {}", archive_path.display()))?;
      progress.inc(read);
    }

    writer.finish()?;
    Ok(archive_path)
  }
}

fn deflated() -> SimpleFileOptions {
  SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}
