//! Unified workspace context - build once, pass everywhere
//!
//! # Design
//!
//! WorkspaceContext loads the catalog once in main.rs and owns the workspace
//! directory layout. Everything downstream (train store, lock, packer,
//! session) receives paths derived here instead of re-deriving them.
//!
//! # Layout
//!
//! ```text
//! <root>/
//!   upkit.toml                 catalog
//!   packages/<type>/info.yaml  release train per device type
//!   packages/<type>/raw/       upgrade payloads awaiting packaging
//!   packages/<type>/<kit>.zip  assembled kits
//!   temp/                      lock markers
//! ```

use crate::core::config::Catalog;
use crate::core::error::KitResult;
use std::path::{Path, PathBuf};

/// Workspace-level data shared by every step of a session.
///
/// Built once at startup. The catalog is required: a workspace without a
/// valid catalog fails before any workflow begins.
#[derive(Debug, Clone)]
pub struct WorkspaceContext {
  /// Workspace root directory (absolute path)
  pub root: PathBuf,

  /// Validated device/app catalog (upkit.toml)
  pub catalog: Catalog,
}

impl WorkspaceContext {
  /// Build workspace context from a root directory.
  pub fn build(root: &Path) -> KitResult<Self> {
    let root = root.to_path_buf();
    let catalog = Catalog::load(&root)?;

    Ok(Self { root, catalog })
  }

  /// Directory holding one release train per device type
  pub fn packages_dir(&self) -> PathBuf {
    self.root.join("packages")
  }

  /// Directory of a single device type's train, payloads and kits
  pub fn device_dir(&self, type_id: &str) -> PathBuf {
    self.packages_dir().join(type_id)
  }

  /// Where raw upgrade payloads for a device type are picked up
  pub fn raw_payload_dir(&self, type_id: &str) -> PathBuf {
    self.device_dir(type_id).join("raw")
  }

  /// Scratch directory for lock markers
  pub fn scratch_dir(&self) -> PathBuf {
    self.root.join("temp")
  }
}
