use crate::core::error::{CatalogError, KitError, KitResult, ResultExt};
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Initial placeholder version for device types that do not configure one
pub const DEFAULT_INIT_VERSION: &str = "0.0.0";

/// On-disk catalog for upkit
/// Searched in order: upkit.toml, .upkit.toml, .config/upkit.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogFile {
  #[serde(default)]
  pub devices: BTreeMap<String, DeviceEntry>,

  #[serde(default)]
  pub apps: BTreeMap<String, AppEntry>,
}

/// One `[devices.<name>]` table, before defaults are applied
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeviceEntry {
  /// Device-type identifier; required, used for train paths and lock markers
  #[serde(rename = "type", default)]
  pub type_id: Option<String>,

  /// Display title (default: the type identifier)
  #[serde(default)]
  pub title: Option<String>,

  /// Disabled entries are listed but cannot be selected
  #[serde(default)]
  pub disabled: bool,

  /// Version the release train is seeded with (default: "0.0.0")
  #[serde(default)]
  pub init_version: Option<String>,

  /// Hardware models this device type covers
  #[serde(default)]
  pub models: BTreeMap<String, ModelEntry>,
}

/// Per-model table; no fields yet, reserved for model metadata
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelEntry {}

/// Per-app table; no fields yet, reserved for app metadata
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppEntry {}

/// A catalog entry with every default applied
#[derive(Debug, Clone)]
pub struct DeviceType {
  pub type_id: String,
  pub title: String,
  pub disabled: bool,
  pub init_version: Version,
  pub models: Vec<String>,
}

impl DeviceType {
  /// Menu label, `title(type)`
  pub fn label(&self) -> String {
    format!("{}({})", self.title, self.type_id)
  }
}

/// Immutable, validated device/app catalog
#[derive(Debug, Clone)]
pub struct Catalog {
  pub devices: Vec<DeviceType>,
  pub apps: Vec<String>,
}

impl Catalog {
  /// Find the catalog file in search order: upkit.toml, .upkit.toml, .config/upkit.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("upkit.toml"),
      path.join(".upkit.toml"),
      path.join(".config").join("upkit.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load and validate the catalog (searches multiple locations)
  pub fn load(path: &Path) -> KitResult<Self> {
    let config_path = Self::find_config_path(path).ok_or_else(|| {
      KitError::Catalog(CatalogError::NotFound {
        root: path.to_path_buf(),
      })
    })?;

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read catalog from {}", config_path.display()))?;
    Self::from_toml_str(&content).with_context(|| format!("Failed to parse catalog from {}", config_path.display()))
  }

  /// Parse and validate a catalog document
  pub fn from_toml_str(content: &str) -> KitResult<Self> {
    let file: CatalogFile = toml_edit::de::from_str(content)?;

    let mut devices = Vec::with_capacity(file.devices.len());
    for (entry_name, entry) in &file.devices {
      devices.push(entry.normalize(entry_name)?);
    }

    Ok(Catalog {
      devices,
      apps: file.apps.keys().cloned().collect(),
    })
  }

  /// Look up a device type by its identifier
  pub fn device(&self, type_id: &str) -> Option<&DeviceType> {
    self.devices.iter().find(|d| d.type_id == type_id)
  }
}

impl DeviceEntry {
  /// Apply defaults and validate; `entry_name` is the `[devices.<name>]` key,
  /// used in error messages
  fn normalize(&self, entry_name: &str) -> KitResult<DeviceType> {
    let type_id = self.type_id.clone().ok_or_else(|| {
      KitError::Catalog(CatalogError::MissingType {
        entry: entry_name.to_string(),
      })
    })?;

    let init_text = self
      .init_version
      .clone()
      .unwrap_or_else(|| DEFAULT_INIT_VERSION.to_string());
    let init_version = Version::parse(&init_text).map_err(|_| {
      KitError::Catalog(CatalogError::InvalidInitVersion {
        entry: entry_name.to_string(),
        value: init_text.clone(),
      })
    })?;

    Ok(DeviceType {
      title: self.title.clone().unwrap_or_else(|| type_id.clone()),
      disabled: self.disabled,
      models: self.models.keys().cloned().collect(),
      type_id,
      init_version,
    })
  }
}
