//! Error types for upkit with contextual messages and exit codes
//!
//! This module provides a unified error type that categorizes errors and provides
//! contextual help messages to operators. Every error includes a helpful suggestion
//! to guide users toward resolution.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for upkit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (catalog, invalid args, missing files)
  User = 1,
  /// System error (filesystem, archive, I/O)
  System = 2,
  /// Validation failure (malformed versions, rejected input)
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for upkit
#[derive(Debug)]
pub enum KitError {
  /// Device/app catalog errors
  Catalog(CatalogError),

  /// Version parsing and increment errors
  Version(VersionError),

  /// I/O errors, optionally annotated with what was being touched
  Io {
    context: Option<String>,
    source: io::Error,
  },

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl KitError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    KitError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    KitError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      KitError::Message { message, context, help } => KitError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      KitError::Io { context, source } => KitError::Io {
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        source,
      },
      other => other,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      KitError::Catalog(_) => ExitCode::User,
      KitError::Version(_) => ExitCode::Validation,
      KitError::Io { .. } => ExitCode::System,
      KitError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      KitError::Catalog(e) => e.help_message(),
      KitError::Version(e) => e.help_message(),
      KitError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for KitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      KitError::Catalog(e) => write!(f, "{}", e),
      KitError::Version(e) => write!(f, "{}", e),
      KitError::Io { context, source } => match context {
        Some(ctx) => write!(f, "{}: {}", ctx, source),
        None => write!(f, "I/O error: {}", source),
      },
      KitError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for KitError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      KitError::Io { source, .. } => Some(source),
      _ => None,
    }
  }
}

impl From<io::Error> for KitError {
  fn from(err: io::Error) -> Self {
    KitError::Io {
      context: None,
      source: err,
    }
  }
}

impl From<String> for KitError {
  fn from(msg: String) -> Self {
    KitError::message(msg)
  }
}

impl From<&str> for KitError {
  fn from(msg: &str) -> Self {
    KitError::message(msg)
  }
}

impl From<toml_edit::TomlError> for KitError {
  fn from(err: toml_edit::TomlError) -> Self {
    KitError::message(format!("TOML parse error: {}", err))
  }
}

impl From<toml_edit::de::Error> for KitError {
  fn from(err: toml_edit::de::Error) -> Self {
    KitError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<toml_edit::ser::Error> for KitError {
  fn from(err: toml_edit::ser::Error) -> Self {
    KitError::message(format!("TOML serialization error: {}", err))
  }
}

impl From<serde_json::Error> for KitError {
  fn from(err: serde_json::Error) -> Self {
    KitError::message(format!("JSON error: {}", err))
  }
}

impl From<serde_yaml::Error> for KitError {
  fn from(err: serde_yaml::Error) -> Self {
    KitError::message(format!("YAML error: {}", err))
  }
}

impl From<std::num::ParseIntError> for KitError {
  fn from(err: std::num::ParseIntError) -> Self {
    KitError::message(format!("Parse error: {}", err))
  }
}

impl From<glob::PatternError> for KitError {
  fn from(err: glob::PatternError) -> Self {
    KitError::message(format!("Marker pattern error: {}", err))
  }
}

impl From<glob::GlobError> for KitError {
  fn from(err: glob::GlobError) -> Self {
    KitError::message(format!("Marker listing error: {}", err))
  }
}

impl From<zip::result::ZipError> for KitError {
  fn from(err: zip::result::ZipError) -> Self {
    KitError::message(format!("Archive error: {}", err))
  }
}

impl From<dialoguer::Error> for KitError {
  fn from(err: dialoguer::Error) -> Self {
    match err {
      dialoguer::Error::IO(e) => KitError::from(e),
    }
  }
}

impl From<ctrlc::Error> for KitError {
  fn from(err: ctrlc::Error) -> Self {
    KitError::message(format!("Signal handler error: {}", err))
  }
}

/// Catalog configuration errors
#[derive(Debug)]
pub enum CatalogError {
  /// upkit.toml not found
  NotFound { root: PathBuf },

  /// Device entry without a `type` identifier
  MissingType { entry: String },

  /// Device entry whose initial version does not parse
  InvalidInitVersion { entry: String, value: String },
}

impl CatalogError {
  fn help_message(&self) -> Option<String> {
    match self {
      CatalogError::NotFound { .. } => {
        Some("Create an upkit.toml with a [devices.<name>] table per device class.".to_string())
      }
      CatalogError::MissingType { entry } => Some(format!(
        "Add `type = \"{}\"` (or the real identifier) to that device table.",
        entry
      )),
      CatalogError::InvalidInitVersion { .. } => {
        Some("Initial versions look like 0.0.0 (three numeric components).".to_string())
      }
    }
  }
}

impl fmt::Display for CatalogError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CatalogError::NotFound { root } => {
        write!(
          f,
          "No upkit catalog found.\nExpected file: {}/upkit.toml",
          root.display()
        )
      }
      CatalogError::MissingType { entry } => {
        write!(f, "Device entry '{}' has no type identifier", entry)
      }
      CatalogError::InvalidInitVersion { entry, value } => {
        write!(f, "Device entry '{}' has unparseable initial version '{}'", entry, value)
      }
    }
  }
}

/// Version errors
#[derive(Debug)]
pub enum VersionError {
  /// Input does not parse as `major.minor.patch[-token]`
  InvalidFormat { input: String },

  /// Increment position outside {0, 1, 2}
  InvalidPosition { position: usize },
}

impl VersionError {
  fn help_message(&self) -> Option<String> {
    match self {
      VersionError::InvalidFormat { .. } => Some(
        "Versions look like 1.4.2 or 1.4.2-beta1: three numeric components, then an optional -token of [A-Za-z0-9_-].".to_string(),
      ),
      VersionError::InvalidPosition { .. } => {
        Some("Valid increment positions are 0 (major), 1 (minor) and 2 (patch).".to_string())
      }
    }
  }
}

impl fmt::Display for VersionError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      VersionError::InvalidFormat { input } => {
        write!(f, "Invalid version format: '{}'", input)
      }
      VersionError::InvalidPosition { position } => {
        write!(f, "Invalid version increment position: {}", position)
      }
    }
  }
}

/// Result type alias for upkit
pub type KitResult<T> = Result<T, KitError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> KitResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> KitResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<KitError>,
{
  fn context(self, ctx: impl Into<String>) -> KitResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> KitResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with colors and help text
pub fn print_error(error: &KitError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}

/// Convert anyhow::Error to KitError (for collaborator boundaries)
impl From<anyhow::Error> for KitError {
  fn from(err: anyhow::Error) -> Self {
    KitError::message(err.to_string())
  }
}
