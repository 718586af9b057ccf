//! Version ordinals for upgrade kits
//!
//! A kit version is three numeric components plus an optional pre-release
//! token, e.g. `1.4.2` or `1.4.2-rc1`. Unlike semver, pre-release tokens are
//! opaque: they mark a version as provisional but never participate in
//! ordering.
//!
//! # Core Invariants
//!
//! 1. **Exactly three components**: a version string parses to
//!    `major.minor.patch` before any `-token` suffix; anything else is a hard
//!    error, never coerced.
//! 2. **Tokens are opaque**: comparison and equality of cores ignore the
//!    pre-release token entirely. There is no `-alpha` < `-beta` ranking.
//! 3. **Bumps reset downstream only**: incrementing a position zeroes every
//!    higher-numbered position and never touches lower-numbered ones.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::core::error::{KitError, KitResult, VersionError};

/// Ordinal position a version bump applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpPosition {
  Major,
  Minor,
  Patch,
}

impl BumpPosition {
  /// All positions, in menu order
  pub const ALL: [BumpPosition; 3] = [BumpPosition::Major, BumpPosition::Minor, BumpPosition::Patch];

  /// Resolve a numeric position (major=0, minor=1, patch=2)
  pub fn from_index(index: usize) -> KitResult<Self> {
    match index {
      0 => Ok(BumpPosition::Major),
      1 => Ok(BumpPosition::Minor),
      2 => Ok(BumpPosition::Patch),
      _ => Err(KitError::Version(VersionError::InvalidPosition { position: index })),
    }
  }
}

/// A kit version: `(major, minor, patch)` plus optional pre-release token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
  major: u64,
  minor: u64,
  patch: u64,
  pre_release: Option<String>,
}

/// True iff `text` is a usable pre-release token or file-name remark:
/// non-empty, only `[A-Za-z0-9_-]`.
pub fn valid_token(text: &str) -> bool {
  !text.is_empty()
    && text
      .bytes()
      .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

impl Version {
  /// Parse `major.minor.patch[-token]`
  ///
  /// The token is split off at the first `-` and may itself contain `-`.
  pub fn parse(text: &str) -> KitResult<Version> {
    let invalid = || {
      KitError::Version(VersionError::InvalidFormat {
        input: text.to_string(),
      })
    };

    let (core, pre_release) = match text.split_once('-') {
      Some((core, token)) => {
        if !valid_token(token) {
          return Err(invalid());
        }
        (core, Some(token.to_string()))
      }
      None => (text, None),
    };

    let mut components = [0u64; 3];
    let mut parts = core.split('.');
    for slot in components.iter_mut() {
      let part = parts.next().ok_or_else(invalid)?;
      *slot = part.parse().map_err(|_| invalid())?;
    }
    if parts.next().is_some() {
      return Err(invalid());
    }

    Ok(Version {
      major: components[0],
      minor: components[1],
      patch: components[2],
      pre_release,
    })
  }

  /// The pre-release token, if any
  pub fn pre_release(&self) -> Option<&str> {
    self.pre_release.as_deref()
  }

  /// True iff this version carries a pre-release token
  pub fn is_pre_release(&self) -> bool {
    self.pre_release.is_some()
  }

  /// Compare only `(major, minor, patch)`, ignoring pre-release tokens
  pub fn core_cmp(&self, other: &Version) -> Ordering {
    (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
  }

  /// True iff the numeric triples are equal, pre-release tokens aside
  pub fn same_core(&self, other: &Version) -> bool {
    self.core_cmp(other) == Ordering::Equal
  }

  /// Bump the ordinal at `position`, zeroing every higher-numbered position
  /// and leaving lower-numbered ones untouched. The pre-release token is
  /// dropped unless `retain_pre_release`.
  pub fn increment(&self, position: BumpPosition, retain_pre_release: bool) -> Version {
    let mut next = self.clone();
    match position {
      BumpPosition::Major => {
        next.major += 1;
        next.minor = 0;
        next.patch = 0;
      }
      BumpPosition::Minor => {
        next.minor += 1;
        next.patch = 0;
      }
      BumpPosition::Patch => {
        next.patch += 1;
      }
    }
    next.pre_release = if retain_pre_release { self.pre_release.clone() } else { None };
    next
  }

  /// Same core with the pre-release token replaced
  pub fn with_pre_release(&self, token: &str) -> KitResult<Version> {
    if !valid_token(token) {
      return Err(KitError::Version(VersionError::InvalidFormat {
        input: format!("{}.{}.{}-{}", self.major, self.minor, self.patch, token),
      }));
    }
    let mut next = self.clone();
    next.pre_release = Some(token.to_string());
    Ok(next)
  }

  /// Same core with any pre-release token dropped
  pub fn without_pre_release(&self) -> Version {
    let mut next = self.clone();
    next.pre_release = None;
    next
  }
}

impl FromStr for Version {
  type Err = KitError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Version::parse(s)
  }
}

impl fmt::Display for Version {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
    if let Some(token) = &self.pre_release {
      write!(f, "-{}", token)?;
    }
    Ok(())
  }
}
