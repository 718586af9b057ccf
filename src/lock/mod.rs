//! Cross-process advisory locking via marker files
//!
//! A device type's release train is guarded by zero-byte markers named
//! `<resource>_<pid>` in a scratch directory. Acquiring writes the caller's
//! own marker, then scans for foreign ones; any live foreign holder blocks,
//! while markers of dead processes are reclaimed on the spot.
//!
//! # Core Invariants
//!
//! 1. **Advisory only**: nothing stops a process that ignores the markers.
//!    Check-then-create is racy at the filesystem level; writing the own
//!    marker before scanning narrows the window to "both racers back off",
//!    never "both proceed".
//! 2. **Conflict holds nothing**: a caller that observes a conflict removes
//!    its own marker again, so holding a [`LockGuard`] and having a marker on
//!    disk coincide.
//! 3. **Liveness decides reclaim**: only a definite not-found verdict from
//!    the probe makes a foreign marker stale; unsignalable processes count
//!    as alive. Markers whose file name carries no parseable pid are stale.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::core::error::{KitResult, ResultExt};

pub mod probe;

pub use probe::{ProcessProbe, SystemProbe};

/// One marker file: resource name plus holder pid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockMarker {
  pub resource: String,
  /// `None` when the file name carries no parseable pid
  pub holder: Option<u32>,
  pub path: PathBuf,
}

fn marker_from_path(path: PathBuf) -> LockMarker {
  let name = path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_default();
  let (resource, holder) = match name.rsplit_once('_') {
    Some((resource, pid)) => (resource.to_string(), pid.parse().ok()),
    None => (name, None),
  };
  LockMarker { resource, holder, path }
}

/// Outcome of an acquire attempt
#[derive(Debug)]
pub enum Acquire {
  /// The resource is ours; dropping the guard releases it
  Acquired(LockGuard),
  /// Live foreign holders block the resource
  Conflict(Vec<LockMarker>),
}

/// Holds one acquired marker; releasing is idempotent and happens on drop
#[derive(Debug)]
pub struct LockGuard {
  path: PathBuf,
  released: bool,
}

impl LockGuard {
  /// Remove the marker now instead of at drop time
  pub fn release(mut self) -> KitResult<()> {
    self.remove()
  }

  fn remove(&mut self) -> KitResult<()> {
    if self.released {
      return Ok(());
    }
    self.released = true;
    match fs::remove_file(&self.path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e).with_context(|| format!("Failed to remove lock marker {}", self.path.display())),
    }
  }
}

impl Drop for LockGuard {
  fn drop(&mut self) {
    let _ = self.remove();
  }
}

/// Marker-file lock for one process
pub struct ProcessLock {
  scratch_dir: PathBuf,
  pid: u32,
  probe: Box<dyn ProcessProbe>,
}

impl ProcessLock {
  /// Lock with an explicit pid and probe (tests simulate foreign processes
  /// this way)
  pub fn new(scratch_dir: PathBuf, pid: u32, probe: Box<dyn ProcessProbe>) -> Self {
    Self { scratch_dir, pid, probe }
  }

  /// Lock for the current process, probing the operating system
  pub fn system(scratch_dir: PathBuf) -> Self {
    Self::new(scratch_dir, std::process::id(), Box::new(SystemProbe::new()))
  }

  /// Try to take the resource. Never blocks; a conflict is an outcome, not
  /// an error.
  pub fn acquire(&self, resource: &str) -> KitResult<Acquire> {
    fs::create_dir_all(&self.scratch_dir)
      .with_context(|| format!("Failed to create scratch directory {}", self.scratch_dir.display()))?;

    let own = self.scratch_dir.join(format!("{}_{}", resource, self.pid));
    if !own.exists() {
      fs::write(&own, b"").with_context(|| format!("Failed to write lock marker {}", own.display()))?;
    }

    let mut blocking = Vec::new();
    let mut stale = Vec::new();
    for marker in self.list(resource)? {
      match marker.holder {
        Some(pid) if pid == self.pid => {}
        Some(pid) if self.probe.is_alive(pid) => blocking.push(marker),
        _ => stale.push(marker),
      }
    }

    if !blocking.is_empty() {
      match fs::remove_file(&own) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
          return Err(e).with_context(|| format!("Failed to remove lock marker {}", own.display()));
        }
      }
      return Ok(Acquire::Conflict(blocking));
    }

    for marker in stale {
      match fs::remove_file(&marker.path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
          return Err(e).with_context(|| format!("Failed to reclaim stale marker {}", marker.path.display()));
        }
      }
    }

    Ok(Acquire::Acquired(LockGuard {
      path: own,
      released: false,
    }))
  }

  /// Markers for `resource`, parsed from a `<resource>_*` glob. The glob is
  /// a prefix match, so results are filtered back to the exact resource name
  /// (resource names may themselves contain underscores).
  pub fn list(&self, resource: &str) -> KitResult<Vec<LockMarker>> {
    if !self.scratch_dir.is_dir() {
      return Ok(Vec::new());
    }
    let pattern = format!(
      "{}/{}_*",
      Pattern::escape(&self.scratch_dir.to_string_lossy()),
      Pattern::escape(resource)
    );

    let mut markers = Vec::new();
    for entry in glob::glob(&pattern)? {
      let marker = marker_from_path(entry?);
      if marker.resource == resource {
        markers.push(marker);
      }
    }
    Ok(markers)
  }

  /// Remove every marker held by this process
  pub fn sweep_own(&self) -> KitResult<usize> {
    Self::sweep(&self.scratch_dir, self.pid)
  }

  /// Remove every marker held by `pid`. An associated function so interrupt
  /// hooks can sweep without a lock instance.
  pub fn sweep(scratch_dir: &Path, pid: u32) -> KitResult<usize> {
    if !scratch_dir.is_dir() {
      return Ok(0);
    }
    let pattern = format!("{}/*_{}", Pattern::escape(&scratch_dir.to_string_lossy()), pid);

    let mut removed = 0;
    for entry in glob::glob(&pattern)? {
      let path = entry?;
      match fs::remove_file(&path) {
        Ok(()) => removed += 1,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
          return Err(e).with_context(|| format!("Failed to sweep marker {}", path.display()));
        }
      }
    }
    Ok(removed)
  }
}
