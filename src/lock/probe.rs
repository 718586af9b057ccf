//! Process liveness probing
//!
//! Reclaiming a lock marker requires knowing whether its holder still runs.
//! The check must treat "process exists but is not ours to signal" as alive:
//! only a definite not-found verdict makes a marker stale.

use std::path::Path;

/// Liveness oracle for lock-marker holders
pub trait ProcessProbe {
  /// True iff the process is running or cannot be ruled out
  fn is_alive(&self, pid: u32) -> bool;
}

/// Probe backed by the operating system
///
/// Prefers `/proc/<pid>` where procfs exists, otherwise falls back to a
/// signal-0 probe through the system `kill` utility.
#[derive(Debug, Default)]
pub struct SystemProbe;

impl SystemProbe {
  pub fn new() -> Self {
    Self
  }
}

impl ProcessProbe for SystemProbe {
  fn is_alive(&self, pid: u32) -> bool {
    if Path::new("/proc").is_dir() {
      return Path::new(&format!("/proc/{}", pid)).exists();
    }
    signal_probe(pid)
  }
}

#[cfg(unix)]
fn signal_probe(pid: u32) -> bool {
  use std::process::Command;

  match Command::new("kill").arg("-0").arg(pid.to_string()).output() {
    Ok(output) => {
      if output.status.success() {
        return true;
      }
      // Unsignalable still means the pid is taken
      let stderr = String::from_utf8_lossy(&output.stderr).to_lowercase();
      stderr.contains("not permitted") || stderr.contains("denied")
    }
    // Probe failure cannot rule the process out
    Err(_) => true,
  }
}

#[cfg(not(unix))]
fn signal_probe(_pid: u32) -> bool {
  true
}
