//! Test helpers for integration tests

use std::cell::Cell;
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use tempfile::TempDir;

use upkit::core::context::WorkspaceContext;
use upkit::core::error::KitResult;
use upkit::lock::ProcessProbe;
use upkit::session::ReleaseSession;
use upkit::train::{ReleaseTrain, TrainStore};
use upkit::ui::prompt::{InputCheck, Prompter};
use upkit::version::Version;

// Device menu indices for the helpers catalog (entries sort by key)
pub const DOORCAM: usize = 0;
pub const GATEWAY: usize = 1;
pub const SENSORHUB: usize = 2;

/// A test workspace with a device catalog and payload fixtures
pub struct TestWorkspace {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestWorkspace {
  /// Create a workspace whose catalog has one disabled and two enabled
  /// device types
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    fs::write(
      path.join("upkit.toml"),
      r#"[apps.edged]
[apps.fleetd]

[devices.doorcam]
type = "doorcam"
title = "Door camera"
disabled = true
init_version = "1.0.0"

[devices.gateway]
type = "gateway"
title = "Site gateway"

[devices.gateway.models.g1]
[devices.gateway.models.g2]

[devices.sensorhub]
type = "sensorhub"
title = "Sensor hub"
"#,
    )?;

    Ok(Self { _root: root, path })
  }

  pub fn context(&self) -> Result<WorkspaceContext> {
    Ok(WorkspaceContext::build(&self.path)?)
  }

  /// Drop a raw upgrade payload into `packages/<device>/raw/`
  pub fn add_payload(&self, device: &str, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let dir = self.path.join("packages").join(device).join("raw");
    fs::create_dir_all(&dir)?;
    let payload = dir.join(name);
    fs::write(&payload, bytes)?;
    Ok(payload)
  }

  pub fn packages_dir(&self) -> PathBuf {
    self.path.join("packages")
  }

  pub fn scratch_dir(&self) -> PathBuf {
    self.path.join("temp")
  }

  pub fn marker_path(&self, resource: &str, pid: u32) -> PathBuf {
    self.scratch_dir().join(format!("{resource}_{pid}"))
  }

  /// Check if a path relative to the workspace root exists
  pub fn file_exists(&self, path: &str) -> bool {
    self.path.join(path).exists()
  }
}

/// One scripted reply to a prompt
#[derive(Debug, Clone)]
pub enum Answer {
  /// Index for a `select`
  Pick(usize),
  /// Indices for a `multi_select`
  PickMany(Vec<usize>),
  /// Text for an `input`; empty takes the prompt's default like a terminal
  Line(String),
  /// Result of an `edit_text`
  Text(Option<String>),
}

/// Prompter that answers from a fixed script.
///
/// Panics with the offending prompt when the script runs dry or an answer
/// has the wrong shape, so a drifting step order fails loudly. An input
/// line the step's check rejects consumes the next scripted answer,
/// mirroring a terminal re-prompt.
pub struct ScriptedPrompter {
  answers: VecDeque<Answer>,
  pub transcript: Vec<String>,
}

impl ScriptedPrompter {
  pub fn new(answers: Vec<Answer>) -> Self {
    Self {
      answers: answers.into(),
      transcript: Vec::new(),
    }
  }

  fn next(&mut self, kind: &str, prompt: &str) -> Answer {
    self.transcript.push(prompt.to_string());
    match self.answers.pop_front() {
      Some(answer) => answer,
      None => panic!("prompter script exhausted at {kind} prompt: {prompt:?}"),
    }
  }
}

impl Prompter for ScriptedPrompter {
  fn select(&mut self, prompt: &str, items: &[String], _default: usize) -> KitResult<usize> {
    match self.next("select", prompt) {
      Answer::Pick(index) => {
        assert!(
          index < items.len(),
          "scripted pick {index} out of range for {prompt:?} ({} items: {items:?})",
          items.len()
        );
        Ok(index)
      }
      other => panic!("expected Pick for select prompt {prompt:?}, got {other:?}"),
    }
  }

  fn multi_select(&mut self, prompt: &str, items: &[String]) -> KitResult<Vec<usize>> {
    match self.next("multi-select", prompt) {
      Answer::PickMany(indices) => {
        for index in &indices {
          assert!(
            *index < items.len(),
            "scripted pick {index} out of range for {prompt:?} ({} items: {items:?})",
            items.len()
          );
        }
        Ok(indices)
      }
      other => panic!("expected PickMany for multi-select prompt {prompt:?}, got {other:?}"),
    }
  }

  fn input(&mut self, prompt: &str, default: Option<&str>, check: InputCheck) -> KitResult<String> {
    loop {
      let answer = self.next("input", prompt);
      let Answer::Line(text) = answer else {
        panic!("expected Line for input prompt {prompt:?}, got {answer:?}");
      };
      let effective = if text.is_empty() {
        default.unwrap_or("").to_string()
      } else {
        text
      };
      match check(&effective) {
        Ok(()) => return Ok(effective),
        Err(reason) => self.transcript.push(format!("(rejected: {reason})")),
      }
    }
  }

  fn edit_text(&mut self, _initial: &str) -> KitResult<Option<String>> {
    match self.next("editor", "$EDITOR") {
      Answer::Text(text) => Ok(text),
      other => panic!("expected Text for editor prompt, got {other:?}"),
    }
  }
}

/// Run one scripted session against the workspace with the system lock
pub fn run_scripted(ws: &TestWorkspace, answers: Vec<Answer>) -> Result<()> {
  let mut session = ReleaseSession::new(ws.context()?, ScriptedPrompter::new(answers));
  session.run()?;
  Ok(())
}

/// Load a device's persisted release train
pub fn load_train(ws: &TestWorkspace, device: &str) -> Result<ReleaseTrain> {
  let store = TrainStore::new(ws.packages_dir());
  Ok(store.load(device, &Version::parse("0.0.0")?)?)
}

/// Script tail that declines every optional field and accepts the summary:
/// description, the three compatibility picks, the remark, then the final
/// confirmation.
pub fn no_extras() -> Vec<Answer> {
  vec![
    Answer::Pick(0),
    Answer::Pick(0),
    Answer::Pick(0),
    Answer::Pick(0),
    Answer::Pick(0),
    Answer::Pick(0),
  ]
}

/// Probe that reports any pid alive for the first `n` checks, then dead.
/// Simulates a foreign marker holder that exits mid-session.
pub struct FadingProbe {
  remaining: Cell<usize>,
}

impl FadingProbe {
  pub fn new(alive_checks: usize) -> Self {
    Self {
      remaining: Cell::new(alive_checks),
    }
  }
}

impl ProcessProbe for FadingProbe {
  fn is_alive(&self, _pid: u32) -> bool {
    let left = self.remaining.get();
    if left > 0 {
      self.remaining.set(left - 1);
      return true;
    }
    false
  }
}
