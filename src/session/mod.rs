//! The interactive release session
//!
//! Binds the workflow steps to the catalog, the process lock, the train
//! store, the prompt layer and the packer. One session prepares exactly one
//! kit. Every menu carries a way back; the lock for the chosen device type
//! is held from selection until the session leaves it or ends.

use std::path::{Path, PathBuf};
use std::process;

use glob::Pattern;

use crate::core::config::DeviceType;
use crate::core::context::WorkspaceContext;
use crate::core::error::{KitError, KitResult};
use crate::lock::{Acquire, LockGuard, ProcessLock};
use crate::pack::{Packer, digest_payload, kit_file_name, kit_stem};
use crate::train::{KitRecord, ReleaseTrain, TrainStore, date_stamp};
use crate::ui::prompt::Prompter;
use crate::version::{BumpPosition, Version, valid_token};
use crate::workflow::{Flow, Step, Workflow};

const GO_BACK: &str = "(go back)";
const TOKEN_RULE: &str = "Only letters, digits, hyphens and underscores are allowed";

/// One interactive run: select, version, describe, confirm, assemble
pub struct ReleaseSession<P> {
  ctx: WorkspaceContext,
  store: TrainStore,
  lock: ProcessLock,
  prompter: P,

  selected: Option<DeviceType>,
  guard: Option<LockGuard>,
  train: Option<ReleaseTrain>,
  payload: Option<PathBuf>,
  new_version: Option<Version>,
  description: String,
  compat_versions: Vec<String>,
  compat_models: Vec<String>,
  compat_apps: Vec<String>,
  remarks: String,
  stem: Option<String>,
  record: Option<KitRecord>,
  archive: Option<PathBuf>,
}

impl<P: Prompter + 'static> ReleaseSession<P> {
  pub fn new(ctx: WorkspaceContext, prompter: P) -> Self {
    let lock = ProcessLock::system(ctx.scratch_dir());
    Self::with_lock(ctx, prompter, lock)
  }

  /// Session with an explicit lock (tests inject pids and probes this way)
  pub fn with_lock(ctx: WorkspaceContext, prompter: P, lock: ProcessLock) -> Self {
    let store = TrainStore::new(ctx.packages_dir());
    Self {
      ctx,
      store,
      lock,
      prompter,
      selected: None,
      guard: None,
      train: None,
      payload: None,
      new_version: None,
      description: String::new(),
      compat_versions: Vec::new(),
      compat_models: Vec::new(),
      compat_apps: Vec::new(),
      remarks: String::new(),
      stem: None,
      record: None,
      archive: None,
    }
  }

  /// Walk the operator through one kit, sweeping this process's markers on
  /// the way out whether the run completed or failed.
  pub fn run(&mut self) -> KitResult<()> {
    let result = Workflow::new(Self::steps()).run(self);
    self.guard = None;
    let _ = self.lock.sweep_own();
    result.map(|_| ())
  }

  fn steps() -> Vec<Step<Self, ()>> {
    vec![
      Step::new("select-device", |s: &mut Self, _| s.select_device()),
      Step::new("show-version", |s: &mut Self, _| s.show_version()),
      Step::new("select-payload", |s: &mut Self, _| s.select_payload()).back_to("select-device"),
      Step::new("choose-version", |s: &mut Self, _| s.choose_version()),
      Step::new("edit-description", |s: &mut Self, _| s.edit_description()),
      Step::new("pick-compat-versions", |s: &mut Self, _| s.pick_compat_versions()),
      Step::new("pick-compat-models", |s: &mut Self, _| s.pick_compat_models()),
      Step::new("pick-compat-apps", |s: &mut Self, _| s.pick_compat_apps()),
      Step::new("edit-remarks", |s: &mut Self, _| s.edit_remarks()),
      Step::new("confirm", |s: &mut Self, _| s.confirm()),
      Step::new("build-kit", |s: &mut Self, _| s.build_kit()),
    ]
  }

  fn select_device(&mut self) -> KitResult<Flow<Self, ()>> {
    // Re-entering releases any hold from a previous pass
    if let Some(guard) = self.guard.take() {
      guard.release()?;
    }
    self.selected = None;

    let devices = self.ctx.catalog.devices.clone();
    let mut items: Vec<String> = devices
      .iter()
      .map(|device| {
        if device.disabled {
          format!("{} [disabled]", device.label())
        } else {
          device.label()
        }
      })
      .collect();
    items.push(GO_BACK.to_string());

    let choice = self.prompter.select("Select a device type", &items, 0)?;
    if choice == devices.len() {
      return Ok(Flow::Back);
    }
    let device = devices[choice].clone();
    if device.disabled {
      println!("⚠️ {} is disabled and cannot be selected\n", device.title);
      return Ok(Flow::Back);
    }

    match self.lock.acquire(&device.type_id)? {
      Acquire::Acquired(guard) => {
        println!("✅ Selected device type: {}\n", device.title);
        self.guard = Some(guard);
        self.selected = Some(device);
        Ok(Flow::Carry)
      }
      Acquire::Conflict(blocking) => {
        let holders: Vec<String> = blocking
          .iter()
          .filter_map(|marker| marker.holder.map(|pid| pid.to_string()))
          .collect();
        println!(
          "⚠️ {} kits are being managed by another operator (pid {})",
          device.title,
          holders.join(", ")
        );
        let options = vec!["Retry".to_string(), "Exit".to_string()];
        if self.prompter.select("What now?", &options, 0)? == 1 {
          self.lock.sweep_own()?;
          println!("\n👋 Bye");
          process::exit(0);
        }
        Ok(Flow::Back)
      }
    }
  }

  fn show_version(&mut self) -> KitResult<Flow<Self, ()>> {
    let device = self.device()?;
    let train = self.store.load(&device.type_id, &device.init_version)?;
    println!("📦 {} current version: {}\n", device.title, train.current_version()?);
    self.train = Some(train);
    Ok(Flow::Carry)
  }

  fn select_payload(&mut self) -> KitResult<Flow<Self, ()>> {
    let device = self.device()?;
    let dir = self.ctx.raw_payload_dir(&device.type_id);
    let names = list_payload_files(&dir)?;
    if names.is_empty() {
      // Resolved as navigation: this step returns to device selection
      println!("⚠️ No upgrade files available under {}\n", dir.display());
      return Ok(Flow::Back);
    }

    let mut items = names.clone();
    items.push(GO_BACK.to_string());
    let choice = self.prompter.select("Select an upgrade file", &items, 0)?;
    if choice == names.len() {
      return Ok(Flow::Back);
    }
    println!("✅ Selected upgrade file: {}\n", names[choice]);
    self.payload = Some(dir.join(&names[choice]));
    Ok(Flow::Carry)
  }

  fn choose_version(&mut self) -> KitResult<Flow<Self, ()>> {
    let device = self.device()?;
    let current = self.train()?.current_version()?;

    let mut items = vec![
      "Major version".to_string(),
      "Minor version".to_string(),
      "Patch version".to_string(),
    ];
    // Pre-releases only make sense once a real version exists
    let offer_pre = current != device.init_version;
    if offer_pre {
      items.push("Pre-release".to_string());
    }
    items.push(GO_BACK.to_string());

    let choice = self.prompter.select("Select the version bump", &items, 0)?;
    if choice + 1 == items.len() {
      return Ok(Flow::Back);
    }

    let new_version = if offer_pre && choice == 3 {
      match self.prompt_pre_release(&current)? {
        Some(version) => version,
        None => return Ok(Flow::Back),
      }
    } else {
      let bumped = current.increment(BumpPosition::from_index(choice)?, false);
      let token = self.prompt_bump_token()?;
      if token.is_empty() {
        bumped
      } else {
        bumped.with_pre_release(&token)?
      }
    };

    let confirm_items = vec![
      format!("New version: {}", new_version),
      "No, start over".to_string(),
      GO_BACK.to_string(),
    ];
    match self.prompter.select("Confirm the version", &confirm_items, 0)? {
      0 => {
        println!("✅ Confirmed new version: {}\n", new_version);
        self.new_version = Some(new_version);
        Ok(Flow::Carry)
      }
      1 => Ok(Flow::Recurse(vec![Step::new("choose-version", |s: &mut Self, _| {
        s.choose_version()
      })])),
      _ => Ok(Flow::Back),
    }
  }

  /// Pre-release mode: re-cut the current core with a fresh token, showing
  /// the core's existing pre-releases as reference. `None` means the
  /// operator backed out.
  fn prompt_pre_release(&mut self, current: &Version) -> KitResult<Option<Version>> {
    let references: Vec<(String, String, String)> = self
      .train()?
      .latest_run(true)?
      .iter()
      .map(|record| (record.version.clone(), record.date.clone(), record.description.clone()))
      .collect();

    let mut default_token: Option<String> = None;
    if references.is_empty() {
      println!("⚠️ The current version has no pre-releases yet");
    } else {
      let mut items = vec![GO_BACK.to_string()];
      items.extend(
        references
          .iter()
          .map(|(version, date, description)| reference_label(version, date, description)),
      );
      let pick = self
        .prompter
        .select("Existing pre-releases of the current version (pick one to reuse its token)", &items, 1)?;
      if pick == 0 {
        return Ok(None);
      }
      let reference = Version::parse(&references[pick - 1].0)?;
      default_token = reference.pre_release().map(str::to_string);
    }

    let finalizable = current.is_pre_release();
    let check = move |line: &str| -> Result<(), String> {
      if line.is_empty() {
        if finalizable {
          Ok(())
        } else {
          Err("The current version has no pre-release to finalize; enter a token".to_string())
        }
      } else if valid_token(line) {
        Ok(())
      } else {
        Err(TOKEN_RULE.to_string())
      }
    };
    let token = self.prompter.input(
      "Pre-release token (empty finalizes the current version)",
      default_token.as_deref(),
      &check,
    )?;

    let version = if token.is_empty() {
      current.without_pre_release()
    } else {
      current.with_pre_release(&token)?
    };
    Ok(Some(version))
  }

  fn prompt_bump_token(&mut self) -> KitResult<String> {
    let check = |line: &str| -> Result<(), String> {
      if line.is_empty() || valid_token(line) {
        Ok(())
      } else {
        Err(TOKEN_RULE.to_string())
      }
    };
    self
      .prompter
      .input("Pre-release token (empty to skip)", None, &check)
  }

  fn edit_description(&mut self) -> KitResult<Flow<Self, ()>> {
    self.description.clear();
    let items = yes_no_back("Not needed", "Write one");
    match self.prompter.select("Add a release description?", &items, 0)? {
      0 => Ok(Flow::Carry),
      1 => {
        if let Some(text) = self.prompter.edit_text("")? {
          self.description = text;
        }
        Ok(Flow::Carry)
      }
      _ => Ok(Flow::Back),
    }
  }

  fn pick_compat_versions(&mut self) -> KitResult<Flow<Self, ()>> {
    self.compat_versions.clear();
    let options: Vec<String> = self
      .train()?
      .records()
      .iter()
      .map(|record| record.version.clone())
      .collect();
    match self.pick_compat("compatible versions", options)? {
      Some(picked) => {
        self.compat_versions = picked;
        Ok(Flow::Carry)
      }
      None => Ok(Flow::Back),
    }
  }

  fn pick_compat_models(&mut self) -> KitResult<Flow<Self, ()>> {
    self.compat_models.clear();
    let options = self.device()?.models;
    match self.pick_compat("compatible models", options)? {
      Some(picked) => {
        self.compat_models = picked;
        Ok(Flow::Carry)
      }
      None => Ok(Flow::Back),
    }
  }

  fn pick_compat_apps(&mut self) -> KitResult<Flow<Self, ()>> {
    self.compat_apps.clear();
    let options = self.ctx.catalog.apps.clone();
    match self.pick_compat("compatible apps", options)? {
      Some(picked) => {
        self.compat_apps = picked;
        Ok(Flow::Carry)
      }
      None => Ok(Flow::Back),
    }
  }

  /// Shared yes/no/multi-select shape of the three compatibility steps.
  /// `None` means the operator navigated back; an empty pick means "all".
  fn pick_compat(&mut self, what: &str, options: Vec<String>) -> KitResult<Option<Vec<String>>> {
    let items = yes_no_back("Not needed", "Pick from the list");
    match self.prompter.select(&format!("Restrict {what}?"), &items, 0)? {
      0 => Ok(Some(Vec::new())),
      1 => {
        let mut menu = options.clone();
        menu.push(format!("{GO_BACK} (checking this discards the selection)"));
        let picked = self.prompter.multi_select(&format!("Select {what}"), &menu)?;
        if picked.contains(&options.len()) {
          return Ok(None);
        }
        Ok(Some(picked.into_iter().map(|index| options[index].clone()).collect()))
      }
      _ => Ok(None),
    }
  }

  fn edit_remarks(&mut self) -> KitResult<Flow<Self, ()>> {
    self.remarks.clear();
    let items = yes_no_back("Not needed", "Add one");
    match self
      .prompter
      .select("Append a remark to the kit file name?", &items, 0)?
    {
      0 => Ok(Flow::Carry),
      1 => {
        let check = |line: &str| -> Result<(), String> {
          if line.is_empty() || valid_token(line) {
            Ok(())
          } else {
            Err(TOKEN_RULE.to_string())
          }
        };
        self.remarks = self.prompter.input("Remark (empty to skip)", None, &check)?;
        Ok(Flow::Carry)
      }
      _ => Ok(Flow::Back),
    }
  }

  fn confirm(&mut self) -> KitResult<Flow<Self, ()>> {
    let device = self.device()?;
    let payload = self.payload()?;
    let version = self.version()?;

    println!();
    println!("📦 Device type:         {}", device.title);
    println!("📦 Upgrade file:        {}", payload.display());
    println!("📦 New version:         {}", version);
    println!("📦 Description:         {}", text_or(&self.description, "(none)"));
    println!("📦 Compatible versions: {}", list_or(&self.compat_versions, "(all versions)"));
    println!("📦 Compatible models:   {}", list_or(&self.compat_models, "(all models)"));
    println!("📦 Compatible apps:     {}", list_or(&self.compat_apps, "(all apps)"));
    println!("📦 Remark:              {}", text_or(&self.remarks, "(none)"));
    println!();

    let items = vec!["Looks right".to_string(), "Go back".to_string()];
    match self.prompter.select("Is everything correct?", &items, 0)? {
      0 => Ok(Flow::Carry),
      _ => Ok(Flow::Back),
    }
  }

  fn build_kit(&mut self) -> KitResult<Flow<Self, ()>> {
    Ok(Flow::Recurse(vec![
      Step::new("compose-record", |s: &mut Self, _| s.compose_record()),
      Step::new("write-archive", |s: &mut Self, _| s.write_archive()),
      Step::new("record-release", |s: &mut Self, _| s.record_release()),
    ]))
  }

  fn compose_record(&mut self) -> KitResult<Flow<Self, ()>> {
    let device = self.device()?;
    let payload = self.payload()?;
    let version = self.version()?;

    let digest = digest_payload(&payload)?;
    let date = date_stamp();
    let stem = kit_stem(&device.type_id, &version, &date, &self.remarks);
    let file_name = kit_file_name(&stem, &payload);

    self.record = Some(KitRecord {
      device: device.type_id.clone(),
      version: version.to_string(),
      date,
      description: self.description.clone(),
      updated_at: None,
      versions: self.compat_versions.clone(),
      models: self.compat_models.clone(),
      apps: self.compat_apps.clone(),
      file_name,
      file_size: digest.size,
      sha256: digest.sha256,
      remarks: self.remarks.clone(),
    });
    self.stem = Some(stem);
    Ok(Flow::Carry)
  }

  fn write_archive(&mut self) -> KitResult<Flow<Self, ()>> {
    let device = self.device()?;
    let payload = self.payload()?;
    let record = self.record()?;
    let stem = match &self.stem {
      Some(stem) => stem.clone(),
      None => return Err(missing_state("kit name")),
    };

    let packer = Packer::new(self.ctx.device_dir(&device.type_id));
    self.archive = Some(packer.write_archive(&stem, &record, &payload)?);
    Ok(Flow::Carry)
  }

  fn record_release(&mut self) -> KitResult<Flow<Self, ()>> {
    let record = self.record()?;
    match self.train.as_mut() {
      Some(train) => train.append(record),
      None => return Err(missing_state("release train")),
    }
    if let Some(train) = self.train.as_ref() {
      self.store.save(train)?;
    }
    if let Some(archive) = &self.archive {
      println!("✅ Kit assembled: {}\n", archive.display());
    }
    Ok(Flow::Carry)
  }

  // Accessors for state earlier steps are responsible for having set.

  fn device(&self) -> KitResult<DeviceType> {
    self.selected.clone().ok_or_else(|| missing_state("device type"))
  }

  fn train(&self) -> KitResult<&ReleaseTrain> {
    self.train.as_ref().ok_or_else(|| missing_state("release train"))
  }

  fn payload(&self) -> KitResult<PathBuf> {
    self.payload.clone().ok_or_else(|| missing_state("upgrade file"))
  }

  fn version(&self) -> KitResult<Version> {
    self.new_version.clone().ok_or_else(|| missing_state("new version"))
  }

  fn record(&self) -> KitResult<KitRecord> {
    self.record.clone().ok_or_else(|| missing_state("kit record"))
  }
}

fn missing_state(what: &str) -> KitError {
  KitError::message(format!("Session state out of order: no {what} has been chosen"))
}

fn yes_no_back(no: &str, yes: &str) -> Vec<String> {
  vec![no.to_string(), yes.to_string(), GO_BACK.to_string()]
}

/// Menu line for one prior pre-release: version, date, first line of the
/// description cut to 30 characters.
fn reference_label(version: &str, date: &str, description: &str) -> String {
  let line = description.lines().next().unwrap_or("");
  let note = if line.is_empty() {
    "(no description)".to_string()
  } else {
    let mut note: String = line.chars().take(30).collect();
    if line.chars().count() > 30 {
      note.push_str("...");
    }
    note
  };
  format!("{version}; released {date}; {note}")
}

fn text_or(text: &str, fallback: &str) -> String {
  if text.is_empty() {
    fallback.to_string()
  } else {
    text.to_string()
  }
}

fn list_or(items: &[String], fallback: &str) -> String {
  if items.is_empty() {
    fallback.to_string()
  } else {
    items.join(", ")
  }
}

/// File names under the raw payload directory, sorted
fn list_payload_files(dir: &Path) -> KitResult<Vec<String>> {
  if !dir.is_dir() {
    return Ok(Vec::new());
  }
  let pattern = format!("{}/*", Pattern::escape(&dir.to_string_lossy()));
  let mut names = Vec::new();
  for entry in glob::glob(&pattern)? {
    let path = entry?;
    if path.is_file()
      && let Some(name) = path.file_name().and_then(|n| n.to_str())
    {
      names.push(name.to_string());
    }
  }
  names.sort();
  Ok(names)
}
