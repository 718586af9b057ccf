//! End-to-end release sessions driven by a scripted prompter

use std::fs::File;
use std::io::Read;

use anyhow::Result;
use sha2::{Digest, Sha256};
use tempfile::TempDir;

use upkit::core::error::{CatalogError, KitError};
use upkit::{KitRecord, ReleaseTrain, TrainStore, Version, WorkspaceContext};

use crate::helpers::{Answer, GATEWAY, TestWorkspace, load_train, no_extras, run_scripted};

const PAYLOAD: &[u8] = b"gateway firmware image v1";

/// Seed a gateway train with one placeholder-style record per version
fn seed_history(ws: &TestWorkspace, versions: &[&str]) -> Result<()> {
  let mut records = Vec::new();
  for version in versions {
    let mut record = KitRecord::seed("gateway", &Version::parse(version)?);
    record.description = format!("cut {version}");
    records.push(record);
  }
  let train = ReleaseTrain::new("gateway", records);
  TrainStore::new(ws.packages_dir()).save(&train)?;
  Ok(())
}

#[test]
fn test_first_release_bumps_patch_and_writes_kit() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_payload("gateway", "firmware.bin", PAYLOAD)?;

  // Device, payload, patch bump without a token, accept the version,
  // decline every extra, confirm.
  let mut answers = vec![
    Answer::Pick(GATEWAY),
    Answer::Pick(0),
    Answer::Pick(2),
    Answer::Line(String::new()),
    Answer::Pick(0),
  ];
  answers.extend(no_extras());
  run_scripted(&ws, answers)?;

  // Exactly one record appended after the placeholder
  let train = load_train(&ws, "gateway")?;
  assert_eq!(train.records().len(), 2);
  assert_eq!(train.records()[0].version, "0.0.0");

  let kit = &train.records()[1];
  assert_eq!(kit.device, "gateway");
  assert_eq!(kit.version, "0.0.1");
  assert_eq!(kit.updated_at, None);
  assert!(kit.description.is_empty());
  assert!(kit.versions.is_empty());
  assert!(kit.models.is_empty());
  assert!(kit.apps.is_empty());
  assert!(kit.remarks.is_empty());
  assert!(kit.file_name.starts_with("gateway_0.0.1_"));
  assert!(kit.file_name.ends_with(".bin"));
  assert_eq!(kit.file_size, PAYLOAD.len() as u64);

  let mut hasher = Sha256::new();
  hasher.update(PAYLOAD);
  assert_eq!(kit.sha256, format!("{:x}", hasher.finalize()));

  // The archive sits next to the train, named after the kit
  let stem = kit.file_name.strip_suffix(".bin").unwrap();
  let archive_path = ws.packages_dir().join("gateway").join(format!("{stem}.zip"));
  assert!(archive_path.exists());

  let mut archive = zip::ZipArchive::new(File::open(&archive_path)?)?;
  let mut manifest = String::new();
  archive.by_name("info.json")?.read_to_string(&mut manifest)?;
  let packed: KitRecord = serde_json::from_str(&manifest)?;
  assert_eq!(&packed, kit);

  let mut stored = Vec::new();
  archive.by_name(&kit.file_name)?.read_to_end(&mut stored)?;
  assert_eq!(stored, PAYLOAD);

  // Lock markers are swept on the way out
  assert!(!ws.marker_path("gateway", std::process::id()).exists());
  Ok(())
}

#[test]
fn test_second_release_continues_from_persisted_train() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_payload("gateway", "firmware.bin", PAYLOAD)?;

  let mut first = vec![
    Answer::Pick(GATEWAY),
    Answer::Pick(0),
    Answer::Pick(2),
    Answer::Line(String::new()),
    Answer::Pick(0),
  ];
  first.extend(no_extras());
  run_scripted(&ws, first)?;

  // A fresh session reads 0.0.1 back; a minor bump makes 0.1.0
  let mut second = vec![
    Answer::Pick(GATEWAY),
    Answer::Pick(0),
    Answer::Pick(1),
    Answer::Line(String::new()),
    Answer::Pick(0),
  ];
  second.extend(no_extras());
  run_scripted(&ws, second)?;

  let train = load_train(&ws, "gateway")?;
  assert_eq!(train.records().len(), 3);
  assert_eq!(train.records()[2].version, "0.1.0");
  Ok(())
}

#[test]
fn test_full_metadata_flows_into_record_and_file_name() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_payload("gateway", "fw.img", PAYLOAD)?;

  let answers = vec![
    Answer::Pick(GATEWAY),
    Answer::Pick(0),
    Answer::Pick(2),
    Answer::Line(String::new()),
    Answer::Pick(0),
    // Description via the editor
    Answer::Pick(1),
    Answer::Text(Some("Adds local control plane\nAlso fixes watchdog".to_string())),
    // Restrict versions, then discard that by checking the go-back entry
    // of the models menu, which rewinds to the versions step
    Answer::Pick(1),
    Answer::PickMany(vec![0]),
    Answer::Pick(1),
    Answer::PickMany(vec![2]),
    // Second pass: skip versions, pick both models, one app, a remark
    Answer::Pick(0),
    Answer::Pick(1),
    Answer::PickMany(vec![0, 1]),
    Answer::Pick(1),
    Answer::PickMany(vec![1]),
    Answer::Pick(1),
    Answer::Line("hotfix".to_string()),
    Answer::Pick(0),
  ];
  run_scripted(&ws, answers)?;

  let train = load_train(&ws, "gateway")?;
  let kit = &train.records()[1];
  assert_eq!(kit.description, "Adds local control plane\nAlso fixes watchdog");
  assert!(kit.versions.is_empty());
  assert_eq!(kit.models, vec!["g1".to_string(), "g2".to_string()]);
  assert_eq!(kit.apps, vec!["fleetd".to_string()]);
  assert_eq!(kit.remarks, "hotfix");
  assert!(kit.file_name.starts_with("gateway_0.0.1_"));
  assert!(kit.file_name.ends_with("_hotfix.img"));

  let stem = kit.file_name.strip_suffix(".img").unwrap();
  assert!(ws.packages_dir().join("gateway").join(format!("{stem}.zip")).exists());
  Ok(())
}

#[test]
fn test_pre_release_reuses_reference_token() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_payload("gateway", "firmware.bin", PAYLOAD)?;
  seed_history(&ws, &["0.9.0", "1.0.0", "1.0.0-a", "1.0.0-b"])?;

  let mut answers = vec![
    Answer::Pick(GATEWAY),
    Answer::Pick(0),
    // Pre-release mode; pick the newest reference (its token becomes the
    // default), then type a fresh one over it
    Answer::Pick(3),
    Answer::Pick(1),
    Answer::Line("rc1".to_string()),
    Answer::Pick(0),
  ];
  answers.extend(no_extras());
  run_scripted(&ws, answers)?;

  let train = load_train(&ws, "gateway")?;
  assert_eq!(train.records().len(), 5);
  let kit = &train.records()[4];
  assert_eq!(kit.version, "1.0.0-rc1");
  assert!(kit.file_name.starts_with("gateway_1.0.0-rc1_"));
  Ok(())
}

#[test]
fn test_finalize_requires_an_existing_pre_release() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_payload("gateway", "firmware.bin", PAYLOAD)?;
  seed_history(&ws, &["0.9.0", "1.0.0"])?;

  // 1.0.0 carries no token, so the empty line is rejected and the prompt
  // re-asks; the second line goes through.
  let mut answers = vec![
    Answer::Pick(GATEWAY),
    Answer::Pick(0),
    Answer::Pick(3),
    Answer::Line(String::new()),
    Answer::Line("beta-1".to_string()),
    Answer::Pick(0),
  ];
  answers.extend(no_extras());
  run_scripted(&ws, answers)?;

  let train = load_train(&ws, "gateway")?;
  assert_eq!(train.records().len(), 3);
  assert_eq!(train.records()[2].version, "1.0.0-beta-1");
  Ok(())
}

#[test]
fn test_version_redo_starts_the_choice_over() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_payload("gateway", "firmware.bin", PAYLOAD)?;

  // Patch picked first, then "No, start over" re-runs the choice as a
  // sub-workflow; the minor bump from the redo wins
  let mut answers = vec![
    Answer::Pick(GATEWAY),
    Answer::Pick(0),
    Answer::Pick(2),
    Answer::Line(String::new()),
    Answer::Pick(1),
    Answer::Pick(1),
    Answer::Line(String::new()),
    Answer::Pick(0),
  ];
  answers.extend(no_extras());
  run_scripted(&ws, answers)?;

  let train = load_train(&ws, "gateway")?;
  assert_eq!(train.records().len(), 2);
  assert_eq!(train.records()[1].version, "0.1.0");
  Ok(())
}

#[test]
fn test_missing_catalog_fails_before_any_workflow() -> Result<()> {
  let dir = TempDir::new()?;
  let err = WorkspaceContext::build(dir.path()).unwrap_err();
  assert!(matches!(err, KitError::Catalog(CatalogError::NotFound { .. })));
  Ok(())
}

#[test]
fn test_invalid_catalog_fails_before_any_workflow() -> Result<()> {
  let dir = TempDir::new()?;
  std::fs::write(
    dir.path().join("upkit.toml"),
    "[devices.gateway]\ntitle = \"Site gateway\"\n",
  )?;
  let err = WorkspaceContext::build(dir.path()).unwrap_err();
  assert!(matches!(
    err,
    KitError::Catalog(CatalogError::MissingType { ref entry }) if entry == "gateway"
  ));
  Ok(())
}
