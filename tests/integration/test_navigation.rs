//! Back navigation and lock handling across session steps

use std::fs;

use anyhow::Result;

use upkit::lock::ProcessLock;
use upkit::session::ReleaseSession;

use crate::helpers::{
  Answer, DOORCAM, FadingProbe, GATEWAY, SENSORHUB, ScriptedPrompter, TestWorkspace, load_train,
  no_extras, run_scripted,
};

const PAYLOAD: &[u8] = b"payload bytes";

#[test]
fn test_disabled_device_and_top_back_return_to_selection() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_payload("gateway", "fw.bin", PAYLOAD)?;

  // Going back at the first step floors there; a disabled pick bounces too
  let mut answers = vec![
    Answer::Pick(3),
    Answer::Pick(DOORCAM),
    Answer::Pick(GATEWAY),
    Answer::Pick(0),
    Answer::Pick(2),
    Answer::Line(String::new()),
    Answer::Pick(0),
  ];
  answers.extend(no_extras());
  run_scripted(&ws, answers)?;

  let train = load_train(&ws, "gateway")?;
  assert_eq!(train.records().len(), 2);
  // The disabled device was never entered, so nothing was seeded for it
  assert!(!ws.file_exists("packages/doorcam"));
  Ok(())
}

#[test]
fn test_empty_payload_dir_returns_to_device_selection() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_payload("sensorhub", "hub.bin", PAYLOAD)?;

  // The gateway has no raw payloads, so its payload step bounces the
  // operator back to device selection
  let mut answers = vec![
    Answer::Pick(GATEWAY),
    Answer::Pick(SENSORHUB),
    Answer::Pick(0),
    Answer::Pick(2),
    Answer::Line(String::new()),
    Answer::Pick(0),
  ];
  answers.extend(no_extras());
  run_scripted(&ws, answers)?;

  let hub = load_train(&ws, "sensorhub")?;
  assert_eq!(hub.records().len(), 2);
  assert_eq!(hub.records()[1].version, "0.0.1");

  // Visiting the gateway seeded its train but released nothing into it
  let gateway = load_train(&ws, "gateway")?;
  assert_eq!(gateway.records().len(), 1);
  assert_eq!(gateway.records()[0].version, "0.0.0");
  Ok(())
}

#[test]
fn test_payload_go_back_rewinds_to_device_selection() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_payload("gateway", "fw.bin", PAYLOAD)?;
  ws.add_payload("sensorhub", "hub.bin", PAYLOAD)?;

  let mut answers = vec![
    Answer::Pick(GATEWAY),
    Answer::Pick(1),
    Answer::Pick(SENSORHUB),
    Answer::Pick(0),
    Answer::Pick(2),
    Answer::Line(String::new()),
    Answer::Pick(0),
  ];
  answers.extend(no_extras());
  run_scripted(&ws, answers)?;

  assert_eq!(load_train(&ws, "sensorhub")?.records().len(), 2);
  assert_eq!(load_train(&ws, "gateway")?.records().len(), 1);
  Ok(())
}

#[test]
fn test_version_go_back_rewinds_to_payload_selection() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_payload("gateway", "fw.bin", PAYLOAD)?;

  let mut answers = vec![
    Answer::Pick(GATEWAY),
    Answer::Pick(0),
    Answer::Pick(3),
    Answer::Pick(0),
    Answer::Pick(2),
    Answer::Line(String::new()),
    Answer::Pick(0),
  ];
  answers.extend(no_extras());
  run_scripted(&ws, answers)?;

  let train = load_train(&ws, "gateway")?;
  assert_eq!(train.records().len(), 2);
  assert_eq!(train.records()[1].version, "0.0.1");
  Ok(())
}

#[test]
fn test_summary_go_back_revisits_the_remark() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_payload("gateway", "fw.bin", PAYLOAD)?;

  let answers = vec![
    Answer::Pick(GATEWAY),
    Answer::Pick(0),
    Answer::Pick(2),
    Answer::Line(String::new()),
    Answer::Pick(0),
    Answer::Pick(0),
    Answer::Pick(0),
    Answer::Pick(0),
    Answer::Pick(0),
    // First remark, then "Go back" from the summary replaces it
    Answer::Pick(1),
    Answer::Line("first".to_string()),
    Answer::Pick(1),
    Answer::Pick(1),
    Answer::Line("second".to_string()),
    Answer::Pick(0),
  ];
  run_scripted(&ws, answers)?;

  let train = load_train(&ws, "gateway")?;
  let kit = &train.records()[1];
  assert_eq!(kit.remarks, "second");
  assert!(kit.file_name.ends_with("_second.bin"));
  Ok(())
}

#[test]
fn test_lock_conflict_retry_after_holder_exits() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_payload("gateway", "fw.bin", PAYLOAD)?;

  // A foreign marker whose holder answers one liveness check, then dies
  fs::create_dir_all(ws.scratch_dir())?;
  fs::write(ws.marker_path("gateway", 4242), b"")?;
  let lock = ProcessLock::new(ws.scratch_dir(), 31337, Box::new(FadingProbe::new(1)));

  let mut answers = vec![
    Answer::Pick(GATEWAY),
    // Conflict menu: retry
    Answer::Pick(0),
    Answer::Pick(GATEWAY),
    Answer::Pick(0),
    Answer::Pick(2),
    Answer::Line(String::new()),
    Answer::Pick(0),
  ];
  answers.extend(no_extras());

  let mut session = ReleaseSession::with_lock(ws.context()?, ScriptedPrompter::new(answers), lock);
  session.run()?;

  // The stale marker was reclaimed on the retry, our own swept on exit
  assert!(!ws.marker_path("gateway", 4242).exists());
  assert!(!ws.marker_path("gateway", 31337).exists());
  assert_eq!(load_train(&ws, "gateway")?.records().len(), 2);
  Ok(())
}
