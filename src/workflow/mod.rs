//! Back-navigable sequential workflows
//!
//! A workflow is an ordered list of named steps run by a single cursor. Each
//! step receives the running result of the previous step and answers with a
//! [`Flow`]: advance with a new result, advance keeping the old one, navigate
//! backward, or recurse into a nested step list.
//!
//! # Core Invariants
//!
//! 1. **One cursor**: steps run strictly sequentially; there is no concurrent
//!    step execution and no terminal state other than advancing past the last
//!    step.
//! 2. **The running result is the only value channel**: steps share domain
//!    state exclusively through the context value the caller threads in.
//! 3. **Back targets resolve at jump time**: a step's `back_to` name is
//!    looked up when the step actually navigates backward, never cached. An
//!    unresolvable name falls back to the previous step. The cursor is
//!    floored at the first step.
//! 4. **Nested lists run fresh**: a recursed sub-workflow starts with an
//!    empty running result and its completion leaves the outer result
//!    untouched; backing out past its first step aborts the containing step.
//! 5. **Errors pass through**: the engine never catches step errors; a step
//!    resolves recoverable conditions into [`Flow::Back`] itself or lets the
//!    error end the run.

use crate::core::error::KitResult;

/// What a step tells the engine to do next
pub enum Flow<C, V> {
  /// Move to the next step; the value replaces the running result
  Advance(V),
  /// Move to the next step; the running result stays as it was
  Carry,
  /// Navigate backward (to the step's `back_to` target when set)
  Back,
  /// Run a nested list to completion before advancing
  Recurse(Vec<Step<C, V>>),
}

type StepAction<C, V> = Box<dyn FnMut(&mut C, Option<&V>) -> KitResult<Flow<C, V>>>;

/// A named workflow step
pub struct Step<C, V> {
  name: String,
  back_to: Option<String>,
  action: StepAction<C, V>,
}

impl<C, V> Step<C, V> {
  pub fn new<F>(name: impl Into<String>, action: F) -> Self
  where
    F: FnMut(&mut C, Option<&V>) -> KitResult<Flow<C, V>> + 'static,
  {
    Self {
      name: name.into(),
      back_to: None,
      action: Box::new(action),
    }
  }

  /// Name of the step this one returns to when it navigates backward
  pub fn back_to(mut self, target: impl Into<String>) -> Self {
    self.back_to = Some(target.into());
    self
  }
}

/// An ordered list of steps, run to completion by [`Workflow::run`]
pub struct Workflow<C, V> {
  steps: Vec<Step<C, V>>,
}

enum LevelOutcome<V> {
  Completed(Option<V>),
  Aborted,
}

enum BackStep {
  Jump(usize),
  OffFront,
}

impl<C, V> Workflow<C, V> {
  pub fn new(steps: Vec<Step<C, V>>) -> Self {
    Self { steps }
  }

  /// Run every step in order; completes when the cursor advances past the
  /// last step and returns the final running result.
  pub fn run(&mut self, ctx: &mut C) -> KitResult<Option<V>> {
    match run_level(&mut self.steps, ctx, true)? {
      LevelOutcome::Completed(result) => Ok(result),
      // The top level floors at the first step instead of aborting
      LevelOutcome::Aborted => Ok(None),
    }
  }
}

fn resolve_back<C, V>(steps: &[Step<C, V>], cursor: usize) -> BackStep {
  if let Some(name) = &steps[cursor].back_to
    && let Some(index) = steps.iter().position(|s| s.name == *name)
  {
    return BackStep::Jump(index);
  }
  match cursor.checked_sub(1) {
    Some(previous) => BackStep::Jump(previous),
    None => BackStep::OffFront,
  }
}

fn run_level<C, V>(steps: &mut [Step<C, V>], ctx: &mut C, top: bool) -> KitResult<LevelOutcome<V>> {
  let mut cursor = 0usize;
  let mut result: Option<V> = None;

  while cursor < steps.len() {
    let flow = (steps[cursor].action)(ctx, result.as_ref())?;
    match flow {
      Flow::Advance(value) => {
        result = Some(value);
        cursor += 1;
      }
      Flow::Carry => {
        cursor += 1;
      }
      Flow::Back => match resolve_back(steps, cursor) {
        BackStep::Jump(index) => cursor = index,
        BackStep::OffFront => {
          if top {
            cursor = 0;
          } else {
            return Ok(LevelOutcome::Aborted);
          }
        }
      },
      Flow::Recurse(mut sub_steps) => match run_level(&mut sub_steps, ctx, false)? {
        LevelOutcome::Completed(_) => {
          cursor += 1;
        }
        LevelOutcome::Aborted => match resolve_back(steps, cursor) {
          BackStep::Jump(index) => cursor = index,
          BackStep::OffFront => {
            if top {
              cursor = 0;
            } else {
              return Ok(LevelOutcome::Aborted);
            }
          }
        },
      },
    }
  }

  Ok(LevelOutcome::Completed(result))
}
