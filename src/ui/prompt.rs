//! Operator prompts behind a trait
//!
//! The session only talks to `Prompter`, so tests can script answers while
//! the binary wires in the dialoguer-backed `TerminalPrompter`. Menu
//! affordances like "go back" entries are composed by the caller; this layer
//! just asks.

use dialoguer::{Editor, Input, MultiSelect, Select};

use crate::core::error::KitResult;

/// Validation callback for line input: `Ok(())` accepts, `Err(msg)` re-prompts.
pub type InputCheck<'a> = &'a dyn Fn(&str) -> Result<(), String>;

/// How the session asks the operator questions
pub trait Prompter {
  /// Pick one item; returns its index
  fn select(&mut self, prompt: &str, items: &[String], default: usize) -> KitResult<usize>;

  /// Pick any number of items; returns their indices
  fn multi_select(&mut self, prompt: &str, items: &[String]) -> KitResult<Vec<usize>>;

  /// Read a line; empty input yields the default when one is given
  fn input(&mut self, prompt: &str, default: Option<&str>, check: InputCheck) -> KitResult<String>;

  /// Open `$EDITOR`; `None` means the operator closed without saving
  fn edit_text(&mut self, initial: &str) -> KitResult<Option<String>>;
}

/// Interactive terminal prompter
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
  pub fn new() -> Self {
    Self
  }
}

impl Prompter for TerminalPrompter {
  fn select(&mut self, prompt: &str, items: &[String], default: usize) -> KitResult<usize> {
    let index = Select::new()
      .with_prompt(prompt)
      .items(items)
      .default(default)
      .interact()?;
    Ok(index)
  }

  fn multi_select(&mut self, prompt: &str, items: &[String]) -> KitResult<Vec<usize>> {
    let indices = MultiSelect::new().with_prompt(prompt).items(items).interact()?;
    Ok(indices)
  }

  fn input(&mut self, prompt: &str, default: Option<&str>, check: InputCheck) -> KitResult<String> {
    let mut builder = Input::<String>::new().with_prompt(prompt).allow_empty(true);
    if let Some(value) = default {
      builder = builder.default(value.to_string());
    }
    let text = builder.validate_with(|line: &String| check(line)).interact_text()?;
    Ok(text)
  }

  fn edit_text(&mut self, initial: &str) -> KitResult<Option<String>> {
    let edited = Editor::new().edit(initial)?;
    Ok(edited)
  }
}
