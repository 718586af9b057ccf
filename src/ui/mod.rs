//! Terminal concerns: prompts and progress indicators
//!
//! - **prompt**: the `Prompter` trait the session asks questions through,
//!   plus its dialoguer-backed terminal implementation
//! - **progress**: byte-oriented progress bars for digest and archive passes

pub mod progress;
pub mod prompt;

pub use progress::ByteProgress;
pub use prompt::{Prompter, TerminalPrompter};
