// upkit library - exposes the session components for testing and integration

pub mod core;
pub mod lock;
pub mod pack;
pub mod session;
pub mod train;
pub mod ui;
pub mod version;
pub mod workflow;

// Re-export key types for easy access
pub use crate::core::config::{Catalog, DeviceType};
pub use crate::core::context::WorkspaceContext;
pub use crate::core::error::{KitError, KitResult, print_error};
pub use crate::lock::{Acquire, LockGuard, ProcessLock, ProcessProbe};
pub use crate::session::ReleaseSession;
pub use crate::train::{KitRecord, ReleaseTrain, TrainStore};
pub use crate::ui::prompt::{Prompter, TerminalPrompter};
pub use crate::version::{BumpPosition, Version};
pub use crate::workflow::{Flow, Step, Workflow};
