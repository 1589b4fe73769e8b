mod comment;
mod project;
mod task;
mod user;

pub use comment::*;
pub use project::*;
pub use task::*;
pub use user::*;

/// Display value used when a joined row cannot be resolved.
pub const UNKNOWN: &str = "Unknown";
