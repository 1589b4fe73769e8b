//! Data access layer for the task tracker bot.
//!
//! [`TaskRepository`] holds the operations; a [`Backend`] carries them to a
//! store. [`RestBackend`] talks to a PostgREST endpoint, [`MemoryBackend`]
//! keeps everything in process.

mod backend;
mod error;
mod memory;
mod query;
mod repository;
mod rest;

pub use backend::{Backend, PROJECTS, PROJECT_MEMBERS, TASKS, TASK_COMMENTS, TASK_STATUSES, USERS};
pub use error::StoreError;
pub use memory::MemoryBackend;
pub use query::{Direction, Filter, Query};
pub use repository::TaskRepository;
pub use rest::{RestBackend, DEFAULT_TIMEOUT};
