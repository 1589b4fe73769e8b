mod projects;
mod tasks;
mod users;
mod webapp;

pub use projects::*;
pub use tasks::*;
pub use users::*;
pub use webapp::*;
