// Core data models for Worktime
// These structs represent the persisted entities

pub mod project;
pub mod record;
pub mod todo;

pub use project::*;
pub use record::*;
pub use todo::*;
