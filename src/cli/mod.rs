/// Unwrap a validation result, or return it from the handler as a failed
/// outcome
macro_rules! or_fail {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(e) => return Ok($crate::cli::outcome::CommandOutcome::failure(e)),
        }
    };
}

pub mod commands;
pub mod commands_projects;
pub mod commands_records;
pub mod commands_todos;
pub mod error;
pub mod options;
pub mod outcome;
pub mod output;

pub use commands::*;
pub use options::*;
pub use outcome::*;
pub use output::*;
pub use error::*;
