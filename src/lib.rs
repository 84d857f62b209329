//! Worktime - a command-line time tracker for hierarchical projects
//!
//! This library provides the core functionality for Worktime, including:
//! - Database operations and migrations
//! - Project tree building, path resolution and fuzzy suggestions
//! - Work records and the rules keeping them from overlapping
//! - Reporting windows and per-project statistics
//! - Time, offset and duration expressions
//! - CLI option interpretation, completion and command execution
//!
//! # Example
//!
//! ```no_run
//! use worktime::cli::run;
//!
//! fn main() {
//!     if let Err(e) = run() {
//!         eprintln!("Internal error: {}", e);
//!         std::process::exit(2);
//!     }
//! }
//! ```

pub mod cli;
pub mod config;
pub mod db;
pub mod hierarchy;
pub mod models;
pub mod overlap;
pub mod repo;
pub mod report;
pub mod utils;
