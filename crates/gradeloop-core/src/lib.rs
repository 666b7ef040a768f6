//! gradeloop-core — Practice sessions, grading orchestration, and mastery scoring.
//!
//! This crate defines the data model, the persistence and oracle seams, and
//! the asynchronous machinery that grades submitted answers in the background
//! while a practice session is running.

pub mod bank_file;
pub mod barrier;
pub mod error;
pub mod extract;
pub mod grader;
pub mod mastery;
pub mod model;
pub mod orchestrator;
pub mod prompt;
pub mod report;
pub mod service;
pub mod session;
pub mod store;
pub mod traits;

#[cfg(test)]
mod testing;
