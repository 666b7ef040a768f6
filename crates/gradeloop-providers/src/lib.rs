//! gradeloop-providers — Grading oracle clients.
//!
//! Implements the `Oracle` trait for OpenAI-compatible chat-completions
//! endpoints (OpenAI itself and Ollama's compatibility API), plus a mock
//! oracle for tests and the config loader that picks between them.

pub mod config;
pub mod mock;
pub mod openai;

pub use config::{create_oracle, load_config, load_config_from, GradeloopConfig, ProviderConfig};
pub use gradeloop_core::error::OracleError;
