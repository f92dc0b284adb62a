//! colord Common - Shared types, errors, and configuration

pub mod config;
pub mod error;
pub mod types;

pub use config::{ClusterConfig, EvaluationMethod, EvaluationParams};
pub use error::{ColordError, Result};
pub use types::{Column, EvaluationResult};
