//! Core domain models for the quality gate
//!
//! This module defines the fundamental data structures that represent
//! pipelines, steps, run modes and their results.

pub mod config;
pub mod error;
pub mod mode;
pub mod pipeline;
pub mod scope;
pub mod state;
pub mod step;

pub use error::ConfigError;
pub use mode::*;
pub use pipeline::*;
pub use scope::*;
pub use state::*;
pub use step::*;
