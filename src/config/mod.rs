// src/config/mod.rs

//! Configuration loading and validation for agentgraph.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate agent count, run bounds and topology shape (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{AgentConfig, ConfigFile, GraphSection, RawConfigFile, RunSection};
