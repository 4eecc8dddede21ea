// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Only setup-time problems surface as [`GraphError`]. Per-unit execution
//! failures are absorbed by the round scheduler's retry loop and never reach
//! the caller of `Graph::run`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Topology error: {0}")]
    Topology(String),

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Unknown language model: {0}")]
    UnknownModel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, GraphError>;
