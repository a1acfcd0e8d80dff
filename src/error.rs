use std::path::PathBuf;
use thiserror::Error;

use crate::recorder::repository::RepositoryState;

/// Rejections raised by the recording engine.
///
/// None of these are fatal. Every call site that produces one also logs it,
/// and the tick path never returns them.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TraceError {
    #[error("repository is already {state:?}, no more data sources can be added")]
    RepositoryNotInitialized { state: RepositoryState },

    #[error("data sources '{existing}' and '{rejected}' observe the same field")]
    DuplicateField { existing: String, rejected: String },

    #[error("data source '{name}' already exists in group '{group}'")]
    DuplicateName { name: String, group: String },

    #[error("memory budget exhausted: '{name}' needs {required} bytes, {available} available")]
    MemoryBudgetExceeded {
        name: String,
        required: u64,
        available: u64,
    },

    #[error("no tracer session exists")]
    NoActiveSession,

    #[error("session {id} is no longer active")]
    SessionNotActive { id: u32 },

    #[error("session {id} does not exist")]
    UnknownSession { id: u32 },

    #[error("repository {id} does not exist")]
    UnknownRepository { id: u32 },

    #[error("tracer is already initialized")]
    AlreadyInitialized,

    #[error("tracer is not initialized")]
    NotInitialized,
}

/// Settings loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}
