use thiserror::Error;

use parley_core::CoreError;
use parley_grid::GridError;
use parley_storage::StoreError;

#[derive(Error, Debug)]
pub enum SkillError {
    #[error("Invalid skill descriptor: {0}")]
    InvalidDescriptor(#[from] CoreError),

    #[error("Could not connect to skill {skill}: {source}")]
    Connection {
        skill: String,
        #[source]
        source: GridError,
    },

    #[error("No skill registered for route '{route}'")]
    MissingPackage { route: String },

    #[error("Call {method} failed: {source}")]
    Dispatch {
        method: String,
        #[source]
        source: GridError,
    },

    #[error("Skill service {skill} failed: {source}")]
    Service {
        skill: String,
        #[source]
        source: GridError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl SkillError {
    pub fn is_missing_package(&self) -> bool {
        matches!(self, SkillError::MissingPackage { .. })
    }
}

pub type Result<T> = std::result::Result<T, SkillError>;
