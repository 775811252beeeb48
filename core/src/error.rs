use crate::building::BuildingKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;

/// A refused player action. Never fatal; the state is left untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("{what} capacity exceeded ({current}/{limit})")]
    CapacityExceeded {
        what:    &'static str,
        current: u64,
        limit:   u64,
    },

    #[error("Cannot build {building:?}: {reason}")]
    BuildPreconditionUnmet {
        building: BuildingKind,
        reason:   String,
    },

    #[error("Point ({x:.1}, {y:.1}) lies outside the planet")]
    OutOfBounds { x: f64, y: f64 },

    #[error("Simulation is paused")]
    Paused,
}

/// Why a save payload could not be turned back into a game state.
/// The caller keeps (or falls back to) a valid in-memory state in every case.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistenceError {
    #[error("Malformed save: {0}")]
    MalformedSave(String),

    #[error("Unsupported save version: {found:?}")]
    UnsupportedSaveVersion { found: Option<i64> },

    #[error("Migration chain revisited version {version}")]
    MigrationCycle { version: u32 },

    #[error("Compression codec failure: {0}")]
    CompressionFailure(String),
}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        PersistenceError::MalformedSave(e.to_string())
    }
}
