//! Error taxonomy for room operations.

use crate::store::StoreError;
use crate::types::{phase_label, Phase};

pub type GameResult<T> = Result<T, GameError>;

/// Errors returned by the room state machine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Phase mismatch: {0}")]
    PhaseMismatch(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Ambiguous inference: {0}")]
    AmbiguousInference(String),

    #[error("Room is full ({capacity} players)")]
    RoomFull { capacity: usize },

    #[error("Invalid guess: {0}")]
    InvalidGuess(String),

    #[error("Store failure: {0}")]
    Store(String),
}

impl GameError {
    /// Action attempted from a phase that does not allow it
    pub fn phase_mismatch(action: &str, actual: Option<Phase>) -> Self {
        GameError::PhaseMismatch(format!(
            "cannot {} while the room is in {}",
            action,
            phase_label(actual)
        ))
    }

    /// Stable wire code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            GameError::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
            GameError::Unauthorized(_) => "UNAUTHORIZED",
            GameError::PhaseMismatch(_) => "PHASE_MISMATCH",
            GameError::NotFound(_) => "NOT_FOUND",
            GameError::AmbiguousInference(_) => "AMBIGUOUS_INFERENCE",
            GameError::RoomFull { .. } => "ROOM_FULL",
            GameError::InvalidGuess(_) => "INVALID_GUESS",
            GameError::Store(_) => "STORE_ERROR",
        }
    }
}

impl From<StoreError> for GameError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::RoomNotFound(code) => GameError::NotFound(format!("room {}", code)),
            StoreError::Conflict { actual_phase, .. } => GameError::PhaseMismatch(format!(
                "room changed concurrently and is now in {}",
                phase_label(actual_phase)
            )),
            StoreError::RoomFull { capacity, .. } => GameError::RoomFull { capacity },
            StoreError::DuplicatePlayer { name, .. } => {
                GameError::InvalidConfiguration(format!("name {} is already taken", name))
            }
            StoreError::DuplicateScore { round, .. } => {
                GameError::PhaseMismatch(format!("round {} is already scored", round))
            }
            other => GameError::Store(other.to_string()),
        }
    }
}
