use crate::error::GameError;
use crate::scoring::{RoundPoints, Scoreboard, Standings};
use crate::types::*;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    // Admin-only messages
    StartGame,
    AdvancePhase,
    AdvanceRound,
    FinishGame,
    // Role-scoped guesses
    SubmitMantriGuess {
        chor: PlayerName,
        /// Required with 5 players, inferred with 4
        #[serde(default)]
        sipahi: Option<PlayerName>,
    },
    SubmitRajaGuess {
        rani: PlayerName,
    },
    /// Ask for a fresh personal view
    RequestState,
    RequestScoreboard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        you: PlayerName,
        room: RoomView,
        server_now: String,
    },
    State {
        room: RoomView,
    },
    Scoreboard {
        scoreboard: Scoreboard,
        standings: Standings,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl From<GameError> for ServerMessage {
    fn from(e: GameError) -> Self {
        ServerMessage::Error {
            code: e.code().to_string(),
            msg: e.to_string(),
        }
    }
}

/// A player as one particular viewer sees them
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerView {
    pub name: PlayerName,
    /// `None` while hidden from the viewer
    pub role: Option<Role>,
    pub total: u32,
    pub is_admin: bool,
}

/// Redacted room snapshot for one viewer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomView {
    pub code: RoomCode,
    pub mode: GameMode,
    pub num_rounds: u32,
    pub current_round: u32,
    /// `None` in the lobby
    pub phase: Option<Phase>,
    pub version: u64,
    pub admin: PlayerName,
    pub you: Option<PlayerName>,
    pub your_role: Option<Role>,
    pub players: Vec<PlayerView>,
    /// What `you` may do right now
    pub actions: Vec<Action>,
    /// Who `you` may pick for the pending guess
    pub candidates: Vec<PlayerName>,
    /// Only once the round is resolved
    pub guesses: Option<PendingGuesses>,
    pub round_points: Option<RoundPoints>,
    /// Filled at GAME_OVER; ties share the win
    pub winners: Vec<PlayerName>,
    pub lobby_log: Vec<LobbyEvent>,
}
