use crate::roles::RoleAssignment;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque ID types
pub type RoomCode = String;
pub type PlayerName = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Raja,
    Rani,
    Mantri,
    Sipahi,
    Chor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Raja => "Raja",
            Role::Rani => "Rani",
            Role::Mantri => "Mantri",
            Role::Sipahi => "Sipahi",
            Role::Chor => "Chor",
        };
        f.write_str(name)
    }
}

const FOUR_PLAYER_ROLES: &[Role] = &[Role::Raja, Role::Mantri, Role::Sipahi, Role::Chor];
const FIVE_PLAYER_ROLES: &[Role] = &[
    Role::Raja,
    Role::Rani,
    Role::Mantri,
    Role::Sipahi,
    Role::Chor,
];

/// Table size. Serialized as the plain player count (4 or 5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum GameMode {
    FourPlayer,
    FivePlayer,
}

impl GameMode {
    pub fn player_count(self) -> usize {
        match self {
            GameMode::FourPlayer => 4,
            GameMode::FivePlayer => 5,
        }
    }

    /// The role set dealt every round
    pub fn roles(self) -> &'static [Role] {
        match self {
            GameMode::FourPlayer => FOUR_PLAYER_ROLES,
            GameMode::FivePlayer => FIVE_PLAYER_ROLES,
        }
    }

    /// Whether the Raja has to guess the Rani before a round resolves
    pub fn has_raja_guess(self) -> bool {
        self == GameMode::FivePlayer
    }
}

impl TryFrom<u8> for GameMode {
    type Error = String;

    fn try_from(count: u8) -> Result<Self, Self::Error> {
        match count {
            4 => Ok(GameMode::FourPlayer),
            5 => Ok(GameMode::FivePlayer),
            other => Err(format!("player count must be 4 or 5, got {}", other)),
        }
    }
}

impl From<GameMode> for u8 {
    fn from(mode: GameMode) -> u8 {
        mode.player_count() as u8
    }
}

/// Step within a round. A room without a phase is still in the lobby.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    RajaReveal,
    MantriReveal,
    MantriGuess,
    RajaGuess,
    RoundResult,
    GameOver,
}

impl Phase {
    /// Whether the holder of `role` is public knowledge in this phase
    pub fn reveals(self, role: Role) -> bool {
        match role {
            Role::Raja => true,
            Role::Mantri => self != Phase::RajaReveal,
            _ => self.is_resolved(),
        }
    }

    /// Round outcome is final and everything may be shown
    pub fn is_resolved(self) -> bool {
        matches!(self, Phase::RoundResult | Phase::GameOver)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::RajaReveal => "RAJA_REVEAL",
            Phase::MantriReveal => "MANTRI_REVEAL",
            Phase::MantriGuess => "MANTRI_GUESS",
            Phase::RajaGuess => "RAJA_GUESS",
            Phase::RoundResult => "ROUND_RESULT",
            Phase::GameOver => "GAME_OVER",
        };
        f.write_str(name)
    }
}

/// Label for an optional phase, `LOBBY` when unset
pub fn phase_label(phase: Option<Phase>) -> String {
    phase.map_or_else(|| "LOBBY".to_string(), |p| p.to_string())
}

/// Guesses recorded during the current round
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingGuesses {
    pub mantri_chor: Option<PlayerName>,
    pub mantri_sipahi: Option<PlayerName>,
    pub raja_rani: Option<PlayerName>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LobbyEvent {
    pub at: String,
    pub text: String,
}

impl LobbyEvent {
    pub fn now(text: impl Into<String>) -> Self {
        Self {
            at: chrono::Utc::now().to_rfc3339(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Room {
    pub code: RoomCode,
    pub mode: GameMode,
    pub num_rounds: u32,
    /// 1-based
    pub current_round: u32,
    pub phase: Option<Phase>,
    pub roles: Option<RoleAssignment>,
    #[serde(default)]
    pub guesses: PendingGuesses,
    pub admin: PlayerName,
    #[serde(default)]
    pub lobby_log: Vec<LobbyEvent>,
    /// Bumped by every state transition; the compare-and-swap token
    pub version: u64,
    pub created_at: String,
}

impl Room {
    pub fn is_last_round(&self) -> bool {
        self.current_round >= self.num_rounds
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub room_code: RoomCode,
    pub name: PlayerName,
    pub joined_at: String,
}

impl Player {
    pub fn new(room_code: impl Into<RoomCode>, name: impl Into<PlayerName>) -> Self {
        Self {
            room_code: room_code.into(),
            name: name.into(),
            joined_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// One ledger line: what a player earned in one round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundScoreEntry {
    pub id: String,
    pub room_code: RoomCode,
    pub player_name: PlayerName,
    pub round_number: u32,
    pub points: u32,
    pub recorded_at: String,
}

impl RoundScoreEntry {
    pub fn new(room_code: &str, player_name: &str, round_number: u32, points: u32) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            room_code: room_code.to_string(),
            player_name: player_name.to_string(),
            round_number,
            points,
            recorded_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Something a viewer may do right now
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    StartGame,
    AdvancePhase,
    SubmitMantriGuess,
    SubmitRajaGuess,
    AdvanceRound,
    FinishGame,
}
