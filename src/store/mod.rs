//! Room/player/score storage.
//!
//! The state machine only talks to [`RoomStore`]. Every transition goes
//! through a conditional write keyed on the room's version, so two clients
//! racing on the same action cannot both win.

pub mod export;
mod memory;

pub use memory::MemoryStore;

use crate::roles::RoleAssignment;
use crate::types::*;
use async_trait::async_trait;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("room {0} not found")]
    RoomNotFound(RoomCode),

    #[error("room {0} already exists")]
    RoomExists(RoomCode),

    #[error(
        "stale write to room {code}: expected version {expected_version}, found {actual_version}"
    )]
    Conflict {
        code: RoomCode,
        expected_version: u64,
        actual_version: u64,
        actual_phase: Option<Phase>,
    },

    #[error("room {code} is full ({capacity} players)")]
    RoomFull { code: RoomCode, capacity: usize },

    #[error("player {name} already registered in room {code}")]
    DuplicatePlayer { code: RoomCode, name: PlayerName },

    #[error("round {round} already scored for {name} in room {code}")]
    DuplicateScore {
        code: RoomCode,
        name: PlayerName,
        round: u32,
    },

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// State the writer observed before deciding on a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expected {
    pub phase: Option<Phase>,
    pub version: u64,
}

impl Expected {
    pub fn of(room: &Room) -> Self {
        Self {
            phase: room.phase,
            version: room.version,
        }
    }

    pub fn check(&self, room: &Room) -> StoreResult<()> {
        if room.phase != self.phase || room.version != self.version {
            return Err(StoreError::Conflict {
                code: room.code.clone(),
                expected_version: self.version,
                actual_version: room.version,
                actual_phase: room.phase,
            });
        }
        Ok(())
    }
}

/// Fields a transition writes. Every transition lands in a phase.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomUpdate {
    pub phase: Phase,
    pub current_round: Option<u32>,
    pub roles: Option<RoleAssignment>,
    pub guesses: Option<PendingGuesses>,
}

impl RoomUpdate {
    pub fn to(phase: Phase) -> Self {
        Self {
            phase,
            current_round: None,
            roles: None,
            guesses: None,
        }
    }

    pub fn round(mut self, round: u32) -> Self {
        self.current_round = Some(round);
        self
    }

    pub fn roles(mut self, roles: RoleAssignment) -> Self {
        self.roles = Some(roles);
        self
    }

    pub fn guesses(mut self, guesses: PendingGuesses) -> Self {
        self.guesses = Some(guesses);
        self
    }

    /// Write the fields and bump the version. Never touches the admin.
    pub fn apply(self, room: &mut Room) {
        room.phase = Some(self.phase);
        if let Some(round) = self.current_round {
            room.current_round = round;
        }
        if let Some(roles) = self.roles {
            room.roles = Some(roles);
        }
        if let Some(guesses) = self.guesses {
            room.guesses = guesses;
        }
        room.version += 1;
    }
}

#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn get_room(&self, code: &str) -> StoreResult<Option<Room>>;

    /// Players ordered by name
    async fn get_players(&self, code: &str) -> StoreResult<Vec<Player>>;

    async fn get_round_scores(&self, code: &str) -> StoreResult<Vec<RoundScoreEntry>>;

    async fn create_room(&self, room: Room) -> StoreResult<Room>;

    /// Conditional update; fails with `Conflict` if the room moved on
    async fn update_room(
        &self,
        code: &str,
        update: RoomUpdate,
        expected: Expected,
    ) -> StoreResult<Room>;

    /// All-or-nothing; enforces capacity and unique names
    async fn insert_players(&self, code: &str, rows: Vec<Player>) -> StoreResult<Vec<Player>>;

    /// All-or-nothing; one entry per (player, round)
    async fn insert_round_scores(
        &self,
        code: &str,
        rows: Vec<RoundScoreEntry>,
    ) -> StoreResult<()>;

    /// Conditional update and ledger append as one unit
    async fn commit_round(
        &self,
        code: &str,
        update: RoomUpdate,
        expected: Expected,
        rows: Vec<RoundScoreEntry>,
    ) -> StoreResult<Room>;

    /// Unconditional; does not bump the room version
    async fn append_lobby_event(&self, code: &str, event: LobbyEvent) -> StoreResult<()>;
}
