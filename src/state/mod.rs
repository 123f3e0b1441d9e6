mod game;
mod guess;
mod room;
mod score;
mod view;

pub use room::{normalize_room_code, CreateRoom};

use crate::config::ServerConfig;
use crate::error::{GameError, GameResult};
use crate::roles::{assign_roles, RoleAssignment};
use crate::store::{MemoryStore, RoomStore};
use crate::types::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Notification that a room changed. Watchers re-read their own view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomEvent {
    pub room_code: RoomCode,
    pub version: u64,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RoomStore>,
    pub max_rounds: u32,
    rng: Arc<Mutex<StdRng>>,
    /// Broadcast channel for room change notifications
    pub room_events: broadcast::Sender<RoomEvent>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), &ServerConfig::default())
    }

    pub fn with_store(store: Arc<dyn RoomStore>, config: &ServerConfig) -> Self {
        let rng = match config.role_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let (tx, _rx) = broadcast::channel(100);
        Self {
            store,
            max_rounds: config.max_rounds,
            rng: Arc::new(Mutex::new(rng)),
            room_events: tx,
        }
    }

    /// Observe room changes. Any transport can sit on top of this.
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.room_events.subscribe()
    }

    pub(crate) fn notify(&self, room_code: &str, version: u64) {
        // No receivers connected is fine
        let _ = self.room_events.send(RoomEvent {
            room_code: room_code.to_string(),
            version,
        });
    }

    pub(crate) fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut rng)
    }

    pub(crate) fn deal_roles(
        &self,
        players: &[Player],
        mode: GameMode,
    ) -> GameResult<RoleAssignment> {
        let names: Vec<PlayerName> = players.iter().map(|p| p.name.clone()).collect();
        self.with_rng(|rng| assign_roles(&names, mode, rng))
    }

    pub async fn get_room(&self, code: &str) -> GameResult<Room> {
        let code = normalize_room_code(code);
        self.store
            .get_room(&code)
            .await?
            .ok_or_else(|| GameError::NotFound(format!("room {}", code)))
    }

    pub async fn get_players(&self, code: &str) -> GameResult<Vec<Player>> {
        Ok(self.store.get_players(&normalize_room_code(code)).await?)
    }

    pub async fn get_round_scores(&self, code: &str) -> GameResult<Vec<RoundScoreEntry>> {
        Ok(self
            .store
            .get_round_scores(&normalize_room_code(code))
            .await?)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
