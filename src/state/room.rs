use super::AppState;
use crate::error::{GameError, GameResult};
use crate::store::StoreError;
use crate::types::*;
use rand::Rng;
use serde::Deserialize;
use std::collections::HashSet;

/// Safe character set for join codes (excludes 0/O and 1/I)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 6;
const MAX_NAME_CHARS: usize = 32;

/// Room setup as entered by the admin
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoom {
    pub num_players: u8,
    pub num_rounds: u32,
    /// Names known up front, in seating order; others may join later
    #[serde(default)]
    pub player_names: Vec<String>,
    /// Must be one of `player_names`
    pub admin: String,
}

/// Join codes are typed by humans: trim and upper-case
pub fn normalize_room_code(code: &str) -> RoomCode {
    code.trim().to_uppercase()
}

fn generate_room_code<R: Rng + ?Sized>(rng: &mut R) -> RoomCode {
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

fn clean_name(name: &str) -> GameResult<PlayerName> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GameError::InvalidConfiguration(
            "player name must not be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(GameError::InvalidConfiguration(format!(
            "player name must be at most {} characters",
            MAX_NAME_CHARS
        )));
    }
    Ok(name.to_string())
}

fn joined_text(name: &str) -> String {
    format!("{} joined the lobby", name)
}

/// Whether `name` has connected to the room before
fn has_joined(room: &Room, name: &str) -> bool {
    let text = joined_text(name);
    room.lobby_log.iter().any(|e| e.text == text)
}

impl AppState {
    /// Create a room and register the names entered by the admin
    pub async fn create_room(&self, req: CreateRoom) -> GameResult<Room> {
        let mode = GameMode::try_from(req.num_players).map_err(GameError::InvalidConfiguration)?;

        if req.num_rounds < 1 || req.num_rounds > self.max_rounds {
            return Err(GameError::InvalidConfiguration(format!(
                "round count must be between 1 and {}",
                self.max_rounds
            )));
        }

        let names = req
            .player_names
            .iter()
            .map(|n| clean_name(n))
            .collect::<GameResult<Vec<_>>>()?;
        let distinct: HashSet<&str> = names.iter().map(String::as_str).collect();
        if distinct.len() != names.len() {
            return Err(GameError::InvalidConfiguration(
                "player names must be unique".to_string(),
            ));
        }
        if names.len() > mode.player_count() {
            return Err(GameError::InvalidConfiguration(format!(
                "{} names given for {} seats",
                names.len(),
                mode.player_count()
            )));
        }

        let admin = clean_name(&req.admin)?;
        if !distinct.contains(admin.as_str()) {
            return Err(GameError::InvalidConfiguration(
                "admin must be one of the player names".to_string(),
            ));
        }

        // Generate a unique code (retry on collision)
        let room = loop {
            let room = Room {
                code: self.with_rng(|rng| generate_room_code(rng)),
                mode,
                num_rounds: req.num_rounds,
                current_round: 1,
                phase: None,
                roles: None,
                guesses: PendingGuesses::default(),
                admin: admin.clone(),
                lobby_log: Vec::new(),
                version: 0,
                created_at: chrono::Utc::now().to_rfc3339(),
            };
            match self.store.create_room(room).await {
                Ok(room) => break room,
                Err(StoreError::RoomExists(code)) => {
                    tracing::debug!("Room code {} taken, drawing another", code);
                }
                Err(e) => return Err(e.into()),
            }
        };

        let rows = names.iter().map(|n| Player::new(&room.code, n)).collect();
        self.store.insert_players(&room.code, rows).await?;

        tracing::info!(
            "Room {} created by {} ({} players, {} rounds)",
            room.code,
            admin,
            mode.player_count(),
            room.num_rounds
        );
        self.log_lobby_event(&room.code, format!("{} created the room", admin)).await;
        self.notify(&room.code, room.version);

        self.get_room(&room.code).await
    }

    /// Register a new name, or re-attach to an existing one
    pub async fn join_room(&self, code: &str, name: &str) -> GameResult<Player> {
        let room = self.get_room(code).await?;
        let name = clean_name(name)?;

        let players = self.store.get_players(&room.code).await?;
        if let Some(existing) = players.into_iter().find(|p| p.name == name) {
            // pre-registered names have not joined until their first connection
            let text = if has_joined(&room, &name) {
                tracing::info!("{} rejoined room {}", name, room.code);
                format!("{} rejoined the lobby", name)
            } else {
                tracing::info!("{} joined room {}", name, room.code);
                joined_text(&name)
            };
            self.log_lobby_event(&room.code, text).await;
            self.notify(&room.code, room.version);
            return Ok(existing);
        }

        let inserted = self
            .store
            .insert_players(&room.code, vec![Player::new(&room.code, &name)])
            .await
            .map_err(|e| {
                tracing::warn!("{} could not join room {}: {}", name, room.code, e);
                GameError::from(e)
            })?;
        let player = inserted.into_iter().next().ok_or_else(|| {
            GameError::Store(format!("insert of {} returned no rows", name))
        })?;

        tracing::info!("{} joined room {}", name, room.code);
        self.log_lobby_event(&room.code, joined_text(&name)).await;
        self.notify(&room.code, room.version);
        Ok(player)
    }

    /// Lobby messages are non-critical; failures never abort the caller
    pub(crate) async fn log_lobby_event(&self, code: &str, text: String) {
        if let Err(e) = self
            .store
            .append_lobby_event(code, LobbyEvent::now(text))
            .await
        {
            tracing::warn!("Failed to append lobby event for room {}: {}", code, e);
        }
    }
}
