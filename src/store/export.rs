//! Snapshot export/import for the in-memory store.
//!
//! Lets a running server survive restarts without committing to a database.

use super::memory::RoomRecord;
use super::{MemoryStore, StoreError, StoreResult};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Schema version for snapshot compatibility
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub schema_version: u32,
    /// ISO8601
    pub exported_at: String,
    pub rooms: Vec<Room>,
    pub players: Vec<Player>,
    pub round_scores: Vec<RoundScoreEntry>,
}

impl StoreSnapshot {
    /// Validate references and invariants before import
    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version > SNAPSHOT_SCHEMA_VERSION {
            return Err(format!(
                "snapshot schema version {} is newer than supported version {}",
                self.schema_version, SNAPSHOT_SCHEMA_VERSION
            ));
        }

        let mut rooms: HashMap<&str, &Room> = HashMap::new();
        for room in &self.rooms {
            if rooms.insert(room.code.as_str(), room).is_some() {
                return Err(format!("room '{}' appears twice", room.code));
            }
        }

        let mut names: HashMap<&str, HashSet<&str>> = HashMap::new();
        for player in &self.players {
            if !rooms.contains_key(player.room_code.as_str()) {
                return Err(format!(
                    "player '{}' references room '{}' which doesn't exist",
                    player.name, player.room_code
                ));
            }
            let seated = names.entry(player.room_code.as_str()).or_default();
            if !seated.insert(player.name.as_str()) {
                return Err(format!(
                    "player '{}' registered twice in room '{}'",
                    player.name, player.room_code
                ));
            }
        }

        for (code, seated) in &names {
            let room = rooms[code];
            if seated.len() > room.mode.player_count() {
                return Err(format!("room '{}' has more players than seats", code));
            }
        }

        for room in rooms.values() {
            if room.current_round < 1 || room.current_round > room.num_rounds {
                return Err(format!(
                    "room '{}' is on round {} of {}",
                    room.code, room.current_round, room.num_rounds
                ));
            }
            if room.phase.is_some() && room.roles.is_none() {
                return Err(format!("room '{}' is in play without roles", room.code));
            }

            let seated = names.get(room.code.as_str()).cloned().unwrap_or_default();
            // a room exported between its creation and its first players has nobody seated
            if !seated.is_empty() && !seated.contains(room.admin.as_str()) {
                return Err(format!(
                    "room '{}' has admin '{}' who is not a player",
                    room.code, room.admin
                ));
            }
            if let Some(roles) = &room.roles {
                if roles.mode() != room.mode || !roles.covers(seated) {
                    return Err(format!(
                        "room '{}' has a role assignment that does not match its players",
                        room.code
                    ));
                }
            }
        }

        let mut ledger: HashSet<(&str, &str, u32)> = HashSet::new();
        for entry in &self.round_scores {
            if !rooms.contains_key(entry.room_code.as_str()) {
                return Err(format!(
                    "score '{}' references room '{}' which doesn't exist",
                    entry.id, entry.room_code
                ));
            }
            let key = (
                entry.room_code.as_str(),
                entry.player_name.as_str(),
                entry.round_number,
            );
            if !ledger.insert(key) {
                return Err(format!(
                    "round {} scored twice for '{}' in room '{}'",
                    entry.round_number, entry.player_name, entry.room_code
                ));
            }
        }

        Ok(())
    }
}

impl MemoryStore {
    pub async fn export(&self) -> StoreSnapshot {
        let rooms = self.rooms.read().await;

        let mut snapshot = StoreSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            exported_at: chrono::Utc::now().to_rfc3339(),
            rooms: Vec::with_capacity(rooms.len()),
            players: Vec::new(),
            round_scores: Vec::new(),
        };
        for record in rooms.values() {
            snapshot.rooms.push(record.room.clone());
            snapshot.players.extend(record.players.iter().cloned());
            snapshot.round_scores.extend(record.scores.iter().cloned());
        }
        snapshot
    }

    /// Replace the whole store with the snapshot's contents
    pub async fn import(&self, snapshot: StoreSnapshot) -> StoreResult<()> {
        snapshot.validate().map_err(StoreError::InvalidSnapshot)?;

        let mut records: HashMap<RoomCode, RoomRecord> = snapshot
            .rooms
            .into_iter()
            .map(|room| {
                (
                    room.code.clone(),
                    RoomRecord {
                        room,
                        players: Vec::new(),
                        scores: Vec::new(),
                    },
                )
            })
            .collect();

        for player in snapshot.players {
            if let Some(record) = records.get_mut(&player.room_code) {
                record.players.push(player);
            }
        }
        for entry in snapshot.round_scores {
            if let Some(record) = records.get_mut(&entry.room_code) {
                record.scores.push(entry);
            }
        }

        let count = records.len();
        *self.rooms.write().await = records;
        self.touch();
        tracing::info!("Imported snapshot with {} rooms", count);
        Ok(())
    }

    /// Write a snapshot next to `path` and move it into place
    pub async fn save_to(&self, path: &Path) -> StoreResult<()> {
        let snapshot = self.export().await;
        let json =
            serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Io(e.to_string()))?;

        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(())
    }

    pub async fn load_from(&self, path: &Path) -> StoreResult<()> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        let snapshot: StoreSnapshot = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::InvalidSnapshot(e.to_string()))?;
        self.import(snapshot).await
    }
}
