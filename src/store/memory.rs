use super::*;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub(super) struct RoomRecord {
    pub room: Room,
    pub players: Vec<Player>,
    pub scores: Vec<RoundScoreEntry>,
}

impl RoomRecord {
    fn check_new_scores(&self, rows: &[RoundScoreEntry]) -> StoreResult<()> {
        let mut seen: HashSet<(&str, u32)> = self
            .scores
            .iter()
            .map(|s| (s.player_name.as_str(), s.round_number))
            .collect();

        for row in rows {
            if !seen.insert((row.player_name.as_str(), row.round_number)) {
                return Err(StoreError::DuplicateScore {
                    code: self.room.code.clone(),
                    name: row.player_name.clone(),
                    round: row.round_number,
                });
            }
        }
        Ok(())
    }
}

/// In-process store. One lock covers the whole map, so every call is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub(super) rooms: RwLock<HashMap<RoomCode, RoomRecord>>,
    generation: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter bumped by every successful write
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub(super) fn touch(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

fn record_mut<'a>(
    rooms: &'a mut HashMap<RoomCode, RoomRecord>,
    code: &str,
) -> StoreResult<&'a mut RoomRecord> {
    rooms
        .get_mut(code)
        .ok_or_else(|| StoreError::RoomNotFound(code.to_string()))
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn get_room(&self, code: &str) -> StoreResult<Option<Room>> {
        Ok(self.rooms.read().await.get(code).map(|r| r.room.clone()))
    }

    async fn get_players(&self, code: &str) -> StoreResult<Vec<Player>> {
        let rooms = self.rooms.read().await;
        let record = rooms
            .get(code)
            .ok_or_else(|| StoreError::RoomNotFound(code.to_string()))?;
        let mut players = record.players.clone();
        players.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(players)
    }

    async fn get_round_scores(&self, code: &str) -> StoreResult<Vec<RoundScoreEntry>> {
        let rooms = self.rooms.read().await;
        let record = rooms
            .get(code)
            .ok_or_else(|| StoreError::RoomNotFound(code.to_string()))?;
        let mut scores = record.scores.clone();
        scores.sort_by_key(|s| s.round_number);
        Ok(scores)
    }

    async fn create_room(&self, room: Room) -> StoreResult<Room> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(&room.code) {
            return Err(StoreError::RoomExists(room.code));
        }
        rooms.insert(
            room.code.clone(),
            RoomRecord {
                room: room.clone(),
                players: Vec::new(),
                scores: Vec::new(),
            },
        );
        self.touch();
        Ok(room)
    }

    async fn update_room(
        &self,
        code: &str,
        update: RoomUpdate,
        expected: Expected,
    ) -> StoreResult<Room> {
        let mut rooms = self.rooms.write().await;
        let record = record_mut(&mut rooms, code)?;
        expected.check(&record.room)?;

        update.apply(&mut record.room);
        self.touch();
        Ok(record.room.clone())
    }

    async fn insert_players(&self, code: &str, rows: Vec<Player>) -> StoreResult<Vec<Player>> {
        let mut rooms = self.rooms.write().await;
        let record = record_mut(&mut rooms, code)?;

        let capacity = record.room.mode.player_count();
        if record.players.len() + rows.len() > capacity {
            return Err(StoreError::RoomFull {
                code: code.to_string(),
                capacity,
            });
        }

        let mut names: HashSet<&str> = record.players.iter().map(|p| p.name.as_str()).collect();
        for row in &rows {
            if !names.insert(row.name.as_str()) {
                return Err(StoreError::DuplicatePlayer {
                    code: code.to_string(),
                    name: row.name.clone(),
                });
            }
        }

        let inserted: Vec<Player> = rows
            .into_iter()
            .map(|mut p| {
                p.room_code = code.to_string();
                p
            })
            .collect();
        record.players.extend(inserted.iter().cloned());
        self.touch();
        Ok(inserted)
    }

    async fn insert_round_scores(
        &self,
        code: &str,
        rows: Vec<RoundScoreEntry>,
    ) -> StoreResult<()> {
        let mut rooms = self.rooms.write().await;
        let record = record_mut(&mut rooms, code)?;
        record.check_new_scores(&rows)?;

        record.scores.extend(rows);
        self.touch();
        Ok(())
    }

    async fn commit_round(
        &self,
        code: &str,
        update: RoomUpdate,
        expected: Expected,
        rows: Vec<RoundScoreEntry>,
    ) -> StoreResult<Room> {
        let mut rooms = self.rooms.write().await;
        let record = record_mut(&mut rooms, code)?;
        expected.check(&record.room)?;
        record.check_new_scores(&rows)?;

        update.apply(&mut record.room);
        record.scores.extend(rows);
        self.touch();
        Ok(record.room.clone())
    }

    async fn append_lobby_event(&self, code: &str, event: LobbyEvent) -> StoreResult<()> {
        let mut rooms = self.rooms.write().await;
        let record = record_mut(&mut rooms, code)?;
        record.room.lobby_log.push(event);
        self.touch();
        Ok(())
    }
}
