use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use super::id::{AlphanumericIdGenerator, IdGenerator, ROOM_ID_LENGTH};
use super::room::Room;
use crate::config::{RoomConfig, DEFAULT_ROOM_ID_MAX_ATTEMPTS};
use crate::error::{RaffleError, Result};

/// All live rooms behind a single lock.
///
/// Every operation holds the lock for its whole read-modify-write, and no
/// operation awaits anything but the lock itself, so hold times stay short.
pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, Room>>,
    generator: Box<dyn IdGenerator>,
    id_length: usize,
    max_id_attempts: usize,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::with_generator(
            Box::new(AlphanumericIdGenerator),
            ROOM_ID_LENGTH,
            DEFAULT_ROOM_ID_MAX_ATTEMPTS,
        )
    }

    pub fn from_config(config: &RoomConfig) -> Self {
        Self::with_generator(
            Box::new(AlphanumericIdGenerator),
            config.id_length,
            config.max_id_attempts,
        )
    }

    pub fn with_generator(
        generator: Box<dyn IdGenerator>,
        id_length: usize,
        max_id_attempts: usize,
    ) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            generator,
            id_length,
            max_id_attempts,
        }
    }

    /// Create an empty room under a freshly generated id
    pub async fn create_room(&self) -> Result<String> {
        let mut rooms = self.rooms.lock().await;

        for _ in 0..self.max_id_attempts {
            let room_id = self.generator.generate(self.id_length);
            if rooms.contains_key(&room_id) {
                tracing::debug!(room_id = %room_id, "Room id collision, retrying");
                continue;
            }

            rooms.insert(room_id.clone(), Room::new());
            tracing::info!(room_id = %room_id, "Room created");
            return Ok(room_id);
        }

        tracing::error!(
            attempts = self.max_id_attempts,
            id_length = self.id_length,
            "Exhausted room id generation attempts"
        );
        Err(RaffleError::GeneratorExhausted {
            attempts: self.max_id_attempts,
        })
    }

    /// Check if a room exists. Does not count as activity.
    pub async fn exists(&self, room_id: &str) -> bool {
        let rooms = self.rooms.lock().await;
        rooms.contains_key(room_id)
    }

    /// Append an entry to a room. Any string is accepted, including empty ones.
    pub async fn append(&self, room_id: &str, entry: String) -> Result<()> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| RaffleError::RoomNotFound(room_id.to_string()))?;

        room.push(entry);
        room.touch();
        tracing::debug!(room_id = %room_id, entries = room.len(), "Entry added");
        Ok(())
    }

    /// Number of entries left in a room. Counts as activity.
    pub async fn count(&self, room_id: &str) -> Result<usize> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| RaffleError::RoomNotFound(room_id.to_string()))?;

        room.touch();
        Ok(room.len())
    }

    /// Remove and return a random entry; `None` when the room is empty
    pub async fn draw(&self, room_id: &str) -> Result<Option<String>> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| RaffleError::RoomNotFound(room_id.to_string()))?;

        let entry = room.draw_with(&mut rand::thread_rng());
        room.touch();
        tracing::debug!(
            room_id = %room_id,
            drawn = entry.is_some(),
            remaining = room.len(),
            "Draw from room"
        );
        Ok(entry)
    }

    /// Remove every room idle for at least `idle_timeout`.
    ///
    /// Collects the ids first and deletes them afterwards, all under one
    /// acquisition of the lock. Returns the evicted ids.
    pub async fn evict_idle(&self, idle_timeout: Duration) -> Vec<String> {
        let mut rooms = self.rooms.lock().await;
        let now = Instant::now();

        let expired: Vec<String> = rooms
            .iter()
            .filter(|(_, room)| room.idle_for(now) >= idle_timeout)
            .map(|(id, _)| id.clone())
            .collect();

        for room_id in &expired {
            if let Some(room) = rooms.remove(room_id) {
                tracing::info!(
                    room_id = %room_id,
                    remaining_entries = room.len(),
                    "Evicted idle room"
                );
            }
        }

        expired
    }

    /// Number of live rooms
    pub async fn room_count(&self) -> usize {
        let rooms = self.rooms.lock().await;
        rooms.len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
