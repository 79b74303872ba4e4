//! Document rooms: the delivery scope for one document's change and
//! presence traffic.
//!
//! A room holds the connections currently viewing one document. It does
//! no per-message processing; the only relay work is membership lookup
//! and fan-out. Send failures to members whose receiver is gone are
//! ignored: delivery is at-least-once toward live members and
//! loss-tolerant toward dead ones.

use cowrite_engine::{room_id, RoomMessage};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Error, Debug)]
pub enum RoomError {
    #[error("no room for document: {0}")]
    NotFound(String),
}

/// One connection in a room.
#[derive(Clone)]
pub struct RoomMember {
    pub user_id: String,
    pub sender: mpsc::Sender<RoomMessage>,
}

/// All connections currently viewing one document.
pub struct Room {
    pub document_id: String,
    members: Vec<RoomMember>,
}

impl Room {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            members: Vec::new(),
        }
    }

    /// Add a member. A stale connection with the same user id is
    /// replaced: one live seat per user per room.
    pub fn join(&mut self, member: RoomMember) {
        self.members.retain(|m| m.user_id != member.user_id);
        tracing::debug!(
            document_id = %self.document_id,
            user_id = %member.user_id,
            "member joined room"
        );
        self.members.push(member);
    }

    /// Remove a member, returning whether it was present.
    pub fn leave(&mut self, user_id: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m.user_id != user_id);
        let removed = self.members.len() != before;
        if removed {
            tracing::debug!(
                document_id = %self.document_id,
                %user_id,
                "member left room"
            );
        }
        removed
    }

    /// Deliver a message to every member except `exclude`.
    pub async fn broadcast(&self, msg: RoomMessage, exclude: Option<&str>) {
        for member in &self.members {
            if Some(member.user_id.as_str()) == exclude {
                continue;
            }
            // A closed receiver just means the member disconnected
            // between lookup and send.
            let _ = member.sender.send(msg.clone()).await;
        }
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn member_ids(&self) -> Vec<String> {
        self.members.iter().map(|m| m.user_id.clone()).collect()
    }
}

/// All live rooms, keyed by room id.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Arc<tokio::sync::RwLock<Room>>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Get or create the room for a document.
    pub fn get_or_create(&self, document_id: &str) -> Arc<tokio::sync::RwLock<Room>> {
        let key = room_id(document_id);

        // Try read lock first
        {
            let rooms = self.rooms.read().expect("room registry lock poisoned");
            if let Some(room) = rooms.get(&key) {
                return room.clone();
            }
        }

        // Need to create - acquire write lock
        let mut rooms = self.rooms.write().expect("room registry lock poisoned");

        // Double-check (another task may have created it)
        if let Some(room) = rooms.get(&key) {
            return room.clone();
        }

        let room = Arc::new(tokio::sync::RwLock::new(Room::new(document_id)));
        rooms.insert(key, room.clone());
        room
    }

    /// The room for a document, if anyone is in it.
    pub fn get(&self, document_id: &str) -> Option<Arc<tokio::sync::RwLock<Room>>> {
        let rooms = self.rooms.read().expect("room registry lock poisoned");
        rooms.get(&room_id(document_id)).cloned()
    }

    /// Drop a room, but only if it is still empty. The emptiness
    /// re-check happens under the registry write lock: a join that
    /// holds the room lock (or has already seated a member) keeps the
    /// entry alive, so nobody ends up in a room the registry forgot.
    pub fn remove_if_empty(&self, document_id: &str) -> bool {
        let key = room_id(document_id);
        let mut rooms = self.rooms.write().expect("room registry lock poisoned");
        let Some(room) = rooms.get(&key).cloned() else {
            return false;
        };
        let removed = match room.try_write() {
            Ok(guard) if guard.is_empty() => {
                drop(guard);
                rooms.remove(&key);
                true
            }
            // Locked or repopulated: someone is mid-join, keep it.
            _ => false,
        };
        removed
    }

    pub fn room_count(&self) -> usize {
        let rooms = self.rooms.read().expect("room registry lock poisoned");
        rooms.len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
