//! The fan-out relay: join, leave, and message delivery.
//!
//! The relay never interprets message content beyond the sender id; room
//! membership governs only change and presence traffic. Ordering within
//! one batch's step array is preserved end to end; no global order is
//! imposed across batches from different senders. Receivers tolerate
//! that by skipping inapplicable steps, and convergence is eventual.

use crate::room::{RoomError, RoomMember, RoomRegistry};
use cowrite_engine::{CollaboratorDisconnect, RoomMessage};
use std::sync::Arc;

/// Per-document fan-out of change and presence events.
pub struct Relay {
    registry: RoomRegistry,
}

impl Relay {
    pub fn new() -> Self {
        Self {
            registry: RoomRegistry::new(),
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Associate a connection with a document's room. Called when a
    /// client opens the document view.
    ///
    /// A concurrent `leave` can prune the room between the registry
    /// lookup and the room lock. Seating the member in that dead room
    /// would cut it off from all traffic, so after joining we confirm
    /// the room is still the registry's current entry and reseat into
    /// the fresh one if not.
    pub async fn join(&self, document_id: &str, member: RoomMember) {
        loop {
            let room = self.registry.get_or_create(document_id);
            room.write().await.join(member.clone());
            if Arc::ptr_eq(&room, &self.registry.get_or_create(document_id)) {
                return;
            }
            room.write().await.leave(&member.user_id);
        }
    }

    /// Remove a connection from a document's room. Called on navigation
    /// away and on transport disconnect.
    ///
    /// Remaining members get a `collaborator-disconnect` so the departed
    /// cursor is dropped immediately even when the client never ran its
    /// own teardown (crash, dropped socket). The empty room is removed.
    pub async fn leave(&self, document_id: &str, user_id: &str) -> Result<(), RoomError> {
        let Some(room) = self.registry.get(document_id) else {
            return Err(RoomError::NotFound(document_id.to_string()));
        };

        let empty = {
            let mut room = room.write().await;
            if room.leave(user_id) {
                room.broadcast(
                    RoomMessage::Disconnect(CollaboratorDisconnect {
                        user_id: user_id.to_string(),
                    }),
                    Some(user_id),
                )
                .await;
            }
            room.is_empty()
        };

        if empty && self.registry.remove_if_empty(document_id) {
            tracing::debug!(%document_id, "removed empty room");
        }
        Ok(())
    }

    /// Deliver a message from one member to every other member of the
    /// document's room. No-op when the room does not exist: the sender
    /// is simply editing single-user.
    pub async fn relay(&self, document_id: &str, msg: RoomMessage) {
        let Some(room) = self.registry.get(document_id) else {
            return;
        };

        let sender = msg.sender().to_string();
        room.read().await.broadcast(msg, Some(&sender)).await;
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}
