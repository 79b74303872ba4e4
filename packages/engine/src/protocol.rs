//! # Wire Protocol
//!
//! Event payloads exchanged through a document room, plus the
//! deterministic color/name fallback for collaborators.
//!
//! Two logical channels share one room: `doc-change` (content steps,
//! ordered within a batch) and `cursor-update`/`collaborator-disconnect`
//! (presence, higher-frequency and loss-tolerant). Field names are
//! camelCase on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Room identity for a document; governs which connections receive that
/// document's change and presence traffic.
pub fn room_id(document_id: &str) -> String {
    format!("room:document:{document_id}")
}

/// A batch of steps emitted by one editor. Event name: `doc-change`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocChangeEvent {
    pub document_id: String,

    /// Origin editor; receivers discard their own echoes.
    pub user_id: String,

    /// Encoded steps, applied in array order.
    pub steps: Vec<Value>,

    /// Document size after local application. An approximate drift
    /// signal, not an ordering key.
    pub version: u64,

    /// Wall-clock millis at emission; a latency signal only.
    pub timestamp: i64,
}

/// A cursor/selection range with `from <= to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRange {
    pub from: usize,
    pub to: usize,
}

/// One collaborator's cursor state. Event name: `cursor-update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorUpdate {
    pub document_id: String,
    pub user_id: String,
    pub user_name: String,
    pub color: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionRange>,

    /// False signals "don't show my caret" (focus lost).
    pub is_active: bool,
}

/// Explicit departure signal. Event name: `collaborator-disconnect`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorDisconnect {
    pub user_id: String,
}

/// Everything a document room fans out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum RoomMessage {
    #[serde(rename = "doc-change")]
    DocChange(DocChangeEvent),

    #[serde(rename = "cursor-update")]
    CursorUpdate(CursorUpdate),

    #[serde(rename = "collaborator-disconnect")]
    Disconnect(CollaboratorDisconnect),
}

impl RoomMessage {
    /// The user that produced this message.
    pub fn sender(&self) -> &str {
        match self {
            RoomMessage::DocChange(e) => &e.user_id,
            RoomMessage::CursorUpdate(e) => &e.user_id,
            RoomMessage::Disconnect(e) => &e.user_id,
        }
    }
}

const COLLABORATOR_COLORS: [&str; 8] = [
    "#e53935", "#8e24aa", "#3949ab", "#039be5", "#00897b", "#7cb342", "#fb8c00", "#6d4c41",
];

const COLLABORATOR_NAMES: [&str; 8] = [
    "Cardinal", "Violet", "Indigo", "Cerulean", "Teal", "Fern", "Amber", "Umber",
];

fn palette_index(user_id: &str, len: usize) -> usize {
    let sum: usize = user_id.chars().map(|c| c as usize).sum();
    sum % len
}

/// Deterministic color for a user id: every peer renders the same user
/// with the same color without coordination.
pub fn collaborator_color(user_id: &str) -> &'static str {
    COLLABORATOR_COLORS[palette_index(user_id, COLLABORATOR_COLORS.len())]
}

/// Deterministic display name fallback for a user id.
pub fn collaborator_name(user_id: &str) -> &'static str {
    COLLABORATOR_NAMES[palette_index(user_id, COLLABORATOR_NAMES.len())]
}
