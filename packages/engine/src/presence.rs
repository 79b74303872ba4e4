//! # Presence Tracker
//!
//! Remote collaborators' cursors and selections, repositioned through
//! every document change and rendered as derived decorations.
//!
//! ## Lifecycle
//!
//! A peer record is created on its first `cursor-update`, refreshed on
//! every subsequent one, and removed on an explicit disconnect or when
//! `last_seen` falls behind the staleness window. Staleness is checked
//! opportunistically on every decoration recompute; there is no sweep
//! timer. Records live only in this tracker: every editor keeps its own
//! independent copy of every other participant's presence, and nothing
//! here touches document state or undo history.
//!
//! ## Local side
//!
//! Focus gain/loss emit immediately. Cursor movement is detected by
//! poll-based diffing against the last broadcast state, coalescing
//! keystroke-rate movement into a bounded emission rate; the embedder
//! drives the interval ([`SELECTION_POLL_MS`] is the suggested period).

use crate::protocol::{
    collaborator_color, collaborator_name, CollaboratorDisconnect, CursorUpdate, RoomMessage,
    SelectionRange,
};
use crate::steps::Mapping;
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;

/// A peer record with no update for this long is dropped on the next
/// decoration recompute.
pub const STALE_AFTER_MS: i64 = 30_000;

/// Suggested local selection-poll period. A tunable coalescing knob,
/// not a correctness constant.
pub const SELECTION_POLL_MS: u64 = 250;

/// Current wall-clock milliseconds, the timestamp base for `last_seen`.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// One remote collaborator as this editor last saw them.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerPresence {
    pub user_id: String,
    pub name: String,
    pub color: String,
    pub cursor: Option<usize>,
    pub selection: Option<SelectionRange>,
    pub last_seen: i64,
    pub is_active: bool,
}

/// A visual artifact derived from the peer registry. Regenerated from
/// scratch on every recompute; never stored as independent truth.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoration {
    /// Colored caret with a name label.
    Caret {
        user_id: String,
        label: String,
        color: String,
        pos: usize,
    },

    /// Translucent selection highlight, `from < to` always.
    Highlight {
        user_id: String,
        color: String,
        from: usize,
        to: usize,
    },
}

/// The last cursor state this editor broadcast about itself.
#[derive(Debug, Clone, PartialEq)]
struct LocalCursor {
    cursor: Option<usize>,
    selection: Option<SelectionRange>,
    is_active: bool,
}

pub struct PresenceTracker {
    document_id: String,
    user_id: String,
    user_name: String,
    color: String,
    peers: HashMap<String, PeerPresence>,
    last_broadcast: Option<LocalCursor>,
    outbound: Option<UnboundedSender<RoomMessage>>,
}

impl PresenceTracker {
    /// Tracker with the deterministic palette identity for `user_id`.
    pub fn new(document_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        let user_name = collaborator_name(&user_id).to_string();
        let color = collaborator_color(&user_id).to_string();
        Self {
            document_id: document_id.into(),
            user_id,
            user_name,
            color,
            peers: HashMap::new(),
            last_broadcast: None,
            outbound: None,
        }
    }

    /// Override the palette identity with a sourced display name/color.
    pub fn with_identity(mut self, name: impl Into<String>, color: impl Into<String>) -> Self {
        self.user_name = name.into();
        self.color = color.into();
        self
    }

    /// Attach the outbound channel toward the document room. Without
    /// one the tracker still tracks inbound presence; it just never
    /// announces the local cursor.
    pub fn connect(&mut self, outbound: UnboundedSender<RoomMessage>) {
        self.outbound = Some(outbound);
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Tracked peers, in no particular order.
    pub fn peers(&self) -> impl Iterator<Item = &PeerPresence> {
        self.peers.values()
    }

    pub fn peer(&self, user_id: &str) -> Option<&PeerPresence> {
        self.peers.get(user_id)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Record an inbound `cursor-update`. First sighting creates the
    /// record; later ones refresh it in place.
    ///
    /// Offsets are clamped to `[0, doc_len]` on the way in: the sender
    /// may have been looking at a longer document than this editor
    /// currently holds, and a stored peer position must always be a
    /// valid local offset. A selection that clamping collapses to a
    /// point is dropped.
    pub fn observe(&mut self, update: &CursorUpdate, now: i64, doc_len: usize) {
        if update.user_id == self.user_id || update.document_id != self.document_id {
            return;
        }

        let cursor = update.cursor.map(|pos| pos.min(doc_len));
        let selection = update.selection.and_then(|s| {
            let from = s.from.min(doc_len);
            let to = s.to.min(doc_len);
            (from < to).then_some(SelectionRange { from, to })
        });
        let entry = self
            .peers
            .entry(update.user_id.clone())
            .or_insert_with(|| {
                tracing::debug!(user_id = %update.user_id, "collaborator joined");
                PeerPresence {
                    user_id: update.user_id.clone(),
                    name: update.user_name.clone(),
                    color: update.color.clone(),
                    cursor: None,
                    selection: None,
                    last_seen: now,
                    is_active: false,
                }
            });

        entry.name = update.user_name.clone();
        entry.color = update.color.clone();
        entry.cursor = cursor;
        entry.selection = selection;
        entry.last_seen = now;
        entry.is_active = update.is_active;
    }

    /// Drop a peer on an explicit `collaborator-disconnect`.
    pub fn remove(&mut self, user_id: &str) {
        if self.peers.remove(user_id).is_some() {
            tracing::debug!(%user_id, "collaborator disconnected");
        }
    }

    /// Reposition every tracked cursor/selection through a document
    /// change. Offsets are mapped, clamped to `[0, doc_len]`, and a
    /// selection that collapses to a point becomes no selection.
    pub fn remap(&mut self, mapping: &Mapping, doc_len: usize) {
        for peer in self.peers.values_mut() {
            peer.cursor = peer.cursor.map(|pos| mapping.map(pos).min(doc_len));
            peer.selection = peer.selection.and_then(|sel| {
                let from = mapping.map(sel.from).min(doc_len);
                let to = mapping.map(sel.to).min(doc_len);
                (from < to).then_some(SelectionRange { from, to })
            });
        }
    }

    /// Regenerate decorations from the registry, purging stale peers
    /// first. Carets render only for active peers with an in-range
    /// cursor; highlights only for real (`from < to`) selections.
    pub fn decorations(&mut self, now: i64, doc_len: usize) -> Vec<Decoration> {
        self.peers.retain(|user_id, peer| {
            let fresh = now - peer.last_seen <= STALE_AFTER_MS;
            if !fresh {
                tracing::debug!(%user_id, "expiring stale collaborator");
            }
            fresh
        });

        let mut peers: Vec<&PeerPresence> = self.peers.values().collect();
        peers.sort_by(|a, b| a.user_id.cmp(&b.user_id));

        let mut decorations = Vec::new();
        for peer in peers {
            if let Some(sel) = peer.selection {
                if sel.from < sel.to && sel.to <= doc_len {
                    decorations.push(Decoration::Highlight {
                        user_id: peer.user_id.clone(),
                        color: peer.color.clone(),
                        from: sel.from,
                        to: sel.to,
                    });
                }
            }
            if peer.is_active {
                if let Some(pos) = peer.cursor {
                    if pos <= doc_len {
                        decorations.push(Decoration::Caret {
                            user_id: peer.user_id.clone(),
                            label: peer.name.clone(),
                            color: peer.color.clone(),
                            pos,
                        });
                    }
                }
            }
        }
        decorations
    }

    /// Announce the local cursor on focus gain.
    pub fn focus_gained(&mut self, cursor: Option<usize>, selection: Option<SelectionRange>) {
        self.broadcast(LocalCursor {
            cursor,
            selection: selection.filter(|s| s.from < s.to),
            is_active: true,
        });
    }

    /// Announce focus loss: peers hide the caret but keep the record.
    pub fn focus_lost(&mut self) {
        self.broadcast(LocalCursor {
            cursor: None,
            selection: None,
            is_active: false,
        });
    }

    /// Poll-based diffing of the local cursor while focused: emits only
    /// when the cursor or selection moved since the last broadcast.
    /// Returns whether an update went out.
    pub fn poll_selection(
        &mut self,
        cursor: Option<usize>,
        selection: Option<SelectionRange>,
    ) -> bool {
        let state = LocalCursor {
            cursor,
            selection: selection.filter(|s| s.from < s.to),
            is_active: true,
        };
        if self.last_broadcast.as_ref() == Some(&state) {
            return false;
        }
        self.broadcast(state);
        true
    }

    /// Tell peers to drop the local caret now instead of waiting out
    /// the staleness window. Call on editor/session close.
    pub fn teardown(&mut self) {
        if let Some(outbound) = &self.outbound {
            let _ = outbound.send(RoomMessage::Disconnect(CollaboratorDisconnect {
                user_id: self.user_id.clone(),
            }));
        }
        self.last_broadcast = None;
    }

    fn broadcast(&mut self, state: LocalCursor) {
        if let Some(outbound) = &self.outbound {
            let update = CursorUpdate {
                document_id: self.document_id.clone(),
                user_id: self.user_id.clone(),
                user_name: self.user_name.clone(),
                color: self.color.clone(),
                cursor: state.cursor,
                selection: state.selection,
                is_active: state.is_active,
            };
            let _ = outbound.send(RoomMessage::CursorUpdate(update));
        }
        self.last_broadcast = Some(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::StepMap;
    use tokio::sync::mpsc;

    fn update(user_id: &str, cursor: Option<usize>, selection: Option<SelectionRange>) -> CursorUpdate {
        CursorUpdate {
            document_id: "doc-1".to_string(),
            user_id: user_id.to_string(),
            user_name: "Peer".to_string(),
            color: "#039be5".to_string(),
            cursor,
            selection,
            is_active: true,
        }
    }

    fn tracker() -> PresenceTracker {
        PresenceTracker::new("doc-1", "user-a")
    }

    #[test]
    fn test_first_update_creates_record() {
        let mut tracker = tracker();
        tracker.observe(&update("user-b", Some(3), None), 1_000, 100);

        let peer = tracker.peer("user-b").unwrap();
        assert_eq!(peer.cursor, Some(3));
        assert_eq!(peer.last_seen, 1_000);
        assert!(peer.is_active);
    }

    #[test]
    fn test_refresh_updates_in_place() {
        let mut tracker = tracker();
        tracker.observe(&update("user-b", Some(3), None), 1_000, 100);
        tracker.observe(&update("user-b", Some(7), None), 2_000, 100);

        assert_eq!(tracker.peer_count(), 1);
        let peer = tracker.peer("user-b").unwrap();
        assert_eq!(peer.cursor, Some(7));
        assert_eq!(peer.last_seen, 2_000);
    }

    #[test]
    fn test_own_updates_are_ignored() {
        let mut tracker = tracker();
        tracker.observe(&update("user-a", Some(3), None), 1_000, 100);
        assert_eq!(tracker.peer_count(), 0);
    }

    #[test]
    fn test_cross_document_updates_are_ignored() {
        let mut tracker = tracker();
        let mut foreign = update("user-b", Some(3), None);
        foreign.document_id = "doc-other".to_string();

        tracker.observe(&foreign, 1_000, 100);
        assert_eq!(tracker.peer_count(), 0);
    }

    #[test]
    fn test_inbound_offsets_are_clamped() {
        let mut tracker = tracker();
        tracker.observe(
            &update("user-b", Some(40), Some(SelectionRange { from: 2, to: 50 })),
            1_000,
            10,
        );

        let peer = tracker.peer("user-b").unwrap();
        assert_eq!(peer.cursor, Some(10));
        assert_eq!(peer.selection, Some(SelectionRange { from: 2, to: 10 }));
    }

    #[test]
    fn test_selection_collapsed_by_clamping_is_dropped() {
        let mut tracker = tracker();
        tracker.observe(
            &update("user-b", Some(20), Some(SelectionRange { from: 15, to: 20 })),
            1_000,
            10,
        );

        let peer = tracker.peer("user-b").unwrap();
        assert_eq!(peer.cursor, Some(10));
        assert_eq!(peer.selection, None);
    }

    #[test]
    fn test_explicit_disconnect_removes_record() {
        let mut tracker = tracker();
        tracker.observe(&update("user-b", Some(3), None), 1_000, 100);
        tracker.remove("user-b");
        assert_eq!(tracker.peer_count(), 0);
    }

    #[test]
    fn test_remap_through_insertion() {
        let mut tracker = tracker();
        tracker.observe(&update("user-b", Some(10), None), 1_000, 100);

        // Insert 5 characters at position 3.
        let mut mapping = Mapping::new();
        mapping.push(StepMap::replaced(3, 0, 5));
        tracker.remap(&mapping, 100);

        assert_eq!(tracker.peer("user-b").unwrap().cursor, Some(15));
    }

    #[test]
    fn test_remap_through_deletion() {
        let mut tracker = tracker();
        tracker.observe(&update("user-b", Some(10), None), 1_000, 100);

        // Delete [3, 8).
        let mut mapping = Mapping::new();
        mapping.push(StepMap::replaced(3, 5, 0));
        tracker.remap(&mapping, 100);

        assert_eq!(tracker.peer("user-b").unwrap().cursor, Some(5));
    }

    #[test]
    fn test_remap_clamps_to_doc_size() {
        let mut tracker = tracker();
        tracker.observe(&update("user-b", Some(10), None), 1_000, 100);

        tracker.remap(&Mapping::new(), 4);
        assert_eq!(tracker.peer("user-b").unwrap().cursor, Some(4));
    }

    #[test]
    fn test_selection_collapse_after_remap() {
        let mut tracker = tracker();
        tracker.observe(
            &update("user-b", None, Some(SelectionRange { from: 4, to: 7 })),
            1_000,
            100,
        );

        // Deleting [4, 7) collapses the selection to a point.
        let mut mapping = Mapping::new();
        mapping.push(StepMap::replaced(4, 3, 0));
        tracker.remap(&mapping, 100);

        assert_eq!(tracker.peer("user-b").unwrap().selection, None);
    }

    #[test]
    fn test_zero_width_selection_is_not_tracked() {
        let mut tracker = tracker();
        tracker.observe(
            &update("user-b", Some(5), Some(SelectionRange { from: 5, to: 5 })),
            1_000,
            100,
        );

        assert_eq!(tracker.peer("user-b").unwrap().selection, None);
        let decorations = tracker.decorations(1_000, 100);
        assert!(decorations
            .iter()
            .all(|d| !matches!(d, Decoration::Highlight { .. })));
    }

    #[test]
    fn test_stale_peer_produces_no_decorations() {
        let mut tracker = tracker();
        tracker.observe(&update("user-b", Some(3), None), 1_000, 100);

        // Just inside the window: still rendered.
        assert_eq!(tracker.decorations(1_000 + STALE_AFTER_MS, 100).len(), 1);

        // Past the window: purged with no disconnect event needed.
        tracker.observe(&update("user-b", Some(3), None), 1_000, 100);
        assert!(tracker
            .decorations(1_000 + STALE_AFTER_MS + 1, 100)
            .is_empty());
        assert_eq!(tracker.peer_count(), 0);
    }

    #[test]
    fn test_inactive_peer_has_no_caret() {
        let mut tracker = tracker();
        let mut blurred = update("user-b", None, None);
        blurred.is_active = false;
        tracker.observe(&blurred, 1_000, 100);

        assert!(tracker.decorations(1_000, 100).is_empty());
        assert_eq!(tracker.peer_count(), 1, "record survives focus loss");
    }

    #[test]
    fn test_decorations_carry_identity() {
        let mut tracker = tracker();
        tracker.observe(
            &update("user-b", Some(2), Some(SelectionRange { from: 0, to: 2 })),
            1_000,
            100,
        );

        let decorations = tracker.decorations(1_000, 100);
        assert_eq!(
            decorations,
            vec![
                Decoration::Highlight {
                    user_id: "user-b".to_string(),
                    color: "#039be5".to_string(),
                    from: 0,
                    to: 2,
                },
                Decoration::Caret {
                    user_id: "user-b".to_string(),
                    label: "Peer".to_string(),
                    color: "#039be5".to_string(),
                    pos: 2,
                },
            ]
        );
    }

    #[test]
    fn test_focus_gain_and_loss_emission() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tracker = tracker();
        tracker.connect(tx);

        tracker.focus_gained(Some(4), None);
        let RoomMessage::CursorUpdate(up) = rx.try_recv().unwrap() else {
            panic!("expected cursor-update");
        };
        assert!(up.is_active);
        assert_eq!(up.cursor, Some(4));

        tracker.focus_lost();
        let RoomMessage::CursorUpdate(up) = rx.try_recv().unwrap() else {
            panic!("expected cursor-update");
        };
        assert!(!up.is_active);
        assert_eq!(up.cursor, None);
    }

    #[test]
    fn test_poll_emits_only_on_change() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tracker = tracker();
        tracker.connect(tx);

        assert!(tracker.poll_selection(Some(4), None));
        assert!(!tracker.poll_selection(Some(4), None));
        assert!(tracker.poll_selection(Some(5), None));

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_teardown_emits_disconnect() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tracker = tracker();
        tracker.connect(tx);

        tracker.teardown();
        let RoomMessage::Disconnect(event) = rx.try_recv().unwrap() else {
            panic!("expected collaborator-disconnect");
        };
        assert_eq!(event.user_id, "user-a");
    }

    #[test]
    fn test_unconnected_tracker_still_tracks() {
        let mut tracker = tracker();
        tracker.focus_gained(Some(1), None);
        tracker.observe(&update("user-b", Some(3), None), 1_000, 100);
        assert_eq!(tracker.peer_count(), 1);
    }
}
