//! # Cowrite Engine
//!
//! Client-side core of the cowrite real-time collaborative editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ local user input → steps                    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ session: apply + history + batch emission   │
//! │  - local steps: atomic apply, undo record,  │
//! │    one fire-and-forget doc-change batch     │
//! │  - remote batches: echo/document filter,    │
//! │    per-step decode+apply, no history        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ presence: peer registry + remapping +       │
//! │ derived decorations                         │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Explicit origin**: every transaction is Local or Remote; there is
//!    no ambient "receiving" flag to get stuck
//! 2. **Echo suppression**: a client never treats its own batch as input
//! 3. **Per-step fault isolation**: one bad remote step is skipped and
//!    logged, never aborting its batch or the editor
//! 4. **Eventual convergence**: batches across senders are unordered;
//!    step-mapping tolerance keeps divergence small and self-correcting
//! 5. **Network optional**: every component works unconnected
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cowrite_engine::{CollabSession, PresenceTracker, RichDoc, Schema, Step};
//!
//! let mut session = CollabSession::new("doc-1", "user-a", Schema::basic(), RichDoc::new());
//! session.connect(room_tx.clone());
//!
//! let mut presence = PresenceTracker::new("doc-1", "user-a");
//! presence.connect(room_tx);
//!
//! // Local edit: applies, records undo, emits one batch.
//! let txn = session.apply_local(vec![Step::insert(0, "hello")])?;
//! presence.remap(txn.mapping(), session.doc().len());
//! ```

pub mod codec;
mod doc;
mod errors;
mod history;
pub mod presence;
pub mod protocol;
mod schema;
mod session;
mod steps;
mod transaction;

pub use doc::{ApplyError, RichDoc, Span};
pub use errors::EngineError;
pub use history::{History, LocalChange};
pub use presence::{Decoration, PeerPresence, PresenceTracker, SELECTION_POLL_MS, STALE_AFTER_MS};
pub use protocol::{
    collaborator_color, collaborator_name, room_id, CollaboratorDisconnect, CursorUpdate,
    DocChangeEvent, RoomMessage, SelectionRange,
};
pub use schema::Schema;
pub use session::CollabSession;
pub use steps::{Mapping, Step, StepMap};
pub use transaction::{Transaction, TransactionOrigin};

pub use codec::{decode, encode, CodecError};
