//! # Collaboration Session
//!
//! The feedback-loop-safe bridge between local edit intent and network
//! step batches.
//!
//! Each session exclusively owns one replica of the document. Local
//! steps apply atomically, land in undo history, and are emitted as one
//! fire-and-forget batch. Inbound batches are filtered (own echoes,
//! cross-document strays), then each step is decoded and applied
//! independently: a bad step is skipped with a diagnostic and never
//! aborts the rest of its batch, never rolls back earlier steps, never
//! enters the undo history, and is never retried. The originating
//! client's subsequent edits are the correction mechanism.
//!
//! A session without an outbound channel is a fully usable single-user
//! editor; the network is optional, not a dependency.

use crate::codec;
use crate::doc::{ApplyError, RichDoc};
use crate::history::{History, LocalChange};
use crate::protocol::{DocChangeEvent, RoomMessage};
use crate::schema::Schema;
use crate::steps::{Mapping, Step};
use crate::transaction::{Transaction, TransactionOrigin};
use tokio::sync::mpsc::UnboundedSender;

pub struct CollabSession {
    document_id: String,
    user_id: String,
    schema: Schema,
    doc: RichDoc,
    history: History,
    outbound: Option<UnboundedSender<RoomMessage>>,
}

impl CollabSession {
    /// Offline session: fully usable, nothing is emitted.
    pub fn new(
        document_id: impl Into<String>,
        user_id: impl Into<String>,
        schema: Schema,
        doc: RichDoc,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            user_id: user_id.into(),
            schema,
            doc,
            history: History::new(),
            outbound: None,
        }
    }

    /// Attach the outbound channel toward the document room.
    pub fn connect(&mut self, outbound: UnboundedSender<RoomMessage>) {
        self.outbound = Some(outbound);
    }

    /// Detach from the network; the session keeps working single-user.
    pub fn disconnect(&mut self) {
        self.outbound = None;
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn doc(&self) -> &RichDoc {
        &self.doc
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Document size after the last applied change; the version counter
    /// stamped on outbound batches.
    pub fn version(&self) -> u64 {
        self.doc.len() as u64
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Apply locally-originated steps.
    ///
    /// All-or-nothing: a step that fails leaves the document as it was.
    /// On success the change is recorded for undo and emitted as one
    /// batch to the room.
    pub fn apply_local(&mut self, steps: Vec<Step>) -> Result<Transaction, ApplyError> {
        if steps.is_empty() {
            return Ok(Transaction::new(
                TransactionOrigin::Local,
                Vec::new(),
                Vec::new(),
                Mapping::new(),
                false,
            ));
        }

        // Stage against a working copy so a failing step cannot leave a
        // partially-applied batch behind.
        let mut work = self.doc.clone();
        let mut mapping = Mapping::new();
        let mut inverses = Vec::with_capacity(steps.len());

        for step in &steps {
            let inverse = step.invert(&work)?;
            mapping.push(step.apply(&mut work)?);
            // Undo replays inverses front to back, so newest goes first.
            inverses.insert(0, inverse);
        }

        self.doc = work;
        self.history.record(LocalChange {
            steps: steps.clone(),
            inverses: inverses.clone(),
        });
        self.emit(&steps);

        Ok(Transaction::new(
            TransactionOrigin::Local,
            steps,
            inverses,
            mapping,
            true,
        ))
    }

    /// Apply an inbound step batch from the room.
    ///
    /// Returns `None` when nothing changed: echoes of our own batches,
    /// batches for another document, and batches where every step failed
    /// to decode or apply. No empty transaction ever reaches the caller.
    pub fn apply_remote(&mut self, event: &DocChangeEvent) -> Option<Transaction> {
        if event.user_id == self.user_id {
            tracing::debug!(user_id = %self.user_id, "discarding echo of own batch");
            return None;
        }
        if event.document_id != self.document_id {
            tracing::debug!(
                got = %event.document_id,
                expected = %self.document_id,
                "discarding batch for another document"
            );
            return None;
        }

        let mut applied = Vec::new();
        let mut mapping = Mapping::new();

        for (index, raw) in event.steps.iter().enumerate() {
            let step = match codec::decode(raw, &self.schema) {
                Ok(step) => step,
                Err(err) => {
                    tracing::warn!(
                        user_id = %event.user_id,
                        step_index = index,
                        %err,
                        "skipping undecodable remote step"
                    );
                    continue;
                }
            };

            // Steps apply independently: a version-drift failure on one
            // must not abort its batch or roll back earlier steps.
            match step.apply(&mut self.doc) {
                Ok(map) => {
                    mapping.push(map);
                    applied.push(step);
                }
                Err(err) => {
                    tracing::warn!(
                        user_id = %event.user_id,
                        step_index = index,
                        %err,
                        "skipping inapplicable remote step"
                    );
                }
            }
        }

        if applied.is_empty() {
            return None;
        }

        Some(Transaction::new(
            TransactionOrigin::Remote {
                source_user_id: event.user_id.clone(),
            },
            applied,
            Vec::new(),
            mapping,
            false,
        ))
    }

    /// Undo the most recent local change.
    ///
    /// The inverse steps are ordinary document changes to peers, so they
    /// are emitted like any other local edit. Returns `None` when there
    /// is nothing to undo.
    pub fn undo(&mut self) -> Result<Option<Transaction>, ApplyError> {
        let Some(change) = self.history.pop_undo() else {
            return Ok(None);
        };

        let mut work = self.doc.clone();
        let mut mapping = Mapping::new();
        for inverse in &change.inverses {
            mapping.push(inverse.apply(&mut work)?);
        }

        self.doc = work;
        let steps = change.inverses.clone();
        self.history.push_redo(change);
        self.emit(&steps);

        Ok(Some(Transaction::new(
            TransactionOrigin::Local,
            steps,
            Vec::new(),
            mapping,
            false,
        )))
    }

    /// Reapply the most recently undone local change.
    pub fn redo(&mut self) -> Result<Option<Transaction>, ApplyError> {
        let Some(change) = self.history.pop_redo() else {
            return Ok(None);
        };

        let mut work = self.doc.clone();
        let mut mapping = Mapping::new();
        for step in &change.steps {
            mapping.push(step.apply(&mut work)?);
        }

        self.doc = work;
        let steps = change.steps.clone();
        self.history.restore(change);
        self.emit(&steps);

        Ok(Some(Transaction::new(
            TransactionOrigin::Local,
            steps,
            Vec::new(),
            mapping,
            false,
        )))
    }

    /// Fire-and-forget batch emission. No acknowledgement is required
    /// for correctness; a closed channel just means single-user mode.
    fn emit(&self, steps: &[Step]) {
        let Some(outbound) = &self.outbound else {
            return;
        };

        let mut encoded = Vec::with_capacity(steps.len());
        for step in steps {
            match codec::encode(step) {
                Ok(value) => encoded.push(value),
                Err(err) => {
                    tracing::error!(%err, "failed to encode outbound step");
                }
            }
        }
        if encoded.is_empty() {
            return;
        }

        let event = DocChangeEvent {
            document_id: self.document_id.clone(),
            user_id: self.user_id.clone(),
            steps: encoded,
            version: self.version(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        };

        let _ = outbound.send(RoomMessage::DocChange(event));
    }
}
