//! # Step Codec
//!
//! Converts steps to/from a transport-safe JSON representation.
//!
//! Encoding is lossless: `decode(encode(step))` applied at the same base
//! document version yields the same resulting document as applying the
//! original step. Decoding validates every referenced mark type against
//! the local [`Schema`]; an unknown type is a per-step [`CodecError`],
//! never a panic into the caller's batch loop.

use crate::doc::Span;
use crate::schema::Schema;
use crate::steps::Step;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("malformed step: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown mark type: {0}")]
    UnknownMark(String),
}

/// Wire shape of a step. Kept separate from [`Step`] so the in-memory
/// representation can evolve without changing the transport format.
#[derive(Serialize, Deserialize)]
#[serde(tag = "stepType", rename_all = "camelCase")]
enum WireStep {
    #[serde(rename_all = "camelCase")]
    Replace {
        from: usize,
        to: usize,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<Span>,
    },
    #[serde(rename_all = "camelCase")]
    AddMark { from: usize, to: usize, mark: String },
    #[serde(rename_all = "camelCase")]
    RemoveMark { from: usize, to: usize, mark: String },
}

/// Encode a step for transport.
pub fn encode(step: &Step) -> Result<Value, CodecError> {
    let wire = match step {
        Step::Replace { from, to, content } => WireStep::Replace {
            from: *from,
            to: *to,
            content: content.clone(),
        },
        Step::AddMark { from, to, mark } => WireStep::AddMark {
            from: *from,
            to: *to,
            mark: mark.clone(),
        },
        Step::RemoveMark { from, to, mark } => WireStep::RemoveMark {
            from: *from,
            to: *to,
            mark: mark.clone(),
        },
    };
    Ok(serde_json::to_value(wire)?)
}

/// Decode a step received from a peer, validating mark types against the
/// local schema.
pub fn decode(value: &Value, schema: &Schema) -> Result<Step, CodecError> {
    let wire: WireStep = serde_json::from_value(value.clone())?;

    let step = match wire {
        WireStep::Replace { from, to, content } => Step::Replace { from, to, content },
        WireStep::AddMark { from, to, mark } => Step::AddMark { from, to, mark },
        WireStep::RemoveMark { from, to, mark } => Step::RemoveMark { from, to, mark },
    };

    for mark in step.mark_types() {
        if !schema.has_mark(mark) {
            return Err(CodecError::UnknownMark(mark.to_string()));
        }
    }

    Ok(step)
}
