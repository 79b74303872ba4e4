//! # Steps
//!
//! Atomic, invertible document mutations and position mapping.
//!
//! ## Design Principles
//!
//! 1. **Atomic**: a step either applies fully or leaves the document untouched
//! 2. **Invertible**: the inverse is computed against the pre-application document
//! 3. **Version-relative**: a step is meaningful only against the document
//!    state it was created for; applying it elsewhere may fail, and the
//!    caller decides whether that failure is fatal (local edits) or
//!    skippable (remote batches)
//!
//! ## Mapping Semantics
//!
//! Every applied step yields a [`StepMap`] describing how positions move:
//! positions before the replaced range are unchanged, positions after it
//! shift by the length delta, positions inside a deleted range clamp to its
//! start. Mark steps never move positions.

use crate::doc::{ApplyError, RichDoc, Span};

/// One atomic document mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Replace `from..to` with `content`. Insert when `from == to`,
    /// delete when `content` is empty.
    Replace {
        from: usize,
        to: usize,
        content: Vec<Span>,
    },

    /// Add a mark to every character in `from..to`.
    AddMark {
        from: usize,
        to: usize,
        mark: String,
    },

    /// Remove a mark from every character in `from..to`.
    RemoveMark {
        from: usize,
        to: usize,
        mark: String,
    },
}

impl Step {
    /// Insert plain text at a position.
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Step::Replace {
            from: at,
            to: at,
            content: vec![Span::text(text)],
        }
    }

    /// Delete the characters in `from..to`.
    pub fn delete(from: usize, to: usize) -> Self {
        Step::Replace {
            from,
            to,
            content: Vec::new(),
        }
    }

    /// Apply to `doc`, returning the position map for this step.
    ///
    /// On error the document is unchanged.
    pub fn apply(&self, doc: &mut RichDoc) -> Result<StepMap, ApplyError> {
        match self {
            Step::Replace { from, to, content } => {
                // delete validates the whole range up front; once it
                // succeeds the insert position is guaranteed in bounds,
                // so a failed step never leaves a half-applied replace.
                doc.delete(*from, *to)?;
                let inserted = doc.insert(*from, content)?;
                Ok(StepMap::replaced(*from, to - from, inserted))
            }
            Step::AddMark { from, to, mark } => {
                doc.add_mark(*from, *to, mark)?;
                Ok(StepMap::identity())
            }
            Step::RemoveMark { from, to, mark } => {
                doc.remove_mark(*from, *to, mark)?;
                Ok(StepMap::identity())
            }
        }
    }

    /// The step that undoes this one, computed against the document as it
    /// is *before* this step applies.
    pub fn invert(&self, doc_before: &RichDoc) -> Result<Step, ApplyError> {
        match self {
            Step::Replace { from, to, content } => {
                let removed = doc_before.slice(*from, *to)?;
                let inserted_len: usize = content.iter().map(Span::len).sum();
                Ok(Step::Replace {
                    from: *from,
                    to: from + inserted_len,
                    content: removed,
                })
            }
            Step::AddMark { from, to, mark } => Ok(Step::RemoveMark {
                from: *from,
                to: *to,
                mark: mark.clone(),
            }),
            Step::RemoveMark { from, to, mark } => Ok(Step::AddMark {
                from: *from,
                to: *to,
                mark: mark.clone(),
            }),
        }
    }

    /// Mark type names this step references, for schema validation.
    pub fn mark_types(&self) -> Vec<&str> {
        match self {
            Step::Replace { content, .. } => content
                .iter()
                .flat_map(|span| span.marks.iter().map(String::as_str))
                .collect(),
            Step::AddMark { mark, .. } | Step::RemoveMark { mark, .. } => {
                vec![mark.as_str()]
            }
        }
    }
}

/// Position mapping for one applied step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepMap {
    start: usize,
    old_len: usize,
    new_len: usize,
}

impl StepMap {
    /// The map of a step that moves nothing (mark changes).
    pub fn identity() -> Self {
        Self {
            start: 0,
            old_len: 0,
            new_len: 0,
        }
    }

    /// The map of replacing `old_len` characters at `start` with `new_len`.
    pub fn replaced(start: usize, old_len: usize, new_len: usize) -> Self {
        Self {
            start,
            old_len,
            new_len,
        }
    }

    /// Translate a position through this step.
    ///
    /// Positions inside the replaced range clamp to its start.
    pub fn map(&self, pos: usize) -> usize {
        if pos <= self.start {
            pos
        } else if pos >= self.start + self.old_len {
            pos - self.old_len + self.new_len
        } else {
            self.start
        }
    }
}

/// Ordered composition of the step maps of one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    /// Translate a position through every step in application order.
    pub fn map(&self, pos: usize) -> usize {
        self.maps.iter().fold(pos, |p, m| m.map(p))
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }
}
