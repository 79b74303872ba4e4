//! # Rich-Text Document Model
//!
//! Minimal marked-text document that steps apply against.
//!
//! A document is a sequence of characters, each carrying a set of mark
//! type names (bold, italic, ...). All positions are character offsets
//! in `[0, len]`. Range operations bounds-check and return `ApplyError`
//! instead of panicking; a failed operation leaves the document untouched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors from applying a structural edit at an invalid position.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApplyError {
    #[error("position {pos} out of bounds for document of size {len}")]
    OutOfBounds { pos: usize, len: usize },

    #[error("invalid range {from}..{to}")]
    InvalidRange { from: usize, to: usize },
}

/// A contiguous run of identically-marked text.
///
/// The content unit inside Replace steps and document slices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,

    /// Mark type names applied to every character of `text`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<String>,
}

impl Span {
    /// Plain unmarked text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    /// Text carrying the given marks.
    pub fn marked(text: impl Into<String>, marks: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            text: text.into(),
            marks: marks.into_iter().map(Into::into).collect(),
        }
    }

    /// Character length of this span.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Glyph {
    ch: char,
    marks: BTreeSet<String>,
}

/// A rich-text document: marked characters addressed by offset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RichDoc {
    glyphs: Vec<Glyph>,
}

impl RichDoc {
    /// Empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Document from plain unmarked text.
    pub fn from_text(text: &str) -> Self {
        Self {
            glyphs: text
                .chars()
                .map(|ch| Glyph {
                    ch,
                    marks: BTreeSet::new(),
                })
                .collect(),
        }
    }

    /// Number of characters.
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Plain text content, marks stripped.
    pub fn text(&self) -> String {
        self.glyphs.iter().map(|g| g.ch).collect()
    }

    /// Content of `from..to` as spans, consecutive identically-marked
    /// characters coalesced.
    pub fn slice(&self, from: usize, to: usize) -> Result<Vec<Span>, ApplyError> {
        self.check_range(from, to)?;

        let mut spans: Vec<Span> = Vec::new();
        let mut current: Option<(String, BTreeSet<String>)> = None;

        for glyph in &self.glyphs[from..to] {
            match &mut current {
                Some((text, marks)) if *marks == glyph.marks => text.push(glyph.ch),
                _ => {
                    if let Some((text, marks)) = current.take() {
                        spans.push(Span {
                            text,
                            marks: marks.into_iter().collect(),
                        });
                    }
                    current = Some((glyph.ch.to_string(), glyph.marks.clone()));
                }
            }
        }

        if let Some((text, marks)) = current {
            spans.push(Span {
                text,
                marks: marks.into_iter().collect(),
            });
        }

        Ok(spans)
    }

    /// Full document content as spans.
    pub fn spans(&self) -> Vec<Span> {
        // Range is always valid for 0..len.
        self.slice(0, self.len()).unwrap_or_default()
    }

    /// Insert spans at `at`. Returns the number of characters inserted.
    pub fn insert(&mut self, at: usize, content: &[Span]) -> Result<usize, ApplyError> {
        if at > self.len() {
            return Err(ApplyError::OutOfBounds {
                pos: at,
                len: self.len(),
            });
        }

        let new_glyphs: Vec<Glyph> = content
            .iter()
            .flat_map(|span| {
                let marks: BTreeSet<String> = span.marks.iter().cloned().collect();
                span.text
                    .chars()
                    .map(move |ch| Glyph {
                        ch,
                        marks: marks.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        let inserted = new_glyphs.len();
        self.glyphs.splice(at..at, new_glyphs);
        Ok(inserted)
    }

    /// Delete the characters in `from..to`.
    pub fn delete(&mut self, from: usize, to: usize) -> Result<(), ApplyError> {
        self.check_range(from, to)?;
        self.glyphs.drain(from..to);
        Ok(())
    }

    /// Add a mark to every character in `from..to`.
    pub fn add_mark(&mut self, from: usize, to: usize, mark: &str) -> Result<(), ApplyError> {
        self.check_range(from, to)?;
        for glyph in &mut self.glyphs[from..to] {
            glyph.marks.insert(mark.to_string());
        }
        Ok(())
    }

    /// Remove a mark from every character in `from..to`.
    pub fn remove_mark(&mut self, from: usize, to: usize, mark: &str) -> Result<(), ApplyError> {
        self.check_range(from, to)?;
        for glyph in &mut self.glyphs[from..to] {
            glyph.marks.remove(mark);
        }
        Ok(())
    }

    /// Mark type names on the character at `pos`.
    pub fn marks_at(&self, pos: usize) -> Option<Vec<String>> {
        self.glyphs
            .get(pos)
            .map(|g| g.marks.iter().cloned().collect())
    }

    fn check_range(&self, from: usize, to: usize) -> Result<(), ApplyError> {
        if from > to {
            return Err(ApplyError::InvalidRange { from, to });
        }
        if to > self.len() {
            return Err(ApplyError::OutOfBounds {
                pos: to,
                len: self.len(),
            });
        }
        Ok(())
    }
}
