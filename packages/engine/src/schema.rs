//! Schema context: the mark types the local editor understands.
//!
//! Decoding a step validates every referenced mark type against the
//! schema, so a peer running a richer editor build cannot inject content
//! the local document model has no meaning for.

use std::collections::BTreeSet;

/// The set of mark type names known to this editor instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    marks: BTreeSet<String>,
}

impl Schema {
    /// The default rich-text mark set.
    pub fn basic() -> Self {
        Self::with_marks(["bold", "italic", "underline", "strike", "code", "link"])
    }

    /// A schema with a custom mark set.
    pub fn with_marks(marks: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            marks: marks.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `mark` is a known mark type.
    pub fn has_mark(&self, mark: &str) -> bool {
        self.marks.contains(mark)
    }

    /// Known mark type names, in sorted order.
    pub fn marks(&self) -> impl Iterator<Item = &str> {
        self.marks.iter().map(String::as_str)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::basic()
    }
}
