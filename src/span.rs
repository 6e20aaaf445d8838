//! Source spans.
//!
//! A `Span` is a half-open byte range into the source buffer of the file
//! being checked. Spans are attached to expression nodes when the tree is
//! built and flow unchanged into diagnostics; this crate never re-derives
//! positions from text.

use serde::{Deserialize, Serialize};

/// A half-open `[start, end)` byte range in a source file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// An empty span at offset zero, used for synthesized nodes.
    pub const SYNTHESIZED: Span = Span { start: 0, end: 0 };

    pub fn new(start: u32, end: u32) -> Span {
        debug_assert!(start <= end);
        Span { start, end }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The smallest span covering both `self` and `other`.
    pub fn cover(&self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn contains(&self, offset: u32) -> bool {
        self.start <= offset && offset < self.end
    }
}
