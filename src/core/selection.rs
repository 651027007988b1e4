//! Selection Model
//!
//! Positions, ranges and selections in host coordinates:
//! - zero-based line numbers
//! - columns counted in Unicode scalar values
//! - selections carry direction (anchor to active end)

use std::cmp::{max, min};
use std::fmt;

// =============================================================================
// POSITION
// =============================================================================

/// A location in a document. Orders by line, then column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

impl Position {
    pub const fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }

    /// Position reached after inserting `text` at `self`
    pub fn advance(self, text: &str) -> Self {
        match text.rfind('\n') {
            Some(last_newline) => Self {
                line: self.line + text.matches('\n').count(),
                character: text[last_newline + 1..].chars().count(),
            },
            None => Self {
                line: self.line,
                character: self.character + text.chars().count(),
            },
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.line, self.character)
    }
}

// =============================================================================
// RANGE
// =============================================================================

/// A normalized span, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    /// Create a range from two positions in any order
    pub fn new(a: Position, b: Position) -> Self {
        Self {
            start: min(a, b),
            end: max(a, b),
        }
    }

    /// Zero-width range at `pos`
    pub fn point(pos: Position) -> Self {
        Self { start: pos, end: pos }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if a position is within the range (end inclusive)
    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos <= self.end
    }

    /// Ranges intersect when they share at least one position; touching ranges intersect.
    pub fn intersects(&self, other: &Range) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Check if two ranges share more than a boundary
    pub fn overlaps(&self, other: &Range) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Union of two ranges
    pub fn merge(&self, other: &Range) -> Self {
        Self {
            start: min(self.start, other.start),
            end: max(self.end, other.end),
        }
    }
}

/// Sort ranges and merge any that overlap, so the result can go out as one
/// edit batch. Identical empty ranges collapse into one.
pub fn merge_overlapping(mut ranges: Vec<Range>) -> Vec<Range> {
    ranges.sort_by_key(|range| (range.start, range.end));
    let mut merged: Vec<Range> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if last.overlaps(&range) || *last == range => *last = last.merge(&range),
            _ => merged.push(range),
        }
    }
    merged
}

// =============================================================================
// SELECTION
// =============================================================================

/// A text selection on a surface
///
/// The anchor is where the selection started, `active` is the cursor.
/// They can be in any order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Selection {
    pub anchor: Position,
    pub active: Position,
}

impl Selection {
    pub fn new(anchor: Position, active: Position) -> Self {
        Self { anchor, active }
    }

    /// Create a caret (empty selection) at a single point
    pub fn caret(pos: Position) -> Self {
        Self {
            anchor: pos,
            active: pos,
        }
    }

    /// Check if this is a caret (no range)
    pub fn is_empty(&self) -> bool {
        self.anchor == self.active
    }

    /// Get the start of the selection (smaller position)
    pub fn start(&self) -> Position {
        min(self.anchor, self.active)
    }

    /// Get the end of the selection (larger position)
    pub fn end(&self) -> Position {
        max(self.anchor, self.active)
    }

    pub fn range(&self) -> Range {
        Range::new(self.anchor, self.active)
    }

    /// Collapse to a caret at the active end
    pub fn collapse(&self) -> Self {
        Self::caret(self.active)
    }
}
