//! Coordinate translation between flat character offsets and
//! line/column positions.
//!
//! All functions are pure and operate against a specific text snapshot.
//! A `Position` computed against one snapshot is only meaningful against
//! that snapshot — re-derive after every edit.
//!
//! Offsets are zero-based indices over Unicode scalar values (chars),
//! never bytes. Positions are 1-based in both line and column.

use serde::{Deserialize, Serialize};

/// A 1-based line/column coordinate pair.
///
/// Ordering is lexicographic: line first, then column. The derived `Ord`
/// relies on the field order below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Convert a zero-based char offset into a line/column position.
///
/// Offsets past the end of the text clamp to the end.
pub fn offset_to_position(text: &str, offset: usize) -> Position {
    let mut line = 1u32;
    let mut column = 1u32;
    for (i, ch) in text.chars().enumerate() {
        if i == offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    Position { line, column }
}

/// Convert a line/column position back into a zero-based char offset
/// against the same snapshot.
///
/// Out-of-range input clamps: a column past the end of its line resolves
/// to the end of that line, a line past the end of the text resolves to
/// the end of the text.
pub fn position_to_offset(text: &str, pos: Position) -> usize {
    let mut line = 1u32;
    let mut column = 1u32;
    let mut offset = 0usize;
    for ch in text.chars() {
        if line == pos.line && column == pos.column {
            return offset;
        }
        if ch == '\n' {
            if line == pos.line {
                // Column past the end of the requested line.
                return offset;
            }
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
        offset += 1;
    }
    offset
}

/// Normalize two positions into an ordered `(start, end)` pair.
///
/// Equal positions come back unchanged — an empty range is valid.
pub fn order_positions(a: Position, b: Position) -> (Position, Position) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
