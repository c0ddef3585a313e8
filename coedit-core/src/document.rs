//! Versioned text buffer shared with remote participants.
//!
//! [`TextDocument`] owns the flattened document text and the monotonic
//! version counter that every outgoing and incoming edit message is
//! checked against. Edits apply through two paths:
//!
//! - [`TextDocument::apply_edits`] — the local path: the version advances
//!   by exactly one per change set.
//! - [`TextDocument::apply_edits_versioned`] — the remote path: the
//!   version is set to the value carried by the accepted message, so both
//!   sides agree on the version an edit produced.
//!
//! Spans are char ranges and clamp to the buffer rather than failing; a
//! malformed remote range degrades to a harmless edit at the end of the
//! document instead of a panic.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::coords::{self, Position};

/// One replacement to perform: swap the chars in `span` for `text`.
///
/// An empty span inserts, empty text deletes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Char range to replace, addressed against the buffer as left by the
    /// previous edit in the same change set.
    pub span: Range<usize>,
    /// Replacement text.
    pub text: String,
}

impl Edit {
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self { span: offset..offset, text: text.into() }
    }

    pub fn delete(span: Range<usize>) -> Self {
        Self { span, text: String::new() }
    }

    pub fn replace(span: Range<usize>, text: impl Into<String>) -> Self {
        Self { span, text: text.into() }
    }
}

/// One applied change, described in pre-edit coordinates.
///
/// This is the shape that crosses the wire: the replaced range as both a
/// position pair and a flat offset, plus the inserted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChange {
    /// Start of the replaced range.
    pub start: Position,
    /// End of the replaced range.
    pub end: Position,
    /// Char offset of `start` in the pre-edit text.
    pub range_offset: usize,
    /// Inserted text (empty for a pure deletion).
    pub text: String,
}

/// Emitted by every apply. `version` is the document version after the
/// change set was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub version: u64,
    pub changes: Vec<TextChange>,
}

/// The shared text buffer plus its version counter.
#[derive(Debug, Clone, Default)]
pub struct TextDocument {
    text: String,
    version: u64,
}

impl TextDocument {
    /// Empty document at version 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Document with initial content, still at version 0.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self { text: text.into(), version: 0 }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len_chars(&self) -> usize {
        self.text.chars().count()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Offset → position against the current snapshot.
    pub fn offset_to_position(&self, offset: usize) -> Position {
        coords::offset_to_position(&self.text, offset)
    }

    /// Position → offset against the current snapshot.
    pub fn position_to_offset(&self, pos: Position) -> usize {
        coords::position_to_offset(&self.text, pos)
    }

    /// Apply a locally-originated change set. Advances the version by one.
    pub fn apply_edits(&mut self, edits: &[Edit]) -> ChangeEvent {
        let changes = edits.iter().map(|e| self.splice(e.span.clone(), &e.text)).collect();
        self.version += 1;
        ChangeEvent { version: self.version, changes }
    }

    /// Apply a remotely-originated change set that was produced at
    /// `version`. Each change's carried range is translated against the
    /// buffer as left by the previous change, then spliced. The caller has
    /// already verified `version` is strictly newer than the current one;
    /// afterwards the document version equals the carried value.
    ///
    /// The returned event re-describes every change in local pre-splice
    /// coordinates (its `range_offset` is the translated start offset).
    pub fn apply_changes_versioned(&mut self, changes: &[TextChange], version: u64) -> ChangeEvent {
        debug_assert!(version > self.version, "remote version must be strictly newer");
        let applied = changes
            .iter()
            .map(|c| {
                let start = coords::position_to_offset(&self.text, c.start);
                let end = coords::position_to_offset(&self.text, c.end).max(start);
                self.splice(start..end, &c.text)
            })
            .collect();
        self.version = version;
        ChangeEvent { version: self.version, changes: applied }
    }

    /// Replace one char span, recording the pre-edit coordinates.
    fn splice(&mut self, span: Range<usize>, replacement: &str) -> TextChange {
        let len = self.len_chars();
        let start = span.start.min(len);
        let end = span.end.clamp(start, len);
        if start != span.start || end != span.end {
            log::trace!("edit span {:?} clamped to {start}..{end} (len {len})", span);
        }

        let start_pos = coords::offset_to_position(&self.text, start);
        let end_pos = coords::offset_to_position(&self.text, end);
        let byte_start = self.byte_index(start);
        let byte_end = self.byte_index(end);
        self.text.replace_range(byte_start..byte_end, replacement);

        TextChange {
            start: start_pos,
            end: end_pos,
            range_offset: start,
            text: replacement.to_string(),
        }
    }

    fn byte_index(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }
}
