//! # coedit-core — document model for collaborative editing
//!
//! The version-counted text buffer and coordinate system that the
//! `coedit-collab` synchronization layer builds on.
//!
//! ## Modules
//!
//! - [`coords`] — stateless offset↔position translation and range ordering
//! - [`document`] — [`TextDocument`]: versioned buffer + edit application
//!
//! Offsets are zero-based char indices into the flattened text; positions
//! are 1-based line/column pairs. Both are relative to a specific document
//! version and must be re-derived after every edit.

pub mod coords;
pub mod document;

pub use coords::{offset_to_position, order_positions, position_to_offset, Position};
pub use document::{ChangeEvent, Edit, TextChange, TextDocument};
