//! # coedit-collab — synchronization layer for collaborative editing
//!
//! Turns local editor events into wire messages and incoming wire
//! messages back into editor mutations, keeping one shared document
//! consistent across participants despite concurrent, unordered delivery.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   events    ┌────────────────┐   envelopes   ┌─────────┐
//! │ local editor │ ──────────► │ SyncController │ ────────────► │ channel │
//! │  (host app)  │ ◄────────── │                │ ◄──────────── │         │
//! └──────────────┘  mutations  └───────┬────────┘               └─────────┘
//!                                      │
//!                              ┌───────┴────────┐
//!                              │ OverlayRegistry│  (remote carets
//!                              │  × cursor/sel  │   and selections)
//!                              └────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] — envelope + tagged payload union
//! - [`codec`] — pluggable compress-then-serialize payload codecs
//! - [`participant`] — ids, labels, stable overlay colors
//! - [`overlay`] — one remote caret/selection widget with its lifecycle
//! - [`registry`] — idempotent per-participant overlay registry
//! - [`channel`] — transport contract + in-process [`LocalHub`]
//! - [`controller`] — the orchestrator tying it all together
//!
//! Consistency is best-effort by design: stale and duplicate edits are
//! rejected by document version, not reconciled — there is no OT/CRDT
//! convergence guarantee.

pub mod channel;
pub mod codec;
pub mod controller;
pub mod overlay;
pub mod participant;
pub mod protocol;
pub mod registry;

// Re-exports for convenience
pub use channel::{ChannelError, ChannelEvent, HubEndpoint, HubReceiver, LocalHub, MessageChannel};
pub use codec::{CodecError, Lz4Codec, PayloadCodec, PlainCodec};
pub use controller::{SessionState, SyncController};
pub use overlay::{OverlayKind, OverlayState, RemoteOverlay, TooltipTimer};
pub use participant::{generate_session_id, OverlayColor, Participant};
pub use protocol::{Envelope, MessagePayload, ProtocolError};
pub use registry::OverlayRegistry;
