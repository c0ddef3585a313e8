//! Content synchronization controller.
//!
//! The orchestrator between the local editor and the channel:
//!
//! ```text
//! local edit / cursor / selection
//!       │
//!       ▼
//! SyncController (outbound) ──► codec.encode ──► channel.send
//!
//! channel event
//!       │
//!       ▼
//! SyncController (inbound) ──► codec.decode ──► { apply edit to document,
//!                                                reposition overlay }
//! ```
//!
//! Consistency rests on the document version, not on transport ordering:
//! an outbound change whose version predates the document is superseded
//! and never sent; an inbound edit is applied only when its version is
//! strictly newer than the document. The two checks are intentionally
//! asymmetric — an outbound event at the current version is the normal
//! just-applied local edit, while an inbound edit at the current version
//! is by definition already reflected locally.
//!
//! Remote edits are applied straight to the document and never re-enter
//! the outbound path, so a session cannot echo back what it received.

use coedit_core::{order_positions, ChangeEvent, Edit, Position, TextChange, TextDocument};

use crate::channel::{ChannelEvent, MessageChannel};
use crate::codec::{Lz4Codec, PayloadCodec};
use crate::overlay::OverlayKind;
use crate::participant::Participant;
use crate::protocol::{Envelope, MessagePayload};
use crate::registry::OverlayRegistry;

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No channel attached: a plain editor with no synchronization side
    /// effects.
    LocalOnly,
    /// Channel attached, messages flowing.
    Active,
    /// Disposed; every operation is a no-op.
    Disposed,
}

/// Orchestrates one participant's view of a shared document.
///
/// Owns the document, the overlay registries for everyone else, and the
/// optional channel. All methods are called from the host's single event
/// loop; nothing here blocks or spawns.
pub struct SyncController {
    local_id: String,
    document: TextDocument,
    channel: Option<Box<dyn MessageChannel>>,
    codec: Box<dyn PayloadCodec>,
    cursors: OverlayRegistry,
    selections: OverlayRegistry,
    state: SessionState,
}

impl SyncController {
    /// Local-only session around `document`. Attach a channel with
    /// [`SyncController::with_channel`] to go live.
    pub fn new(local_id: impl Into<String>, document: TextDocument) -> Self {
        Self {
            local_id: local_id.into(),
            document,
            channel: None,
            codec: Box::new(Lz4Codec),
            cursors: OverlayRegistry::new(OverlayKind::Cursor),
            selections: OverlayRegistry::new(OverlayKind::Selection),
            state: SessionState::LocalOnly,
        }
    }

    /// Attach the channel and activate synchronization.
    pub fn with_channel(mut self, channel: impl MessageChannel + 'static) -> Self {
        self.channel = Some(Box::new(channel));
        self.state = SessionState::Active;
        self
    }

    /// Swap the payload codec (default: [`Lz4Codec`]). Both sides of a
    /// session must agree.
    pub fn with_codec(mut self, codec: impl PayloadCodec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn document(&self) -> &TextDocument {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut TextDocument {
        &mut self.document
    }

    /// Remote caret overlays.
    pub fn cursors(&self) -> &OverlayRegistry {
        &self.cursors
    }

    pub fn cursors_mut(&mut self) -> &mut OverlayRegistry {
        &mut self.cursors
    }

    /// Remote selection overlays.
    pub fn selections(&self) -> &OverlayRegistry {
        &self.selections
    }

    pub fn selections_mut(&mut self) -> &mut OverlayRegistry {
        &mut self.selections
    }

    // ── Outbound: local editor events ──────────────────────────────

    /// Apply a local change set to the document and broadcast it.
    pub fn apply_local_edit(&mut self, edits: &[Edit]) -> ChangeEvent {
        let event = self.document.apply_edits(edits);
        self.local_content_changed(&event);
        event
    }

    /// Forward a local content-change event. Discarded when its version
    /// predates the document (a superseded change, e.g. from a
    /// programmatic rollback); a version equal to the document's is the
    /// normal case and goes out.
    pub fn local_content_changed(&mut self, event: &ChangeEvent) {
        if event.version < self.document.version() {
            log::trace!(
                "superseded local change v{} not sent (document at v{})",
                event.version,
                self.document.version()
            );
            return;
        }
        self.send(MessagePayload::CodeEdit {
            version: event.version,
            changes: event.changes.clone(),
        });
    }

    /// Broadcast the local caret position.
    pub fn local_cursor_moved(&mut self, position: Position) {
        self.send(MessagePayload::CursorPosition { position });
    }

    /// Broadcast the local selection. Endpoints may arrive in either
    /// order; they are normalized before they hit the wire.
    pub fn local_selection_changed(&mut self, a: Position, b: Position) {
        let (start, end) = order_positions(a, b);
        self.send(MessagePayload::CursorSelection { start, end });
    }

    /// Encode and hand off. Fire-and-forget: failures are logged and
    /// swallowed, never surfaced to the user.
    fn send(&mut self, payload: MessagePayload) {
        if self.state != SessionState::Active {
            return;
        }
        let Some(channel) = self.channel.as_ref() else {
            return;
        };
        match self.codec.encode(&payload) {
            Ok(bytes) => {
                if let Err(e) = channel.send(Envelope::local(bytes)) {
                    log::warn!("channel send failed: {e}");
                }
            }
            Err(e) => log::warn!("payload encode failed: {e}"),
        }
    }

    // ── Inbound: channel events ────────────────────────────────────

    /// Dispatch one channel event.
    pub fn handle_channel_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Message(envelope) => self.handle_envelope(&envelope),
            ChannelEvent::MemberJoined(id) => self.member_joined(&id),
            ChannelEvent::MemberLeft(id) => self.member_left(&id),
        }
    }

    /// Handle one inbound envelope.
    pub fn handle_envelope(&mut self, envelope: &Envelope) {
        if self.state != SessionState::Active {
            return;
        }
        let Some(sender_id) = envelope.sender_id.clone() else {
            log::trace!("envelope without sender id dropped");
            return;
        };
        if sender_id == self.local_id {
            return;
        }
        let payload = match self.codec.decode(&envelope.payload) {
            Ok(payload) => payload,
            Err(e) => {
                // Unknown kinds and garbage land here; both are ignored
                // for forward compatibility.
                log::trace!("undecodable payload from {sender_id} ignored: {e}");
                return;
            }
        };

        // Content from an unseen sender still gets overlays — a join
        // notification may have raced or been dropped.
        self.ensure_participant(&sender_id);

        match payload {
            MessagePayload::CodeEdit { version, changes } => {
                self.apply_remote_edit(&sender_id, version, &changes);
            }
            MessagePayload::CursorPosition { position } => {
                let offset = self.document.position_to_offset(position);
                self.cursors.set_offset(&sender_id, offset);
            }
            MessagePayload::CursorSelection { start, end } => {
                let (start, end) = order_positions(start, end);
                let start_offset = self.document.position_to_offset(start);
                let end_offset = self.document.position_to_offset(end);
                self.selections.set_span(&sender_id, start_offset, end_offset);
            }
        }
    }

    /// A participant joined. Idempotent with the lazy content path.
    pub fn member_joined(&mut self, id: &str) {
        if self.state == SessionState::Disposed {
            return;
        }
        self.ensure_participant(id);
    }

    /// A participant left; both overlays go away. Safe on unknown ids.
    pub fn member_left(&mut self, id: &str) {
        if self.state == SessionState::Disposed {
            return;
        }
        self.cursors.remove(id);
        self.selections.remove(id);
    }

    /// Stop synchronizing. Drops the channel; overlays stay with their
    /// registries.
    pub fn dispose(&mut self) {
        if self.state == SessionState::Disposed {
            return;
        }
        self.state = SessionState::Disposed;
        self.channel = None;
    }

    fn ensure_participant(&mut self, id: &str) {
        if id == self.local_id {
            return;
        }
        let participant = Participant::from_id(id);
        self.cursors.add(&participant);
        self.selections.add(&participant);
    }

    /// Apply one inbound versioned change set, rejecting anything not
    /// strictly newer than the document.
    fn apply_remote_edit(&mut self, sender_id: &str, version: u64, changes: &[TextChange]) {
        if version <= self.document.version() {
            log::trace!(
                "stale edit v{version} from {sender_id} dropped (document at v{})",
                self.document.version()
            );
            return;
        }
        let applied = self.document.apply_changes_versioned(changes, version);
        // The sender's caret lands right after the last inserted text.
        if let Some(last) = applied.changes.last() {
            let caret = last.range_offset + last.text.chars().count();
            self.cursors.set_offset(sender_id, caret);
        }
    }
}

impl std::fmt::Debug for SyncController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncController")
            .field("local_id", &self.local_id)
            .field("state", &self.state)
            .field("version", &self.document.version())
            .field("remote_participants", &self.cursors.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelError;
    use crate::codec::PlainCodec;
    use std::sync::{Arc, Mutex};

    /// Captures everything sent, for outbound-path assertions.
    #[derive(Clone, Default)]
    struct RecordingChannel {
        sent: Arc<Mutex<Vec<Envelope>>>,
    }

    impl RecordingChannel {
        fn sent(&self) -> Vec<Envelope> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl MessageChannel for RecordingChannel {
        fn send(&self, envelope: Envelope) -> Result<(), ChannelError> {
            self.sent.lock().unwrap().push(envelope);
            Ok(())
        }
    }

    fn active_controller() -> (SyncController, RecordingChannel) {
        let channel = RecordingChannel::default();
        let controller = SyncController::new("local", TextDocument::new())
            .with_codec(PlainCodec)
            .with_channel(channel.clone());
        (controller, channel)
    }

    fn edit_envelope(sender: &str, version: u64, offset_pos: Position, text: &str) -> Envelope {
        let payload = MessagePayload::CodeEdit {
            version,
            changes: vec![TextChange {
                start: offset_pos,
                end: offset_pos,
                range_offset: 0,
                text: text.into(),
            }],
        };
        Envelope {
            sender_id: Some(sender.into()),
            payload: PlainCodec.encode(&payload).unwrap(),
            timestamp: Some(1),
        }
    }

    fn decode_sent(channel: &RecordingChannel) -> Vec<MessagePayload> {
        channel
            .sent()
            .iter()
            .map(|env| PlainCodec.decode(&env.payload).unwrap())
            .collect()
    }

    #[test]
    fn test_local_only_without_channel() {
        let mut controller = SyncController::new("local", TextDocument::new());
        assert_eq!(controller.state(), SessionState::LocalOnly);

        // Editing still works, nothing is sent anywhere.
        controller.apply_local_edit(&[Edit::insert(0, "hi")]);
        assert_eq!(controller.document().text(), "hi");
        assert_eq!(controller.document().version(), 1);
    }

    #[test]
    fn test_local_edit_broadcasts_code_edit() {
        let (mut controller, channel) = active_controller();
        controller.apply_local_edit(&[Edit::insert(0, "hi")]);

        let sent = decode_sent(&channel);
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            MessagePayload::CodeEdit { version, changes } => {
                assert_eq!(*version, 1);
                assert_eq!(changes[0].range_offset, 0);
                assert_eq!(changes[0].text, "hi");
            }
            other => panic!("expected CodeEdit, got {other:?}"),
        }
        // Locally originated: sender id is the transport's business.
        assert!(channel.sent()[0].sender_id.is_none());
    }

    #[test]
    fn test_superseded_local_change_not_sent() {
        let (mut controller, channel) = active_controller();
        controller.apply_local_edit(&[Edit::insert(0, "a")]); // v1, sent

        let stale = ChangeEvent { version: 0, changes: vec![] };
        controller.local_content_changed(&stale);
        assert_eq!(channel.sent().len(), 1);
    }

    #[test]
    fn test_cursor_and_selection_broadcast() {
        let (mut controller, channel) = active_controller();
        controller.local_cursor_moved(Position::new(2, 4));
        controller.local_selection_changed(Position::new(5, 3), Position::new(5, 1));

        let sent = decode_sent(&channel);
        assert_eq!(
            sent[0],
            MessagePayload::CursorPosition { position: Position::new(2, 4) }
        );
        // Reversed endpoints were normalized before sending.
        assert_eq!(
            sent[1],
            MessagePayload::CursorSelection {
                start: Position::new(5, 1),
                end: Position::new(5, 3),
            }
        );
    }

    #[test]
    fn test_remote_edit_applies_and_moves_cursor() {
        let (mut controller, _) = active_controller();
        controller.handle_envelope(&edit_envelope("peer", 1, Position::new(1, 1), "hi"));

        assert_eq!(controller.document().text(), "hi");
        assert_eq!(controller.document().version(), 1);
        // End-of-insert positioning.
        assert_eq!(controller.cursors().get("peer").unwrap().offset(), 2);
    }

    #[test]
    fn test_stale_remote_edit_rejected() {
        let (mut controller, _) = active_controller();
        controller.apply_local_edit(&[Edit::insert(0, "local")]); // v1

        // Equal version: already reflected locally, must be dropped.
        controller.handle_envelope(&edit_envelope("peer", 1, Position::new(1, 1), "X"));
        assert_eq!(controller.document().text(), "local");
        assert_eq!(controller.document().version(), 1);
        // Overlay exists (lazy creation) but never moved off origin.
        let overlay = controller.cursors().get("peer").unwrap();
        assert_eq!(overlay.offset(), 0);

        // Older version: same.
        controller.handle_envelope(&edit_envelope("peer", 0, Position::new(1, 1), "Y"));
        assert_eq!(controller.document().text(), "local");
    }

    #[test]
    fn test_monotonic_acceptance_in_arrival_order() {
        let (mut controller, _) = active_controller();
        controller.handle_envelope(&edit_envelope("peer", 1, Position::new(1, 1), "a"));
        controller.handle_envelope(&edit_envelope("peer", 2, Position::new(1, 1), "b"));
        controller.handle_envelope(&edit_envelope("peer", 3, Position::new(1, 1), "c"));

        assert_eq!(controller.document().text(), "cba");
        assert_eq!(controller.document().version(), 3);

        // A duplicate of v2 after v3 is stale.
        controller.handle_envelope(&edit_envelope("peer", 2, Position::new(1, 1), "b"));
        assert_eq!(controller.document().text(), "cba");
    }

    #[test]
    fn test_envelope_without_sender_dropped() {
        let (mut controller, _) = active_controller();
        let mut envelope = edit_envelope("peer", 1, Position::new(1, 1), "hi");
        envelope.sender_id = None;

        controller.handle_envelope(&envelope);
        assert_eq!(controller.document().text(), "");
        assert!(controller.cursors().is_empty());
    }

    #[test]
    fn test_garbage_payload_ignored() {
        let (mut controller, _) = active_controller();
        let envelope = Envelope {
            sender_id: Some("peer".into()),
            payload: vec![0xFF, 0xFF, 0xFF],
            timestamp: None,
        };
        controller.handle_envelope(&envelope);
        assert_eq!(controller.document().text(), "");
    }

    #[test]
    fn test_lazy_participant_creation_on_first_message() {
        let (mut controller, _) = active_controller();
        assert!(controller.cursors().is_empty());

        let payload = MessagePayload::CursorPosition { position: Position::new(1, 1) };
        let envelope = Envelope {
            sender_id: Some("stranger".into()),
            payload: PlainCodec.encode(&payload).unwrap(),
            timestamp: None,
        };
        controller.handle_envelope(&envelope);

        assert!(controller.cursors().contains("stranger"));
        assert!(controller.selections().contains("stranger"));
        let overlay = controller.cursors().get("stranger").unwrap();
        assert_eq!(overlay.participant().label, "Guest-stranger");
    }

    #[test]
    fn test_join_leave_lifecycle() {
        let (mut controller, _) = active_controller();
        controller.member_joined("peer");
        assert!(controller.cursors().contains("peer"));
        assert!(controller.selections().contains("peer"));

        // Re-join is a no-op, not a reset.
        controller.cursors_mut().set_offset("peer", 5);
        controller.member_joined("peer");
        assert_eq!(controller.cursors().get("peer").unwrap().offset(), 5);

        controller.member_left("peer");
        assert!(!controller.cursors().contains("peer"));
        assert!(!controller.selections().contains("peer"));

        // Leave again: harmless.
        controller.member_left("peer");
    }

    #[test]
    fn test_own_envelope_ignored() {
        let (mut controller, _) = active_controller();
        controller.handle_envelope(&edit_envelope("local", 1, Position::new(1, 1), "echo"));
        assert_eq!(controller.document().text(), "");
        assert!(controller.cursors().is_empty());
    }

    #[test]
    fn test_remote_edit_not_rebroadcast() {
        let (mut controller, channel) = active_controller();
        controller.handle_envelope(&edit_envelope("peer", 1, Position::new(1, 1), "hi"));

        assert_eq!(controller.document().text(), "hi");
        assert!(channel.sent().is_empty(), "remote edit must not be echoed");
    }

    #[test]
    fn test_remote_selection_updates_overlay() {
        let (mut controller, _) = active_controller();
        controller.document_mut().apply_edits(&[Edit::insert(0, "hello\nworld")]);

        let payload = MessagePayload::CursorSelection {
            start: Position::new(2, 3),
            end: Position::new(1, 2),
        };
        let envelope = Envelope {
            sender_id: Some("peer".into()),
            payload: PlainCodec.encode(&payload).unwrap(),
            timestamp: None,
        };
        controller.handle_envelope(&envelope);

        // Normalized and converted against the current snapshot.
        assert_eq!(controller.selections().get("peer").unwrap().span(), (1, 8));
    }

    #[test]
    fn test_dispose_stops_everything() {
        let (mut controller, channel) = active_controller();
        controller.dispose();
        assert_eq!(controller.state(), SessionState::Disposed);

        controller.local_cursor_moved(Position::new(1, 1));
        controller.handle_envelope(&edit_envelope("peer", 1, Position::new(1, 1), "hi"));
        controller.member_joined("peer");

        assert!(channel.sent().is_empty());
        assert_eq!(controller.document().text(), "");
        assert!(controller.cursors().is_empty());

        controller.dispose(); // idempotent
    }
}
