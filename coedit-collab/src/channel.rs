//! Channel abstraction — the seam between the controller and whatever
//! transport actually moves bytes between participants.
//!
//! The contract is thin on purpose: [`MessageChannel::send`] is a
//! best-effort, fire-and-forget handoff with no delivery guarantee, and
//! inbound traffic arrives as [`ChannelEvent`]s the host pumps into the
//! controller. At-least-once delivery and arbitrary reordering are
//! assumed; the controller's version check makes duplicates and stale
//! messages harmless.
//!
//! [`LocalHub`] is the bundled in-process implementation: a broadcast
//! fan-out that connects any number of sessions in one process, used by
//! the integration tests and by embedders that host several editors.

use tokio::sync::broadcast;

use crate::protocol::{unix_millis, Envelope};

/// Inbound traffic surfaced to the session host.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// A stamped envelope from another participant.
    Message(Envelope),
    /// A participant appeared. Not guaranteed to pair 1:1 with real
    /// connectivity — content can arrive from ids that never joined.
    MemberJoined(String),
    /// A participant went away. May never arrive for a crashed peer.
    MemberLeft(String),
}

/// Outbound half of the channel contract.
pub trait MessageChannel {
    /// Hand an envelope to the transport. Resolving `Ok` means the
    /// transport accepted it, nothing more; there is no retry here.
    fn send(&self, envelope: Envelope) -> Result<(), ChannelError>;
}

/// Channel errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The transport is gone; the envelope was not handed off.
    Closed,
}

impl std::fmt::Display for ChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "channel closed"),
        }
    }
}

impl std::error::Error for ChannelError {}

/// In-process fan-out connecting sessions within one process.
///
/// Every event goes to every endpoint; receivers filter out their own
/// traffic. A receiver that falls too far behind skips ahead (the
/// version check downstream absorbs the loss).
pub struct LocalHub {
    sender: broadcast::Sender<ChannelEvent>,
}

impl LocalHub {
    /// Hub buffering up to `capacity` events per receiver.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Connect a session. Announces `MemberJoined` to everyone already
    /// connected and returns the send half plus the event receiver.
    pub fn connect(&self, session_id: impl Into<String>) -> (HubEndpoint, HubReceiver) {
        let session_id = session_id.into();
        let receiver = HubReceiver {
            session_id: session_id.clone(),
            receiver: self.sender.subscribe(),
        };
        let _ = self.sender.send(ChannelEvent::MemberJoined(session_id.clone()));
        let endpoint = HubEndpoint { session_id, sender: self.sender.clone(), left: false };
        (endpoint, receiver)
    }

    /// Number of connected receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LocalHub {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Send half of a hub connection. Stamps outgoing envelopes with the
/// session id and announces `MemberLeft` when dropped.
pub struct HubEndpoint {
    session_id: String,
    sender: broadcast::Sender<ChannelEvent>,
    left: bool,
}

impl HubEndpoint {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Announce departure. Idempotent; also runs on drop.
    pub fn leave(&mut self) {
        if !self.left {
            self.left = true;
            let _ = self.sender.send(ChannelEvent::MemberLeft(self.session_id.clone()));
        }
    }
}

impl MessageChannel for HubEndpoint {
    fn send(&self, mut envelope: Envelope) -> Result<(), ChannelError> {
        envelope.sender_id = Some(self.session_id.clone());
        if envelope.timestamp.is_none() {
            envelope.timestamp = Some(unix_millis());
        }
        self.sender
            .send(ChannelEvent::Message(envelope))
            .map(|_| ())
            .map_err(|_| ChannelError::Closed)
    }
}

impl Drop for HubEndpoint {
    fn drop(&mut self) {
        self.leave();
    }
}

/// Receive half of a hub connection. Pull-based: the host drains it into
/// the controller whenever it likes.
pub struct HubReceiver {
    session_id: String,
    receiver: broadcast::Receiver<ChannelEvent>,
}

impl HubReceiver {
    /// Next event originated by someone else, or `None` when drained.
    pub fn poll(&mut self) -> Option<ChannelEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.is_own(&event) {
                        continue;
                    }
                    return Some(event);
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    log::warn!("hub receiver for {} lagged, skipped {skipped} events", self.session_id);
                    continue;
                }
                Err(_) => return None, // Empty | Closed
            }
        }
    }

    /// Drain every pending event.
    pub fn drain(&mut self) -> Vec<ChannelEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.poll() {
            events.push(event);
        }
        events
    }

    fn is_own(&self, event: &ChannelEvent) -> bool {
        match event {
            ChannelEvent::Message(env) => env.sender_id.as_deref() == Some(self.session_id.as_str()),
            ChannelEvent::MemberJoined(id) | ChannelEvent::MemberLeft(id) => {
                id == &self.session_id
            }
        }
    }
}
