//! Remote overlay widget — one participant's caret or selection range as
//! seen in the local editor.
//!
//! Lifecycle:
//!
//! ```text
//! created ──► shown ◄──► hidden
//!                │          │
//!                └────┬─────┘
//!                     ▼
//!                 disposed (terminal)
//! ```
//!
//! The overlay caches its last anchor, so hiding and re-showing restores
//! the last known position. Disposal is terminal: it cancels the tooltip
//! timer, fires the one-shot disposal hook, and turns every later
//! operation into a silent no-op.
//!
//! The widget holds no reference back to its owning registry — ownership
//! flows one way, and the registry hears about disposal through the hook
//! it wired in at construction time.

use std::time::{Duration, Instant};

use crate::participant::Participant;

/// What an overlay renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    Cursor,
    Selection,
}

/// Widget lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Created,
    Shown,
    Hidden,
    Disposed,
}

/// Auto-hide deadline for the transient participant label.
///
/// A new anchor update re-arms the deadline instead of stacking a second
/// timer; disposal cancels it unconditionally. The host render loop polls
/// [`TooltipTimer::is_visible`] — there is no background task.
#[derive(Debug, Clone)]
pub struct TooltipTimer {
    duration: Duration,
    deadline: Option<Instant>,
}

impl TooltipTimer {
    pub fn new(duration: Duration) -> Self {
        Self { duration, deadline: None }
    }

    /// (Re-)arm the auto-hide deadline from now.
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.duration);
    }

    /// Cancel without waiting for expiry.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_visible(&self) -> bool {
        self.deadline.map(|d| Instant::now() < d).unwrap_or(false)
    }
}

/// One-shot notification fired when the overlay is disposed.
type DisposeHook = Box<dyn FnOnce(&str)>;

/// One remote participant's caret or selection decoration.
pub struct RemoteOverlay {
    participant: Participant,
    kind: OverlayKind,
    state: OverlayState,
    /// Anchor char offset (selection start for [`OverlayKind::Selection`]).
    anchor: usize,
    /// Selection end; equals `anchor` for a caret.
    anchor_end: usize,
    tooltip: TooltipTimer,
    on_dispose: Option<DisposeHook>,
}

/// Tooltip label lingers this long after an anchor update.
pub const DEFAULT_TOOLTIP_DURATION: Duration = Duration::from_millis(1500);

impl RemoteOverlay {
    pub fn new(participant: Participant, kind: OverlayKind) -> Self {
        Self {
            participant,
            kind,
            state: OverlayState::Created,
            anchor: 0,
            anchor_end: 0,
            tooltip: TooltipTimer::new(DEFAULT_TOOLTIP_DURATION),
            on_dispose: None,
        }
    }

    /// Wire the one-shot disposal notification. Replaces any previous hook.
    pub fn set_dispose_hook(&mut self, hook: impl FnOnce(&str) + 'static) {
        self.on_dispose = Some(Box::new(hook));
    }

    /// Override the tooltip auto-hide duration.
    pub fn set_tooltip_duration(&mut self, duration: Duration) {
        self.tooltip.duration = duration;
    }

    pub fn participant(&self) -> &Participant {
        &self.participant
    }

    pub fn kind(&self) -> OverlayKind {
        self.kind
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    /// Cached anchor offset (selection start for selection overlays).
    pub fn offset(&self) -> usize {
        self.anchor
    }

    /// Cached `(start, end)` offsets; `start == end` for a caret.
    pub fn span(&self) -> (usize, usize) {
        (self.anchor, self.anchor_end)
    }

    pub fn is_visible(&self) -> bool {
        self.state == OverlayState::Shown
    }

    pub fn is_disposed(&self) -> bool {
        self.state == OverlayState::Disposed
    }

    /// Whether the transient participant label is currently visible.
    pub fn tooltip_visible(&self) -> bool {
        self.tooltip.is_visible()
    }

    /// Move the caret anchor. The first position update makes a freshly
    /// created overlay visible; an explicitly hidden overlay stays hidden
    /// but keeps tracking the anchor.
    pub fn set_offset(&mut self, offset: usize) {
        self.set_span(offset, offset);
    }

    /// Move the selection anchor pair. Same visibility rules as
    /// [`RemoteOverlay::set_offset`].
    pub fn set_span(&mut self, start: usize, end: usize) {
        if self.state == OverlayState::Disposed {
            log::trace!("ignoring anchor update on disposed overlay for {}", self.participant.id);
            return;
        }
        self.anchor = start;
        self.anchor_end = end.max(start);
        if self.state == OverlayState::Created {
            self.state = OverlayState::Shown;
        }
        if self.state == OverlayState::Shown {
            self.tooltip.arm();
        }
    }

    /// Make the overlay visible at its last known anchor.
    pub fn show(&mut self) {
        if self.state == OverlayState::Disposed {
            return;
        }
        self.state = OverlayState::Shown;
    }

    /// Hide without clearing the cached anchor.
    pub fn hide(&mut self) {
        if self.state == OverlayState::Disposed {
            return;
        }
        self.state = OverlayState::Hidden;
    }

    /// Release the widget. Terminal; the disposal hook fires exactly once
    /// and the tooltip timer is cancelled. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.state == OverlayState::Disposed {
            return;
        }
        self.state = OverlayState::Disposed;
        self.tooltip.cancel();
        let hook = self.on_dispose.take();
        if let Some(hook) = hook {
            hook(&self.participant.id);
        }
    }
}

impl Drop for RemoteOverlay {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for RemoteOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteOverlay")
            .field("participant", &self.participant.id)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("span", &self.span())
            .finish()
    }
}
