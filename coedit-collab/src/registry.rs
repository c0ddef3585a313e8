//! Overlay registry — one overlay per participant per kind.
//!
//! The registry owns its widgets outright. `add` is idempotent (an
//! existing entry comes back untouched, no property refresh), `remove`
//! disposes then deletes, and every positional operation on an unknown id
//! is a silent no-op — late messages about departed participants are
//! harmless by construction.

use std::collections::HashMap;
use std::sync::Arc;

use crate::overlay::{OverlayKind, RemoteOverlay};
use crate::participant::Participant;

/// Registry of remote overlays of a single kind, keyed by participant id.
pub struct OverlayRegistry {
    kind: OverlayKind,
    overlays: HashMap<String, RemoteOverlay>,
    /// Wired into every constructed overlay; fires once per disposal.
    dispose_hook: Option<Arc<dyn Fn(&str)>>,
}

impl OverlayRegistry {
    pub fn new(kind: OverlayKind) -> Self {
        Self { kind, overlays: HashMap::new(), dispose_hook: None }
    }

    /// Registry whose overlays notify `hook` (with the participant id)
    /// when they are disposed — the host's chance to tear down whatever
    /// it rendered for them.
    pub fn with_dispose_hook(kind: OverlayKind, hook: impl Fn(&str) + 'static) -> Self {
        Self { kind, overlays: HashMap::new(), dispose_hook: Some(Arc::new(hook)) }
    }

    pub fn kind(&self) -> OverlayKind {
        self.kind
    }

    /// Add an overlay for `participant`, or return the existing one
    /// unchanged. Deliberately does not refresh label/color on an
    /// existing entry.
    pub fn add(&mut self, participant: &Participant) -> &mut RemoteOverlay {
        let kind = self.kind;
        let hook = self.dispose_hook.clone();
        self.overlays.entry(participant.id.clone()).or_insert_with(|| {
            let mut overlay = RemoteOverlay::new(participant.clone(), kind);
            if let Some(hook) = hook {
                overlay.set_dispose_hook(move |id| (*hook)(id));
            }
            overlay
        })
    }

    /// Dispose and drop the entry for `id`. Safe on unknown ids and on
    /// entries that were already disposed.
    pub fn remove(&mut self, id: &str) {
        if let Some(mut overlay) = self.overlays.remove(id) {
            overlay.dispose();
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.overlays.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&RemoteOverlay> {
        self.overlays.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut RemoteOverlay> {
        self.overlays.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    /// Reposition `id`'s caret. No-op for unknown ids.
    pub fn set_offset(&mut self, id: &str, offset: usize) {
        if let Some(overlay) = self.overlays.get_mut(id) {
            overlay.set_offset(offset);
        }
    }

    /// Reposition `id`'s selection. No-op for unknown ids.
    pub fn set_span(&mut self, id: &str, start: usize, end: usize) {
        if let Some(overlay) = self.overlays.get_mut(id) {
            overlay.set_span(start, end);
        }
    }

    /// Show `id`'s overlay at its last known anchor. No-op for unknown ids.
    pub fn show(&mut self, id: &str) {
        if let Some(overlay) = self.overlays.get_mut(id) {
            overlay.show();
        }
    }

    /// Hide `id`'s overlay without clearing its anchor. No-op for unknown ids.
    pub fn hide(&mut self, id: &str) {
        if let Some(overlay) = self.overlays.get_mut(id) {
            overlay.hide();
        }
    }

    /// Currently visible overlays, for the host renderer.
    pub fn visible(&self) -> impl Iterator<Item = &RemoteOverlay> {
        self.overlays.values().filter(|o| o.is_visible())
    }

    /// Ids of every registered participant.
    pub fn participant_ids(&self) -> impl Iterator<Item = &str> {
        self.overlays.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for OverlayRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayRegistry")
            .field("kind", &self.kind)
            .field("participants", &self.overlays.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> OverlayRegistry {
        OverlayRegistry::new(OverlayKind::Cursor)
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut reg = registry();
        let alice = Participant::new("alice", "Alice");

        reg.add(&alice).set_offset(4);

        // Re-adding with different presentation returns the existing
        // overlay, untouched.
        let renamed = Participant::new("alice", "Alice (2)");
        let overlay = reg.add(&renamed);
        assert_eq!(overlay.participant().label, "Alice");
        assert_eq!(overlay.offset(), 4);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_remove_unknown_and_twice_is_safe() {
        let mut reg = registry();
        reg.remove("ghost");

        reg.add(&Participant::from_id("p1"));
        reg.remove("p1");
        reg.remove("p1");
        assert!(!reg.contains("p1"));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_remove_disposes_overlay() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let counter = disposed.clone();
        let mut reg = OverlayRegistry::with_dispose_hook(OverlayKind::Cursor, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        reg.add(&Participant::from_id("p1"));
        reg.remove("p1");
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_positional_ops_on_unknown_id_are_noops() {
        let mut reg = registry();
        reg.set_offset("ghost", 3);
        reg.set_span("ghost", 1, 5);
        reg.show("ghost");
        reg.hide("ghost");
        assert!(reg.is_empty());
    }

    #[test]
    fn test_fan_out_updates_only_target() {
        let mut reg = registry();
        reg.add(&Participant::from_id("p1"));
        reg.add(&Participant::from_id("p2"));

        reg.set_offset("p1", 9);
        assert_eq!(reg.get("p1").unwrap().offset(), 9);
        assert_eq!(reg.get("p2").unwrap().offset(), 0);
    }

    #[test]
    fn test_visible_filters_hidden() {
        let mut reg = registry();
        reg.add(&Participant::from_id("p1"));
        reg.add(&Participant::from_id("p2"));
        reg.set_offset("p1", 1);
        reg.set_offset("p2", 2);
        reg.hide("p2");

        let visible: Vec<_> = reg.visible().map(|o| o.participant().id.clone()).collect();
        assert_eq!(visible, vec!["p1".to_string()]);
    }

    #[test]
    fn test_dispose_hook_wired_per_overlay() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let counter = disposed.clone();
        let mut reg = OverlayRegistry::with_dispose_hook(OverlayKind::Selection, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        reg.add(&Participant::from_id("p1"));
        reg.add(&Participant::from_id("p2"));
        reg.remove("p1");
        reg.remove("p2");
        assert_eq!(disposed.load(Ordering::SeqCst), 2);
    }
}
