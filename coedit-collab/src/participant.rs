//! Participant identity and presentation.
//!
//! Participant ids are opaque strings, stable for the session, assigned by
//! whatever transport delivers the messages. Labels and colors are derived
//! locally and deterministically from the id, so every peer renders an
//! unknown participant the same way without coordination.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RGBA color for overlay rendering, each channel in [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl OverlayColor {
    /// Stable, visually distinct color derived from a participant id.
    ///
    /// Hashes the id, spreads the hue over the color wheel, and keeps
    /// saturation/lightness fixed so every cursor reads as the same
    /// family of vivid colors.
    pub fn from_id(id: &str) -> Self {
        let hash = fnv1a(id.as_bytes());
        let hue = (hash % 360) as f32 / 360.0;
        let (r, g, b) = hsl_to_rgb(hue, 0.7, 0.6);
        Self { r, g, b, a: 1.0 }
    }

    pub fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Flatten for upload to whatever renders the decoration.
    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for OverlayColor {
    fn default() -> Self {
        Self { r: 0.26, g: 0.52, b: 0.96, a: 1.0 } // Default blue
    }
}

/// FNV-1a over the id bytes. Deterministic across processes, which the
/// std hasher is not.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// HSL to RGB conversion helper.
fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (f32, f32, f32) {
    if s == 0.0 {
        return (l, l, l); // Achromatic
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    let r = hue_to_rgb(p, q, h + 1.0 / 3.0);
    let g = hue_to_rgb(p, q, h);
    let b = hue_to_rgb(p, q, h - 1.0 / 3.0);

    (r, g, b)
}

fn hue_to_rgb(p: f32, q: f32, mut t: f32) -> f32 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 1.0 / 2.0 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

/// One remote participant as presented in the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// Opaque session-stable id.
    pub id: String,
    /// Display label shown next to the participant's overlays.
    pub label: String,
    /// Stable overlay color.
    pub color: OverlayColor,
}

impl Participant {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        let id = id.into();
        let color = OverlayColor::from_id(&id);
        Self { id, label: label.into(), color }
    }

    /// Placeholder identity for a participant only known by id — a join
    /// notification that never arrived, or content from an unseen sender.
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        let prefix: String = id.chars().take(8).collect();
        let label = format!("Guest-{prefix}");
        let color = OverlayColor::from_id(&id);
        Self { id, label, color }
    }
}

/// Mint a fresh session id for the local participant.
pub fn generate_session_id() -> String {
    Uuid::new_v4().to_string()
}
