#![forbid(unsafe_code)]

//! Pointer-dismissal detector.
//!
//! Decides whether a click on the backdrop is a genuine "click outside" or a
//! false positive from a drag that crossed the content boundary (typically a
//! text selection released over the backdrop).
//!
//! # Decision rule
//!
//! A click is dismissal-eligible only when the mouse-down **and** the
//! following mouse-up both targeted the overlay itself:
//!
//! | down    | up      | click   | eligible |
//! |---------|---------|---------|----------|
//! | overlay | overlay | overlay | yes      |
//! | overlay | content | any     | no       |
//! | content | overlay | any     | no       |
//! | none    | none    | overlay | no (programmatic click) |
//!
//! The detector only observes. It never touches the event's propagation
//! flags; callers hand the untouched event to the dismissal callback.

use scrim_core::{NodeId, NodeTree};

/// Which modal surface an event hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    /// The backdrop itself, not any of its descendants.
    Overlay,
    /// The content container or anything inside it.
    Content,
}

impl Surface {
    /// Classify an event target against a modal's surfaces.
    ///
    /// Returns `None` for targets outside both surfaces, and for descendants
    /// of the overlay that are not inside the content.
    pub fn classify(
        tree: &dyn NodeTree,
        overlay: Option<NodeId>,
        content: Option<NodeId>,
        target: Option<NodeId>,
    ) -> Option<Self> {
        let target = target?;
        if content.is_some_and(|content| tree.contains(content, target)) {
            return Some(Self::Content);
        }
        (overlay == Some(target)).then_some(Self::Overlay)
    }
}

/// Transient press/release state for one overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerGesture {
    pressed: Option<Surface>,
    armed: bool,
}

impl PointerGesture {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pressed: None,
            armed: false,
        }
    }

    /// Surface of the pending mouse-down, if any.
    #[inline]
    #[must_use]
    pub const fn pressed(&self) -> Option<Surface> {
        self.pressed
    }

    /// Whether the last down/up pair qualifies the next click.
    #[inline]
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.armed
    }

    /// Record a mouse-down. A new press always disarms.
    pub fn press(&mut self, surface: Option<Surface>) {
        self.pressed = surface;
        self.armed = false;
    }

    /// Record a mouse-up and return whether the pair stayed on the overlay.
    /// The pressed surface is cleared either way.
    pub fn release(&mut self, surface: Option<Surface>) -> bool {
        let pressed = self.pressed.take();
        self.armed = pressed == Some(Surface::Overlay) && surface == Some(Surface::Overlay);
        self.armed
    }

    /// Consume a click and return whether it is dismissal-eligible.
    pub fn click(&mut self, surface: Option<Surface>) -> bool {
        let armed = std::mem::take(&mut self.armed);
        armed && surface == Some(Surface::Overlay)
    }

    /// Forget everything (used when the modal closes).
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
