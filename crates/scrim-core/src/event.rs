#![forbid(unsafe_code)]

//! Canonical input events and the dispatch envelope.
//!
//! [`Event`] is the raw input (key, mouse, window focus). [`UiEvent`] wraps an
//! `Event` with everything a rendering layer attaches while dispatching it
//! through a node tree: the target node, caller-supplied extras, and the
//! default-action and propagation flags.
//!
//! # Invariants
//!
//! - Every `UiEvent` gets a process-unique [`EventId`] at construction. Clones
//!   keep the id, so handlers can tell "the event I was given" apart from a
//!   look-alike.
//! - Extras are never rewritten by the dispatcher or by `scrim-modal`; what the
//!   caller attached is what every listener and callback observes.
//! - `prevent_default` and `stop_propagation` are sticky for the lifetime of
//!   the envelope.

use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use bitflags::bitflags;

/// Global counter for unique event ids.
static EVENT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

bitflags! {
    /// Keyboard modifiers held during an event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const NONE = 0;
        const SHIFT = 0b0001;
        const ALT = 0b0010;
        const CTRL = 0b0100;
        const SUPER = 0b1000;
    }
}

/// Key identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    Enter,
    Escape,
    Tab,
    /// Shift+Tab as reported by terminals that fold the modifier into the key.
    BackTab,
    Backspace,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
}

/// Press, repeat, or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyEventKind {
    #[default]
    Press,
    Repeat,
    Release,
}

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
    pub kind: KeyEventKind,
}

impl KeyEvent {
    /// A key press with no modifiers.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::NONE,
            kind: KeyEventKind::Press,
        }
    }

    /// Replace the modifier set.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Replace the event kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: KeyEventKind) -> Self {
        self.kind = kind;
        self
    }

    #[inline]
    #[must_use]
    pub fn is_press(&self) -> bool {
        matches!(self.kind, KeyEventKind::Press | KeyEventKind::Repeat)
    }

    /// Whether this is a forward or backward tab press.
    #[must_use]
    pub fn is_tab(&self) -> bool {
        self.is_press() && matches!(self.code, KeyCode::Tab | KeyCode::BackTab)
    }

    /// Whether a tab press should move focus backwards.
    #[must_use]
    pub fn is_backward_tab(&self) -> bool {
        self.code == KeyCode::BackTab
            || (self.code == KeyCode::Tab && self.modifiers.contains(Modifiers::SHIFT))
    }

    #[must_use]
    pub fn is_escape(&self) -> bool {
        self.is_press() && self.code == KeyCode::Escape
    }
}

/// Mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// What happened with the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseEventKind {
    Down(MouseButton),
    Up(MouseButton),
    /// Synthesized by the rendering layer after a down/up pair, or
    /// dispatched programmatically.
    Click(MouseButton),
    Moved,
}

/// A pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub x: u16,
    pub y: u16,
    pub modifiers: Modifiers,
}

impl MouseEvent {
    #[must_use]
    pub const fn new(kind: MouseEventKind, x: u16, y: u16) -> Self {
        Self {
            kind,
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }
}

/// Canonical input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// Window focus changed: `true` when gained, `false` when lost.
    Focus(bool),
}

impl Event {
    /// Escape key press.
    #[must_use]
    pub const fn escape() -> Self {
        Self::Key(KeyEvent::new(KeyCode::Escape))
    }

    /// Tab press, optionally with Shift held.
    #[must_use]
    pub const fn tab(shift: bool) -> Self {
        let modifiers = if shift {
            Modifiers::SHIFT
        } else {
            Modifiers::NONE
        };
        Self::Key(KeyEvent::new(KeyCode::Tab).with_modifiers(modifiers))
    }

    /// Left-button mouse event of the given kind at the origin.
    #[must_use]
    pub fn left(kind: fn(MouseButton) -> MouseEventKind) -> Self {
        Self::Mouse(MouseEvent::new(kind(MouseButton::Left), 0, 0))
    }

    #[must_use]
    pub fn as_key(&self) -> Option<&KeyEvent> {
        match self {
            Self::Key(key) => Some(key),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_mouse(&self) -> Option<&MouseEvent> {
        match self {
            Self::Mouse(mouse) => Some(mouse),
            _ => None,
        }
    }
}

/// Unique identifier for a dispatched event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u64);

impl EventId {
    fn next() -> Self {
        Self(EVENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Caller-attached key/value data carried alongside an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extras {
    fields: AHashMap<String, String>,
}

impl Extras {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.fields.insert(key.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Extras {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut extras = Self::new();
        for (k, v) in iter {
            extras.insert(k, v);
        }
        extras
    }
}

/// An [`Event`] in flight through a node tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiEvent {
    id: EventId,
    event: Event,
    target: Option<crate::node::NodeId>,
    extras: Extras,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl UiEvent {
    /// Wrap an event with a fresh id and no target.
    #[must_use]
    pub fn new(event: Event) -> Self {
        Self {
            id: EventId::next(),
            event,
            target: None,
            extras: Extras::new(),
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    /// Set the node the event is dispatched at.
    #[must_use]
    pub fn with_target(mut self, target: crate::node::NodeId) -> Self {
        self.target = Some(target);
        self
    }

    /// Attach a caller-defined field.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(key, value);
        self
    }

    /// Replace all caller-defined fields.
    #[must_use]
    pub fn with_extras(mut self, extras: Extras) -> Self {
        self.extras = extras;
        self
    }

    #[inline]
    #[must_use]
    pub const fn id(&self) -> EventId {
        self.id
    }

    #[inline]
    #[must_use]
    pub const fn event(&self) -> &Event {
        &self.event
    }

    #[inline]
    #[must_use]
    pub const fn target(&self) -> Option<crate::node::NodeId> {
        self.target
    }

    /// Retarget the envelope. Used by dispatchers that resolve the target
    /// late (for example from the focused element).
    pub fn set_target(&mut self, target: Option<crate::node::NodeId>) {
        self.target = target;
    }

    #[inline]
    #[must_use]
    pub const fn extras(&self) -> &Extras {
        &self.extras
    }

    #[must_use]
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras.get(key)
    }

    /// Suppress the rendering layer's default action for this event.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    #[inline]
    #[must_use]
    pub const fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Stop the event from reaching further ancestors.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    #[inline]
    #[must_use]
    pub const fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    #[must_use]
    pub fn as_key(&self) -> Option<&KeyEvent> {
        self.event.as_key()
    }

    #[must_use]
    pub fn as_mouse(&self) -> Option<&MouseEvent> {
        self.event.as_mouse()
    }
}

impl From<Event> for UiEvent {
    fn from(event: Event) -> Self {
        Self::new(event)
    }
}
