#![forbid(unsafe_code)]

//! Core: input events and the rendering-layer interface.
//!
//! # Role in scrim
//! `scrim-core` is the boundary between the modal coordinator and whatever
//! view layer actually owns the nodes on screen. It defines:
//!
//! - **Event**: canonical key, mouse, and window-focus input.
//! - **UiEvent**: the envelope a rendering layer dispatches. It carries the
//!   target node, caller-attached extras, and the default/propagation flags.
//! - **NodeTree**: the queries and focus operations the coordinator needs
//!   from the rendering layer (active element, containment, attachment,
//!   per-node focus traits).
//!
//! Nothing here mutates global state; `scrim-modal` builds on these types.

pub mod event;
pub mod node;

pub use event::{
    Event, EventId, Extras, KeyCode, KeyEvent, KeyEventKind, Modifiers, MouseButton, MouseEvent,
    MouseEventKind, UiEvent,
};
pub use node::{ElementKind, FocusTraits, NodeId, NodeTree};
