#![forbid(unsafe_code)]

//! Modal interaction coordinator.
//!
//! Everything a dialog needs to behave correctly once a rendering layer has
//! put its nodes on screen:
//!
//! - [`tabbable`]: which descendants Tab can land on.
//! - [`focus_trap`]: keep focus inside the dialog, give it back afterwards.
//! - [`pointer`]: tell a real backdrop click from a drag that ended there.
//! - [`stack`]: route Escape to the topmost open dialog only.
//! - [`instance`]: the [`Modal`] lifecycle tying the above together.
//!
//! The coordinator is single-threaded and synchronous. It never installs a
//! `tracing` subscriber; lifecycle edges are logged at `debug` and degraded
//! paths at `warn`.

pub mod config;
pub mod diagnostic;
pub mod focus_trap;
pub mod instance;
pub mod pointer;
pub mod stack;
pub mod tabbable;

#[cfg(test)]
mod test_tree;

pub use config::{ConfigError, InitialFocus, ModalConfig};
pub use diagnostic::ModalDiagnostic;
pub use focus_trap::{
    ActivateOutcome, FocusMemento, FocusTrap, RestoreOutcome, TabOutcome, TrapOptions,
};
pub use instance::{Modal, ModalAction, ModalCallbacks, ModalHandle, ModalPhase, Surfaces};
pub use pointer::{PointerGesture, Surface};
pub use stack::{EscapeRouting, ModalId, ModalStack, StackChange, StackModal, StackSubscription};
pub use tabbable::{first_focus_target, is_tabbable, tabbable_descendants};
