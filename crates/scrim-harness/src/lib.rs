#![forbid(unsafe_code)]

//! Test harness for scrim modals.
//!
//! - [`dom`]: an in-memory document implementing [`scrim_core::NodeTree`]
//!   with bubbling dispatch, window listeners, and native Tab traversal.
//! - [`fixture`]: a [`Page`] that mounts modals into that document and
//!   simulates user input (clicks, key presses, window focus changes).
//!
//! ```ignore
//! let page = Page::new();
//! let rendered = page.render_modal(ModalConfig::default().open(true), callbacks, |_, _| {});
//! page.click_at(rendered.overlay(), &[("fakeData", "ABC")]);
//! ```

pub mod dom;
pub mod fixture;

pub use dom::{Dom, EventType, ListenerId, ListenerTarget};
pub use fixture::{Page, RenderedModal};
