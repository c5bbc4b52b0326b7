#![forbid(unsafe_code)]

//! Non-fatal anomalies reported by a modal.
//!
//! Nothing in the coordinator aborts the host. Degraded paths produce a
//! [`ModalDiagnostic`], which is logged at `warn` level and handed to the
//! optional `on_diagnostic` callback.

use std::fmt;

use scrim_core::NodeId;

use crate::stack::ModalId;

/// A recoverable problem observed during a lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalDiagnostic {
    /// The modal opened without a content container. Focus is trapped on
    /// `fallback` (the overlay) instead, or not at all when that is `None`.
    MissingSurfaces {
        modal: ModalId,
        fallback: Option<NodeId>,
    },
    /// The element focused before opening was detached by the time the
    /// modal closed; focus was left unassigned.
    StaleFocusMemento { modal: ModalId, node: NodeId },
    /// The view layer refused to focus `node`.
    FocusRejected { modal: ModalId, node: NodeId },
}

impl ModalDiagnostic {
    /// The modal the diagnostic concerns.
    #[must_use]
    pub const fn modal(&self) -> ModalId {
        match *self {
            Self::MissingSurfaces { modal, .. }
            | Self::StaleFocusMemento { modal, .. }
            | Self::FocusRejected { modal, .. } => modal,
        }
    }
}

impl fmt::Display for ModalDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSurfaces {
                modal,
                fallback: Some(node),
            } => write!(
                f,
                "{modal}: no content container; trapping focus on overlay node {}",
                node.get()
            ),
            Self::MissingSurfaces {
                modal,
                fallback: None,
            } => write!(f, "{modal}: no surfaces mounted; focus is not trapped"),
            Self::StaleFocusMemento { modal, node } => write!(
                f,
                "{modal}: previously focused node {} is detached; focus not restored",
                node.get()
            ),
            Self::FocusRejected { modal, node } => {
                write!(f, "{modal}: node {} refused focus", node.get())
            }
        }
    }
}

impl std::error::Error for ModalDiagnostic {}
