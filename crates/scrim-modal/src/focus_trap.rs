#![forbid(unsafe_code)]

//! Focus trap: keep keyboard focus inside one container while it is active.
//!
//! # State machine
//!
//! ```text
//! Inactive --activate--> Active --deactivate--> Inactive
//! ```
//!
//! - **activate** remembers the element focused before the modal opened (the
//!   [`FocusMemento`]) and moves focus into the container.
//! - **scope_tab** runs on every Tab press while active. It recomputes the
//!   tabbable sequence, wraps at both ends, and pulls focus back in when it
//!   has drifted outside.
//! - **deactivate** gives focus back to the memento element if that element
//!   is still attached. A second deactivate is a no-op.
//!
//! # Invariants
//!
//! - A memento is released exactly once, at the deactivate that ends the
//!   activation that captured it.
//! - With zero tabbable elements, every Tab is intercepted and focus stays on
//!   the container.
//! - The trap never raises: unfocusable or detached targets degrade to
//!   [`RestoreOutcome`] / [`ActivateOutcome`] values the caller can report.

use scrim_core::{NodeId, NodeTree};

use crate::config::InitialFocus;
use crate::tabbable::{first_focus_target, tabbable_descendants};

/// The element focused immediately before a trap activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusMemento {
    node: Option<NodeId>,
}

impl FocusMemento {
    /// Capture the tree's current focus.
    pub fn capture(tree: &dyn NodeTree) -> Self {
        Self {
            node: tree.active_element(),
        }
    }

    /// The remembered element; `None` when nothing was focused.
    #[inline]
    #[must_use]
    pub const fn node(&self) -> Option<NodeId> {
        self.node
    }
}

/// How a trap behaves on activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapOptions {
    /// Move focus into the container on activation.
    pub move_focus: bool,
    /// Capture a memento and restore it on deactivation. Only honoured when
    /// `move_focus` is set.
    pub return_focus: bool,
    /// Where focus lands on activation.
    pub initial: InitialFocus,
}

impl Default for TrapOptions {
    fn default() -> Self {
        Self {
            move_focus: true,
            return_focus: true,
            initial: InitialFocus::Content,
        }
    }
}

/// Result of [`FocusTrap::activate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivateOutcome {
    /// Focus moved to this node.
    Focused(NodeId),
    /// The tree refused to focus this node; the trap is still active.
    Refused(NodeId),
    /// Activated without moving focus.
    Unfocused,
    /// The trap was already active; nothing changed.
    AlreadyActive,
}

/// Result of [`FocusTrap::scope_tab`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabOutcome {
    /// Native traversal must be suppressed; focus is now on `focused`.
    Intercepted { focused: NodeId },
    /// Let the rendering layer move focus natively.
    PassThrough,
    /// The trap is not active.
    Inactive,
}

impl TabOutcome {
    #[must_use]
    pub const fn is_intercepted(&self) -> bool {
        matches!(self, Self::Intercepted { .. })
    }
}

/// Result of [`FocusTrap::deactivate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Focus went back to the remembered element.
    Restored(NodeId),
    /// The remembered element is gone from the document; focus left unassigned.
    Stale(NodeId),
    /// The remembered element is attached but refused focus.
    Refused(NodeId),
    /// Nothing was focused before activation; focus left unassigned.
    NothingToRestore,
    /// Restoration was not requested for this activation.
    NotRequested,
    /// The trap was not active.
    AlreadyInactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrapState {
    Inactive,
    Active {
        container: NodeId,
        memento: Option<FocusMemento>,
        needs_reclaim: bool,
    },
}

/// Per-modal focus trap.
#[derive(Debug, Clone)]
pub struct FocusTrap {
    state: TrapState,
}

impl Default for FocusTrap {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusTrap {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: TrapState::Inactive,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.state, TrapState::Active { .. })
    }

    /// The container focus is trapped in, while active.
    #[must_use]
    pub const fn container(&self) -> Option<NodeId> {
        match self.state {
            TrapState::Active { container, .. } => Some(container),
            TrapState::Inactive => None,
        }
    }

    /// The memento held by the current activation, if one was captured.
    #[must_use]
    pub const fn memento(&self) -> Option<FocusMemento> {
        match self.state {
            TrapState::Active { memento, .. } => memento,
            TrapState::Inactive => None,
        }
    }

    /// Start trapping focus inside `container`.
    pub fn activate(
        &mut self,
        tree: &dyn NodeTree,
        container: NodeId,
        options: TrapOptions,
    ) -> ActivateOutcome {
        if self.is_active() {
            return ActivateOutcome::AlreadyActive;
        }

        let memento = (options.move_focus && options.return_focus)
            .then(|| FocusMemento::capture(tree));
        self.state = TrapState::Active {
            container,
            memento,
            needs_reclaim: false,
        };

        if !options.move_focus {
            return ActivateOutcome::Unfocused;
        }

        let target = match options.initial {
            InitialFocus::Content => container,
            InitialFocus::FirstTabbable => first_focus_target(tree, container),
        };
        if tree.focus(target) {
            tracing::trace!(target: "scrim::focus", node = target.get(), "trap focused");
            ActivateOutcome::Focused(target)
        } else {
            ActivateOutcome::Refused(target)
        }
    }

    /// Handle a Tab (or Shift+Tab when `backward`) press.
    ///
    /// The caller must suppress the native default action when the outcome
    /// is [`TabOutcome::Intercepted`].
    pub fn scope_tab(&mut self, tree: &dyn NodeTree, backward: bool) -> TabOutcome {
        let TrapState::Active { container, .. } = self.state else {
            return TabOutcome::Inactive;
        };

        let tabbables = tabbable_descendants(tree, container);
        let (Some(&head), Some(&tail)) = (tabbables.first(), tabbables.last()) else {
            // Nowhere to go: pin focus on the container.
            if tree.active_element() != Some(container) {
                tree.focus(container);
            }
            return TabOutcome::Intercepted { focused: container };
        };

        let active = tree.active_element();
        let inside = active.is_some_and(|node| tree.contains(container, node));

        let target = if active == Some(container) {
            // Forward from the container is the native "enter first element".
            backward.then_some(tail)
        } else if !inside {
            Some(if backward { tail } else { head })
        } else if let Some(node) = active.filter(|node| !tabbables.contains(node)) {
            // Native traversal from an untabbable node could leave the trap.
            Some(neighbour_tabbable(
                tree,
                container,
                node,
                (head, tail),
                &tabbables,
                backward,
            ))
        } else if !backward && active == Some(tail) {
            Some(head)
        } else if backward && active == Some(head) {
            Some(tail)
        } else {
            None
        };

        match target {
            Some(node) => {
                tree.focus(node);
                TabOutcome::Intercepted { focused: node }
            }
            None => TabOutcome::PassThrough,
        }
    }

    /// Note that the window lost focus. The next [`reclaim`](Self::reclaim)
    /// pulls focus back in if it landed elsewhere meanwhile.
    pub fn mark_blurred(&mut self) {
        if let TrapState::Active { needs_reclaim, .. } = &mut self.state {
            *needs_reclaim = true;
        }
    }

    /// After the window regains focus, move focus back into the container if
    /// it drifted out while blurred. Returns the node that received focus.
    pub fn reclaim(&mut self, tree: &dyn NodeTree) -> Option<NodeId> {
        let TrapState::Active {
            container,
            needs_reclaim,
            ..
        } = &mut self.state
        else {
            return None;
        };
        if !std::mem::take(needs_reclaim) {
            return None;
        }
        let container = *container;
        if tree
            .active_element()
            .is_some_and(|node| tree.contains(container, node))
        {
            return None;
        }
        let target = first_focus_target(tree, container);
        tree.focus(target).then_some(target)
    }

    /// Stop trapping and give focus back.
    pub fn deactivate(&mut self, tree: &dyn NodeTree) -> RestoreOutcome {
        let TrapState::Active {
            container, memento, ..
        } = std::mem::replace(&mut self.state, TrapState::Inactive)
        else {
            return RestoreOutcome::AlreadyInactive;
        };

        let outcome = match memento.map(|memento| memento.node()) {
            None => RestoreOutcome::NotRequested,
            Some(None) => RestoreOutcome::NothingToRestore,
            Some(Some(node)) if !tree.is_attached(node) => RestoreOutcome::Stale(node),
            Some(Some(node)) if tree.focus(node) => RestoreOutcome::Restored(node),
            Some(Some(node)) => RestoreOutcome::Refused(node),
        };

        if !matches!(outcome, RestoreOutcome::Restored(_))
            && tree
                .active_element()
                .is_some_and(|node| tree.contains(container, node))
        {
            // Do not leave focus on a surface that is about to go away.
            tree.blur();
        }
        outcome
    }
}

/// The tabbable after (or before, when `backward`) `node` in document order,
/// wrapping to `head` or `tail` at the ends.
fn neighbour_tabbable(
    tree: &dyn NodeTree,
    container: NodeId,
    node: NodeId,
    (head, tail): (NodeId, NodeId),
    tabbables: &[NodeId],
    backward: bool,
) -> NodeId {
    let order = tree.descendants(container);
    let at = order.iter().position(|n| *n == node).unwrap_or(0);
    let found = if backward {
        order[..at].iter().rev().find(|n| tabbables.contains(n))
    } else {
        order.get(at + 1..).unwrap_or(&[]).iter().find(|n| tabbables.contains(n))
    };
    match found {
        Some(next) => *next,
        None if backward => tail,
        None => head,
    }
}
