#![forbid(unsafe_code)]

//! Modal instance: lifecycle, event routing, and host callbacks.
//!
//! A [`Modal`] composes the other pieces of this crate for one dialog:
//! it registers with the [`ModalStack`] while open, owns a [`FocusTrap`]
//! over its content container, and tracks backdrop gestures with a
//! [`PointerGesture`].
//!
//! # Lifecycle
//!
//! ```text
//!            open (config / set_open)
//!   Closed ----------------------------> Open
//!     ^                                   |
//!     +-----------------------------------+
//!       close() / set_open(false) / unmount
//! ```
//!
//! - **Closed -> Open**: register with the stack, activate the trap, then
//!   invoke `on_after_open`.
//! - **Open -> Closed**: unregister, deactivate the trap (restoring focus),
//!   then invoke `on_after_close`.
//!
//! # Invariants
//!
//! - `on_after_open` and `on_after_close` fire exactly once per edge.
//!   Redundant transitions are silent no-ops.
//! - Unmounting a closed modal never invokes `on_after_close`.
//! - Dismissal requests (Escape, backdrop click) only call
//!   `on_request_close`; the host decides whether to close.
//! - The modal never stops event propagation.
//!
//! # Re-entrancy
//!
//! No internal borrow is held while a host callback or a [`NodeTree`] focus
//! operation runs, so callbacks may close this or any other modal.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use scrim_core::{Event, MouseEventKind, NodeId, NodeTree, UiEvent};

use crate::config::ModalConfig;
use crate::diagnostic::ModalDiagnostic;
use crate::focus_trap::{ActivateOutcome, FocusMemento, FocusTrap, RestoreOutcome, TabOutcome};
use crate::pointer::{PointerGesture, Surface};
use crate::stack::{ModalId, ModalStack, StackModal};

/// The view nodes a modal lives in. Owned by the rendering layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Surfaces {
    /// The backdrop covering the page.
    pub overlay: Option<NodeId>,
    /// The dialog container; focus is trapped here.
    pub content: Option<NodeId>,
}

impl Surfaces {
    #[must_use]
    pub const fn new(overlay: NodeId, content: NodeId) -> Self {
        Self {
            overlay: Some(overlay),
            content: Some(content),
        }
    }
}

/// Lifecycle phase of a modal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ModalPhase {
    #[default]
    Closed,
    Open,
}

/// What [`Modal::handle_event`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalAction {
    /// A Tab press was kept inside the modal; focus is now on the node. The
    /// event's default has been prevented.
    TabTrapped(NodeId),
    /// A mouse-down on the backdrop had its default prevented because
    /// backdrop dismissal is off.
    OverlayPressSuppressed,
    /// `on_request_close` was invoked with the event.
    DismissRequested,
    /// A qualifying backdrop click with no `on_request_close` registered
    /// moved focus back to the content.
    ContentFocused,
    /// Focus drifted out while the window was blurred and was moved back.
    FocusReclaimed(NodeId),
}

type Hook = Rc<dyn Fn()>;
type RequestCloseHook = Rc<dyn Fn(&UiEvent)>;
type DiagnosticHook = Rc<dyn Fn(&ModalDiagnostic)>;

/// Host callbacks. All optional.
#[derive(Clone, Default)]
pub struct ModalCallbacks {
    on_after_open: Option<Hook>,
    on_after_close: Option<Hook>,
    on_request_close: Option<RequestCloseHook>,
    on_diagnostic: Option<DiagnosticHook>,
}

impl ModalCallbacks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called after the modal opened and focus moved.
    #[must_use]
    pub fn on_after_open(mut self, f: impl Fn() + 'static) -> Self {
        self.on_after_open = Some(Rc::new(f));
        self
    }

    /// Called after the modal closed and focus restoration was attempted.
    #[must_use]
    pub fn on_after_close(mut self, f: impl Fn() + 'static) -> Self {
        self.on_after_close = Some(Rc::new(f));
        self
    }

    /// Called with the originating event when the user asks to dismiss.
    #[must_use]
    pub fn on_request_close(mut self, f: impl Fn(&UiEvent) + 'static) -> Self {
        self.on_request_close = Some(Rc::new(f));
        self
    }

    #[must_use]
    pub fn on_diagnostic(mut self, f: impl Fn(&ModalDiagnostic) + 'static) -> Self {
        self.on_diagnostic = Some(Rc::new(f));
        self
    }
}

impl fmt::Debug for ModalCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalCallbacks")
            .field("on_after_open", &self.on_after_open.is_some())
            .field("on_after_close", &self.on_after_close.is_some())
            .field("on_request_close", &self.on_request_close.is_some())
            .field("on_diagnostic", &self.on_diagnostic.is_some())
            .finish()
    }
}

#[derive(Debug)]
struct ModalState {
    phase: ModalPhase,
    mounted: bool,
    config: ModalConfig,
    surfaces: Surfaces,
    trap: FocusTrap,
    gesture: PointerGesture,
}

struct ModalInner {
    id: ModalId,
    this: Weak<ModalInner>,
    stack: ModalStack,
    tree: Rc<dyn NodeTree>,
    state: RefCell<ModalState>,
    callbacks: RefCell<ModalCallbacks>,
}

impl ModalInner {
    fn phase(&self) -> ModalPhase {
        self.state.borrow().phase
    }

    /// Run `f` on a copy of the trap with no borrow held, then store it back.
    fn with_trap<R>(&self, f: impl FnOnce(&mut FocusTrap, &dyn NodeTree) -> R) -> R {
        let mut trap = self.state.borrow().trap.clone();
        let result = f(&mut trap, self.tree.as_ref());
        self.state.borrow_mut().trap = trap;
        result
    }

    fn report(&self, diagnostic: ModalDiagnostic) {
        tracing::warn!(modal = self.id.id(), "{diagnostic}");
        let hook = self.callbacks.borrow().on_diagnostic.clone();
        if let Some(hook) = hook {
            hook(&diagnostic);
        }
    }

    fn open(&self) {
        let (container, options, missing_content) = {
            let mut state = self.state.borrow_mut();
            if !state.mounted || state.phase == ModalPhase::Open {
                return;
            }
            state.phase = ModalPhase::Open;
            let surfaces = state.surfaces;
            (
                surfaces.content.or(surfaces.overlay),
                state.config.trap_options(),
                surfaces.content.is_none(),
            )
        };
        let _span = tracing::debug_span!("modal_open", modal = self.id.id()).entered();

        self.stack.register(self.id, self.this.clone());

        if missing_content {
            self.report(ModalDiagnostic::MissingSurfaces {
                modal: self.id,
                fallback: container,
            });
        }
        if let Some(container) = container
            && let ActivateOutcome::Refused(node) =
                self.with_trap(|trap, tree| trap.activate(tree, container, options))
        {
            self.report(ModalDiagnostic::FocusRejected {
                modal: self.id,
                node,
            });
        }

        tracing::debug!(modal = self.id.id(), "modal opened");
        let hook = self.callbacks.borrow().on_after_open.clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    fn close(&self) {
        {
            let mut state = self.state.borrow_mut();
            if state.phase == ModalPhase::Closed {
                return;
            }
            state.phase = ModalPhase::Closed;
            state.gesture.reset();
        }
        let _span = tracing::debug_span!("modal_close", modal = self.id.id()).entered();

        self.stack.unregister(self.id);

        match self.with_trap(|trap, tree| trap.deactivate(tree)) {
            RestoreOutcome::Stale(node) => self.report(ModalDiagnostic::StaleFocusMemento {
                modal: self.id,
                node,
            }),
            RestoreOutcome::Refused(node) => self.report(ModalDiagnostic::FocusRejected {
                modal: self.id,
                node,
            }),
            outcome => {
                tracing::trace!(target: "scrim::focus", modal = self.id.id(), ?outcome, "trap released");
            }
        }

        tracing::debug!(modal = self.id.id(), "modal closed");
        let hook = self.callbacks.borrow().on_after_close.clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    fn set_open(&self, open: bool) {
        self.state.borrow_mut().config.is_open = open;
        if open {
            self.open();
        } else {
            self.close();
        }
    }

    fn update(&self, config: ModalConfig) {
        let previous = std::mem::replace(&mut self.state.borrow_mut().config, config);
        if previous.is_open != config.is_open {
            if config.is_open {
                self.open();
            } else {
                self.close();
            }
        }
    }

    fn unmount(&self) {
        if !self.state.borrow().mounted {
            return;
        }
        self.close();
        self.state.borrow_mut().mounted = false;
        tracing::debug!(modal = self.id.id(), "modal unmounted");
    }

    /// Hand a dismissal request to the host. Returns `false` when no
    /// `on_request_close` is registered.
    fn request_close(&self, event: &UiEvent) -> bool {
        let hook = self.callbacks.borrow().on_request_close.clone();
        let Some(hook) = hook else {
            return false;
        };
        tracing::debug!(
            modal = self.id.id(),
            event = event.id().get(),
            "dismissal requested"
        );
        hook(event);
        true
    }

    fn handle_event(&self, event: &mut UiEvent) -> Option<ModalAction> {
        let (surfaces, close_on_overlay_click) = {
            let state = self.state.borrow();
            if state.phase != ModalPhase::Open {
                return None;
            }
            (state.surfaces, state.config.close_on_overlay_click)
        };
        let _span = tracing::debug_span!(
            "modal_event",
            modal = self.id.id(),
            event = event.id().get()
        )
        .entered();

        let input = *event.event();
        match input {
            Event::Key(key) if key.is_tab() => {
                let backward = key.is_backward_tab();
                match self.with_trap(|trap, tree| trap.scope_tab(tree, backward)) {
                    TabOutcome::Intercepted { focused } => {
                        event.prevent_default();
                        Some(ModalAction::TabTrapped(focused))
                    }
                    TabOutcome::PassThrough | TabOutcome::Inactive => None,
                }
            }
            Event::Key(_) => None,
            Event::Mouse(mouse) => {
                let surface = Surface::classify(
                    self.tree.as_ref(),
                    surfaces.overlay,
                    surfaces.content,
                    event.target(),
                );
                match mouse.kind {
                    MouseEventKind::Down(_) => {
                        self.state.borrow_mut().gesture.press(surface);
                        if surface == Some(Surface::Overlay) && !close_on_overlay_click {
                            event.prevent_default();
                            return Some(ModalAction::OverlayPressSuppressed);
                        }
                        None
                    }
                    MouseEventKind::Up(_) => {
                        self.state.borrow_mut().gesture.release(surface);
                        None
                    }
                    MouseEventKind::Click(_) => {
                        let eligible = self.state.borrow_mut().gesture.click(surface);
                        if !eligible || !close_on_overlay_click {
                            return None;
                        }
                        if self.request_close(event) {
                            return Some(ModalAction::DismissRequested);
                        }
                        let target = surfaces.content.or(surfaces.overlay)?;
                        self.tree
                            .focus(target)
                            .then_some(ModalAction::ContentFocused)
                    }
                    MouseEventKind::Moved => None,
                }
            }
            Event::Focus(false) => {
                self.state.borrow_mut().trap.mark_blurred();
                None
            }
            Event::Focus(true) => {
                if self.stack.top_id() != Some(self.id) {
                    return None;
                }
                self.with_trap(|trap, tree| trap.reclaim(tree))
                    .map(ModalAction::FocusReclaimed)
            }
        }
    }
}

impl StackModal for ModalInner {
    fn close_on_escape(&self) -> bool {
        self.state.borrow().config.close_on_escape
    }

    fn on_escape(&self, event: &UiEvent) {
        self.request_close(event);
    }
}

/// An owned modal dialog. Dropping it unmounts it.
pub struct Modal {
    inner: Rc<ModalInner>,
}

impl Modal {
    /// Mount a modal over `surfaces`. Opens immediately when
    /// `config.is_open` is set.
    pub fn new(
        stack: &ModalStack,
        tree: Rc<dyn NodeTree>,
        surfaces: Surfaces,
        config: ModalConfig,
        callbacks: ModalCallbacks,
    ) -> Self {
        let inner = Rc::new_cyclic(|this| ModalInner {
            id: ModalId::new(),
            this: this.clone(),
            stack: stack.clone(),
            tree,
            state: RefCell::new(ModalState {
                phase: ModalPhase::Closed,
                mounted: true,
                config,
                surfaces,
                trap: FocusTrap::new(),
                gesture: PointerGesture::new(),
            }),
            callbacks: RefCell::new(callbacks),
        });
        tracing::debug!(modal = inner.id.id(), open = config.is_open, "modal mounted");
        if config.is_open {
            inner.open();
        }
        Self { inner }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ModalId {
        self.inner.id
    }

    #[must_use]
    pub fn phase(&self) -> ModalPhase {
        self.inner.phase()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.phase() == ModalPhase::Open
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.inner.state.borrow().mounted
    }

    #[must_use]
    pub fn config(&self) -> ModalConfig {
        self.inner.state.borrow().config
    }

    #[must_use]
    pub fn surfaces(&self) -> Surfaces {
        self.inner.state.borrow().surfaces
    }

    /// The focus memento held by the current open phase, if any.
    #[must_use]
    pub fn focus_memento(&self) -> Option<FocusMemento> {
        self.inner.state.borrow().trap.memento()
    }

    /// Open or close explicitly.
    pub fn set_open(&self, open: bool) {
        self.inner.set_open(open);
    }

    /// Apply a re-rendered configuration. Only a change of `is_open`
    /// relative to the previous configuration drives a transition.
    pub fn update(&self, config: ModalConfig) {
        self.inner.update(config);
    }

    /// Replace the host callbacks.
    pub fn set_callbacks(&self, callbacks: ModalCallbacks) {
        *self.inner.callbacks.borrow_mut() = callbacks;
    }

    /// Force the modal closed. No-op when already closed.
    pub fn close(&self) {
        self.inner.close();
    }

    /// Close if open, then detach from the stack for good. Later open
    /// requests are ignored.
    pub fn unmount(&self) {
        self.inner.unmount();
    }

    /// Route an event delivered inside the overlay subtree.
    ///
    /// Escape is not handled here; the document-level listener forwards it
    /// to [`ModalStack::handle_event`].
    pub fn handle_event(&self, event: &mut UiEvent) -> Option<ModalAction> {
        self.inner.handle_event(event)
    }

    /// A non-owning handle for listeners and imperative access.
    #[must_use]
    pub fn handle(&self) -> ModalHandle {
        ModalHandle {
            id: self.inner.id,
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl fmt::Debug for Modal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Modal")
            .field("id", &self.inner.id)
            .field("state", &self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl Drop for Modal {
    fn drop(&mut self) {
        self.inner.unmount();
    }
}

/// Weak handle to a [`Modal`]. Operations on a dropped modal are no-ops.
#[derive(Clone)]
pub struct ModalHandle {
    id: ModalId,
    inner: Weak<ModalInner>,
}

impl ModalHandle {
    #[inline]
    #[must_use]
    pub fn id(&self) -> ModalId {
        self.id
    }

    /// Whether the modal still exists.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// `false` once the modal is closed or dropped.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.phase() == ModalPhase::Open)
    }

    /// Force the modal closed.
    pub fn close(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.close();
        }
    }

    pub fn handle_event(&self, event: &mut UiEvent) -> Option<ModalAction> {
        self.inner.upgrade()?.handle_event(event)
    }
}

impl fmt::Debug for ModalHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalHandle")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}
