#![forbid(unsafe_code)]

//! Mount modals into a [`Dom`] the way a rendering layer would.
//!
//! A [`Page`] owns one document and one [`ModalStack`]. It wires a
//! window-level keydown listener to the stack, so Escape is routed once per
//! press regardless of which dialog the key was pressed in.
//!
//! [`Page::render_modal`] creates the dialog's portal directly under
//! `body`: an overlay node with the content container (tab index `-1`)
//! inside it. Overlay listeners forward keys and pointer events to the
//! modal; window focus/blur listeners forward focus changes. Everything is
//! torn down when the returned [`RenderedModal`] is dropped.

use std::rc::Rc;

use scrim_core::{
    ElementKind, Event, Extras, FocusTraits, MouseButton, MouseEventKind, NodeId, NodeTree, UiEvent,
};
use scrim_modal::{Modal, ModalCallbacks, ModalConfig, ModalHandle, ModalStack, Surfaces};

use crate::dom::{Dom, EventType, ListenerId, ListenerTarget};

/// A document plus the modal stack shared by every dialog on it.
#[derive(Debug)]
pub struct Page {
    dom: Dom,
    stack: ModalStack,
    escape_listener: ListenerId,
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Page {
    #[must_use]
    pub fn new() -> Self {
        let dom = Dom::new();
        let stack = ModalStack::new();
        let routed = stack.clone();
        let escape_listener = dom.add_listener(ListenerTarget::Window, EventType::KeyDown, move |ev| {
            routed.handle_event(ev);
        });
        Self {
            dom,
            stack,
            escape_listener,
        }
    }

    #[inline]
    #[must_use]
    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    #[inline]
    #[must_use]
    pub fn stack(&self) -> &ModalStack {
        &self.stack
    }

    /// Append a focusable button under `body`, outside any modal.
    pub fn add_button(&self, label: &str) -> NodeId {
        self.dom
            .append_labeled(self.dom.body(), FocusTraits::new(ElementKind::Button), label)
    }

    /// Mount a modal. `children` populates the content container.
    pub fn render_modal(
        &self,
        config: ModalConfig,
        callbacks: ModalCallbacks,
        children: impl FnOnce(&Dom, NodeId),
    ) -> RenderedModal {
        let overlay = self
            .dom
            .append_labeled(self.dom.body(), FocusTraits::default(), "overlay");
        let content = self.dom.append_labeled(
            overlay,
            FocusTraits::new(ElementKind::Generic).tab_index(-1),
            "content",
        );
        children(&self.dom, content);

        let tree: Rc<dyn NodeTree> = Rc::new(self.dom.clone());
        let modal = Modal::new(
            &self.stack,
            tree,
            Surfaces::new(overlay, content),
            config,
            callbacks,
        );

        let handle = modal.handle();
        let mut listeners = Vec::with_capacity(6);
        for event_type in [
            EventType::KeyDown,
            EventType::MouseDown,
            EventType::MouseUp,
            EventType::Click,
        ] {
            listeners.push(forward(&self.dom, ListenerTarget::Node(overlay), event_type, &handle));
        }
        for event_type in [EventType::Focus, EventType::Blur] {
            listeners.push(forward(&self.dom, ListenerTarget::Window, event_type, &handle));
        }
        tracing::debug!(modal = modal.id().id(), overlay = overlay.get(), "modal rendered");

        RenderedModal {
            dom: self.dom.clone(),
            modal,
            overlay,
            content,
            listeners,
        }
    }

    // --- Input simulation ---

    /// Mouse-down, mouse-up, and click on `node`, each carrying `extras`.
    /// Returns the click event after dispatch.
    pub fn click_at(&self, node: NodeId, extras: &[(&str, &str)]) -> UiEvent {
        self.mouse_down_at(node, extras);
        self.mouse_up_at(node, extras);
        self.dispatch_mouse(MouseEventKind::Click, node, extras)
    }

    pub fn mouse_down_at(&self, node: NodeId, extras: &[(&str, &str)]) -> UiEvent {
        self.dispatch_mouse(MouseEventKind::Down, node, extras)
    }

    pub fn mouse_up_at(&self, node: NodeId, extras: &[(&str, &str)]) -> UiEvent {
        self.dispatch_mouse(MouseEventKind::Up, node, extras)
    }

    /// A bare click with no preceding press, as from `element.click()`.
    pub fn programmatic_click(&self, node: NodeId) -> UiEvent {
        self.dispatch_mouse(MouseEventKind::Click, node, &[])
    }

    pub fn esc_key_down(&self, node: NodeId) -> UiEvent {
        self.dom
            .dispatch(UiEvent::new(Event::escape()).with_target(node))
    }

    pub fn tab_key_down(&self, node: NodeId, shift: bool) -> UiEvent {
        self.dom
            .dispatch(UiEvent::new(Event::tab(shift)).with_target(node))
    }

    pub fn blur_window(&self) -> UiEvent {
        self.dom.dispatch(UiEvent::new(Event::Focus(false)))
    }

    pub fn focus_window(&self) -> UiEvent {
        self.dom.dispatch(UiEvent::new(Event::Focus(true)))
    }

    fn dispatch_mouse(
        &self,
        kind: fn(MouseButton) -> MouseEventKind,
        node: NodeId,
        extras: &[(&str, &str)],
    ) -> UiEvent {
        let extras: Extras = extras
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        self.dom.dispatch(
            UiEvent::new(Event::left(kind))
                .with_target(node)
                .with_extras(extras),
        )
    }
}

impl Drop for Page {
    fn drop(&mut self) {
        self.dom.remove_listener(self.escape_listener);
    }
}

fn forward(
    dom: &Dom,
    target: ListenerTarget,
    event_type: EventType,
    handle: &ModalHandle,
) -> ListenerId {
    let handle = handle.clone();
    dom.add_listener(target, event_type, move |ev| {
        handle.handle_event(ev);
    })
}

/// A mounted modal and its portal nodes. Dropping it unmounts the modal,
/// removes its listeners, and detaches the portal.
#[derive(Debug)]
pub struct RenderedModal {
    dom: Dom,
    modal: Modal,
    overlay: NodeId,
    content: NodeId,
    listeners: Vec<ListenerId>,
}

impl RenderedModal {
    #[must_use]
    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    #[must_use]
    pub fn handle(&self) -> ModalHandle {
        self.modal().handle()
    }

    #[inline]
    #[must_use]
    pub fn overlay(&self) -> NodeId {
        self.overlay
    }

    #[inline]
    #[must_use]
    pub fn content(&self) -> NodeId {
        self.content
    }

    /// Tear down explicitly (same as dropping).
    pub fn unmount(self) {
        drop(self);
    }
}

impl Drop for RenderedModal {
    fn drop(&mut self) {
        // Unmount while the portal is still attached.
        self.modal.unmount();
        for id in self.listeners.drain(..) {
            self.dom.remove_listener(id);
        }
        self.dom.remove(self.overlay);
    }
}
