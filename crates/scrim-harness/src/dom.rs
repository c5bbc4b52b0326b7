#![forbid(unsafe_code)]

//! In-memory document with bubbling event dispatch.
//!
//! `Dom` is the smallest rendering layer that exercises the coordinator the
//! way a browser would:
//!
//! - a node tree rooted at `body`, with per-node [`FocusTraits`];
//! - a single active element, changed only through [`NodeTree::focus`];
//! - listeners on nodes and on the window, invoked target-first up through
//!   the ancestors and finally the window, honouring `stop_propagation`;
//! - the native Tab default action (move to the next tabbable in the
//!   document) when a listener did not prevent it.
//!
//! Listeners run with no internal borrow held, so they may mutate the
//! document, add or remove listeners, and dispatch nested events.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use scrim_core::{Event, FocusTraits, MouseEventKind, NodeId, NodeTree, UiEvent};
use scrim_modal::tabbable_descendants;

/// DOM event types a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    KeyDown,
    MouseDown,
    MouseUp,
    Click,
    /// Window gained focus.
    Focus,
    /// Window lost focus.
    Blur,
}

impl EventType {
    /// The type under which `event` is dispatched, if any.
    #[must_use]
    pub fn of(event: &Event) -> Option<Self> {
        match event {
            Event::Key(key) if key.is_press() => Some(Self::KeyDown),
            Event::Key(_) => None,
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::Down(_) => Some(Self::MouseDown),
                MouseEventKind::Up(_) => Some(Self::MouseUp),
                MouseEventKind::Click(_) => Some(Self::Click),
                MouseEventKind::Moved => None,
            },
            Event::Focus(true) => Some(Self::Focus),
            Event::Focus(false) => Some(Self::Blur),
        }
    }
}

/// Where a listener is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerTarget {
    Node(NodeId),
    Window,
}

/// Identifies a registered listener for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback = Rc<dyn Fn(&mut UiEvent)>;

struct Listener {
    id: ListenerId,
    target: ListenerTarget,
    event_type: EventType,
    callback: Callback,
}

struct DomNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    traits: FocusTraits,
    label: Option<String>,
    attached: bool,
}

struct DomInner {
    nodes: RefCell<Vec<DomNode>>,
    active: Cell<Option<NodeId>>,
    listeners: RefCell<Vec<Listener>>,
    next_listener: Cell<u64>,
}

/// Shared handle to an in-memory document. Clones refer to the same
/// document.
#[derive(Clone)]
pub struct Dom {
    inner: Rc<DomInner>,
    body: NodeId,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dom")
            .field("nodes", &self.inner.nodes.borrow().len())
            .field("active", &self.inner.active.get())
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}

impl Dom {
    /// An empty document holding only `body`.
    #[must_use]
    pub fn new() -> Self {
        let body = NodeId::new(0);
        let inner = DomInner {
            nodes: RefCell::new(vec![DomNode {
                parent: None,
                children: Vec::new(),
                traits: FocusTraits::default(),
                label: Some("body".to_owned()),
                attached: true,
            }]),
            active: Cell::new(None),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(1),
        };
        Self {
            inner: Rc::new(inner),
            body,
        }
    }

    #[inline]
    #[must_use]
    pub fn body(&self) -> NodeId {
        self.body
    }

    // --- Tree mutation ---

    /// Append a child to `parent`.
    pub fn append(&self, parent: NodeId, traits: FocusTraits) -> NodeId {
        self.insert(parent, traits, None)
    }

    /// Append a child carrying a text label (handy for assertions).
    pub fn append_labeled(
        &self,
        parent: NodeId,
        traits: FocusTraits,
        label: impl Into<String>,
    ) -> NodeId {
        self.insert(parent, traits, Some(label.into()))
    }

    fn insert(&self, parent: NodeId, traits: FocusTraits, label: Option<String>) -> NodeId {
        let mut nodes = self.inner.nodes.borrow_mut();
        let id = NodeId::new(nodes.len() as u64);
        let attached = nodes
            .get(parent.get() as usize)
            .is_some_and(|p| p.attached);
        nodes.push(DomNode {
            parent: Some(parent),
            children: Vec::new(),
            traits,
            label,
            attached,
        });
        if let Some(parent) = nodes.get_mut(parent.get() as usize) {
            parent.children.push(id);
        }
        id
    }

    /// Detach `node` and its subtree. Focus inside the subtree is dropped.
    pub fn remove(&self, node: NodeId) {
        if node == self.body {
            return;
        }
        let mut nodes = self.inner.nodes.borrow_mut();
        let Some(parent) = nodes.get(node.get() as usize).and_then(|n| n.parent) else {
            return;
        };
        if let Some(parent) = nodes.get_mut(parent.get() as usize) {
            parent.children.retain(|child| *child != node);
        }
        let mut pending = vec![node];
        while let Some(current) = pending.pop() {
            if let Some(entry) = nodes.get_mut(current.get() as usize) {
                entry.attached = false;
                pending.extend(entry.children.iter().copied());
            }
        }
        if let Some(active) = self.inner.active.get()
            && nodes
                .get(active.get() as usize)
                .is_none_or(|n| !n.attached)
        {
            self.inner.active.set(None);
        }
    }

    /// Replace the focus traits of `node`.
    pub fn set_traits(&self, node: NodeId, traits: FocusTraits) {
        if let Some(entry) = self.inner.nodes.borrow_mut().get_mut(node.get() as usize) {
            entry.traits = traits;
        }
    }

    #[must_use]
    pub fn label(&self, node: NodeId) -> Option<String> {
        self.inner
            .nodes
            .borrow()
            .get(node.get() as usize)
            .and_then(|n| n.label.clone())
    }

    /// Label of the focused element, if it has one.
    #[must_use]
    pub fn active_label(&self) -> Option<String> {
        self.active_element().and_then(|node| self.label(node))
    }

    // --- Listeners ---

    pub fn add_listener(
        &self,
        target: ListenerTarget,
        event_type: EventType,
        callback: impl Fn(&mut UiEvent) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.inner.next_listener.get());
        self.inner.next_listener.set(id.0 + 1);
        self.inner.listeners.borrow_mut().push(Listener {
            id,
            target,
            event_type,
            callback: Rc::new(callback),
        });
        id
    }

    /// Returns `false` if the listener was already removed.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    fn listeners_for(&self, target: ListenerTarget, event_type: EventType) -> Vec<Callback> {
        self.inner
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.target == target && l.event_type == event_type)
            .map(|l| Rc::clone(&l.callback))
            .collect()
    }

    // --- Dispatch ---

    /// Dispatch `event` at its target, bubbling to the ancestors and then
    /// the window. Window focus events (no target) go to the window only.
    ///
    /// Returns the event after dispatch so callers can inspect its flags.
    pub fn dispatch(&self, mut event: UiEvent) -> UiEvent {
        let Some(event_type) = EventType::of(event.event()) else {
            return event;
        };
        let _span = tracing::trace_span!(
            "dom_dispatch",
            event = event.id().get(),
            ?event_type
        )
        .entered();

        let mut path: Vec<ListenerTarget> = Vec::new();
        let mut cursor = event.target().filter(|node| self.is_attached(*node));
        while let Some(node) = cursor {
            path.push(ListenerTarget::Node(node));
            cursor = self.parent(node);
        }
        path.push(ListenerTarget::Window);

        for hop in path {
            for callback in self.listeners_for(hop, event_type) {
                callback(&mut event);
            }
            if event.is_propagation_stopped() {
                tracing::trace!(?hop, "propagation stopped");
                break;
            }
        }

        if !event.is_default_prevented() {
            self.default_action(&event);
        }
        event
    }

    fn default_action(&self, event: &UiEvent) {
        let Some(key) = event.as_key() else {
            return;
        };
        if !key.is_tab() {
            return;
        }
        let order = tabbable_descendants(self, self.body);
        if order.is_empty() {
            return;
        }
        let position = self
            .active_element()
            .and_then(|active| order.iter().position(|node| *node == active));
        let next = match (position, key.is_backward_tab()) {
            (Some(i), false) => order.get(i + 1).copied(),
            (Some(i), true) => i.checked_sub(1).and_then(|i| order.get(i).copied()),
            (None, false) => self.next_after_active(&order),
            (None, true) => order.last().copied(),
        };
        match next {
            Some(node) => {
                self.focus(node);
            }
            // Tabbing past either end leaves the document.
            None => self.blur(),
        }
    }

    /// First tabbable after the active element in document order. The
    /// active element itself may not be tabbable (e.g. a container with a
    /// negative tab index).
    fn next_after_active(&self, order: &[NodeId]) -> Option<NodeId> {
        let Some(active) = self.active_element() else {
            return order.first().copied();
        };
        let document = self.descendants(self.body);
        let Some(active_at) = document.iter().position(|node| *node == active) else {
            return order.first().copied();
        };
        document[active_at + 1..]
            .iter()
            .find(|node| order.contains(node))
            .copied()
    }
}

impl NodeTree for Dom {
    fn active_element(&self) -> Option<NodeId> {
        self.inner.active.get()
    }

    fn focus(&self, node: NodeId) -> bool {
        let focusable = self.is_attached(node)
            && self
                .focus_traits(node)
                .is_some_and(|traits| traits.is_focusable());
        if focusable {
            self.inner.active.set(Some(node));
        }
        focusable
    }

    fn blur(&self) {
        self.inner.active.set(None);
    }

    fn is_attached(&self, node: NodeId) -> bool {
        self.inner
            .nodes
            .borrow()
            .get(node.get() as usize)
            .is_some_and(|n| n.attached)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner
            .nodes
            .borrow()
            .get(node.get() as usize)
            .and_then(|n| n.parent)
    }

    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let nodes = self.inner.nodes.borrow();
        let mut out = Vec::new();
        let Some(start) = nodes.get(root.get() as usize) else {
            return out;
        };
        let mut pending: Vec<NodeId> = start.children.iter().rev().copied().collect();
        while let Some(current) = pending.pop() {
            out.push(current);
            if let Some(entry) = nodes.get(current.get() as usize) {
                pending.extend(entry.children.iter().rev().copied());
            }
        }
        out
    }

    fn focus_traits(&self, node: NodeId) -> Option<FocusTraits> {
        self.inner
            .nodes
            .borrow()
            .get(node.get() as usize)
            .filter(|n| n.attached)
            .map(|n| n.traits)
    }
}
