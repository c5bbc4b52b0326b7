#![forbid(unsafe_code)]

//! Modal stack registry and Escape routing.
//!
//! The `ModalStack` records every open modal in open order. Only the topmost
//! entry may react to the Escape key, independent of how the modals are
//! nested in the view tree.
//!
//! # Invariants
//!
//! - A modal appears at most once; registering twice is a logged no-op.
//! - Insertion order is open order; the last entry is the topmost.
//! - Unregistering removes the entry wherever it sits. The relative order of
//!   the remaining entries is unchanged, and the topmost is simply the last
//!   remaining entry.
//! - Escape is offered to the topmost entry only. If that entry has
//!   `close_on_escape() == false`, nobody is notified; the event is never
//!   passed down to the next entry.
//!
//! # Re-entrancy
//!
//! The stack is shared through `Rc<RefCell<..>>`. No borrow is held while a
//! modal or subscriber callback runs: the topmost entry (and the subscriber
//! list) is snapshotted first, so callbacks may open or close modals
//! synchronously.
//!
//! # Failure Modes
//!
//! - `unregister()` of an unknown id returns `false` (logged, no panic).
//! - Entries whose modal was dropped without unregistering are pruned on the
//!   next Escape dispatch.
//!
//! # Example
//!
//! ```ignore
//! let stack = ModalStack::new();
//! let outer = Modal::new(&stack, tree.clone(), surfaces, config, callbacks);
//! let inner = Modal::new(&stack, tree.clone(), inner_surfaces, config, callbacks);
//!
//! // Document-level keydown listener:
//! stack.handle_event(&event); // only `inner` hears Escape
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use scrim_core::UiEvent;

/// Global counter for unique modal IDs.
static MODAL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a modal instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModalId(u64);

impl ModalId {
    /// Create a new unique modal ID.
    pub(crate) fn new() -> Self {
        Self(MODAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "modal#{}", self.0)
    }
}

/// What a stack entry must provide.
pub trait StackModal {
    /// Whether this modal wants the Escape key.
    fn close_on_escape(&self) -> bool;

    /// Escape was pressed while this modal was topmost.
    fn on_escape(&self, event: &UiEvent);
}

/// Notification sent to stack subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackChange {
    Registered(ModalId),
    Unregistered(ModalId),
}

/// Where an Escape press went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeRouting {
    /// Delivered to the topmost modal.
    Delivered(ModalId),
    /// The topmost modal opted out; nobody was notified.
    Suppressed(ModalId),
    /// No modal is open.
    Empty,
    /// The event was not an Escape press.
    Ignored,
}

type SubscriberFn = Rc<dyn Fn(StackChange, &[ModalId])>;

struct StackEntry {
    id: ModalId,
    modal: Weak<dyn StackModal>,
}

#[derive(Default)]
struct StackInner {
    /// Open modals, bottom to top.
    entries: Vec<StackEntry>,
    subscribers: Vec<(u64, SubscriberFn)>,
    next_subscriber: u64,
}

impl StackInner {
    fn ids(&self) -> Vec<ModalId> {
        self.entries.iter().map(|e| e.id).collect()
    }
}

/// Ordered registry of open modals.
///
/// Cloning yields another handle to the same registry. Create one per
/// application (or per test) and hand it to every [`Modal`](crate::Modal).
#[derive(Clone, Default)]
pub struct ModalStack {
    inner: Rc<RefCell<StackInner>>,
}

impl fmt::Debug for ModalStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalStack")
            .field("ids", &self.ids())
            .finish()
    }
}

impl ModalStack {
    /// Create an empty modal stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Stack Operations ---

    /// Push a modal. Returns `false` (and changes nothing) if `id` is
    /// already registered.
    pub fn register(&self, id: ModalId, modal: Weak<dyn StackModal>) -> bool {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.entries.iter().any(|e| e.id == id) {
                tracing::warn!(modal = id.id(), "modal already registered; ignoring");
                return false;
            }
            inner.entries.push(StackEntry { id, modal });
            tracing::debug!(modal = id.id(), depth = inner.entries.len(), "modal registered");
        }
        self.emit(StackChange::Registered(id));
        true
    }

    /// Remove a modal from wherever it sits. Returns `false` if absent.
    pub fn unregister(&self, id: ModalId) -> bool {
        {
            let mut inner = self.inner.borrow_mut();
            let Some(idx) = inner.entries.iter().position(|e| e.id == id) else {
                tracing::warn!(modal = id.id(), "modal not registered; nothing to remove");
                return false;
            };
            inner.entries.remove(idx);
            tracing::debug!(
                modal = id.id(),
                position = idx,
                depth = inner.entries.len(),
                "modal unregistered"
            );
        }
        self.emit(StackChange::Unregistered(id));
        true
    }

    // --- State Queries ---

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn contains(&self, id: ModalId) -> bool {
        self.inner.borrow().entries.iter().any(|e| e.id == id)
    }

    /// The topmost modal: the last remaining registered entry.
    pub fn top_id(&self) -> Option<ModalId> {
        self.inner.borrow().entries.last().map(|e| e.id)
    }

    /// Open modals, bottom to top.
    pub fn ids(&self) -> Vec<ModalId> {
        self.inner.borrow().ids()
    }

    // --- Event Handling ---

    /// Route a document-level event. Only Escape presses are acted on.
    pub fn handle_event(&self, event: &UiEvent) -> EscapeRouting {
        match event.as_key() {
            Some(key) if key.is_escape() => self.dispatch_escape(event),
            _ => EscapeRouting::Ignored,
        }
    }

    /// Offer an Escape press to the topmost modal only.
    ///
    /// Call once per key press.
    pub fn dispatch_escape(&self, event: &UiEvent) -> EscapeRouting {
        let _span = tracing::debug_span!("escape_dispatch", event = event.id().get()).entered();

        let Some((id, modal)) = self.top_live() else {
            return EscapeRouting::Empty;
        };
        if !modal.close_on_escape() {
            tracing::debug!(modal = id.id(), "topmost modal ignores escape");
            return EscapeRouting::Suppressed(id);
        }
        tracing::debug!(modal = id.id(), "escape delivered");
        modal.on_escape(event);
        EscapeRouting::Delivered(id)
    }

    /// Snapshot the topmost entry whose modal is still alive, pruning dead
    /// entries on the way.
    fn top_live(&self) -> Option<(ModalId, Rc<dyn StackModal>)> {
        let mut pruned = Vec::new();
        let top = {
            let mut inner = self.inner.borrow_mut();
            loop {
                let entry = inner.entries.last()?;
                if let Some(modal) = entry.modal.upgrade() {
                    break Some((entry.id, modal));
                }
                let id = entry.id;
                inner.entries.pop();
                tracing::warn!(modal = id.id(), "pruned dropped modal from stack");
                pruned.push(id);
            }
        };
        for id in pruned {
            self.emit(StackChange::Unregistered(id));
        }
        top
    }

    // --- Subscriptions ---

    /// Observe registrations and removals. The callback receives the change
    /// and the open ids (bottom to top) after it was applied.
    ///
    /// The subscription ends when the returned guard is dropped.
    pub fn subscribe(
        &self,
        callback: impl Fn(StackChange, &[ModalId]) + 'static,
    ) -> StackSubscription {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_subscriber;
        inner.next_subscriber += 1;
        inner.subscribers.push((id, Rc::new(callback)));
        StackSubscription {
            stack: Rc::downgrade(&self.inner),
            id,
        }
    }

    fn emit(&self, change: StackChange) {
        let (subscribers, ids): (Vec<SubscriberFn>, Vec<ModalId>) = {
            let inner = self.inner.borrow();
            (
                inner.subscribers.iter().map(|(_, f)| Rc::clone(f)).collect(),
                inner.ids(),
            )
        };
        for subscriber in subscribers {
            subscriber(change, &ids);
        }
    }
}

/// RAII guard for a [`ModalStack::subscribe`] callback.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct StackSubscription {
    stack: Weak<RefCell<StackInner>>,
    id: u64,
}

impl fmt::Debug for StackSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackSubscription")
            .field("id", &self.id)
            .finish()
    }
}

impl Drop for StackSubscription {
    fn drop(&mut self) {
        if let Some(stack) = self.stack.upgrade()
            && let Ok(mut inner) = stack.try_borrow_mut()
        {
            inner.subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}
