#![forbid(unsafe_code)]

//! Minimal in-crate `NodeTree` for unit tests.

use std::cell::{Cell, RefCell};

use scrim_core::{FocusTraits, NodeId, NodeTree};

struct TestNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    traits: FocusTraits,
    attached: bool,
}

#[derive(Default)]
pub(crate) struct TestTree {
    nodes: RefCell<Vec<TestNode>>,
    active: Cell<Option<NodeId>>,
    focus_calls: Cell<usize>,
}

impl TestTree {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self, parent: Option<NodeId>, traits: FocusTraits) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        let id = NodeId::new(nodes.len() as u64);
        nodes.push(TestNode {
            parent,
            children: Vec::new(),
            traits,
            attached: true,
        });
        if let Some(parent) = parent {
            nodes[parent.get() as usize].children.push(id);
        }
        id
    }

    /// Detach a node and its subtree.
    pub(crate) fn detach(&self, node: NodeId) {
        let mut stack = vec![node];
        let mut nodes = self.nodes.borrow_mut();
        while let Some(current) = stack.pop() {
            let entry = &mut nodes[current.get() as usize];
            entry.attached = false;
            stack.extend(entry.children.iter().copied());
        }
        if let Some(active) = self.active.get()
            && !nodes[active.get() as usize].attached
        {
            self.active.set(None);
        }
    }

    /// Set focus without going through focusability checks.
    pub(crate) fn force_focus(&self, node: Option<NodeId>) {
        self.active.set(node);
    }

    pub(crate) fn focus_calls(&self) -> usize {
        self.focus_calls.get()
    }
}

impl NodeTree for TestTree {
    fn active_element(&self) -> Option<NodeId> {
        self.active.get()
    }

    fn focus(&self, node: NodeId) -> bool {
        self.focus_calls.set(self.focus_calls.get() + 1);
        let ok = self.is_attached(node)
            && self
                .focus_traits(node)
                .is_some_and(|traits| traits.is_focusable());
        if ok {
            self.active.set(Some(node));
        }
        ok
    }

    fn blur(&self) {
        self.active.set(None);
    }

    fn is_attached(&self, node: NodeId) -> bool {
        self.nodes
            .borrow()
            .get(node.get() as usize)
            .is_some_and(|n| n.attached)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes
            .borrow()
            .get(node.get() as usize)
            .and_then(|n| n.parent)
    }

    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let nodes = self.nodes.borrow();
        let mut out = Vec::new();
        let Some(start) = nodes.get(root.get() as usize) else {
            return out;
        };
        let mut stack: Vec<NodeId> = start.children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(nodes[current.get() as usize].children.iter().rev().copied());
        }
        out
    }

    fn focus_traits(&self, node: NodeId) -> Option<FocusTraits> {
        self.nodes
            .borrow()
            .get(node.get() as usize)
            .filter(|n| n.attached)
            .map(|n| n.traits)
    }
}
