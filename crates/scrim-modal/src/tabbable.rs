#![forbid(unsafe_code)]

//! Tabbable-element locator.
//!
//! Given a container, produce the elements Tab can land on, in document
//! order. The query is pure and cheap enough to rerun on every Tab press,
//! which is what the focus trap does: content can change between renders.
//!
//! # Rules
//!
//! An element is tabbable when all of these hold:
//! 1. its tab index is unset or `>= 0`;
//! 2. it is focusable on its own: a natively focusable kind that is not
//!    disabled, or any element with an explicit tab index;
//! 3. neither it nor any ancestor strictly inside the container is hidden.
//!
//! The container itself is never part of the result. An empty result means
//! the container is the only place focus can stay.

use scrim_core::{NodeId, NodeTree};

/// Ordered tabbable descendants of `container`.
pub fn tabbable_descendants(tree: &dyn NodeTree, container: NodeId) -> Vec<NodeId> {
    tree.descendants(container)
        .into_iter()
        .filter(|&node| is_tabbable(tree, container, node))
        .collect()
}

/// Whether `node` is a Tab stop inside `container`.
pub fn is_tabbable(tree: &dyn NodeTree, container: NodeId, node: NodeId) -> bool {
    let Some(traits) = tree.focus_traits(node) else {
        return false;
    };
    if traits.tab_index.is_some_and(|index| index < 0) {
        return false;
    }
    traits.is_focusable() && is_visible_within(tree, container, node)
}

/// Where focus lands when entering `container`: its first tabbable element,
/// or the container itself.
pub fn first_focus_target(tree: &dyn NodeTree, container: NodeId) -> NodeId {
    tabbable_descendants(tree, container)
        .first()
        .copied()
        .unwrap_or(container)
}

fn is_visible_within(tree: &dyn NodeTree, container: NodeId, node: NodeId) -> bool {
    let mut cursor = Some(node);
    while let Some(current) = cursor {
        if current == container {
            return true;
        }
        match tree.focus_traits(current) {
            Some(traits) if traits.hidden => return false,
            Some(_) => {}
            None => return false,
        }
        cursor = tree.parent(current);
    }
    // Walked off the top without meeting the container.
    false
}
