#![forbid(unsafe_code)]

//! Rendering-layer interface.
//!
//! The modal coordinator never owns view nodes. It borrows [`NodeId`]s handed
//! to it by the rendering layer and asks that layer, through [`NodeTree`],
//! for the handful of facts it needs: which element is focused, whether a
//! node is still attached, who contains whom, and which elements can take
//! keyboard focus.
//!
//! # Contract
//!
//! - Queries are pure: calling any `&self` query twice without an
//!   intervening mutation returns the same answer.
//! - `focus` is the only mutating operation the coordinator performs. It may
//!   refuse (detached, hidden, or non-focusable node) and reports that by
//!   returning `false`.
//! - Implementations use interior mutability. The coordinator may call back
//!   into the tree from inside an event listener the tree is dispatching.

/// Opaque handle to a node owned by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw id value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Element categories that matter for keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ElementKind {
    /// Plain container or text node.
    #[default]
    Generic,
    Button,
    Input,
    Select,
    TextArea,
    Object,
    /// Anchor; only focusable on its own when it carries an `href`.
    Anchor { href: bool },
}

impl ElementKind {
    /// Whether the element takes focus without an explicit tab index.
    #[must_use]
    pub const fn is_natively_focusable(self) -> bool {
        match self {
            Self::Button | Self::Input | Self::Select | Self::TextArea | Self::Object => true,
            Self::Anchor { href } => href,
            Self::Generic => false,
        }
    }

    /// Whether the `disabled` state applies to this kind.
    #[must_use]
    pub const fn is_form_control(self) -> bool {
        matches!(
            self,
            Self::Button | Self::Input | Self::Select | Self::TextArea | Self::Object
        )
    }
}

/// Per-node facts used to decide focusability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FocusTraits {
    pub kind: ElementKind,
    /// Explicit tab index, if the node declares one.
    pub tab_index: Option<i32>,
    pub disabled: bool,
    /// Not rendered (zero size or display none). Hides descendants too.
    pub hidden: bool,
}

impl FocusTraits {
    #[must_use]
    pub const fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            tab_index: None,
            disabled: false,
            hidden: false,
        }
    }

    #[must_use]
    pub const fn tab_index(mut self, index: i32) -> Self {
        self.tab_index = Some(index);
        self
    }

    #[must_use]
    pub const fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    #[must_use]
    pub const fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Whether this node alone (ignoring ancestors) can receive focus at all,
    /// programmatically or via keyboard.
    #[must_use]
    pub const fn is_focusable(&self) -> bool {
        if self.hidden {
            return false;
        }
        let native = self.kind.is_natively_focusable() && !self.disabled;
        // Anchors without href and disabled controls can still be focused
        // when they declare a tab index.
        native || self.tab_index.is_some()
    }
}

/// Queries and focus operations the coordinator needs from the view layer.
pub trait NodeTree {
    /// The currently focused element, if any. `None` stands for "document
    /// body / nothing focused".
    fn active_element(&self) -> Option<NodeId>;

    /// Move focus to `node`. Returns `false` if the node cannot take focus.
    fn focus(&self, node: NodeId) -> bool;

    /// Drop focus entirely.
    fn blur(&self);

    /// Whether `node` exists and is attached to the document.
    fn is_attached(&self, node: NodeId) -> bool;

    /// Parent of `node`, or `None` for the root or unknown nodes.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// All descendants of `root` in document (pre-)order, excluding `root`.
    fn descendants(&self, root: NodeId) -> Vec<NodeId>;

    /// Focus-related facts for `node`, or `None` for unknown nodes.
    fn focus_traits(&self, node: NodeId) -> Option<FocusTraits>;

    /// Whether `node` is `ancestor` or one of its descendants.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }
}
