//! The AST (component C6): syntax tree nodes produced by the match engine,
//! plus post-order listener dispatch.

use std::any::Any;

use triomphe::Arc;

use crate::render::Glyphs;
use crate::symbol::SymbolId;

/// Per-variant bookkeeping a listener can read off a node without walking
/// back through the grammar: which `Option` branch fired, or which
/// `Junction` alternative won.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeMeta {
    None,
    Option { matched: bool },
    Junction { ordinal: usize },
}

/// One node of a parsed tree.
///
/// Invariant (`spec.md` §3): the concatenation of this node's leaves'
/// substrings, in post-order, equals `self.substring`.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxTreeNode {
    pub(crate) symbol: SymbolId,
    pub(crate) name: Option<String>,
    pub(crate) substring: String,
    pub(crate) children: Vec<SyntaxTreeNode>,
    pub(crate) meta: NodeMeta,
}

impl SyntaxTreeNode {
    pub(crate) fn leaf(symbol: SymbolId, substring: String) -> Self {
        Self {
            symbol,
            name: None,
            substring,
            children: Vec::new(),
            meta: NodeMeta::None,
        }
    }

    pub(crate) fn with_children(
        symbol: SymbolId,
        substring: String,
        children: Vec<SyntaxTreeNode>,
    ) -> Self {
        Self {
            symbol,
            name: None,
            substring,
            children,
            meta: NodeMeta::None,
        }
    }

    /// The symbol (by arena id) that produced this node.
    pub fn symbol_id(&self) -> SymbolId {
        self.symbol
    }

    /// The name this node is tagged with, if it (or the `Named` wrapper
    /// that produced it) has one. Used both for listener dispatch keying
    /// and for `rawName`-style lookups from user code.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The exact source text this node matched.
    pub fn substring(&self) -> &str {
        &self.substring
    }

    pub fn children(&self) -> &[SyntaxTreeNode] {
        &self.children
    }

    /// A read-only view into child `i`, for listener code that wants
    /// `matched_as`-style indexed access (`SPEC_FULL.md` §9) without a
    /// per-arity generated type.
    pub fn nth_child(&self, i: usize) -> Option<&SyntaxTreeNode> {
        self.children.get(i)
    }

    /// Whether an `Option` symbol's inner child matched. `None` if this
    /// node was not produced by an `Option`.
    pub fn match_succeeded(&self) -> Option<bool> {
        match self.meta {
            NodeMeta::Option { matched } => Some(matched),
            _ => None,
        }
    }

    /// Whether this node's producing `Option` symbol's inner child failed
    /// to match (the complement of [`Self::match_succeeded`]).
    pub fn match_failed(&self) -> Option<bool> {
        self.match_succeeded().map(|m| !m)
    }

    /// The index (0-based, declaration order) of the alternative that won,
    /// for a node produced by a `Junction` symbol.
    pub fn match_ordinal(&self) -> Option<usize> {
        match self.meta {
            NodeMeta::Junction { ordinal } => Some(ordinal),
            _ => None,
        }
    }

    /// Renders this subtree as an indented tree string, for debugging
    /// (`spec.md` §4.6: "out of core scope but must be available").
    pub fn render(&self, glyphs: Glyphs) -> String {
        crate::render::render(self, glyphs)
    }
}

/// A listener invoked with just the matched node (no forwarded argument).
pub type NullaryListener = Arc<dyn Fn(&SyntaxTreeNode) + Send + Sync>;

/// A listener invoked with a type-erased `&mut A` argument alongside the
/// node; downcast at the call site. `A` is chosen by the grammar's caller
/// at parse time (`SPEC_FULL.md` §10.3), not fixed in the grammar itself.
pub type UnaryListener = Arc<dyn Fn(&mut dyn Any, &SyntaxTreeNode) + Send + Sync>;

/// One symbol's resolved listener, composed at build/extend time into a
/// single callable (`spec.md` §4.6, §9 "Listener extension composition").
#[derive(Clone)]
pub enum Listener {
    Nullary(NullaryListener),
    Unary(UnaryListener),
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Listener::Nullary(_) => write!(f, "Listener::Nullary(..)"),
            Listener::Unary(_) => write!(f, "Listener::Unary(..)"),
        }
    }
}

/// Runs `f` on every node of `root` in post-order (children before parent),
/// invoking `dispatch` for each named node.
pub(crate) fn walk_post_order<'a>(
    root: &'a SyntaxTreeNode,
    dispatch: &mut dyn FnMut(&'a SyntaxTreeNode),
) {
    for child in &root.children {
        walk_post_order(child, dispatch);
    }
    dispatch(root);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> SymbolId {
        SymbolId(n)
    }

    #[test]
    fn round_trip_concatenation() {
        let leaf_a = SyntaxTreeNode::leaf(id(0), "1".to_string());
        let leaf_b = SyntaxTreeNode::leaf(id(0), "22".to_string());
        let parent =
            SyntaxTreeNode::with_children(id(1), "1+22".to_string(), vec![leaf_a, leaf_b]);

        fn leaves<'a>(n: &'a SyntaxTreeNode, out: &mut Vec<&'a str>) {
            if n.children.is_empty() {
                out.push(&n.substring);
            } else {
                for c in &n.children {
                    leaves(c, out);
                }
            }
        }
        let mut out = Vec::new();
        leaves(&parent, &mut out);
        assert_eq!(out.concat(), parent.substring);
    }

    #[test]
    fn post_order_visits_children_before_parent() {
        let leaf = SyntaxTreeNode::leaf(id(0), "x".to_string());
        let root = SyntaxTreeNode::with_children(id(1), "x".to_string(), vec![leaf]);
        let mut seen = Vec::new();
        walk_post_order(&root, &mut |n| seen.push(n.substring.clone()));
        assert_eq!(seen, vec!["x".to_string(), "x".to_string()]);
    }

    #[test]
    fn symbol_id_reports_the_producing_symbol() {
        let node = SyntaxTreeNode::leaf(id(7), "x".to_string());
        assert_eq!(node.symbol_id(), id(7));
    }

    #[test]
    fn nth_child_indexes_and_reports_missing() {
        let a = SyntaxTreeNode::leaf(id(0), "a".to_string());
        let b = SyntaxTreeNode::leaf(id(0), "b".to_string());
        let root = SyntaxTreeNode::with_children(id(1), "ab".to_string(), vec![a, b]);
        assert_eq!(root.nth_child(0).unwrap().substring(), "a");
        assert_eq!(root.nth_child(1).unwrap().substring(), "b");
        assert!(root.nth_child(2).is_none());
    }

    #[test]
    fn match_failed_is_complement_of_match_succeeded() {
        let mut node = SyntaxTreeNode::leaf(id(0), String::new());
        node.meta = NodeMeta::Option { matched: true };
        assert_eq!(node.match_succeeded(), Some(true));
        assert_eq!(node.match_failed(), Some(false));

        node.meta = NodeMeta::Option { matched: false };
        assert_eq!(node.match_failed(), Some(true));

        node.meta = NodeMeta::None;
        assert_eq!(node.match_failed(), None);
    }
}
