//! Filter tree
//!
//! An n-ary tree of AND/OR groups with rules at the leaves. The tree owns all
//! of its nodes; a parent lists its children in order and every node keeps a
//! back-reference to its parent for traversal only. Nodes are addressed by
//! [`NodeId`], unique within one tree.
//!
//! Nodes are created only through [`FilterTree::new`] (the root),
//! [`FilterTree::add_internal`] and [`FilterTree::add_leaf`]. Removing the
//! last child of a non-root group removes the group too, so no empty wrapper
//! is left behind by an edit.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::error::FilterError;
use super::rule::Rule;

/// Identity of a node within its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Combinator applied across the children of a group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    /// Query-engine spelling of the combinator
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "_and",
            Self::Or => "_or",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Leaf(Rule),
    Internal {
        conjunction: Conjunction,
        children: Vec<NodeId>,
    },
}

#[derive(Debug, Clone)]
pub struct FilterNode {
    id: NodeId,
    depth: usize,
    parent: Option<NodeId>,
    kind: NodeKind,
}

impl FilterNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Distance from the root (root = 0)
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    pub fn rule(&self) -> Option<&Rule> {
        match &self.kind {
            NodeKind::Leaf(rule) => Some(rule),
            NodeKind::Internal { .. } => None,
        }
    }

    pub fn conjunction(&self) -> Option<Conjunction> {
        match &self.kind {
            NodeKind::Leaf(_) => None,
            NodeKind::Internal { conjunction, .. } => Some(*conjunction),
        }
    }

    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Leaf(_) => &[],
            NodeKind::Internal { children, .. } => children,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterTree {
    base_table: String,
    root: NodeId,
    nodes: FxHashMap<NodeId, FilterNode>,
    next_id: u64,
}

impl FilterTree {
    /// New tree whose root is an empty AND group over `base_table`
    pub fn new(base_table: impl Into<String>) -> Self {
        Self::with_conjunction(base_table, Conjunction::And)
    }

    pub fn with_conjunction(base_table: impl Into<String>, conjunction: Conjunction) -> Self {
        let root = NodeId(0);
        let mut nodes = FxHashMap::default();
        nodes.insert(
            root,
            FilterNode {
                id: root,
                depth: 0,
                parent: None,
                kind: NodeKind::Internal {
                    conjunction,
                    children: Vec::new(),
                },
            },
        );
        Self {
            base_table: base_table.into(),
            root,
            nodes,
            next_id: 1,
        }
    }

    /// Table filtered by this tree, shared by every node
    pub fn base_table(&self) -> &str {
        &self.base_table
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&FilterNode> {
        self.nodes.get(&id)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(&id).map(FilterNode::children).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(FilterNode::parent)
    }

    pub fn depth(&self, id: NodeId) -> Option<usize> {
        self.nodes.get(&id).map(FilterNode::depth)
    }

    /// Add an empty group under `parent`
    pub fn add_internal(
        &mut self,
        parent: NodeId,
        conjunction: Conjunction,
    ) -> Result<NodeId, FilterError> {
        self.attach_new(
            parent,
            NodeKind::Internal {
                conjunction,
                children: Vec::new(),
            },
        )
    }

    /// Add a rule under `parent`
    pub fn add_leaf(&mut self, parent: NodeId, rule: Rule) -> Result<NodeId, FilterError> {
        self.attach_new(parent, NodeKind::Leaf(rule))
    }

    fn attach_new(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId, FilterError> {
        let depth = self.require_internal(parent)?.depth + 1;
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            FilterNode {
                id,
                depth,
                parent: Some(parent),
                kind,
            },
        );
        self.children_mut(parent)?.push(id);
        Ok(id)
    }

    /// Replace the rule of a leaf, or turn an empty non-root group into a leaf
    pub fn set_rule(&mut self, id: NodeId, rule: Rule) -> Result<(), FilterError> {
        if id == self.root {
            return Err(FilterError::structural("the root cannot hold a rule"));
        }
        let node = self.require(id)?;
        if !node.children().is_empty() {
            return Err(FilterError::structural(format!(
                "node {} has children and cannot hold a rule",
                id
            )));
        }
        self.require_mut(id)?.kind = NodeKind::Leaf(rule);
        Ok(())
    }

    pub fn set_conjunction(
        &mut self,
        id: NodeId,
        conjunction: Conjunction,
    ) -> Result<(), FilterError> {
        match &mut self.require_mut(id)?.kind {
            NodeKind::Internal {
                conjunction: current,
                ..
            } => {
                *current = conjunction;
                Ok(())
            }
            NodeKind::Leaf(_) => Err(FilterError::structural(format!(
                "leaf {} has no conjunction",
                id
            ))),
        }
    }

    /// Move `id` to the end of `parent`'s children
    pub fn append_child(&mut self, parent: NodeId, id: NodeId) -> Result<(), FilterError> {
        self.set_parent(id, parent)
    }

    /// Move `id` (with its subtree) under `new_parent`
    ///
    /// If the old parent is left empty and is not the root, it is removed.
    pub fn set_parent(&mut self, id: NodeId, new_parent: NodeId) -> Result<(), FilterError> {
        if id == self.root {
            return Err(FilterError::structural("the root cannot be moved"));
        }
        self.require(id)?;
        self.require_internal(new_parent)?;
        if new_parent == id || self.is_descendant_of(new_parent, id) {
            return Err(FilterError::structural(format!(
                "cannot move {} under its own descendant {}",
                id, new_parent
            )));
        }

        let old_parent = self.parent(id);
        if let Some(old_parent) = old_parent {
            self.children_mut(old_parent)?.retain(|c| *c != id);
        }
        self.children_mut(new_parent)?.push(id);
        self.require_mut(id)?.parent = Some(new_parent);
        self.refresh_depths(id);

        if let Some(old_parent) = old_parent
            && old_parent != new_parent
        {
            self.prune_if_empty(old_parent);
        }
        Ok(())
    }

    /// Replace the children of a group
    ///
    /// Children not in `children` are dropped with their subtrees; listed
    /// nodes are moved here in the given order. A group other than the root
    /// left without children is removed like in [`FilterTree::remove`].
    pub fn set_children(&mut self, id: NodeId, children: Vec<NodeId>) -> Result<(), FilterError> {
        self.require_internal(id)?;
        for child in &children {
            self.require(*child)?;
            if *child == self.root
                || *child == id
                || self.is_descendant_of(id, *child)
                || children.iter().any(|other| self.is_descendant_of(*child, *other))
            {
                return Err(FilterError::structural(format!(
                    "{} cannot become a child of {}",
                    child, id
                )));
            }
        }

        for child in &children {
            if self.parent(*child) != Some(id) {
                self.set_parent(*child, id)?;
            }
        }

        let dropped: Vec<NodeId> = self
            .children(id)
            .iter()
            .copied()
            .filter(|c| !children.contains(c))
            .collect();
        for child in dropped {
            self.drop_subtree(child);
        }

        *self.children_mut(id)? = children;
        self.prune_if_empty(id);
        Ok(())
    }

    /// Remove a node and its subtree
    ///
    /// Parents emptied by the removal are removed as well, up to the root.
    pub fn remove(&mut self, id: NodeId) -> Result<(), FilterError> {
        if id == self.root {
            return Err(FilterError::structural("the root cannot be removed"));
        }
        let parent = self.require(id)?.parent;
        if let Some(parent) = parent {
            self.children_mut(parent)?.retain(|c| *c != id);
        }
        self.drop_subtree(id);
        if let Some(parent) = parent {
            self.prune_if_empty(parent);
        }
        Ok(())
    }

    /// Whether `ancestor` lies strictly above `id`
    pub fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// A leaf is valid iff its rule is; a group iff all its children are
    pub fn is_node_valid(&self, id: NodeId) -> bool {
        match self.nodes.get(&id).map(FilterNode::kind) {
            Some(NodeKind::Leaf(rule)) => rule.is_valid(),
            Some(NodeKind::Internal { children, .. }) => {
                children.iter().all(|c| self.is_node_valid(*c))
            }
            None => false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_node_valid(self.root)
    }

    /// Leaves in depth-first order
    pub fn leaves(&self) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            match self.nodes.get(&id).map(FilterNode::kind) {
                Some(NodeKind::Leaf(_)) => leaves.push(id),
                Some(NodeKind::Internal { children, .. }) => {
                    stack.extend(children.iter().rev().copied())
                }
                None => {}
            }
        }
        leaves
    }

    /// Rules in depth-first order
    pub fn rules(&self) -> Vec<&Rule> {
        self.leaves()
            .into_iter()
            .filter_map(|id| self.nodes.get(&id).and_then(FilterNode::rule))
            .collect()
    }

    pub(crate) fn require(&self, id: NodeId) -> Result<&FilterNode, FilterError> {
        self.nodes
            .get(&id)
            .ok_or_else(|| FilterError::structural(format!("node {} is not part of this tree", id)))
    }

    fn require_mut(&mut self, id: NodeId) -> Result<&mut FilterNode, FilterError> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| FilterError::structural(format!("node {} is not part of this tree", id)))
    }

    fn require_internal(&self, id: NodeId) -> Result<&FilterNode, FilterError> {
        let node = self.require(id)?;
        if node.is_leaf() {
            return Err(FilterError::structural(format!(
                "leaf {} cannot have children",
                id
            )));
        }
        Ok(node)
    }

    pub(crate) fn children_mut(&mut self, id: NodeId) -> Result<&mut Vec<NodeId>, FilterError> {
        match &mut self.require_mut(id)?.kind {
            NodeKind::Internal { children, .. } => Ok(children),
            NodeKind::Leaf(_) => Err(FilterError::structural(format!(
                "leaf {} cannot have children",
                id
            ))),
        }
    }

    /// Recompute depth of `id` and everything below it
    pub(crate) fn refresh_depths(&mut self, id: NodeId) {
        let depth = self
            .parent(id)
            .and_then(|p| self.depth(p))
            .map_or(0, |d| d + 1);
        let mut stack = vec![(id, depth)];
        while let Some((current, depth)) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(&current) {
                node.depth = depth;
                stack.extend(node.children().iter().map(|c| (*c, depth + 1)));
            }
        }
    }

    /// Forget `id` and its descendants; the parent's child list is not touched
    pub(crate) fn drop_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                stack.extend(node.children().iter().copied());
            }
        }
    }

    /// Take a group out of the tree, returning its now orphaned children
    ///
    /// The caller must re-home the children through [`Self::adopt`].
    pub(crate) fn dissolve(&mut self, id: NodeId) -> Vec<NodeId> {
        match self.nodes.remove(&id).map(|n| n.kind) {
            Some(NodeKind::Internal { children, .. }) => children,
            _ => Vec::new(),
        }
    }

    /// Install `children` as the complete child list of group `id`
    pub(crate) fn adopt(&mut self, id: NodeId, children: Vec<NodeId>) -> Result<(), FilterError> {
        for child in &children {
            self.require_mut(*child)?.parent = Some(id);
        }
        *self.children_mut(id)? = children;
        self.refresh_depths(id);
        Ok(())
    }

    fn prune_if_empty(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == self.root {
                return;
            }
            let Some(node) = self.nodes.get(&node_id) else {
                return;
            };
            if node.is_leaf() || !node.children().is_empty() {
                return;
            }
            let parent = node.parent;
            tracing::trace!(node = %node_id, "Removing emptied group");
            self.nodes.remove(&node_id);
            if let Some(parent) = parent
                && let Some(NodeKind::Internal { children, .. }) =
                    self.nodes.get_mut(&parent).map(|n| &mut n.kind)
            {
                children.retain(|c| *c != node_id);
            }
            current = parent;
        }
    }
}
