//! Tree simplification
//!
//! Removes intermediate groups that do not change the meaning of the tree:
//! groups with a single child, and groups that repeat their parent's
//! conjunction. The multiset of leaves is never changed.

use std::collections::VecDeque;

use super::error::FilterError;
use super::tree::{Conjunction, FilterTree, NodeId, NodeKind};

enum Shape {
    Leaf,
    Group {
        conjunction: Conjunction,
        children: usize,
    },
}

impl FilterTree {
    /// Whether [`FilterTree::simplify`] would change the tree
    pub fn is_simplifiable(&self) -> bool {
        self.is_simplifiable_at(self.root())
    }

    fn is_simplifiable_at(&self, id: NodeId) -> bool {
        let Some(conjunction) = self.node(id).and_then(|n| n.conjunction()) else {
            return false;
        };
        let children = self.children(id);
        if id == self.root() && children.len() == 1 && self.is_group(children[0]) {
            return true;
        }
        children.iter().any(|child| {
            match self.shape(*child) {
                Some(Shape::Group {
                    conjunction: child_conjunction,
                    children,
                }) if children <= 1 || child_conjunction == conjunction => true,
                _ => self.is_simplifiable_at(*child),
            }
        })
    }

    /// Collapse redundant groups bottom-up
    ///
    /// Idempotent; running it twice leaves the tree as after the first run.
    pub fn simplify(&mut self) -> Result<(), FilterError> {
        let before = self.len();
        self.simplify_at(self.root())?;
        tracing::debug!(
            removed = before - self.len(),
            nodes = self.len(),
            "Simplified filter tree"
        );
        Ok(())
    }

    fn simplify_at(&mut self, id: NodeId) -> Result<(), FilterError> {
        for child in self.children(id).to_vec() {
            if self.is_group(child) {
                self.simplify_at(child)?;
            }
        }

        loop {
            let Some(conjunction) = self.node(id).and_then(|n| n.conjunction()) else {
                return Ok(());
            };

            let mut queue: VecDeque<NodeId> = self.children(id).iter().copied().collect();
            let mut kept = Vec::with_capacity(queue.len());
            while let Some(child) = queue.pop_front() {
                match self.shape(child) {
                    Some(Shape::Group {
                        conjunction: child_conjunction,
                        children,
                    }) if children <= 1 || child_conjunction == conjunction => {
                        let orphans = self.dissolve(child);
                        for orphan in orphans.into_iter().rev() {
                            queue.push_front(orphan);
                        }
                    }
                    Some(_) => kept.push(child),
                    None => {}
                }
            }
            self.adopt(id, kept)?;

            // a group left with one group child takes over that child
            let only_group = match self.children(id) {
                [only] if self.is_group(*only) => Some(*only),
                _ => None,
            };
            let Some(only) = only_group else {
                return Ok(());
            };
            let Some(child_conjunction) = self.node(only).and_then(|n| n.conjunction()) else {
                return Ok(());
            };
            let grandchildren = self.dissolve(only);
            self.set_conjunction(id, child_conjunction)?;
            self.adopt(id, grandchildren)?;
        }
    }

    fn is_group(&self, id: NodeId) -> bool {
        matches!(self.shape(id), Some(Shape::Group { .. }))
    }

    fn shape(&self, id: NodeId) -> Option<Shape> {
        self.node(id).map(|node| match node.kind() {
            NodeKind::Leaf(_) => Shape::Leaf,
            NodeKind::Internal {
                conjunction,
                children,
            } => Shape::Group {
                conjunction: *conjunction,
                children: children.len(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Column, ColumnType, Operator, Rule, Schema, Term};

    fn rule(term: &str) -> Rule {
        Rule::new(
            Column::new("cultivars", "name", Schema::of(ColumnType::String, false)),
            Operator::Equal,
            Some(Term::new(term)),
        )
    }

    fn terms(tree: &FilterTree) -> Vec<String> {
        let mut terms: Vec<_> = tree
            .rules()
            .iter()
            .map(|r| r.term.as_ref().map(|t| t.value().to_string()).unwrap_or_default())
            .collect();
        terms.sort();
        terms
    }

    /// Nested shape as a string, e.g. `and(a,or(b,c))`
    fn shape(tree: &FilterTree, id: NodeId) -> String {
        let node = tree.node(id).unwrap();
        match node.kind() {
            NodeKind::Leaf(rule) => rule.term.as_ref().unwrap().value().to_string(),
            NodeKind::Internal {
                conjunction,
                children,
            } => {
                let inner: Vec<_> = children.iter().map(|c| shape(tree, *c)).collect();
                let name = match conjunction {
                    Conjunction::And => "and",
                    Conjunction::Or => "or",
                };
                format!("{}({})", name, inner.join(","))
            }
        }
    }

    fn nested_tree() -> FilterTree {
        // and(or(a), and(b, or(c, d)), e)
        let mut tree = FilterTree::new("cultivars");
        let single = tree.add_internal(tree.root(), Conjunction::Or).unwrap();
        tree.add_leaf(single, rule("a")).unwrap();
        let same = tree.add_internal(tree.root(), Conjunction::And).unwrap();
        tree.add_leaf(same, rule("b")).unwrap();
        let other = tree.add_internal(same, Conjunction::Or).unwrap();
        tree.add_leaf(other, rule("c")).unwrap();
        tree.add_leaf(other, rule("d")).unwrap();
        tree.add_leaf(tree.root(), rule("e")).unwrap();
        tree
    }

    #[test]
    fn test_simplify_splices_in_place() {
        let mut tree = nested_tree();
        assert!(tree.is_simplifiable());

        tree.simplify().unwrap();

        assert_eq!(shape(&tree, tree.root()), "and(a,b,or(c,d),e)");
        assert!(!tree.is_simplifiable());
    }

    #[test]
    fn test_simplify_preserves_leaves() {
        let mut tree = nested_tree();
        let before = terms(&tree);
        tree.simplify().unwrap();
        assert_eq!(terms(&tree), before);
    }

    #[test]
    fn test_simplify_is_idempotent() {
        let mut tree = nested_tree();
        tree.simplify().unwrap();
        let once = shape(&tree, tree.root());
        let len = tree.len();

        tree.simplify().unwrap();
        assert_eq!(shape(&tree, tree.root()), once);
        assert_eq!(tree.len(), len);
    }

    #[test]
    fn test_root_adopts_only_group_child() {
        let mut tree = FilterTree::new("cultivars");
        let group = tree.add_internal(tree.root(), Conjunction::Or).unwrap();
        tree.add_leaf(group, rule("a")).unwrap();
        tree.add_leaf(group, rule("b")).unwrap();

        tree.simplify().unwrap();

        assert_eq!(shape(&tree, tree.root()), "or(a,b)");
        assert_eq!(tree.len(), 3);
        for leaf in tree.leaves() {
            assert_eq!(tree.depth(leaf), Some(1));
        }
    }

    #[test]
    fn test_collapse_chain() {
        // and(or(and(a, b)))
        let mut tree = FilterTree::new("cultivars");
        let or = tree.add_internal(tree.root(), Conjunction::Or).unwrap();
        let and = tree.add_internal(or, Conjunction::And).unwrap();
        tree.add_leaf(and, rule("a")).unwrap();
        tree.add_leaf(and, rule("b")).unwrap();

        tree.simplify().unwrap();
        assert_eq!(shape(&tree, tree.root()), "and(a,b)");
    }

    #[test]
    fn test_single_leaf_root_untouched() {
        let mut tree = FilterTree::new("cultivars");
        tree.add_leaf(tree.root(), rule("a")).unwrap();
        assert!(!tree.is_simplifiable());

        tree.simplify().unwrap();
        assert_eq!(shape(&tree, tree.root()), "and(a)");
    }

    #[test]
    fn test_alternating_groups_are_kept() {
        let mut tree = FilterTree::new("cultivars");
        let or = tree.add_internal(tree.root(), Conjunction::Or).unwrap();
        tree.add_leaf(or, rule("a")).unwrap();
        let and = tree.add_internal(or, Conjunction::And).unwrap();
        tree.add_leaf(and, rule("b")).unwrap();
        tree.add_leaf(and, rule("c")).unwrap();
        tree.add_leaf(tree.root(), rule("d")).unwrap();

        assert!(!tree.is_simplifiable());
        tree.simplify().unwrap();
        assert_eq!(shape(&tree, tree.root()), "and(or(a,and(b,c)),d)");
    }
}
