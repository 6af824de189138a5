//! Persisted form of a filter tree
//!
//! The JSON shape is shared with URL state and saved filters:
//!
//! ```json
//! {"baseTable": "cultivars", "childrensConjunction": "and", "children": [
//!   {"column": {"tableName": "cultivars", "tableColumnName": "name"},
//!    "operator": {"value": "equal"}, "term": {"value": "Gala"}}
//! ]}
//! ```
//!
//! Node identity and depth are not persisted. Columns are stored by reference
//! and resolved against a [`ColumnCatalog`] on load.

use serde::{Deserialize, Serialize};

use super::column::{ColumnCatalog, ColumnRef};
use super::error::FilterError;
use super::operator::Operator;
use super::rule::Rule;
use super::term::Term;
use super::tree::{Conjunction, FilterTree, NodeId, NodeKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorValue {
    pub value: Operator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermValue {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedGroup {
    #[serde(rename = "baseTable", default, skip_serializing_if = "Option::is_none")]
    pub base_table: Option<String>,
    #[serde(rename = "childrensConjunction")]
    pub conjunction: Conjunction,
    pub children: Vec<SerializedNode>,
}

/// Every field is optional so half-edited rules survive a round trip.
/// Unknown keys are rejected, otherwise a malformed group would load as an
/// empty rule and lose its subtree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SerializedRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<ColumnRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<OperatorValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<TermValue>,
    #[serde(
        rename = "includeEntitiesWithoutAttributions",
        default,
        skip_serializing_if = "is_false"
    )]
    pub include_entities_without_attributions: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SerializedNode {
    Internal(SerializedGroup),
    Leaf(SerializedRule),
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl FilterTree {
    pub fn to_serialized(&self) -> SerializedNode {
        self.serialize_node(self.root())
    }

    pub fn to_json(&self) -> Result<String, FilterError> {
        Ok(serde_json::to_string(&self.to_serialized())?)
    }

    fn serialize_node(&self, id: NodeId) -> SerializedNode {
        let base_table = (id == self.root()).then(|| self.base_table().to_string());
        match self.node(id).map(|n| n.kind()) {
            Some(NodeKind::Leaf(rule)) => SerializedNode::Leaf(SerializedRule {
                column: rule.column.as_ref().map(|c| c.column_ref()),
                operator: rule.operator.map(|value| OperatorValue { value }),
                term: rule.term.as_ref().map(|t| TermValue {
                    value: t.value().to_string(),
                }),
                include_entities_without_attributions: rule.include_entities_without_attributions,
            }),
            Some(NodeKind::Internal {
                conjunction,
                children,
            }) => SerializedNode::Internal(SerializedGroup {
                base_table,
                conjunction: *conjunction,
                children: children.iter().map(|c| self.serialize_node(*c)).collect(),
            }),
            None => SerializedNode::Internal(SerializedGroup {
                base_table,
                conjunction: Conjunction::default(),
                children: Vec::new(),
            }),
        }
    }

    /// Rebuild a tree, resolving column references against `catalog`
    ///
    /// Unknown columns are kept as unresolved (invalid) rules.
    pub fn from_serialized(
        node: &SerializedNode,
        catalog: &ColumnCatalog,
    ) -> Result<Self, FilterError> {
        let SerializedNode::Internal(SerializedGroup {
            base_table: Some(base_table),
            conjunction,
            children,
        }) = node
        else {
            return Err(FilterError::structural(
                "the root of a persisted filter must be a group with a base table",
            ));
        };

        let mut tree = FilterTree::with_conjunction(base_table.clone(), *conjunction);
        let root = tree.root();
        for child in children {
            tree.restore(root, child, catalog)?;
        }
        Ok(tree)
    }

    pub fn from_json(json: &str, catalog: &ColumnCatalog) -> Result<Self, FilterError> {
        let node: SerializedNode = serde_json::from_str(json)?;
        Self::from_serialized(&node, catalog)
    }

    fn restore(
        &mut self,
        parent: NodeId,
        node: &SerializedNode,
        catalog: &ColumnCatalog,
    ) -> Result<(), FilterError> {
        match node {
            SerializedNode::Internal(SerializedGroup {
                conjunction,
                children,
                ..
            }) => {
                let id = self.add_internal(parent, *conjunction)?;
                for child in children {
                    self.restore(id, child, catalog)?;
                }
            }
            SerializedNode::Leaf(SerializedRule {
                column,
                operator,
                term,
                include_entities_without_attributions,
            }) => {
                let rule = Rule {
                    column: column.as_ref().map(|c| catalog.resolve(c)),
                    operator: operator.as_ref().map(|o| o.value),
                    term: term.as_ref().map(|t| Term::new(t.value.as_str())),
                    include_entities_without_attributions: *include_entities_without_attributions,
                };
                self.add_leaf(parent, rule)?;
            }
        }
        Ok(())
    }
}
