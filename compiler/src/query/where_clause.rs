//! Where-clause compilation
//!
//! Lowers a [`FilterTree`] into a [`Condition`]. Groups join their surviving
//! children; incomplete or invalid leaves contribute nothing and are counted
//! as excluded. A leaf compiles its positive comparator, nests it along the
//! column's relation path, and wraps the nested result in `_not` when the
//! operator negates.

use serde_json::Value;

use super::condition::{Condition, Operand};
use super::variables::QueryVariables;
use super::CompilerOptions;
use crate::core::constants::ATTRIBUTE_ID_FIELD;
use crate::filter::{
    Column, ColumnType, Comparator, Conjunction, FilterError, FilterTree, NodeId, NodeKind,
    Operator, Rule,
};
use crate::utils::naming::relation_name;

pub(crate) struct WhereCompiler<'a> {
    options: &'a CompilerOptions,
    variables: &'a mut QueryVariables,
    /// Filter on attribution rows, applied inside every attribute condition
    attribute_filter: Option<&'a FilterTree>,
    excluded: usize,
}

impl<'a> WhereCompiler<'a> {
    pub(crate) fn new(
        options: &'a CompilerOptions,
        variables: &'a mut QueryVariables,
        attribute_filter: Option<&'a FilterTree>,
    ) -> Self {
        Self {
            options,
            variables,
            attribute_filter,
            excluded: 0,
        }
    }

    /// Leaves skipped so far
    pub(crate) fn excluded(&self) -> usize {
        self.excluded
    }

    pub(crate) fn attribution_relation(&self) -> &str {
        &self.options.attribution_relation
    }

    /// Condition of a whole tree; `None` when no leaf survives
    ///
    /// The root keeps its conjunction wrapper even around a single child.
    pub(crate) fn compile_tree(
        &mut self,
        tree: &FilterTree,
    ) -> Result<Option<Condition>, FilterError> {
        self.compile_node(tree, tree.root())
    }

    /// Fresh condition of the attribute-row filter
    ///
    /// Compiled on every use so that each occurrence binds its own variables.
    pub(crate) fn compile_attribute_filter(&mut self) -> Result<Option<Condition>, FilterError> {
        let Some(tree) = self.attribute_filter else {
            return Ok(None);
        };
        let mut nested = WhereCompiler::new(self.options, &mut *self.variables, None);
        let condition = nested.compile_tree(tree)?;
        self.excluded += nested.excluded;
        Ok(condition)
    }

    fn compile_node(
        &mut self,
        tree: &FilterTree,
        id: NodeId,
    ) -> Result<Option<Condition>, FilterError> {
        let node = tree.require(id)?;
        match node.kind() {
            NodeKind::Leaf(rule) => self.compile_leaf(tree.base_table(), rule),
            NodeKind::Internal {
                conjunction,
                children,
            } => {
                let mut survivors = Vec::with_capacity(children.len());
                for child in children {
                    if let Some(condition) = self.compile_node(tree, *child)? {
                        survivors.push(condition);
                    }
                }
                if survivors.is_empty() {
                    return Ok(None);
                }
                Ok(Some(match conjunction {
                    Conjunction::And => Condition::And(survivors),
                    Conjunction::Or => Condition::Or(survivors),
                }))
            }
        }
    }

    fn exclude(&mut self, rule: &Rule, reason: &str) -> Result<Option<Condition>, FilterError> {
        self.excluded += 1;
        tracing::trace!(
            column = ?rule
                .column
                .as_ref()
                .map(|c| format!("{}.{}", c.table_name, c.table_column_name)),
            operator = ?rule.operator,
            reason,
            "Excluding rule"
        );
        Ok(None)
    }

    fn compile_leaf(
        &mut self,
        base_table: &str,
        rule: &Rule,
    ) -> Result<Option<Condition>, FilterError> {
        if !rule.is_valid() {
            return self.exclude(rule, "invalid rule");
        }
        let (Some(column), Some(operator)) = (rule.column.as_ref(), rule.operator) else {
            return self.exclude(rule, "missing column or operator");
        };
        let Some(column_type) = column.column_type() else {
            return self.exclude(rule, "unresolved column");
        };
        let value = match self.term_value(rule, column) {
            Ok(value) => value,
            Err(_) => return self.exclude(rule, "term does not match schema"),
        };

        if column.is_attribute() {
            return self
                .compile_attribute_leaf(rule, column, column_type, operator, value)
                .map(Some);
        }

        let segments = column.table_segments();
        if segments.first() != Some(&base_table) {
            return self.exclude(rule, "column outside the base table");
        }
        let relations = &segments[1..];
        let field = column.table_column_name.as_str();

        if rule.can_be_null_or_empty() && rule.compares_to_empty() {
            let positive = matches!(operator, Operator::Equal | Operator::Empty);
            let empty = self.bind_empty();
            if relations.is_empty() {
                return Ok(Some(if positive {
                    null_or_empty(field, empty)
                } else {
                    not_null_and_not_empty(field, empty)
                }));
            }
            let nested = nest(relations, null_or_empty(field, empty));
            return Ok(Some(if positive { nested } else { nested.negate() }));
        }

        let comparison = self.comparison(field, column_type, operator, value);
        let nested = nest(relations, comparison);
        Ok(Some(if operator.negates() {
            nested.negate()
        } else {
            nested
        }))
    }

    /// `{attributions: {_and: [attribute id, value, attribute filter]}}`,
    /// or'ed with "no such attribution" when the rule includes entities
    /// without attributions
    fn compile_attribute_leaf(
        &mut self,
        rule: &Rule,
        column: &Column,
        column_type: ColumnType,
        operator: Operator,
        value: Value,
    ) -> Result<Condition, FilterError> {
        let attribute_id = column.attribute_id().ok_or_else(|| {
            FilterError::unsupported(format!(
                "attribute id '{}' is not numeric",
                column.table_column_name
            ))
        })?;
        let value_field = column_type.attribution_value_field();

        let value_condition = match operator {
            Operator::False if column_type == ColumnType::Boolean => {
                Condition::field(value_field, Comparator::Eq, Operand::Bool(false))
            }
            _ if operator.negates() => {
                return Err(FilterError::unsupported(format!(
                    "operator {} cannot be applied to attribute {}",
                    operator, attribute_id
                )));
            }
            Operator::NotEmpty if rule.can_be_null_or_empty() => {
                let empty = self.bind_empty();
                not_null_and_not_empty(value_field, empty)
            }
            Operator::Equal if rule.can_be_null_or_empty() && rule.compares_to_empty() => {
                let empty = self.bind_empty();
                null_or_empty(value_field, empty)
            }
            _ => self.comparison(value_field, column_type, operator, value),
        };

        let mut matching = vec![attribute_id_condition(attribute_id), value_condition];
        if let Some(filter) = self.compile_attribute_filter()? {
            matching.push(filter);
        }
        let exists = Condition::relation(
            self.options.attribution_relation.as_str(),
            Condition::And(matching),
        );
        if !rule.include_entities_without_attributions {
            return Ok(exists);
        }

        let mut scope = vec![attribute_id_condition(attribute_id)];
        if let Some(filter) = self.compile_attribute_filter()? {
            scope.push(filter);
        }
        let missing = Condition::Count {
            aggregate: format!("{}_aggregate", self.options.attribution_relation),
            filter: Box::new(Condition::And(scope)),
            count: 0,
        };
        Ok(Condition::Or(vec![exists, missing]))
    }

    /// Positive comparison of one field, binding the operand when it is a term
    fn comparison(
        &mut self,
        field: &str,
        column_type: ColumnType,
        operator: Operator,
        value: Value,
    ) -> Condition {
        let comparator = operator.comparator(column_type);
        let operand = match comparator {
            Comparator::IsNull => Operand::Bool(false),
            Comparator::Neq => Operand::Variable(self.variables.bind("String", Value::from(""))),
            Comparator::Eq if matches!(operator, Operator::True | Operator::False) => {
                Operand::Bool(true)
            }
            Comparator::Eq if value.is_null() => {
                return Condition::field(field, Comparator::IsNull, Operand::Bool(true));
            }
            Comparator::Ilike(shape) => {
                let term = value.as_str().unwrap_or_default();
                Operand::Variable(self.variables.bind("String", Value::from(shape.pattern(term))))
            }
            _ => Operand::Variable(self.variables.bind(column_type.graphql_type(), value)),
        };
        Condition::field(field, comparator, operand)
    }

    fn term_value(&self, rule: &Rule, column: &Column) -> Result<Value, FilterError> {
        if !rule.requires_term() {
            return Ok(Value::Null);
        }
        match (rule.term.as_ref(), column.schema.as_ref()) {
            (Some(term), Some(schema)) => term.parse(schema),
            _ => Err(FilterError::incomplete("missing term")),
        }
    }

    fn bind_empty(&mut self) -> String {
        self.variables.bind("String", Value::from(""))
    }
}

fn attribute_id_condition(attribute_id: i64) -> Condition {
    Condition::field(ATTRIBUTE_ID_FIELD, Comparator::Eq, Operand::Int(attribute_id))
}

fn null_or_empty(field: &str, empty: String) -> Condition {
    Condition::Or(vec![
        Condition::field(field, Comparator::IsNull, Operand::Bool(true)),
        Condition::field(field, Comparator::Eq, Operand::Variable(empty)),
    ])
}

fn not_null_and_not_empty(field: &str, empty: String) -> Condition {
    Condition::And(vec![
        Condition::field(field, Comparator::IsNull, Operand::Bool(false)),
        Condition::field(field, Comparator::Neq, Operand::Variable(empty)),
    ])
}

/// Wrap `inner` in relation fields, innermost segment first
fn nest(relations: &[&str], inner: Condition) -> Condition {
    relations
        .iter()
        .rev()
        .fold(inner, |inner, table| Condition::relation(relation_name(table), inner))
}
