//! Leaf content of a filter tree

use super::column::Column;
use super::operator::Operator;
use super::schema::ColumnType;
use super::term::Term;

/// One comparison: column, operator and (usually) a term
///
/// Every part may be missing while the rule is being edited; such rules are
/// invalid and skipped by the compiler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rule {
    pub column: Option<Column>,
    pub operator: Option<Operator>,
    pub term: Option<Term>,
    /// Attribute columns only: also match entities without any matching attribution
    pub include_entities_without_attributions: bool,
}

impl Rule {
    pub fn new(column: Column, operator: Operator, term: Option<Term>) -> Self {
        Self {
            column: Some(column),
            operator: Some(operator),
            term,
            include_entities_without_attributions: false,
        }
    }

    pub fn including_entities_without_attributions(mut self) -> Self {
        self.include_entities_without_attributions = true;
        self
    }

    fn column_type(&self) -> Option<ColumnType> {
        self.column.as_ref().and_then(Column::column_type)
    }

    pub fn requires_term(&self) -> bool {
        if matches!(self.column_type(), Some(ColumnType::Boolean | ColumnType::Photo)) {
            return false;
        }
        !self.operator.is_some_and(|o| o.is_emptiness_check())
    }

    /// Whether null and empty string are interchangeable for this rule
    pub fn can_be_null_or_empty(&self) -> bool {
        let Some(column) = self.column.as_ref() else {
            return false;
        };
        column.column_type() == Some(ColumnType::String)
            && column.allow_empty_term()
            && matches!(
                self.operator,
                Some(Operator::Equal | Operator::NotEqual | Operator::Empty | Operator::NotEmpty)
            )
    }

    /// Whether this rule compares against the empty value
    pub fn compares_to_empty(&self) -> bool {
        match self.operator {
            Some(Operator::Empty | Operator::NotEmpty) => true,
            Some(Operator::Equal | Operator::NotEqual) => {
                self.term.as_ref().is_none_or(Term::is_empty)
            }
            _ => false,
        }
    }

    pub fn is_valid(&self) -> bool {
        let (Some(column), Some(operator)) = (self.column.as_ref(), self.operator) else {
            return false;
        };
        let Some(schema) = column.schema.as_ref().filter(|_| column.is_valid()) else {
            return false;
        };
        if !operator.is_valid(schema) {
            return false;
        }
        if !self.requires_term() {
            return true;
        }
        self.term.as_ref().is_some_and(|t| t.is_valid(schema))
    }
}
