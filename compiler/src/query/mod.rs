//! Query compilation
//!
//! Turns a filter tree, an optional attribute-row filter, a column list and a
//! page request into one GraphQL operation with its variables:
//!
//! ```text
//! query Cultivars($v0: String) {
//!   cultivars(where: {...}, limit: 100, offset: 0, order_by: {id: asc}) { id name }
//!   cultivars_aggregate(where: {...}) { aggregate { count } }
//! }
//! ```
//!
//! Compilation is pure: each call owns its variable counter, so compilers can
//! be shared between threads.

pub mod condition;
pub mod pagination;
pub mod projection;
pub mod variables;
mod where_clause;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::constants::{
    DEFAULT_ATTRIBUTION_RELATION, DEFAULT_ATTRIBUTION_TABLE, DEFAULT_ROWS_PER_PAGE,
};
use crate::filter::{ColumnRef, FilterError, FilterTree};
use crate::utils::naming::{is_graphql_name, operation_name};

pub use condition::{Condition, Operand};
pub use pagination::{Pagination, SortOrder};
pub use variables::{QueryVariable, QueryVariables};

use pagination::compile_pagination;
use projection::{attribution_fragment, compile_projection};
use where_clause::WhereCompiler;

/// Settings shared by every compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    pub rows_per_page: u32,
    /// Relation from an entity to its attribution rows
    pub attribution_relation: String,
    /// Base table of attribute-row filters
    pub attribution_table: String,
    /// Tables that reject pagination arguments
    pub unpaginated_tables: Vec<String>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            rows_per_page: DEFAULT_ROWS_PER_PAGE,
            attribution_relation: DEFAULT_ATTRIBUTION_RELATION.to_string(),
            attribution_table: DEFAULT_ATTRIBUTION_TABLE.to_string(),
            unpaginated_tables: vec![DEFAULT_ATTRIBUTION_TABLE.to_string()],
        }
    }
}

/// Query text with its variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledQuery {
    pub query: String,
    pub variables: Map<String, Value>,
    /// False when some rule was incomplete or invalid and left out
    #[serde(skip)]
    pub complete: bool,
}

#[derive(Debug, Clone, Default)]
pub struct QueryCompiler {
    options: CompilerOptions,
}

impl QueryCompiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Where condition of `tree` alone, with its own variables
    pub fn compile_where(
        &self,
        tree: &FilterTree,
        attribute_filter: Option<&FilterTree>,
    ) -> Result<(Option<Condition>, QueryVariables), FilterError> {
        let mut variables = QueryVariables::new();
        let mut compiler = WhereCompiler::new(&self.options, &mut variables, attribute_filter);
        let condition = compiler.compile_tree(tree)?;
        Ok((condition, variables))
    }

    pub fn compile(
        &self,
        base_filter: &FilterTree,
        attribute_filter: Option<&FilterTree>,
        columns: &[ColumnRef],
        pagination: &Pagination,
    ) -> Result<CompiledQuery, FilterError> {
        let base_table = base_filter.base_table();
        if !is_graphql_name(base_table) {
            return Err(FilterError::unsupported(format!(
                "base table '{}' is not a valid name",
                base_table
            )));
        }
        if let Some(attributes) = attribute_filter
            && attributes.base_table() != self.options.attribution_table
        {
            return Err(FilterError::unsupported(format!(
                "attribute filter must be based on {}, not {}",
                self.options.attribution_table,
                attributes.base_table()
            )));
        }
        tracing::debug!(
            base_table,
            rules = base_filter.leaves().len(),
            columns = columns.len(),
            "Compiling query"
        );

        let mut variables = QueryVariables::new();
        let mut compiler = WhereCompiler::new(&self.options, &mut variables, attribute_filter);
        let condition = compiler.compile_tree(base_filter)?;
        let projection = compile_projection(base_table, columns, &mut compiler)?;
        let excluded = compiler.excluded();
        let paging = compile_pagination(base_table, pagination, &self.options)?;

        let where_arg = condition.map(|c| format!("where: {}", c));
        let list_args = match &where_arg {
            Some(where_arg) => format!("{}, {}", where_arg, paging),
            None => paging,
        };
        let aggregate_args = where_arg
            .map(|w| format!("({})", w))
            .unwrap_or_default();

        let declarations = variables.declarations();
        let header = if declarations.is_empty() {
            format!("query {}", operation_name(base_table))
        } else {
            format!("query {}({})", operation_name(base_table), declarations)
        };

        let mut query = format!(
            "{} {{\n  {}({}) {{\n    {}\n  }}\n  {}_aggregate{} {{\n    aggregate {{ count }}\n  }}\n}}",
            header,
            base_table,
            list_args,
            projection.render(),
            base_table,
            aggregate_args
        );
        if projection.uses_fragment() {
            query.push_str("\n\n");
            query.push_str(&attribution_fragment(&self.options.attribution_table));
        }

        let complete = excluded == 0
            && base_filter.is_valid()
            && attribute_filter.is_none_or(FilterTree::is_valid);
        if !complete {
            tracing::debug!(excluded, "Some rules were left out of the query");
        }
        tracing::debug!(
            base_table,
            variables = variables.len(),
            complete,
            "Compiled query"
        );

        Ok(CompiledQuery {
            query,
            variables: variables.into_map(),
            complete,
        })
    }
}

/// Compile with default options
pub fn compile(
    base_filter: &FilterTree,
    attribute_filter: Option<&FilterTree>,
    columns: &[ColumnRef],
    pagination: &Pagination,
) -> Result<CompiledQuery, FilterError> {
    QueryCompiler::default().compile(base_filter, attribute_filter, columns, pagination)
}
