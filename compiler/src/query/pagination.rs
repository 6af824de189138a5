//! Pagination and ordering arguments

use serde::{Deserialize, Serialize};

use super::CompilerOptions;
use crate::core::constants::DEFAULT_PAGE;
use crate::filter::{ColumnRef, FilterError};
use crate::utils::naming::{PRIMARY_KEY, is_graphql_name, relation_name};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Requested page; unset fields fall back to the compiler defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pagination {
    /// 1-indexed; 0 is treated as the first page
    pub page: Option<u32>,
    pub rows_per_page: Option<u32>,
    pub sort_by: Option<ColumnRef>,
    pub sort_order: Option<SortOrder>,
}

impl Pagination {
    pub fn page(page: u32, rows_per_page: u32) -> Self {
        Self {
            page: Some(page),
            rows_per_page: Some(rows_per_page),
            ..Self::default()
        }
    }

    pub fn sorted_by(mut self, column: ColumnRef, order: SortOrder) -> Self {
        self.sort_by = Some(column);
        self.sort_order = Some(order);
        self
    }
}

/// `limit: 100, offset: 0, order_by: {id: asc}`
pub(crate) fn compile_pagination(
    base_table: &str,
    pagination: &Pagination,
    options: &CompilerOptions,
) -> Result<String, FilterError> {
    if options.unpaginated_tables.iter().any(|t| t == base_table) {
        return Err(FilterError::unsupported(format!(
            "table {} cannot be paginated",
            base_table
        )));
    }

    let page = pagination.page.unwrap_or(DEFAULT_PAGE);
    let limit = pagination.rows_per_page.unwrap_or(options.rows_per_page);
    let offset = u64::from(page.saturating_sub(1)) * u64::from(limit);
    let order = pagination.sort_order.unwrap_or_default();

    let mut order_by = Vec::with_capacity(2);
    let sorts_by_primary_key = match &pagination.sort_by {
        None => {
            order_by.push(order_term(&[], PRIMARY_KEY, order));
            true
        }
        Some(column) => {
            order_by.push(sort_term(base_table, column, order)?);
            column.table_name == base_table && column.table_column_name == PRIMARY_KEY
        }
    };
    if !sorts_by_primary_key {
        order_by.push(order_term(&[], PRIMARY_KEY, SortOrder::Asc));
    }

    let order_by = match order_by.as_slice() {
        [single] => single.clone(),
        terms => format!("[{}]", terms.join(", ")),
    };
    Ok(format!(
        "limit: {}, offset: {}, order_by: {}",
        limit, offset, order_by
    ))
}

fn sort_term(
    base_table: &str,
    column: &ColumnRef,
    order: SortOrder,
) -> Result<String, FilterError> {
    if column.is_attribute() {
        return Err(FilterError::unsupported(format!(
            "cannot sort by attribute {}",
            column.table_column_name
        )));
    }
    let segments: Vec<&str> = column.table_name.split('.').collect();
    if segments.first() != Some(&base_table) {
        return Err(FilterError::unsupported(format!(
            "sort column {}.{} does not start at {}",
            column.table_name, column.table_column_name, base_table
        )));
    }
    if !is_graphql_name(&column.table_column_name) || !segments.iter().all(|s| is_graphql_name(s))
    {
        return Err(FilterError::unsupported(format!(
            "sort column {}.{} has an invalid name",
            column.table_name, column.table_column_name
        )));
    }
    Ok(order_term(&segments[1..], &column.table_column_name, order))
}

/// `{lot: {name: asc}}`
fn order_term(relations: &[&str], field: &str, order: SortOrder) -> String {
    relations
        .iter()
        .rev()
        .fold(format!("{{{}: {}}}", field, order.as_str()), |inner, table| {
            format!("{{{}: {}}}", relation_name(table), inner)
        })
}
