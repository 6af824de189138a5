//! Field selection of the main query
//!
//! `id` always comes first. Direct columns are selected as-is, nested columns
//! under an alias spelling out their path, attribute columns as attribution
//! sub-selections spread with the attribution fragment.

use rustc_hash::FxHashSet;

use super::condition::{Condition, Operand};
use super::where_clause::WhereCompiler;
use crate::core::constants::{
    ATTRIBUTE_ALIAS_PREFIX, ATTRIBUTE_ID_FIELD, ATTRIBUTION_DATE_FIELD, ATTRIBUTION_FRAGMENT,
    ATTRIBUTION_FRAGMENT_FIELDS, NESTED_ALIAS_SEPARATOR,
};
use crate::filter::{ColumnRef, Comparator, FilterError};
use crate::utils::naming::{PRIMARY_KEY, is_graphql_name, relation_name};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Projection {
    selections: Vec<String>,
    uses_fragment: bool,
}

impl Projection {
    pub(crate) fn render(&self) -> String {
        self.selections.join(" ")
    }

    /// Whether the attribution fragment must be defined alongside the query
    pub(crate) fn uses_fragment(&self) -> bool {
        self.uses_fragment
    }
}

/// Definition of the attribution fragment
pub fn attribution_fragment(attribution_table: &str) -> String {
    format!(
        "fragment {} on {} {{ {} }}",
        ATTRIBUTION_FRAGMENT,
        attribution_table,
        ATTRIBUTION_FRAGMENT_FIELDS.join(" ")
    )
}

pub(crate) fn compile_projection(
    base_table: &str,
    columns: &[ColumnRef],
    compiler: &mut WhereCompiler<'_>,
) -> Result<Projection, FilterError> {
    let mut selections = vec![PRIMARY_KEY.to_string()];
    let mut seen: FxHashSet<String> = FxHashSet::default();
    seen.insert(PRIMARY_KEY.to_string());
    let mut uses_fragment = false;

    for column in columns {
        if column.is_attribute() {
            let attribute_id: i64 = column.table_column_name.parse().map_err(|_| {
                FilterError::unsupported(format!(
                    "attribute id '{}' is not numeric",
                    column.table_column_name
                ))
            })?;
            let alias = format!("{}{}", ATTRIBUTE_ALIAS_PREFIX, attribute_id);
            if !seen.insert(alias.clone()) {
                continue;
            }
            selections.push(attribute_selection(&alias, attribute_id, compiler)?);
            uses_fragment = true;
            continue;
        }

        let segments: Vec<&str> = column.table_name.split('.').collect();
        if segments.first() != Some(&base_table) {
            return Err(FilterError::unsupported(format!(
                "column {}.{} does not start at {}",
                column.table_name, column.table_column_name, base_table
            )));
        }
        let field = column.table_column_name.as_str();
        if !is_graphql_name(field) || !segments.iter().all(|s| is_graphql_name(s)) {
            tracing::warn!(
                table = %column.table_name,
                column = %field,
                "Skipping column with invalid name"
            );
            continue;
        }

        let selection = if segments.len() == 1 {
            field.to_string()
        } else {
            nested_selection(&segments, field)?
        };
        let key = selection
            .split_once(':')
            .map_or(selection.as_str(), |(alias, _)| alias)
            .to_string();
        if seen.insert(key) {
            selections.push(selection);
        }
    }

    Ok(Projection {
        selections,
        uses_fragment,
    })
}

/// `cultivars__lots__name: lot { id name }`
pub(crate) fn nested_selection(segments: &[&str], field: &str) -> Result<String, FilterError> {
    if segments.len() < 2 {
        return Err(FilterError::unsupported(format!(
            "column path '{}' is too shallow to nest",
            segments.join(".")
        )));
    }
    let alias = format!(
        "{}{}{}",
        segments.join(NESTED_ALIAS_SEPARATOR),
        NESTED_ALIAS_SEPARATOR,
        field
    );
    let mut body = if field == PRIMARY_KEY {
        format!("{{ {} }}", PRIMARY_KEY)
    } else {
        format!("{{ {} {} }}", PRIMARY_KEY, field)
    };
    for (i, table) in segments.iter().enumerate().skip(1).rev() {
        let relation = relation_name(table);
        body = if i == 1 {
            format!("{}: {} {}", alias, relation, body)
        } else {
            format!("{{ {} {} {} }}", PRIMARY_KEY, relation, body)
        };
    }
    Ok(body)
}

fn attribute_selection(
    alias: &str,
    attribute_id: i64,
    compiler: &mut WhereCompiler<'_>,
) -> Result<String, FilterError> {
    let mut scope = vec![Condition::field(
        ATTRIBUTE_ID_FIELD,
        Comparator::Eq,
        Operand::Int(attribute_id),
    )];
    if let Some(filter) = compiler.compile_attribute_filter()? {
        scope.push(filter);
    }
    Ok(format!(
        "{}: {}(where: {}, order_by: {{{}: desc}}) {{ ...{} }}",
        alias,
        compiler.attribution_relation(),
        Condition::And(scope),
        ATTRIBUTION_DATE_FIELD,
        ATTRIBUTION_FRAGMENT
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Column, ColumnType, FilterTree, Operator, Rule, Schema, Term};
    use crate::query::CompilerOptions;
    use crate::query::variables::QueryVariables;

    fn project(base: &str, columns: &[ColumnRef]) -> Result<Projection, FilterError> {
        let options = CompilerOptions::default();
        let mut variables = QueryVariables::new();
        let mut compiler = WhereCompiler::new(&options, &mut variables, None);
        compile_projection(base, columns, &mut compiler)
    }

    #[test]
    fn test_id_always_once() {
        let projection = project("cultivars", &[]).unwrap();
        assert_eq!(projection.render(), "id");

        let projection = project(
            "cultivars",
            &[
                ColumnRef::new("cultivars", "id"),
                ColumnRef::new("cultivars", "name"),
                ColumnRef::new("cultivars", "id"),
                ColumnRef::new("cultivars", "name"),
            ],
        )
        .unwrap();
        assert_eq!(projection.render(), "id name");
        assert!(!projection.uses_fragment());
    }

    #[test]
    fn test_nested_columns() {
        let projection = project(
            "plants",
            &[
                ColumnRef::new("plants", "label_id"),
                ColumnRef::new("plants.plant_groups.cultivars", "name"),
                ColumnRef::new("plants.lots", "id"),
            ],
        )
        .unwrap();
        assert_eq!(
            projection.render(),
            "id label_id \
             plants__plant_groups__cultivars__name: plant_group { id cultivar { id name } } \
             plants__lots__id: lot { id }"
        );
    }

    #[test]
    fn test_nested_selection_requires_relation() {
        let err = nested_selection(&["cultivars"], "name").unwrap_err();
        assert_eq!(err.kind(), "unsupported_operation");
        assert_eq!(
            nested_selection(&["cultivars", "lots"], "name").unwrap(),
            "cultivars__lots__name: lot { id name }"
        );
    }

    #[test]
    fn test_foreign_path_is_unsupported() {
        let err = project("cultivars", &[ColumnRef::new("lots", "name")]).unwrap_err();
        assert_eq!(err.kind(), "unsupported_operation");
    }

    #[test]
    fn test_invalid_names_are_skipped() {
        let projection = project(
            "cultivars",
            &[
                ColumnRef::new("cultivars", "name } secret {"),
                ColumnRef::new("cultivars", "acronym"),
            ],
        )
        .unwrap();
        assert_eq!(projection.render(), "id acronym");
    }

    #[test]
    fn test_attribute_columns() {
        let projection = project(
            "cultivars",
            &[ColumnRef::new("attributes", "123"), ColumnRef::new("attributes", "123")],
        )
        .unwrap();
        assert_eq!(
            projection.render(),
            "id attribute_123: attributions(where: {_and: [{attribute_id: {_eq: 123}}]}, \
             order_by: {date_attributed: desc}) { ...AttributionFragment }"
        );
        assert!(projection.uses_fragment());

        let err = project("cultivars", &[ColumnRef::new("attributes", "abc")]).unwrap_err();
        assert_eq!(err.kind(), "unsupported_operation");
    }

    #[test]
    fn test_attribute_columns_apply_attribute_filter() {
        let mut attributes = FilterTree::new("attributions_view");
        attributes
            .add_leaf(
                attributes.root(),
                Rule::new(
                    Column::new(
                        "attributions_view",
                        "author",
                        Schema::of(ColumnType::String, false),
                    ),
                    Operator::Equal,
                    Some(Term::new("kim")),
                ),
            )
            .unwrap();

        let options = CompilerOptions::default();
        let mut variables = QueryVariables::new();
        let mut compiler = WhereCompiler::new(&options, &mut variables, Some(&attributes));
        let projection = compile_projection(
            "cultivars",
            &[ColumnRef::new("attributes", "1"), ColumnRef::new("attributes", "2")],
            &mut compiler,
        )
        .unwrap();

        let rendered = projection.render();
        assert!(rendered.contains("{_and: [{attribute_id: {_eq: 1}}, {_and: [{author: {_eq: $v0}}]}]}"));
        assert!(rendered.contains("{_and: [{attribute_id: {_eq: 2}}, {_and: [{author: {_eq: $v1}}]}]}"));
        assert_eq!(variables.len(), 2);
    }

    #[test]
    fn test_fragment_definition() {
        assert_eq!(
            attribution_fragment("attributions_view"),
            "fragment AttributionFragment on attributions_view { id integer_value float_value \
             text_value boolean_value date_value plant_id plant_group_id cultivar_id lot_id \
             crossing_id data_type }"
        );
    }
}
