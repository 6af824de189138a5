//! Filter model
//!
//! Typed rules (column, operator, term) arranged in an AND/OR tree that an
//! editor mutates and the query compiler lowers into a where clause.

pub mod column;
pub mod error;
pub mod operator;
pub mod persist;
pub mod rule;
pub mod schema;
mod simplify;
pub mod term;
pub mod tree;

pub use column::{ATTRIBUTES_TABLE, Column, ColumnCatalog, ColumnRef};
pub use error::FilterError;
pub use operator::{Comparator, Operator};
pub use persist::{SerializedGroup, SerializedNode, SerializedRule};
pub use rule::Rule;
pub use schema::{ColumnType, Schema};
pub use term::Term;
pub use tree::{Conjunction, FilterNode, FilterTree, NodeId, NodeKind};
