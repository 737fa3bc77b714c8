//! Query construction.
//!
//! - [`expr`] - Operands and predicates
//! - [`surface`] - The abstract [`QuerySurface`] and join descriptions
//! - [`builder`] - [`SqlQueryBuilder`], rendering SQLite `SELECT`s
//!
//! Tables are named after the snake-cased short name of their class, columns
//! after properties. A to-one relation `author` is stored in `author_id`; a
//! to-many relation without an owning side uses the join table
//! `<parent table>_<property>`.

pub mod builder;
pub mod expr;
pub mod surface;

use heck::ToSnakeCase;
use meridian_metadata::naming::short_name_of;

pub use builder::{ROOT_ALIAS, SqlQuery, SqlQueryBuilder};
pub use expr::{CompareOp, Operand, Predicate, SqlParam};
pub use surface::{
    JoinKind, JoinSpec, JoinType, OrderDirection, PredicateRecorder, QuerySurface,
};

/// Table holding the instances of `class`.
pub fn table_name(class: &str) -> String {
    short_name_of(class).to_snake_case()
}

/// Column holding the key of the to-one relation `property`.
pub fn foreign_key_column(property: &str) -> String {
    format!("{}_id", property)
}
