//! The query-building surface filters write to.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::expr::{Operand, Predicate, SqlParam};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl OrderDirection {
    /// Parses `asc`/`desc` in any case.
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("asc") {
            Some(OrderDirection::Asc)
        } else if value.eq_ignore_ascii_case("desc") {
            Some(OrderDirection::Desc)
        } else {
            None
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Asc => f.write_str("ASC"),
            OrderDirection::Desc => f.write_str("DESC"),
        }
    }
}

/// How a join keeps rows without a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// Rows without a match are dropped.
    Inner,
    /// Rows without a match are kept.
    Left,
}

/// Where the key of a relation is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinKind {
    /// The parent row holds `<property>_id`.
    ForeignKey,
    /// The target row holds `<mapped_by>_id`.
    Inverse {
        /// Owning property on the target.
        mapped_by: String,
    },
    /// A join table links both sides.
    JoinTable {
        /// Join table name.
        table: String,
        /// Column referencing the parent.
        parent_column: String,
        /// Column referencing the target.
        target_column: String,
    },
}

/// A traversal from one alias to a related table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    /// Dot-path from the root, the de-duplication key.
    pub path: String,
    /// Alias the join starts from.
    pub parent_alias: String,
    /// Relation property on the parent.
    pub property: String,
    /// Identifier column of the parent.
    pub parent_key: String,
    /// Related table.
    pub target_table: String,
    /// Identifier column of the related table.
    pub target_key: String,
    /// Key storage.
    pub kind: JoinKind,
    /// Whether the relation holds many rows.
    pub collection: bool,
    /// Join type requested by the first caller.
    pub join_type: JoinType,
}

impl JoinSpec {
    /// Returns a copy with another join type.
    pub fn with_join_type(mut self, join_type: JoinType) -> Self {
        self.join_type = join_type;
        self
    }

    /// Tests whether the relation is empty (`empty`) or not, without joining.
    pub fn emptiness(&self, empty: bool) -> Predicate {
        let parent = Operand::column(&self.parent_alias, &self.parent_key);
        match &self.kind {
            JoinKind::ForeignKey => Predicate::IsNull {
                operand: Operand::column(&self.parent_alias, super::foreign_key_column(&self.property)),
                negated: !empty,
            },
            JoinKind::Inverse { mapped_by } => Predicate::Exists {
                table: self.target_table.clone(),
                conditions: vec![(super::foreign_key_column(mapped_by), parent)],
                negated: empty,
            },
            JoinKind::JoinTable {
                table,
                parent_column,
                ..
            } => Predicate::Exists {
                table: table.clone(),
                conditions: vec![(parent_column.clone(), parent)],
                negated: empty,
            },
        }
    }
}

/// Mutable, request-scoped query under construction.
///
/// Predicates added here are combined with AND. Joins are de-duplicated by
/// path for the lifetime of one surface.
pub trait QuerySurface {
    /// Alias of the queried table.
    fn root_alias(&self) -> &str;

    /// AND-combines a predicate into the query.
    fn add_predicate(&mut self, predicate: Predicate);

    /// Binds `value` to the parameter `name`.
    fn bind_parameter(&mut self, name: &str, value: SqlParam);

    /// Joins the relation described by `join` unless its path is already
    /// joined, and returns the alias of the related table.
    fn ensure_join(&mut self, join: JoinSpec) -> String;

    /// Appends a sort key.
    fn add_order_by(&mut self, operand: Operand, direction: OrderDirection);

    /// Selects a hidden expression under `alias`, usable as a sort key.
    fn add_select(&mut self, operand: Operand, alias: &str);

    /// Returns a parameter name unique within this surface.
    fn generate_parameter_name(&mut self, field: &str) -> String;

    /// Binds `value` under a fresh name and returns a reference to it.
    fn bind(&mut self, field: &str, value: SqlParam) -> Operand {
        let name = self.generate_parameter_name(field);
        self.bind_parameter(&name, value);
        Operand::Param(name)
    }
}

/// Forwards everything to another surface except predicates, which it keeps.
///
/// Used to compose the predicates of several filter applications with OR:
/// joins and parameters reach the real surface once each, and the caller
/// decides how the recorded predicates are combined. Joins are requested as
/// left joins so a row missing one relation can still match another branch.
pub struct PredicateRecorder<'s> {
    inner: &'s mut dyn QuerySurface,
    recorded: Vec<Predicate>,
}

impl<'s> PredicateRecorder<'s> {
    /// Wraps `inner`.
    pub fn new(inner: &'s mut dyn QuerySurface) -> Self {
        Self {
            inner,
            recorded: Vec::new(),
        }
    }

    /// Predicates recorded so far.
    pub fn recorded(&self) -> &[Predicate] {
        &self.recorded
    }

    /// Takes the recorded predicates.
    pub fn into_predicates(self) -> Vec<Predicate> {
        self.recorded
    }
}

impl QuerySurface for PredicateRecorder<'_> {
    fn root_alias(&self) -> &str {
        self.inner.root_alias()
    }

    fn add_predicate(&mut self, predicate: Predicate) {
        self.recorded.push(predicate);
    }

    fn bind_parameter(&mut self, name: &str, value: SqlParam) {
        self.inner.bind_parameter(name, value);
    }

    fn ensure_join(&mut self, join: JoinSpec) -> String {
        self.inner.ensure_join(join.with_join_type(JoinType::Left))
    }

    fn add_order_by(&mut self, operand: Operand, direction: OrderDirection) {
        self.inner.add_order_by(operand, direction);
    }

    fn add_select(&mut self, operand: Operand, alias: &str) {
        self.inner.add_select(operand, alias);
    }

    fn generate_parameter_name(&mut self, field: &str) -> String {
        self.inner.generate_parameter_name(field)
    }
}

impl fmt::Debug for PredicateRecorder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateRecorder")
            .field("recorded", &self.recorded)
            .finish_non_exhaustive()
    }
}
