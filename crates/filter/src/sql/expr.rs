//! Predicate expressions.
//!
//! Strategies never write SQL text. They combine [`Operand`]s into
//! [`Predicate`]s, and values only ever reach the query as named parameters.

use std::fmt;

use serde::Serialize;

/// A value bound to a named parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlParam {
    /// Text value.
    String(String),
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Float(f64),
    /// Boolean, stored as 0/1.
    Bool(bool),
    /// Raw bytes.
    Blob(Vec<u8>),
    /// SQL NULL.
    Null,
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// `alias.column`
    Column {
        /// Table alias.
        alias: String,
        /// Column name.
        column: String,
    },
    /// `:name`
    Param(String),
    /// Quoted string literal.
    Literal(String),
    /// `LOWER(x)`
    Lower(Box<Operand>),
    /// `datetime(x)`, normalizing ISO 8601 text for comparison.
    DateTime(Box<Operand>),
    /// `a || b || ...`
    Concat(Vec<Operand>),
    /// `CASE WHEN x IS NULL THEN 0 ELSE 1 END`
    NullRank(Box<Operand>),
    /// A name selected earlier in the query.
    Alias(String),
}

impl Operand {
    /// `alias.column`
    pub fn column(alias: impl Into<String>, column: impl Into<String>) -> Self {
        Operand::Column {
            alias: alias.into(),
            column: column.into(),
        }
    }

    /// Reference to the named parameter `name`.
    pub fn param(name: impl Into<String>) -> Self {
        Operand::Param(name.into())
    }

    /// A string literal.
    pub fn literal(value: impl Into<String>) -> Self {
        Operand::Literal(value.into())
    }

    /// Lower-cases this operand.
    pub fn lower(self) -> Self {
        Operand::Lower(Box::new(self))
    }

    /// Normalizes this operand as a date and time.
    pub fn datetime(self) -> Self {
        Operand::DateTime(Box::new(self))
    }

    /// Concatenates operands.
    pub fn concat(parts: Vec<Operand>) -> Self {
        Operand::Concat(parts)
    }

    /// 0 when this operand is null, 1 otherwise.
    pub fn null_rank(self) -> Self {
        Operand::NullRank(Box::new(self))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Column { alias, column } => write!(f, "{}.{}", alias, column),
            Operand::Param(name) => write!(f, ":{}", name),
            Operand::Literal(value) => write!(f, "'{}'", value.replace('\'', "''")),
            Operand::Lower(inner) => write!(f, "LOWER({})", inner),
            Operand::DateTime(inner) => write!(f, "datetime({})", inner),
            Operand::Concat(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" || ")?;
                    }
                    write!(f, "{}", part)?;
                }
                Ok(())
            }
            Operand::NullRank(inner) => {
                write!(f, "CASE WHEN {} IS NULL THEN 0 ELSE 1 END", inner)
            }
            Operand::Alias(name) => f.write_str(name),
        }
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
}

impl CompareOp {
    fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
        }
    }
}

/// A boolean condition on the query.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `left op right`
    Compare {
        /// Left operand.
        left: Operand,
        /// Operator.
        op: CompareOp,
        /// Right operand.
        right: Operand,
    },
    /// `operand LIKE pattern`
    Like {
        /// Matched operand.
        operand: Operand,
        /// Pattern.
        pattern: Operand,
    },
    /// `operand IN (values)`
    In {
        /// Tested operand.
        operand: Operand,
        /// Candidates.
        values: Vec<Operand>,
    },
    /// `operand BETWEEN low AND high`
    Between {
        /// Tested operand.
        operand: Operand,
        /// Lower bound, inclusive.
        low: Operand,
        /// Upper bound, inclusive.
        high: Operand,
    },
    /// `operand IS [NOT] NULL`
    IsNull {
        /// Tested operand.
        operand: Operand,
        /// `IS NOT NULL` when true.
        negated: bool,
    },
    /// `[NOT] EXISTS (SELECT 1 FROM table WHERE table.column = operand ...)`
    Exists {
        /// Correlated table.
        table: String,
        /// Column equalities, all required.
        conditions: Vec<(String, Operand)>,
        /// `NOT EXISTS` when true.
        negated: bool,
    },
    /// Every predicate holds.
    And(Vec<Predicate>),
    /// At least one predicate holds.
    Or(Vec<Predicate>),
}

impl Predicate {
    /// `left = right`
    pub fn eq(left: Operand, right: Operand) -> Self {
        Predicate::compare(left, CompareOp::Eq, right)
    }

    /// `left op right`
    pub fn compare(left: Operand, op: CompareOp, right: Operand) -> Self {
        Predicate::Compare { left, op, right }
    }

    /// `operand LIKE pattern`
    pub fn like(operand: Operand, pattern: Operand) -> Self {
        Predicate::Like { operand, pattern }
    }

    /// Equality for one value, membership for several.
    pub fn eq_any(operand: Operand, mut values: Vec<Operand>) -> Self {
        if values.len() == 1 {
            let value = values.remove(0);
            return Predicate::eq(operand, value);
        }
        Predicate::In { operand, values }
    }

    /// `operand IS NULL`
    pub fn is_null(operand: Operand) -> Self {
        Predicate::IsNull {
            operand,
            negated: false,
        }
    }

    /// `operand IS NOT NULL`
    pub fn is_not_null(operand: Operand) -> Self {
        Predicate::IsNull {
            operand,
            negated: true,
        }
    }

    /// Conjunction, collapsing a single predicate.
    pub fn and(mut predicates: Vec<Predicate>) -> Self {
        if predicates.len() == 1 {
            return predicates.remove(0);
        }
        Predicate::And(predicates)
    }

    /// Disjunction, collapsing a single predicate.
    pub fn or(mut predicates: Vec<Predicate>) -> Self {
        if predicates.len() == 1 {
            return predicates.remove(0);
        }
        Predicate::Or(predicates)
    }

    fn is_compound(&self) -> bool {
        matches!(self, Predicate::And(_) | Predicate::Or(_))
    }

    /// Renders the predicate, parenthesized when it combines others.
    pub fn to_sql_wrapped(&self) -> String {
        if self.is_compound() {
            format!("({})", self)
        } else {
            self.to_string()
        }
    }
}

fn join_predicates(f: &mut fmt::Formatter<'_>, predicates: &[Predicate], sep: &str) -> fmt::Result {
    for (i, predicate) in predicates.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        f.write_str(&predicate.to_sql_wrapped())?;
    }
    Ok(())
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Compare { left, op, right } => {
                write!(f, "{} {} {}", left, op.as_sql(), right)
            }
            Predicate::Like { operand, pattern } => write!(f, "{} LIKE {}", operand, pattern),
            Predicate::In { operand, values } => {
                write!(f, "{} IN (", operand)?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                f.write_str(")")
            }
            Predicate::Between { operand, low, high } => {
                write!(f, "{} BETWEEN {} AND {}", operand, low, high)
            }
            Predicate::IsNull { operand, negated } => {
                let not = if *negated { " NOT" } else { "" };
                write!(f, "{} IS{} NULL", operand, not)
            }
            Predicate::Exists {
                table,
                conditions,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{}EXISTS (SELECT 1 FROM {}", not, table)?;
                for (i, (column, operand)) in conditions.iter().enumerate() {
                    let keyword = if i == 0 { "WHERE" } else { "AND" };
                    write!(f, " {} {}.{} = {}", keyword, table, column, operand)?;
                }
                f.write_str(")")
            }
            Predicate::And(predicates) => join_predicates(f, predicates, " AND "),
            Predicate::Or(predicates) => join_predicates(f, predicates, " OR "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title() -> Operand {
        Operand::column("o", "title")
    }

    #[test]
    fn test_operands_render() {
        let pattern = Operand::concat(vec![
            Operand::literal("%"),
            Operand::param("title_p1"),
            Operand::literal("%"),
        ]);
        assert_eq!(pattern.to_string(), "'%' || :title_p1 || '%'");
        assert_eq!(title().lower().to_string(), "LOWER(o.title)");
        assert_eq!(Operand::literal("it's").to_string(), "'it''s'");
        assert_eq!(
            title().null_rank().to_string(),
            "CASE WHEN o.title IS NULL THEN 0 ELSE 1 END"
        );
    }

    #[test]
    fn test_eq_any() {
        let single = Predicate::eq_any(title(), vec![Operand::param("p1")]);
        assert_eq!(single.to_string(), "o.title = :p1");

        let many = Predicate::eq_any(title(), vec![Operand::param("p1"), Operand::param("p2")]);
        assert_eq!(many.to_string(), "o.title IN (:p1, :p2)");
    }

    #[test]
    fn test_compound_predicates_parenthesized() {
        let predicate = Predicate::and(vec![
            Predicate::or(vec![
                Predicate::like(title(), Operand::param("p1")),
                Predicate::like(title(), Operand::param("p2")),
            ]),
            Predicate::is_not_null(title()),
        ]);
        assert_eq!(
            predicate.to_string(),
            "(o.title LIKE :p1 OR o.title LIKE :p2) AND o.title IS NOT NULL"
        );
        assert!(matches!(Predicate::or(vec![Predicate::is_null(title())]), Predicate::IsNull { .. }));
    }

    #[test]
    fn test_exists_subquery() {
        let predicate = Predicate::Exists {
            table: "employee".to_string(),
            conditions: vec![("company_id".to_string(), Operand::column("o", "id"))],
            negated: true,
        };
        assert_eq!(
            predicate.to_string(),
            "NOT EXISTS (SELECT 1 FROM employee WHERE employee.company_id = o.id)"
        );
    }
}
