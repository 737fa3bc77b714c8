//! SQLite query builder.

use indexmap::IndexMap;
use serde::Serialize;

use super::expr::{Operand, Predicate, SqlParam};
use super::surface::{JoinKind, JoinSpec, JoinType, OrderDirection, QuerySurface};

/// Alias of the queried table.
pub const ROOT_ALIAS: &str = "o";

/// A rendered query with its bound parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlQuery {
    /// SQL text with `:name` placeholders.
    pub sql: String,
    /// Parameter values in binding order.
    pub params: Vec<(String, SqlParam)>,
}

/// [`QuerySurface`] producing one SQLite `SELECT`.
///
/// Rows come back in insertion order unless sort keys are added: `rowid` is
/// always the last sort key. `DISTINCT` is only used once a to-many relation
/// has been joined.
#[derive(Debug, Clone)]
pub struct SqlQueryBuilder {
    table: String,
    predicates: Vec<Predicate>,
    params: IndexMap<String, SqlParam>,
    joins: IndexMap<String, (String, JoinSpec)>,
    order_by: Vec<(Operand, OrderDirection)>,
    selects: Vec<(Operand, String)>,
    counter: usize,
    limit: Option<(u64, u64)>,
}

impl SqlQueryBuilder {
    /// Starts a query over `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            predicates: Vec::new(),
            params: IndexMap::new(),
            joins: IndexMap::new(),
            order_by: Vec::new(),
            selects: Vec::new(),
            counter: 0,
            limit: None,
        }
    }

    /// Starts a query over the table of `class`.
    pub fn for_class(class: &str) -> Self {
        Self::new(super::table_name(class))
    }

    /// Queried table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Restricts the result to `limit` rows after skipping `offset`.
    pub fn paginate(&mut self, limit: u64, offset: u64) {
        self.limit = Some((limit, offset));
    }

    /// Predicates added so far.
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Bound parameters.
    pub fn parameters(&self) -> &IndexMap<String, SqlParam> {
        &self.params
    }

    /// Joins by path, with their aliases.
    pub fn joins(&self) -> impl Iterator<Item = (&str, &JoinSpec)> {
        self.joins.values().map(|(alias, join)| (alias.as_str(), join))
    }

    /// Sort keys added so far.
    pub fn order_by(&self) -> &[(Operand, OrderDirection)] {
        &self.order_by
    }

    /// The `WHERE` condition, if any predicate was added.
    pub fn where_clause(&self) -> Option<String> {
        if self.predicates.is_empty() {
            return None;
        }
        Some(
            self.predicates
                .iter()
                .map(Predicate::to_sql_wrapped)
                .collect::<Vec<_>>()
                .join(" AND "),
        )
    }

    fn render_join(&self, alias: &str, join: &JoinSpec, sql: &mut String) {
        let keyword = match join.join_type {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
        };
        match &join.kind {
            JoinKind::ForeignKey => sql.push_str(&format!(
                " {} {} {} ON {}.{} = {}.{}",
                keyword,
                join.target_table,
                alias,
                alias,
                join.target_key,
                join.parent_alias,
                super::foreign_key_column(&join.property)
            )),
            JoinKind::Inverse { mapped_by } => sql.push_str(&format!(
                " {} {} {} ON {}.{} = {}.{}",
                keyword,
                join.target_table,
                alias,
                alias,
                super::foreign_key_column(mapped_by),
                join.parent_alias,
                join.parent_key
            )),
            JoinKind::JoinTable {
                table,
                parent_column,
                target_column,
            } => {
                let link = format!("{}_j", alias);
                sql.push_str(&format!(
                    " {} {} {} ON {}.{} = {}.{}",
                    keyword, table, link, link, parent_column, join.parent_alias, join.parent_key
                ));
                sql.push_str(&format!(
                    " {} {} {} ON {}.{} = {}.{}",
                    keyword, join.target_table, alias, alias, join.target_key, link, target_column
                ));
            }
        }
    }

    /// Renders the query.
    pub fn build(&self) -> SqlQuery {
        let distinct = self.joins.values().any(|(_, join)| join.collection);

        let mut sql = String::from("SELECT ");
        if distinct {
            sql.push_str("DISTINCT ");
        }
        sql.push_str(&format!("{}.*", ROOT_ALIAS));
        for (operand, alias) in &self.selects {
            sql.push_str(&format!(", {} AS {}", operand, alias));
        }
        sql.push_str(&format!(" FROM {} {}", self.table, ROOT_ALIAS));

        for (alias, join) in self.joins.values() {
            self.render_join(alias, join, &mut sql);
        }

        if let Some(condition) = self.where_clause() {
            sql.push_str(" WHERE ");
            sql.push_str(&condition);
        }

        sql.push_str(" ORDER BY ");
        for (operand, direction) in &self.order_by {
            sql.push_str(&format!("{} {}, ", operand, direction));
        }
        sql.push_str(&format!("{}.rowid ASC", ROOT_ALIAS));

        if let Some((limit, offset)) = self.limit {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));
        }

        SqlQuery {
            sql,
            params: self
                .params
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }
}

impl QuerySurface for SqlQueryBuilder {
    fn root_alias(&self) -> &str {
        ROOT_ALIAS
    }

    fn add_predicate(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    fn bind_parameter(&mut self, name: &str, value: SqlParam) {
        self.params.insert(name.to_string(), value);
    }

    fn ensure_join(&mut self, join: JoinSpec) -> String {
        if let Some((alias, _)) = self.joins.get(&join.path) {
            return alias.clone();
        }
        self.counter += 1;
        let alias = format!("{}_a{}", join.property, self.counter);
        self.joins.insert(join.path.clone(), (alias.clone(), join));
        alias
    }

    fn add_order_by(&mut self, operand: Operand, direction: OrderDirection) {
        self.order_by.push((operand, direction));
    }

    fn add_select(&mut self, operand: Operand, alias: &str) {
        if self.selects.iter().any(|(_, existing)| existing == alias) {
            return;
        }
        self.selects.push((operand, alias.to_string()));
    }

    fn generate_parameter_name(&mut self, field: &str) -> String {
        self.counter += 1;
        format!("{}_p{}", field.replace('.', "_"), self.counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn author_join() -> JoinSpec {
        JoinSpec {
            path: "author".to_string(),
            parent_alias: ROOT_ALIAS.to_string(),
            property: "author".to_string(),
            parent_key: "id".to_string(),
            target_table: "author".to_string(),
            target_key: "id".to_string(),
            kind: JoinKind::ForeignKey,
            collection: false,
            join_type: JoinType::Inner,
        }
    }

    #[test]
    fn test_plain_select() {
        let query = SqlQueryBuilder::new("book").build();
        assert_eq!(query.sql, "SELECT o.* FROM book o ORDER BY o.rowid ASC");
        assert!(query.params.is_empty());
    }

    #[test]
    fn test_predicates_and_parameters() {
        let mut qb = SqlQueryBuilder::new("book");
        let param = qb.bind("title", SqlParam::String("cat".to_string()));
        qb.add_predicate(Predicate::eq(Operand::column("o", "title"), param));
        qb.paginate(30, 60);

        let query = qb.build();
        assert_eq!(
            query.sql,
            "SELECT o.* FROM book o WHERE o.title = :title_p1 ORDER BY o.rowid ASC LIMIT 30 OFFSET 60"
        );
        assert_eq!(
            query.params,
            vec![("title_p1".to_string(), SqlParam::String("cat".to_string()))]
        );
    }

    #[test]
    fn test_join_once_per_path() {
        let mut qb = SqlQueryBuilder::new("book");
        let first = qb.ensure_join(author_join());
        let second = qb.ensure_join(author_join().with_join_type(JoinType::Left));

        assert_eq!(first, second);
        assert_eq!(qb.joins().count(), 1);
        assert!(
            qb.build()
                .sql
                .contains("INNER JOIN author author_a1 ON author_a1.id = o.author_id")
        );
    }

    #[test]
    fn test_to_many_join_is_distinct() {
        let mut qb = SqlQueryBuilder::new("company");
        qb.ensure_join(JoinSpec {
            path: "employees".to_string(),
            property: "employees".to_string(),
            target_table: "employee".to_string(),
            kind: JoinKind::Inverse {
                mapped_by: "company".to_string(),
            },
            collection: true,
            ..author_join()
        });

        let sql = qb.build().sql;
        assert!(sql.starts_with("SELECT DISTINCT o.*"));
        assert!(sql.contains("employee employees_a1 ON employees_a1.company_id = o.id"));
    }

    #[test]
    fn test_hidden_select_and_order() {
        let mut qb = SqlQueryBuilder::new("book");
        let field = Operand::column("o", "author");
        qb.add_select(field.clone().null_rank(), "_o_author_null_rank");
        qb.add_order_by(Operand::Alias("_o_author_null_rank".to_string()), OrderDirection::Desc);
        qb.add_order_by(field, OrderDirection::Asc);

        assert_eq!(
            qb.build().sql,
            "SELECT o.*, CASE WHEN o.author IS NULL THEN 0 ELSE 1 END AS _o_author_null_rank \
             FROM book o ORDER BY _o_author_null_rank DESC, o.author ASC, o.rowid ASC"
        );
    }
}
