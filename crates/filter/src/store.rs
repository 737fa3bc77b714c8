//! SQLite storage for planned queries.
//!
//! [`SqliteStore`] derives one table per catalog class, loads JSON documents
//! into them and runs [`SqlQuery`] plans, turning rows back into JSON. Table
//! layout follows the naming rules of [`crate::sql`]:
//!
//! - scalar properties get a column of the same name
//! - owning to-one relations get a `<property>_id` column
//! - to-many relations without an owning side get a join table
//! - inverse relations get nothing, the related table holds the key

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use meridian_metadata::introspection::{ClassCatalog, PropertyMetadata, PropertyType};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::ToSql;
use rusqlite::types::{Value, ValueRef};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info, instrument};

use crate::error::{StoreError, StoreResult};
use crate::property::{association_of, identifier_column};
use crate::sql::{SqlParam, SqlQuery, foreign_key_column, table_name};
use crate::strategy::EngineCapabilities;

/// Configuration of the SQLite store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of pooled connections. In-memory stores always use one.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_max_connections() -> u32 {
    4
}

fn default_connection_timeout_ms() -> u64 {
    30000
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            connection_timeout_ms: default_connection_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

/// How a property is persisted.
#[derive(Debug, Clone, PartialEq)]
enum Column {
    Scalar {
        property: String,
        kind: Option<PropertyType>,
    },
    ForeignKey {
        property: String,
        column: String,
        key: Option<PropertyType>,
    },
    JoinTable {
        property: String,
        table: String,
        parent_column: String,
        target_column: String,
        key: Option<PropertyType>,
    },
}

/// SQLite database whose schema mirrors a [`ClassCatalog`].
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
    catalog: Arc<ClassCatalog>,
    is_memory: bool,
}

impl fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStore")
            .field("classes", &self.catalog.class_names().collect::<Vec<_>>())
            .field("is_memory", &self.is_memory)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Creates an in-memory store with the schema of `catalog`.
    pub fn in_memory(catalog: Arc<ClassCatalog>) -> StoreResult<Self> {
        Self::with_config(":memory:", catalog, StoreConfig::default())
    }

    /// Opens or creates a database file with the schema of `catalog`.
    pub fn open<P: AsRef<Path>>(path: P, catalog: Arc<ClassCatalog>) -> StoreResult<Self> {
        Self::with_config(path, catalog, StoreConfig::default())
    }

    /// Creates a store with custom configuration.
    pub fn with_config<P: AsRef<Path>>(
        path: P,
        catalog: Arc<ClassCatalog>,
        config: StoreConfig,
    ) -> StoreResult<Self> {
        let is_memory = path.as_ref().to_string_lossy() == ":memory:";
        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);

        let manager = if is_memory {
            SqliteConnectionManager::memory()
        } else {
            SqliteConnectionManager::file(path.as_ref())
        }
        .with_init(move |conn| configure_connection(conn, busy_timeout));

        // Every in-memory connection is a separate database: keep exactly one alive.
        let mut builder = Pool::builder()
            .connection_timeout(Duration::from_millis(config.connection_timeout_ms));
        builder = if is_memory {
            builder
                .max_size(1)
                .min_idle(Some(1))
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            builder.max_size(config.max_connections.max(1))
        };
        let pool = builder.build(manager)?;

        let store = Self {
            pool,
            catalog,
            is_memory,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Returns whether this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        self.is_memory
    }

    /// Capabilities of the engine behind this store.
    pub fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities::sqlite()
    }

    /// Class catalog the schema was derived from.
    pub fn catalog(&self) -> &Arc<ClassCatalog> {
        &self.catalog
    }

    fn connection(&self) -> StoreResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Creates missing tables for every catalog class.
    pub fn init_schema(&self) -> StoreResult<()> {
        let conn = self.connection()?;
        let mut ddl = String::new();
        for class in self.catalog.class_names() {
            ddl.push_str(&self.create_statements(class)?);
        }
        conn.execute_batch(&ddl)?;
        info!(
            classes = self.catalog.class_names().count(),
            "Store schema initialized"
        );
        Ok(())
    }

    fn columns(&self, class: &str) -> StoreResult<Vec<Column>> {
        let definition = self
            .catalog
            .class(class)
            .ok_or_else(|| StoreError::UnknownClass {
                class: class.to_string(),
            })?;

        let mut columns = Vec::new();
        for (property, metadata) in &definition.properties {
            let Some(association) = association_of(metadata) else {
                columns.push(Column::Scalar {
                    property: property.clone(),
                    kind: metadata.primary_type().cloned(),
                });
                continue;
            };

            let target = &association.target_class;
            let key = self.key_type(target);
            if association.mapped_by.is_some() || association.inverse_side {
                continue;
            }
            if association.collection {
                columns.push(Column::JoinTable {
                    property: property.clone(),
                    table: format!("{}_{}", table_name(class), property),
                    parent_column: format!("{}_id", table_name(class)),
                    target_column: format!("{}_id", table_name(target)),
                    key,
                });
            } else {
                columns.push(Column::ForeignKey {
                    property: property.clone(),
                    column: foreign_key_column(property),
                    key,
                });
            }
        }
        Ok(columns)
    }

    fn key_type(&self, class: &str) -> Option<PropertyType> {
        let key = identifier_column(self.catalog.as_ref(), class);
        self.catalog
            .class(class)
            .and_then(|definition| definition.properties.get(&key))
            .and_then(PropertyMetadata::primary_type)
            .cloned()
    }

    fn create_statements(&self, class: &str) -> StoreResult<String> {
        let key = identifier_column(self.catalog.as_ref(), class);
        let table = table_name(class);
        let mut definitions = Vec::new();
        let mut join_tables = Vec::new();

        for column in self.columns(class)? {
            match column {
                Column::Scalar { property, kind } => {
                    let unique = if property == key { " UNIQUE" } else { "" };
                    definitions.push(format!("{} {}{}", property, affinity(kind.as_ref()), unique));
                }
                Column::ForeignKey { column, key, .. } => {
                    definitions.push(format!("{} {}", column, affinity(key.as_ref())));
                }
                Column::JoinTable {
                    table: link,
                    parent_column,
                    target_column,
                    ..
                } => join_tables.push(format!(
                    "CREATE TABLE IF NOT EXISTS {} ({} NOT NULL, {} NOT NULL);\n",
                    link, parent_column, target_column
                )),
            }
        }

        let mut ddl = if definitions.is_empty() {
            format!("CREATE TABLE IF NOT EXISTS {} (_placeholder NULL);\n", table)
        } else {
            format!(
                "CREATE TABLE IF NOT EXISTS {} ({});\n",
                table,
                definitions.join(", ")
            )
        };
        for statement in join_tables {
            ddl.push_str(&statement);
        }
        Ok(ddl)
    }

    /// Inserts one JSON document as an instance of `class`.
    ///
    /// Relations are given by key, either directly or as an object holding the
    /// related identifier. Collections are arrays of such references.
    #[instrument(skip(self, document), fields(class = %class))]
    pub fn insert(&self, class: &str, document: &JsonValue) -> StoreResult<()> {
        let object = document.as_object().ok_or_else(|| StoreError::InvalidRow {
            class: class.to_string(),
            message: "documents must be JSON objects".to_string(),
        })?;
        let key = identifier_column(self.catalog.as_ref(), class);
        let table = table_name(class);

        let mut names = Vec::new();
        let mut values = Vec::new();
        let mut links = Vec::new();
        for column in self.columns(class)? {
            match column {
                Column::Scalar { property, kind } => {
                    let Some(value) = object.get(&property) else {
                        continue;
                    };
                    values.push(to_sql(class, &property, kind.as_ref(), value)?);
                    names.push(property);
                }
                Column::ForeignKey {
                    property,
                    column,
                    key: target_key,
                } => {
                    let Some(value) = object.get(&property) else {
                        continue;
                    };
                    let reference = reference(class, &property, value)?;
                    values.push(to_sql(class, &property, target_key.as_ref(), reference)?);
                    names.push(column);
                }
                Column::JoinTable {
                    property,
                    table: link,
                    parent_column,
                    target_column,
                    key: target_key,
                } => {
                    let Some(items) = object.get(&property) else {
                        continue;
                    };
                    let items = items.as_array().ok_or_else(|| StoreError::InvalidRow {
                        class: class.to_string(),
                        message: format!("'{}' must be an array", property),
                    })?;
                    for item in items {
                        let reference = reference(class, &property, item)?;
                        links.push((
                            link.clone(),
                            parent_column.clone(),
                            target_column.clone(),
                            to_sql(class, &property, target_key.as_ref(), reference)?,
                        ));
                    }
                }
            }
        }

        let conn = self.connection()?;
        let sql = if names.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", table)
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                names.join(", "),
                vec!["?"; names.len()].join(", ")
            )
        };
        conn.execute(&sql, rusqlite::params_from_iter(values.iter()))?;

        if !links.is_empty() {
            let parent_key = match names.iter().position(|name| *name == key) {
                Some(index) => values[index].clone(),
                None => {
                    return Err(StoreError::InvalidRow {
                        class: class.to_string(),
                        message: format!("collections need the identifier '{}'", key),
                    });
                }
            };
            for (link, parent_column, target_column, target) in links {
                conn.execute(
                    &format!(
                        "INSERT INTO {} ({}, {}) VALUES (?1, ?2)",
                        link, parent_column, target_column
                    ),
                    rusqlite::params![parent_key, target],
                )?;
            }
        }
        debug!("Document inserted");
        Ok(())
    }

    /// Inserts every document of `documents` as instances of `class`.
    pub fn insert_all<'a, I>(&self, class: &str, documents: I) -> StoreResult<usize>
    where
        I: IntoIterator<Item = &'a JsonValue>,
    {
        let mut count = 0;
        for document in documents {
            self.insert(class, document)?;
            count += 1;
        }
        Ok(count)
    }

    /// Runs a planned query over `class` and converts the rows to JSON.
    ///
    /// Columns that do not map to a property, such as sort helpers, are
    /// left out.
    #[instrument(skip(self, query), fields(class = %class))]
    pub fn query(&self, class: &str, query: &SqlQuery) -> StoreResult<Vec<JsonValue>> {
        let columns = self.columns(class)?;
        let conn = self.connection()?;
        let mut statement = conn.prepare(&query.sql)?;
        let names: Vec<String> = statement
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let bound: Vec<(String, Value)> = query
            .params
            .iter()
            .map(|(name, value)| (format!(":{}", name), to_value(value)))
            .collect();
        let params: Vec<(&str, &dyn ToSql)> = bound
            .iter()
            .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
            .collect();

        let mut rows = statement.query(params.as_slice())?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            let mut document = Map::new();
            for (index, name) in names.iter().enumerate() {
                let Some((property, kind)) = property_of(&columns, name) else {
                    continue;
                };
                document.insert(property.to_string(), from_sql(row.get_ref(index)?, kind));
            }
            documents.push(JsonValue::Object(document));
        }
        debug!(rows = documents.len(), "Query executed");
        Ok(documents)
    }

    /// Number of stored instances of `class`.
    pub fn count(&self, class: &str) -> StoreResult<usize> {
        self.columns(class)?;
        let conn = self.connection()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table_name(class)),
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

fn configure_connection(
    conn: &mut rusqlite::Connection,
    busy_timeout: Duration,
) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch("PRAGMA case_sensitive_like = ON;")
}

fn affinity(kind: Option<&PropertyType>) -> &'static str {
    match kind {
        Some(PropertyType::Int) | Some(PropertyType::Bool) => "INTEGER",
        Some(PropertyType::Float) => "REAL",
        Some(PropertyType::Decimal) => "NUMERIC",
        Some(PropertyType::Uuid) => "BLOB",
        _ => "TEXT",
    }
}

fn property_of<'c>(columns: &'c [Column], name: &str) -> Option<(&'c str, Option<&'c PropertyType>)> {
    columns.iter().find_map(|column| match column {
        Column::Scalar { property, kind } if property == name => {
            Some((property.as_str(), kind.as_ref()))
        }
        Column::ForeignKey {
            property,
            column,
            key,
        } if column == name => Some((property.as_str(), key.as_ref())),
        _ => None,
    })
}

fn reference<'v>(class: &str, property: &str, value: &'v JsonValue) -> StoreResult<&'v JsonValue> {
    match value {
        JsonValue::Object(object) => {
            object
                .get("id")
                .or_else(|| object.values().next())
                .ok_or_else(|| StoreError::InvalidRow {
                    class: class.to_string(),
                    message: format!("'{}' references nothing", property),
                })
        }
        other => Ok(other),
    }
}

fn to_sql(
    class: &str,
    property: &str,
    kind: Option<&PropertyType>,
    value: &JsonValue,
) -> StoreResult<Value> {
    let invalid = || StoreError::InvalidRow {
        class: class.to_string(),
        message: format!("unexpected value {} for '{}'", value, property),
    };

    Ok(match (kind, value) {
        (_, JsonValue::Null) => Value::Null,
        (Some(PropertyType::Int), _) => Value::Integer(value.as_i64().ok_or_else(invalid)?),
        (Some(PropertyType::Float), _) => Value::Real(value.as_f64().ok_or_else(invalid)?),
        (Some(PropertyType::Bool), _) => {
            Value::Integer(i64::from(value.as_bool().ok_or_else(invalid)?))
        }
        (Some(PropertyType::Uuid), JsonValue::String(raw)) => {
            let id = uuid::Uuid::parse_str(raw).map_err(|_| invalid())?;
            Value::Blob(id.as_bytes().to_vec())
        }
        (_, JsonValue::String(raw)) => Value::Text(raw.clone()),
        (_, JsonValue::Number(number)) => match number.as_i64() {
            Some(integer) => Value::Integer(integer),
            None => Value::Real(number.as_f64().ok_or_else(invalid)?),
        },
        (_, JsonValue::Bool(flag)) => Value::Integer(i64::from(*flag)),
        (_, other) => Value::Text(other.to_string()),
    })
}

fn to_value(param: &SqlParam) -> Value {
    match param {
        SqlParam::String(text) => Value::Text(text.clone()),
        SqlParam::Integer(integer) => Value::Integer(*integer),
        SqlParam::Float(float) => Value::Real(*float),
        SqlParam::Bool(flag) => Value::Integer(i64::from(*flag)),
        SqlParam::Blob(bytes) => Value::Blob(bytes.clone()),
        SqlParam::Null => Value::Null,
    }
}

fn from_sql(value: ValueRef<'_>, kind: Option<&PropertyType>) -> JsonValue {
    match (value, kind) {
        (ValueRef::Null, _) => JsonValue::Null,
        (ValueRef::Integer(integer), Some(PropertyType::Bool)) => JsonValue::Bool(integer != 0),
        (ValueRef::Integer(integer), _) => JsonValue::from(integer),
        (ValueRef::Real(real), _) => JsonValue::from(real),
        (ValueRef::Text(text), _) => JsonValue::String(String::from_utf8_lossy(text).into_owned()),
        (ValueRef::Blob(bytes), Some(PropertyType::Uuid)) => uuid::Uuid::from_slice(bytes)
            .map(|id| JsonValue::String(id.to_string()))
            .unwrap_or(JsonValue::Null),
        (ValueRef::Blob(bytes), _) => JsonValue::String(String::from_utf8_lossy(bytes).into_owned()),
    }
}
