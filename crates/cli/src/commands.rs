//! Subcommand implementations.
//!
//! Every command returns the JSON document printed by the binary.

use anyhow::{Context, bail};
use indexmap::IndexMap;
use meridian_filter::QueryPlan;
use meridian_metadata::types::HttpMethod;
use meridian_metadata::uri_template::match_path;
use meridian_metadata::{Operation, ResourceDescriptorCollection};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::catalog::{Application, CatalogFile};
use crate::config::{Cli, Command};

/// Collection query requested on the command line.
#[derive(Debug, Clone, Copy)]
pub struct QueryRequest<'a> {
    /// Resource class.
    pub class: &'a str,
    /// Operation name.
    pub operation: Option<&'a str>,
    /// Request path.
    pub path: Option<&'a str>,
    /// Query string.
    pub query: &'a str,
}

/// Loads the catalog and runs the selected command.
pub fn run(cli: &Cli) -> anyhow::Result<Value> {
    let app = Application::new(CatalogFile::load(&cli.catalog)?)?;

    match &cli.command {
        Command::Resources => Ok(resources(&app)),
        Command::Resolve { class } => resolve(&app, class),
        Command::Query {
            class,
            operation,
            path,
            query,
            execute,
        } => {
            let request = QueryRequest {
                class,
                operation: operation.as_deref(),
                path: path.as_deref(),
                query,
            };
            let plan = plan(&app, request)?;
            if !*execute {
                return Ok(json!({ "plan": plan }));
            }
            let rows = execute_plan(&app, &cli.database, class, &plan)?;
            Ok(json!({ "plan": plan, "rows": rows }))
        }
        Command::Load => load(&app, &cli.database),
    }
}

/// Resource classes with the name, kind and path of each operation.
pub fn resources(app: &Application) -> Value {
    let classes: Vec<Value> = app
        .collections()
        .map(|collection| {
            let operations: Vec<Value> = collection
                .iter()
                .flat_map(|resource| resource.operations().iter())
                .map(|operation| {
                    json!({
                        "name": operation.name_or_default(),
                        "kind": operation.kind,
                        "path": operation.path(),
                    })
                })
                .collect();
            json!({ "class": collection.class, "operations": operations })
        })
        .collect();
    Value::Array(classes)
}

/// Resolved metadata of `class`.
pub fn resolve(app: &Application, class: &str) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(app.collection(class)?)?)
}

/// Plans the collection query described by `request`.
///
/// A request path selects the collection operation whose path matches it
/// and supplies its URI variables.
pub fn plan(app: &Application, request: QueryRequest<'_>) -> anyhow::Result<QueryPlan> {
    let collection = app.collection(request.class)?;

    let (operation, uri_values) = match request.path {
        Some(path) => match_operation(collection, path).with_context(|| {
            format!(
                "no collection operation of '{}' matches {}",
                request.class, path
            )
        })?,
        None => {
            let operation = collection
                .operation(request.operation, true)
                .with_context(|| match request.operation {
                    Some(name) => format!("'{}' has no operation '{}'", request.class, name),
                    None => format!("'{}' has no collection operation", request.class),
                })?;
            (operation, IndexMap::new())
        }
    };
    if !operation.kind.is_collection() {
        bail!(
            "operation '{}' is not a collection operation",
            operation.name_or_default()
        );
    }

    let plan = app
        .engine()
        .build_query(operation, request.query, &uri_values)?;
    for notice in &plan.notices {
        info!(%notice, "Filter input ignored");
    }
    Ok(plan)
}

fn match_operation<'c>(
    collection: &'c ResourceDescriptorCollection,
    path: &str,
) -> Option<(&'c Operation, IndexMap<String, String>)> {
    collection
        .iter()
        .flat_map(|resource| resource.operations().iter())
        .filter(|operation| {
            operation.kind.is_collection() && operation.kind.method() == Some(HttpMethod::Get)
        })
        .find_map(|operation| {
            let template = operation.path()?;
            let values = match_path(&template, path)?;
            debug!(operation = %operation.name_or_default(), path = %path, "Path matched");
            Some((operation, values.into_iter().collect()))
        })
}

#[cfg(feature = "sqlite")]
fn open_store(app: &Application, database: &str) -> anyhow::Result<meridian_filter::SqliteStore> {
    use meridian_filter::SqliteStore;

    if database == ":memory:" {
        let store = SqliteStore::in_memory(app.classes().clone())?;
        load_data(app, &store)?;
        return Ok(store);
    }
    Ok(SqliteStore::open(database, app.classes().clone())
        .with_context(|| format!("cannot open database {}", database))?)
}

#[cfg(feature = "sqlite")]
fn load_data(
    app: &Application,
    store: &meridian_filter::SqliteStore,
) -> anyhow::Result<IndexMap<String, usize>> {
    let mut loaded = IndexMap::new();
    for (class, documents) in app.data() {
        let count = store
            .insert_all(class, documents)
            .with_context(|| format!("cannot load '{}' documents", class))?;
        loaded.insert(class.clone(), count);
    }
    Ok(loaded)
}

/// Runs `plan` over `class` and returns the rows.
#[cfg(feature = "sqlite")]
pub fn execute_plan(
    app: &Application,
    database: &str,
    class: &str,
    plan: &QueryPlan,
) -> anyhow::Result<Vec<Value>> {
    let store = open_store(app, database)?;
    let rows = store.query(class, &plan.query)?;
    info!(class = %class, rows = rows.len(), "Query executed");
    Ok(rows)
}

/// Runs `plan` over `class` and returns the rows.
#[cfg(not(feature = "sqlite"))]
pub fn execute_plan(
    _app: &Application,
    _database: &str,
    _class: &str,
    _plan: &QueryPlan,
) -> anyhow::Result<Vec<Value>> {
    bail!("Executing queries requires the 'sqlite' feature")
}

/// Loads the catalog's `data` section into `database`.
#[cfg(feature = "sqlite")]
pub fn load(app: &Application, database: &str) -> anyhow::Result<Value> {
    let store = meridian_filter::SqliteStore::open(database, app.classes().clone())
        .with_context(|| format!("cannot open database {}", database))?;
    let loaded = load_data(app, &store)?;
    info!(database = %database, classes = loaded.len(), "Data loaded");
    Ok(json!({ "loaded": loaded }))
}

/// Loads the catalog's `data` section into `database`.
#[cfg(not(feature = "sqlite"))]
pub fn load(_app: &Application, _database: &str) -> anyhow::Result<Value> {
    bail!("Loading data requires the 'sqlite' feature")
}
