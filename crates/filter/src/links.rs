//! URI variable constraints.
//!
//! `/authors/{authorId}/books` lists the books of one author: the
//! `authorId` link turns the path value into a predicate on `Book`. A link
//! identifying the queried class itself compares its identifiers directly;
//! a link from a parent class goes through the relation named by
//! `to_property` (on the queried class) or `from_property` (on the parent).

use std::sync::Arc;

use indexmap::IndexMap;
use meridian_metadata::introspection::{PropertyIntrospector, PropertyMetadata, PropertyType};
use meridian_metadata::types::{Link, UriVariables};
use tracing::debug;

use crate::error::{FilterError, FilterResult};
use crate::property::{association_of, identifier_column, relation_join};
use crate::sql::{
    JoinKind, JoinType, Operand, Predicate, QuerySurface, SqlParam, foreign_key_column, table_name,
};

/// Turns URI variable values into predicates.
#[derive(Clone)]
pub struct LinksHandler {
    introspector: Arc<dyn PropertyIntrospector>,
}

impl LinksHandler {
    /// Creates a handler reading relations from `introspector`.
    pub fn new(introspector: Arc<dyn PropertyIntrospector>) -> Self {
        Self { introspector }
    }

    /// Constrains `class` on `surface` with every URI variable.
    ///
    /// Every variable must have a value in `values`; composite identifiers
    /// are written `key=value;other=value`.
    pub fn apply(
        &self,
        surface: &mut dyn QuerySurface,
        class: &str,
        uri_variables: &UriVariables,
        values: &IndexMap<String, String>,
    ) -> FilterResult<()> {
        for (key, link) in uri_variables {
            let name = link.parameter_name.as_deref().unwrap_or(key);
            let raw = values
                .get(name)
                .ok_or_else(|| FilterError::MissingUriVariable {
                    name: name.to_string(),
                })?;
            let identifiers = split_identifiers(name, link, raw)?;
            let from_class = link.from_class.as_deref().unwrap_or(class);

            let is_self = from_class == class
                && link.to_property.is_none()
                && link.from_property.is_none();

            let predicate = if is_self {
                self.self_predicate(surface, class, &identifiers)
            } else if let Some(property) = &link.to_property {
                self.to_property_predicate(surface, class, property, from_class, &identifiers)
                    .ok_or_else(|| {
                        invalid(name, format!("'{}' is not a relation of {}", property, class))
                    })?
            } else if let Some(property) = &link.from_property {
                self.from_property_predicate(surface, class, property, from_class, &identifiers)
                    .map_err(|message| invalid(name, message))?
            } else {
                return Err(invalid(
                    name,
                    format!("{} is not related to {}", from_class, class),
                ));
            };

            debug!(class = %class, variable = %name, "URI variable applied");
            surface.add_predicate(predicate);
        }
        Ok(())
    }

    fn bind_all(
        &self,
        surface: &mut dyn QuerySurface,
        owner: &str,
        alias: &str,
        identifiers: &[(String, String)],
    ) -> Predicate {
        let mut predicates = Vec::new();
        for (identifier, raw) in identifiers {
            let meta = self.introspector.describe_property(owner, identifier);
            let param = surface.bind(identifier, typed(meta.as_ref(), raw));
            predicates.push(Predicate::eq(Operand::column(alias, identifier), param));
        }
        Predicate::and(predicates)
    }

    fn self_predicate(
        &self,
        surface: &mut dyn QuerySurface,
        class: &str,
        identifiers: &[(String, String)],
    ) -> Predicate {
        let root = surface.root_alias().to_string();
        self.bind_all(surface, class, &root, identifiers)
    }

    /// The queried class points at the parent through `property`.
    fn to_property_predicate(
        &self,
        surface: &mut dyn QuerySurface,
        class: &str,
        property: &str,
        parent: &str,
        identifiers: &[(String, String)],
    ) -> Option<Predicate> {
        let metadata = self.introspector.describe_property(class, property)?;
        let root = surface.root_alias().to_string();
        let join = relation_join(
            self.introspector.as_ref(),
            class,
            property,
            &metadata,
            &root,
            property,
            JoinType::Inner,
        )?;

        if join.kind == JoinKind::ForeignKey && is_key(identifiers, &join.target_key) {
            let (identifier, raw) = &identifiers[0];
            let meta = self.introspector.describe_property(parent, identifier);
            let param = surface.bind(property, typed(meta.as_ref(), raw));
            return Some(Predicate::eq(
                Operand::column(root, foreign_key_column(property)),
                param,
            ));
        }

        let alias = surface.ensure_join(join);
        Some(self.bind_all(surface, parent, &alias, identifiers))
    }

    /// The parent holds the relation `property` towards the queried class.
    fn from_property_predicate(
        &self,
        surface: &mut dyn QuerySurface,
        class: &str,
        property: &str,
        parent: &str,
        identifiers: &[(String, String)],
    ) -> Result<Predicate, String> {
        let metadata = self
            .introspector
            .describe_property(parent, property)
            .ok_or_else(|| format!("'{}' is not a property of {}", property, parent))?;
        let association = association_of(&metadata)
            .ok_or_else(|| format!("'{}' is not a relation of {}", property, parent))?;

        if let Some(mapped_by) = &association.mapped_by {
            return self
                .to_property_predicate(surface, class, mapped_by, parent, identifiers)
                .ok_or_else(|| format!("'{}' is not a relation of {}", mapped_by, class));
        }

        let root = surface.root_alias().to_string();
        let class_key = Operand::column(&root, identifier_column(self.introspector.as_ref(), class));
        let parent_table = table_name(parent);

        if association.collection {
            let parent_key = identifier_column(self.introspector.as_ref(), parent);
            if !is_key(identifiers, &parent_key) {
                return Err(format!(
                    "'{}' can only be matched on the identifier of {}",
                    property, parent
                ));
            }
            let (identifier, raw) = &identifiers[0];
            let meta = self.introspector.describe_property(parent, identifier);
            let param = surface.bind(identifier, typed(meta.as_ref(), raw));
            return Ok(Predicate::Exists {
                table: format!("{}_{}", parent_table, property),
                conditions: vec![
                    (format!("{}_id", table_name(class)), class_key),
                    (format!("{}_id", parent_table), param),
                ],
                negated: false,
            });
        }

        let mut conditions = vec![(foreign_key_column(property), class_key)];
        for (identifier, raw) in identifiers {
            let meta = self.introspector.describe_property(parent, identifier);
            let param = surface.bind(identifier, typed(meta.as_ref(), raw));
            conditions.push((identifier.clone(), param));
        }
        Ok(Predicate::Exists {
            table: parent_table,
            conditions,
            negated: false,
        })
    }
}

impl std::fmt::Debug for LinksHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinksHandler").finish_non_exhaustive()
    }
}

fn invalid(name: &str, message: impl Into<String>) -> FilterError {
    FilterError::InvalidUriVariable {
        name: name.to_string(),
        message: message.into(),
    }
}

fn is_key(identifiers: &[(String, String)], key: &str) -> bool {
    identifiers.len() == 1 && identifiers[0].0 == key
}

/// Pairs the link identifiers with their values.
fn split_identifiers(name: &str, link: &Link, raw: &str) -> FilterResult<Vec<(String, String)>> {
    let identifiers: Vec<String> = if link.identifiers.is_empty() {
        vec!["id".to_string()]
    } else {
        link.identifiers.clone()
    };
    if identifiers.len() == 1 && !link.composite_identifier {
        return Ok(vec![(identifiers[0].clone(), raw.to_string())]);
    }

    let mut parts = IndexMap::new();
    for part in raw.split(';').filter(|part| !part.is_empty()) {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| invalid(name, format!("'{}' is not a key=value pair", part)))?;
        parts.insert(key.trim(), value.trim());
    }
    identifiers
        .into_iter()
        .map(|identifier| {
            let value = parts
                .get(identifier.as_str())
                .ok_or_else(|| invalid(name, format!("missing identifier '{}'", identifier)))?
                .to_string();
            Ok((identifier, value))
        })
        .collect()
}

/// Binds a path value with the type of the identifier it targets.
fn typed(metadata: Option<&PropertyMetadata>, raw: &str) -> SqlParam {
    match metadata.and_then(PropertyMetadata::primary_type) {
        Some(PropertyType::Int) => raw
            .parse()
            .map(SqlParam::Integer)
            .unwrap_or_else(|_| SqlParam::String(raw.to_string())),
        Some(PropertyType::Uuid) => uuid::Uuid::parse_str(raw)
            .map(|id| SqlParam::Blob(id.as_bytes().to_vec()))
            .unwrap_or_else(|_| SqlParam::String(raw.to_string())),
        _ => SqlParam::String(raw.to_string()),
    }
}
