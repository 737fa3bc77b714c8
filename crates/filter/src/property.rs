//! Property path resolution shared by the strategies.
//!
//! A dot-path such as `author.publisher.name` walks relations segment by
//! segment. [`describe_path`] only inspects metadata; [`join_path`] also asks
//! the surface to join every relation on the way, once per path prefix.

use meridian_metadata::introspection::{
    Association, PropertyIntrospector, PropertyMetadata, PropertyType,
};

use crate::sql::{JoinKind, JoinSpec, JoinType, Operand, QuerySurface, table_name};

/// One segment of a property path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    /// Class declaring the property.
    pub class: String,
    /// Property name.
    pub property: String,
    /// Property metadata.
    pub metadata: PropertyMetadata,
}

/// Leaf of a property path after its relations were joined.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProperty {
    /// Full dot-path.
    pub path: String,
    /// Alias of the table holding the leaf.
    pub alias: String,
    /// Class holding the leaf.
    pub class: String,
    /// Leaf property name.
    pub field: String,
    /// Leaf metadata.
    pub metadata: PropertyMetadata,
}

impl ResolvedProperty {
    /// `alias.field`
    pub fn operand(&self) -> Operand {
        Operand::column(&self.alias, &self.field)
    }

    /// Declared type of the leaf.
    pub fn property_type(&self) -> Option<&PropertyType> {
        self.metadata.primary_type()
    }

    /// Related class when the leaf is a relation.
    pub fn relation_target(&self) -> Option<String> {
        relation_target(&self.metadata)
    }

    /// Join description for a relation leaf.
    pub fn relation_join(
        &self,
        introspector: &dyn PropertyIntrospector,
        join_type: JoinType,
    ) -> Option<JoinSpec> {
        relation_join(
            introspector,
            &self.class,
            &self.field,
            &self.metadata,
            &self.alias,
            &self.path,
            join_type,
        )
    }
}

/// Related class of a property, from its association or its declared type.
pub fn relation_target(metadata: &PropertyMetadata) -> Option<String> {
    match &metadata.association {
        Some(association) if !association.target_class.is_empty() => {
            Some(association.target_class.clone())
        }
        _ => metadata
            .primary_type()
            .and_then(PropertyType::class_name)
            .map(str::to_string),
    }
}

/// Association of a relation property, inferred from its type when the
/// property carries no persistence metadata.
pub fn association_of(metadata: &PropertyMetadata) -> Option<Association> {
    if let Some(association) = &metadata.association {
        return Some(association.clone());
    }
    let target = relation_target(metadata)?;
    Some(Association {
        target_class: target,
        collection: metadata.primary_type().is_some_and(PropertyType::is_collection),
        ..Default::default()
    })
}

/// Identifier column of `class`: the first flagged identifier, else `id`.
pub fn identifier_column(introspector: &dyn PropertyIntrospector, class: &str) -> String {
    introspector
        .list_properties(class)
        .into_iter()
        .find(|name| {
            introspector
                .describe_property(class, name)
                .is_some_and(|meta| meta.identifier)
        })
        .unwrap_or_else(|| "id".to_string())
}

/// Describes every segment of `path` on `class`.
///
/// Returns `None` when a segment is unknown or when a non-leaf segment is
/// not a relation.
pub fn describe_path(
    introspector: &dyn PropertyIntrospector,
    class: &str,
    path: &str,
) -> Option<Vec<PathSegment>> {
    let names: Vec<&str> = path.split('.').collect();
    let mut segments = Vec::with_capacity(names.len());
    let mut current = class.to_string();

    for (index, name) in names.iter().enumerate() {
        if name.is_empty() {
            return None;
        }
        let metadata = introspector.describe_property(&current, name)?;
        let next = if index + 1 < names.len() {
            Some(relation_target(&metadata)?)
        } else {
            None
        };
        segments.push(PathSegment {
            class: current.clone(),
            property: name.to_string(),
            metadata,
        });
        if let Some(next) = next {
            current = next;
        }
    }
    Some(segments)
}

/// Returns true when `path` resolves on `class`.
pub fn is_mapped(introspector: &dyn PropertyIntrospector, class: &str, path: &str) -> bool {
    describe_path(introspector, class, path).is_some()
}

/// Describes the join from `parent_alias` through the relation `property`.
pub fn relation_join(
    introspector: &dyn PropertyIntrospector,
    class: &str,
    property: &str,
    metadata: &PropertyMetadata,
    parent_alias: &str,
    path: &str,
    join_type: JoinType,
) -> Option<JoinSpec> {
    let association = association_of(metadata)?;
    let target = association.target_class.clone();

    let kind = match &association.mapped_by {
        Some(mapped_by) if association.inverse_side || association.collection => JoinKind::Inverse {
            mapped_by: mapped_by.clone(),
        },
        _ if association.collection => JoinKind::JoinTable {
            table: format!("{}_{}", table_name(class), property),
            parent_column: format!("{}_id", table_name(class)),
            target_column: format!("{}_id", table_name(&target)),
        },
        _ => JoinKind::ForeignKey,
    };

    Some(JoinSpec {
        path: path.to_string(),
        parent_alias: parent_alias.to_string(),
        property: property.to_string(),
        parent_key: identifier_column(introspector, class),
        target_table: table_name(&target),
        target_key: identifier_column(introspector, &target),
        kind,
        collection: association.collection,
        join_type,
    })
}

/// Joins the relations leading to the leaf of `path` and describes the leaf.
///
/// Nothing is joined when the path does not resolve.
pub fn join_path(
    surface: &mut dyn QuerySurface,
    introspector: &dyn PropertyIntrospector,
    class: &str,
    path: &str,
    join_type: JoinType,
) -> Option<ResolvedProperty> {
    let mut segments = describe_path(introspector, class, path)?;
    let leaf = segments.pop()?;

    let mut alias = surface.root_alias().to_string();
    let mut prefix = String::new();
    for segment in &segments {
        if !prefix.is_empty() {
            prefix.push('.');
        }
        prefix.push_str(&segment.property);
        let join = relation_join(
            introspector,
            &segment.class,
            &segment.property,
            &segment.metadata,
            &alias,
            &prefix,
            join_type,
        )?;
        alias = surface.ensure_join(join);
    }

    Some(ResolvedProperty {
        path: path.to_string(),
        alias,
        class: leaf.class,
        field: leaf.property,
        metadata: leaf.metadata,
    })
}
