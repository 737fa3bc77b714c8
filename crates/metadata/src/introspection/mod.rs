//! Property introspection contracts.
//!
//! The resolver chain and the filter strategies never look at classes
//! directly. They ask a [`PropertyIntrospector`] which properties a class has
//! and how each one is typed, and a [`ResourceClassifier`] whether a class is
//! exposed as a resource. [`ClassCatalog`] is an in-memory implementation fed
//! from configuration.

mod catalog;

pub use catalog::{ClassCatalog, ClassDefinition};

use serde::{Deserialize, Serialize};

/// Declared type of a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyType {
    /// Text.
    String,
    /// Integer.
    Int,
    /// Floating point number.
    Float,
    /// Exact decimal, carried as a string.
    Decimal,
    /// Boolean.
    Bool,
    /// Date and time.
    DateTime,
    /// Calendar date.
    Date,
    /// UUID.
    Uuid,
    /// Enumeration with discrete cases.
    Enum {
        /// Enumeration type name.
        class: String,
        /// Case values.
        #[serde(default)]
        cases: Vec<String>,
    },
    /// Reference to another class.
    Object {
        /// Referenced class.
        class: String,
    },
    /// Collection of values.
    Collection {
        /// Element type.
        value: Box<PropertyType>,
    },
}

impl PropertyType {
    /// Shorthand for an object reference.
    pub fn object(class: impl Into<String>) -> Self {
        PropertyType::Object {
            class: class.into(),
        }
    }

    /// Shorthand for a collection of object references.
    pub fn collection_of(class: impl Into<String>) -> Self {
        PropertyType::Collection {
            value: Box::new(PropertyType::object(class)),
        }
    }

    /// Referenced class, unwrapping collections to their element type.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            PropertyType::Object { class } => Some(class),
            PropertyType::Collection { value } => value.class_name(),
            _ => None,
        }
    }

    /// Returns true for collections.
    pub fn is_collection(&self) -> bool {
        matches!(self, PropertyType::Collection { .. })
    }

    /// JSON schema type name used in parameter schemas.
    pub fn schema_type(&self) -> &'static str {
        match self {
            PropertyType::Int => "integer",
            PropertyType::Float => "number",
            PropertyType::Bool => "boolean",
            PropertyType::Collection { .. } => "array",
            _ => "string",
        }
    }
}

/// Persistence-level relation metadata of a property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Association {
    /// Related class.
    pub target_class: String,
    /// Whether the property holds many related items.
    pub collection: bool,
    /// Whether the foreign key lives on the related class.
    pub inverse_side: bool,
    /// Owning property on the related class (inverse side only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapped_by: Option<String>,
    /// Declared nullability of the join column; unspecified means nullable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_column_nullable: Option<bool>,
}

impl Association {
    /// Owning to-one relation.
    pub fn to_one(target_class: impl Into<String>) -> Self {
        Self {
            target_class: target_class.into(),
            ..Default::default()
        }
    }

    /// Inverse to-many relation mapped by `mapped_by` on the target.
    pub fn to_many(target_class: impl Into<String>, mapped_by: impl Into<String>) -> Self {
        Self {
            target_class: target_class.into(),
            collection: true,
            inverse_side: true,
            mapped_by: Some(mapped_by.into()),
            join_column_nullable: None,
        }
    }

    /// Returns a copy with declared join column nullability.
    pub fn with_join_column_nullable(mut self, nullable: bool) -> Self {
        self.join_column_nullable = Some(nullable);
        self
    }

    /// Whether rows may lack a related item.
    ///
    /// Collections and inverse sides can always be empty; owning to-one
    /// relations follow the join column, nullable unless declared otherwise.
    pub fn is_nullable(&self) -> bool {
        if self.collection || self.inverse_side {
            return true;
        }
        self.join_column_nullable.unwrap_or(true)
    }
}

/// Everything the core needs to know about one property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PropertyMetadata {
    /// Whether the property identifies instances of its class.
    pub identifier: bool,
    /// Whether the property accepts null.
    pub nullable: bool,
    /// Declared types, most specific first.
    #[serde(rename = "types")]
    pub builtin_types: Vec<PropertyType>,
    /// Relation metadata when the property is persisted as a relation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub association: Option<Association>,
}

impl PropertyMetadata {
    /// A property of the given type.
    pub fn of(property_type: PropertyType) -> Self {
        Self {
            builtin_types: vec![property_type],
            ..Default::default()
        }
    }

    /// An identifier property of the given type.
    pub fn identifier(property_type: PropertyType) -> Self {
        Self {
            identifier: true,
            builtin_types: vec![property_type],
            ..Default::default()
        }
    }

    /// Returns a copy marked nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Returns a copy with relation metadata.
    pub fn with_association(mut self, association: Association) -> Self {
        self.association = Some(association);
        self
    }

    /// First declared type.
    pub fn primary_type(&self) -> Option<&PropertyType> {
        self.builtin_types.first()
    }
}

/// Lists and describes the properties of classes.
pub trait PropertyIntrospector: Send + Sync {
    /// Property names of `class`, in declaration order. Empty for unknown classes.
    fn list_properties(&self, class: &str) -> Vec<String>;

    /// Describes one property, `None` when the class or property is unknown.
    fn describe_property(&self, class: &str, property: &str) -> Option<PropertyMetadata>;
}

/// Tells resource classes apart from plain classes.
pub trait ResourceClassifier: Send + Sync {
    /// Returns true if `class` is exposed as a resource.
    fn is_resource_class(&self, class: &str) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_name_unwraps_collection() {
        assert_eq!(PropertyType::collection_of("Book").class_name(), Some("Book"));
        assert_eq!(PropertyType::object("Author").class_name(), Some("Author"));
        assert_eq!(PropertyType::String.class_name(), None);
    }

    #[test]
    fn test_association_nullability() {
        assert!(Association::to_one("Author").is_nullable());
        assert!(
            !Association::to_one("Author")
                .with_join_column_nullable(false)
                .is_nullable()
        );
        assert!(Association::to_many("Comment", "post").is_nullable());
    }

    #[test]
    fn test_deserialize_property() {
        let meta: PropertyMetadata = serde_json::from_value(serde_json::json!({
            "identifier": true,
            "types": [{"type": "int"}],
        }))
        .unwrap();
        assert!(meta.identifier);
        assert_eq!(meta.primary_type(), Some(&PropertyType::Int));

        let meta: PropertyMetadata = serde_json::from_value(serde_json::json!({
            "types": [{"type": "enum", "class": "Status", "cases": ["draft", "published"]}],
        }))
        .unwrap();
        assert!(matches!(meta.primary_type(), Some(PropertyType::Enum { cases, .. }) if cases.len() == 2));
    }
}
