//! Links between resource classes.

use serde::{Deserialize, Serialize};

/// A relationship used to bind a URI variable to a class, or to join two
/// resource classes.
///
/// As a URI variable, `from_class` is the class identified by the link's
/// identifiers. When the link constrains another class (a child collection
/// such as `/authors/{authorId}/books`), `to_class` and `to_property` name the
/// property of the child pointing back at `from_class`; when the parent owns
/// the relation, `from_property` names the parent's property instead.
///
/// Relation links inferred from properties read the other way round: they
/// start at the owning class and property and carry the identifiers of
/// `to_class`.
///
/// Links are immutable once completed. Every change goes through a `with_*`
/// transition that returns a new value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Link {
    /// Class identified by this link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_class: Option<String>,
    /// Class constrained by this link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_class: Option<String>,
    /// Property of `from_class` holding the relation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_property: Option<String>,
    /// Property of `to_class` holding the relation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_property: Option<String>,
    /// Identifier properties forming the join key, in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub identifiers: Vec<String>,
    /// URI variable bound to this link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_name: Option<String>,
    /// Whether the identifiers together form one identifier.
    pub composite_identifier: bool,
}

impl Link {
    /// Creates an empty link.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy identifying `class`.
    pub fn with_from_class(mut self, class: impl Into<String>) -> Self {
        self.from_class = Some(class.into());
        self
    }

    /// Returns a copy constraining `class`.
    pub fn with_to_class(mut self, class: impl Into<String>) -> Self {
        self.to_class = Some(class.into());
        self
    }

    /// Returns a copy with the relation held by `from_class`.
    pub fn with_from_property(mut self, property: impl Into<String>) -> Self {
        self.from_property = Some(property.into());
        self
    }

    /// Returns a copy with the relation held by `to_class`.
    pub fn with_to_property(mut self, property: impl Into<String>) -> Self {
        self.to_property = Some(property.into());
        self
    }

    /// Returns a copy with the given identifiers.
    pub fn with_identifiers<I, S>(mut self, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.identifiers = identifiers.into_iter().map(Into::into).collect();
        self
    }

    /// Returns a copy bound to the URI variable `name`.
    pub fn with_parameter_name(mut self, name: impl Into<String>) -> Self {
        self.parameter_name = Some(name.into());
        self
    }

    /// Returns a copy with the composite flag set.
    pub fn with_composite_identifier(mut self, composite: bool) -> Self {
        self.composite_identifier = composite;
        self
    }

    /// Returns true once identifiers are known.
    pub fn is_complete(&self) -> bool {
        !self.identifiers.is_empty()
    }

    /// Returns true if the link identifies `class` itself rather than a parent.
    pub fn identifies(&self, class: &str) -> bool {
        self.from_class.as_deref() == Some(class)
            && self.to_property.is_none()
            && self.from_property.is_none()
    }
}
