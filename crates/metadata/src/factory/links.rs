//! Link discovery and completion.

use std::fmt;
use std::sync::Arc;

use crate::error::{MetadataError, MetadataResult};
use crate::introspection::{PropertyIntrospector, ResourceClassifier};
use crate::types::Link;

/// Parameter name used for composite identifiers.
pub const COMPOSITE_PARAMETER_NAME: &str = "id";

/// Builds and completes [`Link`]s from class introspection.
#[derive(Clone)]
pub struct LinkFactory {
    introspector: Arc<dyn PropertyIntrospector>,
    classifier: Arc<dyn ResourceClassifier>,
}

impl LinkFactory {
    /// Creates a factory.
    pub fn new(
        introspector: Arc<dyn PropertyIntrospector>,
        classifier: Arc<dyn ResourceClassifier>,
    ) -> Self {
        Self {
            introspector,
            classifier,
        }
    }

    /// Identifier properties of `class`, in declaration order.
    ///
    /// Properties flagged as identifiers win; otherwise a property named `id`
    /// is used. A class with neither has no identifiers.
    pub fn identifiers_of(&self, class: &str) -> MetadataResult<Vec<String>> {
        let properties = self.introspector.list_properties(class);
        let flagged: Vec<String> = properties
            .iter()
            .filter(|name| {
                self.introspector
                    .describe_property(class, name)
                    .is_some_and(|meta| meta.identifier)
            })
            .cloned()
            .collect();
        if !flagged.is_empty() {
            return Ok(flagged);
        }
        if properties.iter().any(|name| name == "id") {
            return Ok(vec!["id".to_string()]);
        }
        Err(MetadataError::NoIdentifiers {
            class: class.to_string(),
        })
    }

    /// Self links identifying instances of `class`.
    ///
    /// A single identifier yields one link named after the property; several
    /// identifiers yield one composite link named `id`.
    pub fn create_links_from_identifiers(&self, class: &str) -> MetadataResult<Vec<Link>> {
        let identifiers = self.identifiers_of(class)?;
        let base = Link::new().with_from_class(class);

        if identifiers.len() > 1 {
            return Ok(vec![
                base.with_identifiers(identifiers)
                    .with_composite_identifier(true)
                    .with_parameter_name(COMPOSITE_PARAMETER_NAME),
            ]);
        }
        Ok(identifiers
            .into_iter()
            .map(|identifier| {
                base.clone()
                    .with_parameter_name(identifier.clone())
                    .with_identifiers([identifier])
            })
            .collect())
    }

    /// Links for every property of `class` referencing another resource.
    ///
    /// The link starts at `class` and `property`, points at the referenced
    /// class (collections unwrap to their element type), carries that class's
    /// identifiers and is bound to the `<property>Id` variable. Referenced
    /// classes without identifiers yield a link without identifiers.
    pub fn create_links_from_relations(&self, class: &str) -> Vec<Link> {
        self.introspector
            .list_properties(class)
            .into_iter()
            .filter_map(|property| {
                let meta = self.introspector.describe_property(class, &property)?;
                let target = meta
                    .builtin_types
                    .iter()
                    .find_map(|t| t.class_name())?
                    .to_string();
                if !self.classifier.is_resource_class(&target) {
                    return None;
                }

                let identifiers = self.identifiers_of(&target).unwrap_or_default();
                Some(
                    Link::new()
                        .with_from_class(class)
                        .with_from_property(property.clone())
                        .with_to_class(target)
                        .with_composite_identifier(identifiers.len() > 1)
                        .with_identifiers(identifiers)
                        .with_parameter_name(format!("{}Id", property)),
                )
            })
            .collect()
    }

    /// Turns a relation link into a URI variable constraining its owner.
    ///
    /// `Book.author -> Author` becomes a variable identifying an `Author`
    /// that constrains `Book` through its `author` property.
    pub fn relation_as_uri_variable(relation: &Link) -> Link {
        Link {
            from_class: relation.to_class.clone(),
            to_class: relation.from_class.clone(),
            from_property: None,
            to_property: relation.from_property.clone(),
            identifiers: relation.identifiers.clone(),
            parameter_name: relation.parameter_name.clone(),
            composite_identifier: relation.composite_identifier,
        }
    }

    /// Fills the missing parts of a link used on `class`.
    ///
    /// `from_class` defaults to `class`. A link identifying another class gets
    /// `to_class = class` and, when neither side's property is declared, the
    /// property relating the two classes. Missing identifiers are read from
    /// `from_class`; several identifiers make the link composite and name it
    /// `id` unless a name is already set.
    pub fn complete_link(&self, class: &str, link: Link) -> MetadataResult<Link> {
        let mut link = link;
        let from_class = link
            .from_class
            .get_or_insert_with(|| class.to_string())
            .clone();

        if from_class != class {
            link.to_class.get_or_insert_with(|| class.to_string());
            if link.to_property.is_none() && link.from_property.is_none() {
                if let Some(property) = self.relating_property(class, &from_class) {
                    link.to_property = Some(property);
                } else if let Some(property) = self.relating_property(&from_class, class) {
                    link.from_property = Some(property);
                }
            }
        }

        if link.identifiers.is_empty() {
            let identifiers = self.identifiers_of(&from_class).map_err(|err| {
                if from_class == class {
                    err
                } else {
                    MetadataError::UnresolvableLink {
                        class: class.to_string(),
                        parameter: link.parameter_name.clone().unwrap_or_default(),
                        message: err.to_string(),
                    }
                }
            })?;
            link.composite_identifier = identifiers.len() > 1;
            link.identifiers = identifiers;
        }

        if link.parameter_name.is_none() {
            link.parameter_name = Some(if link.composite_identifier {
                COMPOSITE_PARAMETER_NAME.to_string()
            } else {
                link.identifiers[0].clone()
            });
        }

        Ok(link)
    }

    /// First property of `owner` referencing `target`.
    fn relating_property(&self, owner: &str, target: &str) -> Option<String> {
        self.introspector
            .list_properties(owner)
            .into_iter()
            .find(|property| {
                self.introspector
                    .describe_property(owner, property)
                    .is_some_and(|meta| {
                        meta.builtin_types
                            .iter()
                            .any(|t| t.class_name() == Some(target))
                    })
            })
    }
}

impl fmt::Debug for LinkFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkFactory").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::InMemoryResourceSource;
    use crate::introspection::{ClassCatalog, ClassDefinition, PropertyMetadata, PropertyType};
    use crate::types::ResourceDescriptor;
    use pretty_assertions::assert_eq;

    fn factory() -> LinkFactory {
        let catalog = ClassCatalog::new()
            .with_class(
                "Book",
                ClassDefinition::new()
                    .property("id", PropertyMetadata::identifier(PropertyType::Int))
                    .property("title", PropertyMetadata::of(PropertyType::String))
                    .property("author", PropertyMetadata::of(PropertyType::object("Author")))
                    .property("tags", PropertyMetadata::of(PropertyType::collection_of("Tag"))),
            )
            .with_class(
                "Author",
                ClassDefinition::new().property("id", PropertyMetadata::of(PropertyType::Int)),
            )
            .with_class(
                "Edition",
                ClassDefinition::new()
                    .property("isbn", PropertyMetadata::identifier(PropertyType::String))
                    .property("year", PropertyMetadata::identifier(PropertyType::Int)),
            )
            .with_class(
                "Tag",
                ClassDefinition::new().property("label", PropertyMetadata::of(PropertyType::String)),
            );
        let source = InMemoryResourceSource::new()
            .with_resource("Book", ResourceDescriptor::new("Book"))
            .with_resource("Author", ResourceDescriptor::new("Author"))
            .with_resource("Tag", ResourceDescriptor::new("Tag"));
        LinkFactory::new(Arc::new(catalog), Arc::new(source))
    }

    #[test]
    fn test_complete_single_identifier() {
        let link = factory().complete_link("Book", Link::new()).unwrap();
        assert_eq!(link.identifiers, vec!["id"]);
        assert!(!link.composite_identifier);
        assert_eq!(link.parameter_name.as_deref(), Some("id"));
        assert_eq!(link.from_class.as_deref(), Some("Book"));
    }

    #[test]
    fn test_complete_composite_identifier() {
        let link = factory().complete_link("Edition", Link::new()).unwrap();
        assert_eq!(link.identifiers, vec!["isbn", "year"]);
        assert!(link.composite_identifier);
        assert_eq!(link.parameter_name.as_deref(), Some("id"));

        let named = factory()
            .complete_link("Edition", Link::new().with_parameter_name("edition"))
            .unwrap();
        assert_eq!(named.parameter_name.as_deref(), Some("edition"));
    }

    #[test]
    fn test_complete_keeps_explicit_identifiers() {
        let link = factory()
            .complete_link("Tag", Link::new().with_identifiers(["label"]))
            .unwrap();
        assert_eq!(link.identifiers, vec!["label"]);
    }

    #[test]
    fn test_complete_without_identifiers_fails() {
        assert_eq!(
            factory().complete_link("Tag", Link::new()),
            Err(MetadataError::NoIdentifiers {
                class: "Tag".to_string()
            })
        );

        let err = factory()
            .complete_link(
                "Book",
                Link::new().with_from_class("Tag").with_parameter_name("tagId"),
            )
            .unwrap_err();
        assert!(matches!(err, MetadataError::UnresolvableLink { parameter, .. } if parameter == "tagId"));
    }

    #[test]
    fn test_complete_infers_relating_property() {
        let link = factory()
            .complete_link("Book", Link::new().with_from_class("Author"))
            .unwrap();
        assert_eq!(link.to_class.as_deref(), Some("Book"));
        assert_eq!(link.to_property.as_deref(), Some("author"));

        let link = factory()
            .complete_link("Author", Link::new().with_from_class("Book"))
            .unwrap();
        assert_eq!(link.from_property.as_deref(), Some("author"));
    }

    #[test]
    fn test_links_from_relations() {
        let links = factory().create_links_from_relations("Book");
        assert_eq!(links.len(), 2);

        assert_eq!(links[0].parameter_name.as_deref(), Some("authorId"));
        assert_eq!(links[0].to_class.as_deref(), Some("Author"));
        assert_eq!(links[0].identifiers, vec!["id"]);
        assert_eq!(links[1].to_class.as_deref(), Some("Tag"));
        assert!(links[1].identifiers.is_empty());

        let variable = LinkFactory::relation_as_uri_variable(&links[0]);
        assert_eq!(variable.from_class.as_deref(), Some("Author"));
        assert_eq!(variable.to_property.as_deref(), Some("author"));
    }

    #[test]
    fn test_links_from_identifiers() {
        let links = factory().create_links_from_identifiers("Book").unwrap();
        assert_eq!(links.len(), 1);
        assert!(links[0].identifies("Book"));

        let links = factory().create_links_from_identifiers("Edition").unwrap();
        assert_eq!(links.len(), 1);
        assert!(links[0].composite_identifier);
    }
}
