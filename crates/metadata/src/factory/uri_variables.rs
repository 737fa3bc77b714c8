use tracing::debug;

use crate::error::{MetadataError, MetadataResult};
use crate::types::{Link, Operation, ResourceDescriptorCollection, UriVariables};
use crate::uri_template;

use super::{LinkFactory, MetadataStage};

/// Binds the path variables of every HTTP operation to completed links.
///
/// * Declared `uriVariables` are completed in place.
/// * Without declared variables, the variables of a declared template are
///   matched against the class identifiers, then against the relation links
///   of the class (`{authorId}` binds the `author` relation).
/// * Without a template, item operations are identified by the class
///   identifiers and collection operations have no variables.
///
/// The relation links of the class are stored on the descriptor.
#[derive(Debug, Clone)]
pub struct UriVariablesStage {
    links: LinkFactory,
}

impl UriVariablesStage {
    /// Creates the stage.
    pub fn new(links: LinkFactory) -> Self {
        Self { links }
    }

    fn uri_variables(
        &self,
        class: &str,
        op: &Operation,
        relations: &[Link],
    ) -> MetadataResult<UriVariables> {
        if let Some(declared) = &op.uri_variables {
            return declared
                .iter()
                .map(|(name, link)| {
                    let mut link = link.clone();
                    link.parameter_name.get_or_insert_with(|| name.clone());
                    Ok((name.clone(), self.links.complete_link(class, link)?))
                })
                .collect();
        }

        if let Some(template) = &op.uri_template {
            return uri_template::path_variables(template)?
                .into_iter()
                .map(|variable| {
                    let link = self.bind_variable(class, template, &variable, relations)?;
                    Ok((variable, link))
                })
                .collect();
        }

        if op.kind.is_collection() {
            return Ok(UriVariables::new());
        }

        Ok(self
            .links
            .create_links_from_identifiers(class)?
            .into_iter()
            .filter_map(|link| Some((link.parameter_name.clone()?, link)))
            .collect())
    }

    fn bind_variable(
        &self,
        class: &str,
        template: &str,
        variable: &str,
        relations: &[Link],
    ) -> MetadataResult<Link> {
        let identifiers = self.links.identifiers_of(class).unwrap_or_default();

        if identifiers.iter().any(|identifier| identifier == variable) {
            return self.links.complete_link(
                class,
                Link::new()
                    .with_identifiers([variable])
                    .with_parameter_name(variable),
            );
        }
        if variable == "id" && !identifiers.is_empty() {
            return self
                .links
                .complete_link(class, Link::new().with_parameter_name(variable));
        }

        let relation = relations
            .iter()
            .find(|link| link.parameter_name.as_deref() == Some(variable))
            .ok_or_else(|| MetadataError::UnknownUriVariable {
                template: template.to_string(),
                variable: variable.to_string(),
            })?;
        if !relation.is_complete() {
            return Err(MetadataError::UnresolvableLink {
                class: class.to_string(),
                parameter: variable.to_string(),
                message: format!(
                    "class '{}' has no identifiers",
                    relation.to_class.as_deref().unwrap_or_default()
                ),
            });
        }
        debug!(class = %class, variable = %variable, "URI variable bound to relation");
        Ok(LinkFactory::relation_as_uri_variable(relation))
    }
}

impl MetadataStage for UriVariablesStage {
    fn name(&self) -> &'static str {
        "uri_variables"
    }

    fn apply(
        &self,
        class: &str,
        collection: ResourceDescriptorCollection,
    ) -> MetadataResult<ResourceDescriptorCollection> {
        let relations = self.links.create_links_from_relations(class);

        collection.try_map(|mut resource| {
            if let Some(operations) = resource.operations.take() {
                resource.operations = Some(
                    operations
                        .into_iter()
                        .map(|mut op| {
                            op.uri_variables = Some(self.uri_variables(class, &op, &relations)?);
                            Ok(op)
                        })
                        .collect::<MetadataResult<Vec<_>>>()?,
                );
            }
            resource.links = relations.clone();
            Ok(resource)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::factory::InMemoryResourceSource;
    use crate::introspection::{ClassCatalog, ClassDefinition, PropertyMetadata, PropertyType};
    use crate::types::{OperationKind, ResourceDescriptor};
    use pretty_assertions::assert_eq;

    fn stage() -> UriVariablesStage {
        let catalog = ClassCatalog::new()
            .with_class(
                "Book",
                ClassDefinition::new()
                    .property("id", PropertyMetadata::identifier(PropertyType::Int))
                    .property("author", PropertyMetadata::of(PropertyType::object("Author"))),
            )
            .with_class(
                "Author",
                ClassDefinition::new().property("id", PropertyMetadata::identifier(PropertyType::Int)),
            );
        let source = InMemoryResourceSource::new()
            .with_resource("Book", ResourceDescriptor::new("Book"))
            .with_resource("Author", ResourceDescriptor::new("Author"));
        UriVariablesStage::new(LinkFactory::new(Arc::new(catalog), Arc::new(source)))
    }

    fn resolve(operations: Vec<Operation>) -> MetadataResult<ResourceDescriptor> {
        let collection = ResourceDescriptorCollection::new(
            "Book",
            vec![ResourceDescriptor::new("Book").with_operations(operations)],
        );
        Ok(stage().apply("Book", collection)?.resources.remove(0))
    }

    #[test]
    fn test_item_and_collection_defaults() {
        let resource = resolve(vec![Operation::get(), Operation::get_collection()]).unwrap();
        let ops = resource.operations();

        let item = ops[0].uri_variables.as_ref().unwrap();
        assert_eq!(item.keys().collect::<Vec<_>>(), vec!["id"]);
        assert_eq!(item["id"].identifiers, vec!["id"]);
        assert!(ops[1].uri_variables.as_ref().unwrap().is_empty());
        assert_eq!(resource.links.len(), 1);
    }

    #[test]
    fn test_template_variable_bound_to_relation() {
        let resource = resolve(vec![
            Operation::get_collection().with_uri_template("/authors/{authorId}/books"),
        ])
        .unwrap();

        let link = &resource.operations()[0].uri_variables.as_ref().unwrap()["authorId"];
        assert_eq!(link.from_class.as_deref(), Some("Author"));
        assert_eq!(link.to_property.as_deref(), Some("author"));
        assert_eq!(link.identifiers, vec!["id"]);
    }

    #[test]
    fn test_unknown_template_variable() {
        let err = resolve(vec![Operation::get().with_uri_template("/books/{slug}")]).unwrap_err();
        assert_eq!(
            err,
            MetadataError::UnknownUriVariable {
                template: "/books/{slug}".to_string(),
                variable: "slug".to_string(),
            }
        );
    }

    #[test]
    fn test_declared_variables_completed() {
        let mut variables = UriVariables::new();
        variables.insert("authorId".to_string(), Link::new().with_from_class("Author"));
        variables.insert("id".to_string(), Link::new());

        let resource = resolve(vec![
            Operation::new(OperationKind::Get)
                .with_uri_template("/authors/{authorId}/books/{id}")
                .with_uri_variables(variables),
        ])
        .unwrap();

        let vars = resource.operations()[0].uri_variables.as_ref().unwrap();
        assert_eq!(vars["authorId"].to_property.as_deref(), Some("author"));
        assert_eq!(vars["authorId"].parameter_name.as_deref(), Some("authorId"));
        assert!(vars["id"].identifies("Book"));
    }
}
