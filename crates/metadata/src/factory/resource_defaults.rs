use crate::config::ResolverConfig;
use crate::error::MetadataResult;
use crate::types::{
    Operation, OperationKind, Parameters, ResourceDescriptor, ResourceDescriptorCollection,
};

use super::MetadataStage;

/// Pushes resource-level defaults into the operations leaving them unset.
///
/// Resource parameters come first; an operation parameter with the same key
/// and location replaces the resource parameter entirely. Extra properties are
/// merged key by key, the operation winning. Collection reads also receive
/// the configured pagination defaults.
#[derive(Debug, Clone, Default)]
pub struct ResourceDefaultsStage {
    config: ResolverConfig,
}

impl ResourceDefaultsStage {
    /// Creates the stage.
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    fn inherit(&self, resource: &ResourceDescriptor, operation: Operation) -> Operation {
        let mut op = operation;

        fill(&mut op.class, &resource.class);
        fill(&mut op.short_name, &resource.short_name);
        fill(&mut op.description, &resource.description);
        fill(&mut op.route_prefix, &resource.route_prefix);
        fill(&mut op.formats, &resource.formats);
        fill(&mut op.input_formats, &resource.input_formats);
        fill(&mut op.output_formats, &resource.output_formats);
        fill(&mut op.filters, &resource.filters);
        fill(&mut op.security, &resource.security);
        fill(&mut op.security_message, &resource.security_message);
        fill(&mut op.provider, &resource.provider);
        fill(&mut op.processor, &resource.processor);
        fill(&mut op.pagination_enabled, &resource.pagination_enabled);
        fill(&mut op.pagination_items_per_page, &resource.pagination_items_per_page);
        fill(
            &mut op.pagination_maximum_items_per_page,
            &resource.pagination_maximum_items_per_page,
        );

        if let Some(resource_parameters) = &resource.parameters {
            let mut merged: Parameters = resource_parameters.clone();
            for parameter in op.parameters.take().into_iter().flatten() {
                merged.add(parameter);
            }
            op.parameters = Some(merged);
        }

        for (key, value) in &resource.extra_properties {
            op.extra_properties
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }

        if matches!(
            op.kind,
            OperationKind::GetCollection | OperationKind::GraphQlQueryCollection
        ) {
            op.pagination_enabled.get_or_insert(self.config.pagination_enabled);
            op.pagination_items_per_page
                .get_or_insert(self.config.pagination_items_per_page);
            if op.pagination_maximum_items_per_page.is_none() {
                op.pagination_maximum_items_per_page =
                    self.config.pagination_maximum_items_per_page;
            }
        }

        op
    }
}

fn fill<T: Clone>(target: &mut Option<T>, default: &Option<T>) {
    if target.is_none() {
        target.clone_from(default);
    }
}

impl MetadataStage for ResourceDefaultsStage {
    fn name(&self) -> &'static str {
        "resource_defaults"
    }

    fn apply(
        &self,
        _class: &str,
        collection: ResourceDescriptorCollection,
    ) -> MetadataResult<ResourceDescriptorCollection> {
        collection.try_map(|mut resource| {
            let operations = resource.operations.take().map(|ops| {
                ops.into_iter()
                    .map(|op| self.inherit(&resource, op))
                    .collect::<Vec<_>>()
            });
            let graphql_operations = resource.graphql_operations.take().map(|ops| {
                ops.into_iter()
                    .map(|op| self.inherit(&resource, op))
                    .collect::<Vec<_>>()
            });
            resource.operations = operations;
            resource.graphql_operations = graphql_operations;
            Ok(resource)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Parameter, ParameterLocation};
    use serde_json::json;

    fn resolve(resource: ResourceDescriptor) -> ResourceDescriptor {
        let collection = ResourceDescriptorCollection::new("Book", vec![resource]);
        ResourceDefaultsStage::default()
            .apply("Book", collection)
            .unwrap()
            .resources
            .remove(0)
    }

    #[test]
    fn test_unset_fields_inherited() {
        let resource = resolve(
            ResourceDescriptor::new("Book")
                .with_short_name("Book")
                .with_security("is_granted('ROLE_USER')")
                .with_operations(vec![
                    Operation::get(),
                    Operation::get_collection().with_security("true"),
                ]),
        );

        let ops = resource.operations();
        assert_eq!(ops[0].class.as_deref(), Some("Book"));
        assert_eq!(ops[0].security.as_deref(), Some("is_granted('ROLE_USER')"));
        assert_eq!(ops[1].security.as_deref(), Some("true"));
        assert_eq!(ops[1].pagination_items_per_page, Some(30));
        assert_eq!(ops[0].pagination_items_per_page, None);
    }

    #[test]
    fn test_parameters_replaced_by_identity() {
        let resource = resolve(
            ResourceDescriptor::new("Book")
                .with_parameters(
                    Parameters::new()
                        .with(Parameter::query("title").with_filter("search").with_required(true))
                        .with(Parameter::header("X-Tenant")),
                )
                .with_operations(vec![Operation::get_collection().with_parameters(
                    Parameters::new().with(Parameter::query("title").with_description("override")),
                )]),
        );

        let params = resource.operations()[0].parameters.as_ref().unwrap();
        assert_eq!(params.len(), 2);
        let title = params.get("title", ParameterLocation::Query).unwrap();
        assert_eq!(title.description.as_deref(), Some("override"));
        assert_eq!(title.filter, None);
        assert_eq!(title.required, None);
    }

    #[test]
    fn test_extra_properties_merged() {
        let mut descriptor = ResourceDescriptor::new("Book").with_operations(vec![
            Operation::get().with_extra_property("cache", json!(false)),
        ]);
        descriptor.extra_properties.insert("cache".into(), json!(true));
        descriptor.extra_properties.insert("vendor".into(), json!("x"));

        let resource = resolve(descriptor);
        let extra = &resource.operations()[0].extra_properties;
        assert_eq!(extra["cache"], json!(false));
        assert_eq!(extra["vendor"], json!("x"));
    }
}
