use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::MetadataResult;
use crate::filter::{FilterDescription, FilterLocator};
use crate::introspection::PropertyIntrospector;
use crate::types::{Operation, Parameter, Parameters, ResourceDescriptorCollection};

use super::MetadataStage;

/// Materializes the parameters of every operation from its filters.
///
/// Each declared filter contributes one parameter per entry of its
/// description. Declared parameters are merged over the filter-derived ones
/// with the same key and location, keeping the fields they leave unset. A
/// declared key containing `:property` is expanded once per property its
/// filter describes. Filters that are not registered are skipped.
pub struct ParametersStage {
    filters: Arc<dyn FilterLocator>,
    introspector: Arc<dyn PropertyIntrospector>,
}

impl ParametersStage {
    /// Creates the stage.
    pub fn new(
        filters: Arc<dyn FilterLocator>,
        introspector: Arc<dyn PropertyIntrospector>,
    ) -> Self {
        Self {
            filters,
            introspector,
        }
    }

    fn describe(&self, class: &str, filter: &str) -> Option<IndexMap<String, FilterDescription>> {
        match self.filters.get(filter) {
            Some(descriptor) => Some(descriptor.description(class, self.introspector.as_ref())),
            None => {
                debug!(class = %class, filter = %filter, "Filter not registered, skipping");
                None
            }
        }
    }

    fn bind(&self, class: &str, mut op: Operation) -> Operation {
        let mut parameters = Parameters::new();

        for filter in op.filters.iter().flatten() {
            let Some(description) = self.describe(class, filter) else {
                continue;
            };
            for (key, entry) in description {
                parameters.add(from_description(key, filter, &entry));
            }
        }

        for declared in op.parameters.take().into_iter().flatten() {
            let description = match declared.filter.as_deref() {
                Some(filter) => match self.describe(class, filter) {
                    Some(description) => description,
                    None => continue,
                },
                None => IndexMap::new(),
            };

            if declared.is_pattern() {
                let mut properties: Vec<&str> = Vec::new();
                for entry in description.values() {
                    if !properties.contains(&entry.property.as_str()) {
                        properties.push(&entry.property);
                    }
                }
                for property in properties {
                    let mut expanded = declared.clone();
                    expanded.key = declared.expand_key(property);
                    expanded.property = Some(property.to_string());
                    merge(&mut parameters, expanded);
                }
                continue;
            }

            let filter = declared.filter.clone();
            let declared = match (filter.as_deref(), description.get(&declared.key)) {
                (Some(filter), Some(entry)) => {
                    declared.merged_over(&from_description(String::new(), filter, entry))
                }
                _ => declared,
            };
            merge(&mut parameters, declared);
        }

        op.parameters = Some(parameters);
        op
    }
}

fn from_description(key: String, filter: &str, entry: &FilterDescription) -> Parameter {
    let mut parameter = Parameter::query(key)
        .with_property(entry.property.clone())
        .with_filter(filter)
        .with_schema(entry.resolved_schema())
        .with_required(entry.required);
    parameter.description.clone_from(&entry.description);
    parameter
}

fn merge(parameters: &mut Parameters, parameter: Parameter) {
    let merged = match parameters.get(&parameter.key, parameter.location) {
        Some(existing) => parameter.merged_over(existing),
        None => parameter,
    };
    parameters.add(merged);
}

impl MetadataStage for ParametersStage {
    fn name(&self) -> &'static str {
        "parameters"
    }

    fn apply(
        &self,
        class: &str,
        collection: ResourceDescriptorCollection,
    ) -> MetadataResult<ResourceDescriptorCollection> {
        collection.try_map(|mut resource| {
            resource.operations = resource
                .operations
                .take()
                .map(|ops| ops.into_iter().map(|op| self.bind(class, op)).collect());
            resource.graphql_operations = resource
                .graphql_operations
                .take()
                .map(|ops| ops.into_iter().map(|op| self.bind(class, op)).collect());
            Ok(resource)
        })
    }
}

impl fmt::Debug for ParametersStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParametersStage").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterDescriptor;
    use crate::introspection::{ClassCatalog, ClassDefinition, PropertyMetadata, PropertyType};
    use crate::types::{ParameterLocation, ResourceDescriptor};
    use serde_json::json;

    struct OrderFilter;

    impl FilterDescriptor for OrderFilter {
        fn description(
            &self,
            resource_class: &str,
            introspector: &dyn PropertyIntrospector,
        ) -> IndexMap<String, FilterDescription> {
            introspector
                .list_properties(resource_class)
                .into_iter()
                .filter(|p| p != "id")
                .map(|p| (format!("order[{}]", p), FilterDescription::new(p, "string")))
                .collect()
        }
    }

    struct Locator(OrderFilter);

    impl FilterLocator for Locator {
        fn has(&self, name: &str) -> bool {
            name == "order"
        }

        fn get(&self, name: &str) -> Option<&dyn crate::filter::FilterDescriptor> {
            (name == "order").then_some(&self.0 as &dyn crate::filter::FilterDescriptor)
        }
    }

    fn stage() -> ParametersStage {
        let catalog = ClassCatalog::new().with_class(
            "Book",
            ClassDefinition::new()
                .property("id", PropertyMetadata::identifier(PropertyType::Int))
                .property("title", PropertyMetadata::of(PropertyType::String))
                .property("author", PropertyMetadata::of(PropertyType::String)),
        );
        ParametersStage::new(Arc::new(Locator(OrderFilter)), Arc::new(catalog))
    }

    fn bind(op: Operation) -> Parameters {
        let collection = ResourceDescriptorCollection::new(
            "Book",
            vec![ResourceDescriptor::new("Book").with_operations(vec![op])],
        );
        let mut resolved = stage().apply("Book", collection).unwrap();
        resolved.resources.remove(0).operations.unwrap().remove(0).parameters.unwrap()
    }

    #[test]
    fn test_one_parameter_per_description_entry() {
        let params = bind(Operation::get_collection().with_filters(["order", "missing"]));
        let keys: Vec<&str> = params.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["order[title]", "order[author]"]);

        let title = params.get("order[title]", ParameterLocation::Query).unwrap();
        assert_eq!(title.filter.as_deref(), Some("order"));
        assert_eq!(title.schema, Some(json!({"type": "string"})));
    }

    #[test]
    fn test_declared_override_is_shallow_merged() {
        let params = bind(
            Operation::get_collection()
                .with_filters(["order"])
                .with_parameters(Parameters::new().with(
                    Parameter::query("order[title]").with_description("Sort by title"),
                )),
        );

        let title = params.get("order[title]", ParameterLocation::Query).unwrap();
        assert_eq!(title.description.as_deref(), Some("Sort by title"));
        assert_eq!(title.filter.as_deref(), Some("order"));
        assert_eq!(title.property.as_deref(), Some("title"));
    }

    #[test]
    fn test_property_pattern_expanded() {
        let params = bind(Operation::get_collection().with_parameters(
            Parameters::new().with(Parameter::query("sort[:property]").with_filter("order")),
        ));

        let keys: Vec<&str> = params.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["sort[title]", "sort[author]"]);
        assert_eq!(params.iter().next().unwrap().property.as_deref(), Some("title"));
    }

    #[test]
    fn test_unregistered_filter_parameter_skipped() {
        let params = bind(Operation::get_collection().with_parameters(
            Parameters::new()
                .with(Parameter::query("q").with_filter("missing"))
                .with(Parameter::header("X-Trace")),
        ));
        assert_eq!(params.len(), 1);
        assert!(params.get("X-Trace", ParameterLocation::Header).is_some());
    }
}
