use std::collections::HashSet;

use crate::error::{MetadataError, MetadataResult};
use crate::types::{Operation, ResourceDescriptorCollection, default_operation_name};

use super::MetadataStage;

/// Names every operation and rejects duplicate names within a resource.
///
/// Declared names are kept verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationNameStage;

impl MetadataStage for OperationNameStage {
    fn name(&self) -> &'static str {
        "operation_name"
    }

    fn apply(
        &self,
        class: &str,
        collection: ResourceDescriptorCollection,
    ) -> MetadataResult<ResourceDescriptorCollection> {
        collection.try_map(|mut resource| {
            let short_name = resource.short_name.clone().unwrap_or_default();
            if let Some(operations) = resource.operations.take() {
                resource.operations = Some(name_all(class, &short_name, operations)?);
            }
            if let Some(operations) = resource.graphql_operations.take() {
                resource.graphql_operations = Some(name_all(class, &short_name, operations)?);
            }
            Ok(resource)
        })
    }
}

fn name_all(
    class: &str,
    short_name: &str,
    operations: Vec<Operation>,
) -> MetadataResult<Vec<Operation>> {
    let mut seen = HashSet::new();
    operations
        .into_iter()
        .map(|mut op| {
            let name = op
                .name
                .take()
                .unwrap_or_else(|| default_operation_name(&op, short_name));
            if !seen.insert(name.clone()) {
                return Err(MetadataError::DuplicateOperationName {
                    class: class.to_string(),
                    name,
                });
            }
            op.name = Some(name);
            Ok(op)
        })
        .collect()
}
