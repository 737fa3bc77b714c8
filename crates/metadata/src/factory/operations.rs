use crate::error::MetadataResult;
use crate::types::{Operation, OperationKind, ResourceDescriptorCollection};

use super::MetadataStage;

/// Synthesizes the standard operations of resources that declare none.
///
/// A descriptor with `operations` unset receives the six HTTP CRUD
/// operations. With GraphQL enabled, a descriptor with `graphql_operations`
/// unset receives the five GraphQL queries and mutations. An explicitly empty
/// list is kept as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultOperationsStage {
    graphql: bool,
}

impl DefaultOperationsStage {
    /// Creates the stage; `graphql` enables GraphQL synthesis.
    pub fn new(graphql: bool) -> Self {
        Self { graphql }
    }
}

impl MetadataStage for DefaultOperationsStage {
    fn name(&self) -> &'static str {
        "default_operations"
    }

    fn apply(
        &self,
        _class: &str,
        collection: ResourceDescriptorCollection,
    ) -> MetadataResult<ResourceDescriptorCollection> {
        collection.try_map(|mut resource| {
            if resource.operations.is_none() {
                resource.operations = Some(synthesize(&OperationKind::HTTP_DEFAULTS));
            }
            if self.graphql && resource.graphql_operations.is_none() {
                resource.graphql_operations = Some(synthesize(&OperationKind::GRAPHQL_DEFAULTS));
            }
            Ok(resource)
        })
    }
}

fn synthesize(kinds: &[OperationKind]) -> Vec<Operation> {
    kinds.iter().copied().map(Operation::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceDescriptor;

    fn kinds(operations: &[Operation]) -> Vec<OperationKind> {
        operations.iter().map(|op| op.kind).collect()
    }

    #[test]
    fn test_crud_synthesized_when_undeclared() {
        let collection = ResourceDescriptorCollection::new("Book", vec![ResourceDescriptor::new("Book")]);
        let resolved = DefaultOperationsStage::new(false).apply("Book", collection).unwrap();

        assert_eq!(kinds(resolved.resources[0].operations()), OperationKind::HTTP_DEFAULTS);
        assert!(resolved.resources[0].graphql_operations.is_none());
    }

    #[test]
    fn test_declared_operations_untouched() {
        let collection = ResourceDescriptorCollection::new(
            "Book",
            vec![
                ResourceDescriptor::new("Book").with_operations(vec![Operation::get()]),
                ResourceDescriptor::new("Book").with_operations(vec![]),
            ],
        );
        let resolved = DefaultOperationsStage::new(true).apply("Book", collection).unwrap();

        assert_eq!(kinds(resolved.resources[0].operations()), vec![OperationKind::Get]);
        assert!(resolved.resources[1].operations().is_empty());
        assert_eq!(
            kinds(resolved.resources[0].graphql_operations()),
            OperationKind::GRAPHQL_DEFAULTS
        );
    }
}
