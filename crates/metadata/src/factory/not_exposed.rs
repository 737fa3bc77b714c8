use tracing::debug;

use crate::error::MetadataResult;
use crate::types::{Operation, OperationKind, ResourceDescriptorCollection};

use super::{LinkFactory, MetadataStage};

/// Adds an internal item operation to resources without an item read.
///
/// The operation is never routed. It exists so that an IRI can still be built
/// for items of the resource, so it is only added when the class has
/// identifiers. It never reads state nor produces output.
#[derive(Debug, Clone)]
pub struct NotExposedStage {
    links: LinkFactory,
    enabled: bool,
}

impl NotExposedStage {
    /// Creates the stage.
    pub fn new(links: LinkFactory, enabled: bool) -> Self {
        Self { links, enabled }
    }
}

impl MetadataStage for NotExposedStage {
    fn name(&self) -> &'static str {
        "not_exposed"
    }

    fn apply(
        &self,
        class: &str,
        collection: ResourceDescriptorCollection,
    ) -> MetadataResult<ResourceDescriptorCollection> {
        if !self.enabled {
            return Ok(collection);
        }

        collection.try_map(|mut resource| {
            if resource.has_item_read() {
                return Ok(resource);
            }
            let identifiers = match self.links.create_links_from_identifiers(class) {
                Ok(links) if !links.is_empty() => links,
                _ => {
                    debug!(class = %class, "No identifiers, skipping not-exposed operation");
                    return Ok(resource);
                }
            };

            let mut operation = Operation::new(OperationKind::NotExposed).with_uri_variables(
                identifiers
                    .into_iter()
                    .filter_map(|link| Some((link.parameter_name.clone()?, link)))
                    .collect(),
            );
            operation.read = Some(false);
            operation.output = Some(false);

            resource
                .operations
                .get_or_insert_with(Vec::new)
                .push(operation);
            Ok(resource)
        })
    }
}
