use crate::config::ResolverConfig;
use crate::error::MetadataResult;
use crate::types::{Formats, Operation, OperationKind, ResourceDescriptorCollection};

use super::MetadataStage;

/// Applies content negotiation defaults.
///
/// `formats` falls back to the configured formats. Operations receiving a
/// body get input formats (`patch` defaults to the patch formats); others get
/// none. Every operation but `not_exposed` gets output formats.
#[derive(Debug, Clone)]
pub struct FormatsStage {
    formats: Formats,
    patch_formats: Formats,
}

impl FormatsStage {
    /// Creates the stage.
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            formats: config.formats.clone(),
            patch_formats: config.patch_formats.clone(),
        }
    }

    fn negotiate(&self, mut op: Operation) -> Operation {
        let formats = op.formats.take().unwrap_or_else(|| self.formats.clone());

        op.input_formats = match op.kind {
            OperationKind::Patch => op
                .input_formats
                .take()
                .or_else(|| Some(self.patch_formats.clone())),
            OperationKind::Post
            | OperationKind::Put
            | OperationKind::GraphQlCreate
            | OperationKind::GraphQlUpdate => {
                op.input_formats.take().or_else(|| Some(formats.clone()))
            }
            _ => None,
        };
        op.output_formats = match op.kind {
            OperationKind::NotExposed => None,
            _ => op.output_formats.take().or_else(|| Some(formats.clone())),
        };
        op.formats = Some(formats);
        op
    }
}

impl MetadataStage for FormatsStage {
    fn name(&self) -> &'static str {
        "formats"
    }

    fn apply(
        &self,
        _class: &str,
        collection: ResourceDescriptorCollection,
    ) -> MetadataResult<ResourceDescriptorCollection> {
        collection.try_map(|mut resource| {
            resource.operations = resource
                .operations
                .take()
                .map(|ops| ops.into_iter().map(|op| self.negotiate(op)).collect());
            resource.graphql_operations = resource
                .graphql_operations
                .take()
                .map(|ops| ops.into_iter().map(|op| self.negotiate(op)).collect());
            Ok(resource)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceDescriptor;

    fn negotiate(op: Operation) -> Operation {
        FormatsStage::new(&ResolverConfig::default()).negotiate(op)
    }

    #[test]
    fn test_read_operations_have_no_input() {
        let op = negotiate(Operation::get());
        assert!(op.input_formats.is_none());
        assert_eq!(op.output_formats.unwrap()["jsonld"], vec!["application/ld+json"]);
    }

    #[test]
    fn test_patch_uses_patch_formats() {
        let op = negotiate(Operation::new(OperationKind::Patch));
        assert_eq!(
            op.input_formats.unwrap()["json"],
            vec!["application/merge-patch+json"]
        );
        assert!(op.output_formats.unwrap().contains_key("jsonld"));
    }

    #[test]
    fn test_declared_formats_kept() {
        let mut csv = Formats::new();
        csv.insert("csv".to_string(), vec!["text/csv".to_string()]);

        let collection = ResourceDescriptorCollection::new(
            "Book",
            vec![ResourceDescriptor::new("Book").with_operations(vec![
                Operation::new(OperationKind::Post).with_formats(csv),
                Operation::new(OperationKind::NotExposed),
            ])],
        );
        let resolved = FormatsStage::new(&ResolverConfig::default())
            .apply("Book", collection)
            .unwrap();
        let ops = resolved.resources[0].operations();

        assert!(ops[0].input_formats.as_ref().unwrap().contains_key("csv"));
        assert!(ops[1].output_formats.is_none());
        assert!(ops[1].input_formats.is_none());
    }
}
