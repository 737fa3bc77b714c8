use crate::error::MetadataResult;
use crate::naming::short_name_of;
use crate::types::ResourceDescriptorCollection;

use super::MetadataStage;

/// Fills the class and default short name of every descriptor.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributesStage;

impl MetadataStage for AttributesStage {
    fn name(&self) -> &'static str {
        "attributes"
    }

    fn apply(
        &self,
        class: &str,
        collection: ResourceDescriptorCollection,
    ) -> MetadataResult<ResourceDescriptorCollection> {
        collection.try_map(|mut resource| {
            resource.class.get_or_insert_with(|| class.to_string());
            resource
                .short_name
                .get_or_insert_with(|| short_name_of(class).to_string());
            Ok(resource)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceDescriptor;

    #[test]
    fn test_short_name_defaults_to_class_basename() {
        let collection = ResourceDescriptorCollection::new(
            "App\\Entity\\Book",
            vec![
                ResourceDescriptor::default(),
                ResourceDescriptor::default().with_short_name("Novel"),
            ],
        );

        let resolved = AttributesStage.apply("App\\Entity\\Book", collection).unwrap();
        assert_eq!(resolved.resources[0].short_name.as_deref(), Some("Book"));
        assert_eq!(resolved.resources[0].class.as_deref(), Some("App\\Entity\\Book"));
        assert_eq!(resolved.resources[1].short_name.as_deref(), Some("Novel"));
    }
}
