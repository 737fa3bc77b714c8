//! Metadata resolver chain.
//!
//! A resource class is resolved by reading its declared descriptors from a
//! [`ResourceSource`] and passing them through an ordered list of
//! [`MetadataStage`]s. Each stage consumes the previous stage's collection and
//! returns a new one; no stage looks at the output of a later stage.
//!
//! The standard chain runs, in order:
//!
//! | stage | effect |
//! |-------|--------|
//! | [`AttributesStage`] | class and default short name |
//! | [`DefaultOperationsStage`] | CRUD (and GraphQL) operations when none are declared |
//! | [`NotExposedStage`] | internal item operation when no item read exists |
//! | [`ResourceDefaultsStage`] | resource-level defaults pushed into operations |
//! | [`OperationNameStage`] | unique operation names |
//! | [`UriVariablesStage`] | completed links for path variables, relation links |
//! | [`UriTemplateStage`] | generated and validated URI templates |
//! | [`FormatsStage`] | content negotiation defaults |
//! | [`ParametersStage`] | parameters materialized from filters |

mod attributes;
mod cached;
mod formats;
mod links;
mod not_exposed;
mod operation_name;
mod operations;
mod parameters;
mod resource_defaults;
mod source;
mod uri_template;
mod uri_variables;

pub use attributes::AttributesStage;
pub use cached::CachedResolver;
pub use formats::FormatsStage;
pub use links::LinkFactory;
pub use not_exposed::NotExposedStage;
pub use operation_name::OperationNameStage;
pub use operations::DefaultOperationsStage;
pub use parameters::ParametersStage;
pub use resource_defaults::ResourceDefaultsStage;
pub use source::{InMemoryResourceSource, ResourceSource};
pub use uri_template::UriTemplateStage;
pub use uri_variables::UriVariablesStage;

use std::sync::Arc;

use tracing::debug;

use crate::config::ResolverConfig;
use crate::error::{MetadataError, MetadataResult};
use crate::filter::FilterLocator;
use crate::introspection::{PropertyIntrospector, ResourceClassifier};
use crate::types::ResourceDescriptorCollection;

/// Resolves a resource class into its complete metadata.
pub trait ResourceMetadataFactory: Send + Sync {
    /// Resolves `class`.
    ///
    /// Deterministic: resolving the same class twice from the same declared
    /// input yields equal collections.
    fn resolve(&self, class: &str) -> MetadataResult<ResourceDescriptorCollection>;
}

/// One transformation step of the resolver chain.
pub trait MetadataStage: Send + Sync {
    /// Stage name used in logs.
    fn name(&self) -> &'static str;

    /// Returns the enriched collection.
    fn apply(
        &self,
        class: &str,
        collection: ResourceDescriptorCollection,
    ) -> MetadataResult<ResourceDescriptorCollection>;
}

/// Ordered pipeline of stages over a resource source.
pub struct ResolverChain {
    source: Arc<dyn ResourceSource>,
    stages: Vec<Box<dyn MetadataStage>>,
}

impl ResolverChain {
    /// Creates a chain with no stages: resolution returns declared input.
    pub fn new(source: Arc<dyn ResourceSource>) -> Self {
        Self {
            source,
            stages: Vec::new(),
        }
    }

    /// Returns a copy with `stage` appended.
    pub fn with_stage<S: MetadataStage + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// The standard chain.
    ///
    /// `source` also decides which referenced classes are resources when
    /// relation links are inferred.
    pub fn standard<S>(
        source: Arc<S>,
        introspector: Arc<dyn PropertyIntrospector>,
        filters: Arc<dyn FilterLocator>,
        config: ResolverConfig,
    ) -> Self
    where
        S: ResourceSource + ResourceClassifier + 'static,
    {
        let classifier: Arc<dyn ResourceClassifier> = source.clone();
        let resources: Arc<dyn ResourceSource> = source;
        let link_factory = LinkFactory::new(introspector.clone(), classifier);

        Self::new(resources.clone())
            .with_stage(AttributesStage)
            .with_stage(DefaultOperationsStage::new(config.graphql_enabled))
            .with_stage(NotExposedStage::new(
                link_factory.clone(),
                config.not_exposed_enabled,
            ))
            .with_stage(ResourceDefaultsStage::new(config.clone()))
            .with_stage(OperationNameStage)
            .with_stage(UriVariablesStage::new(link_factory))
            .with_stage(UriTemplateStage::new(resources, &config))
            .with_stage(FormatsStage::new(&config))
            .with_stage(ParametersStage::new(filters, introspector))
    }

    /// Names of the stages, in order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Every class the source declares.
    pub fn resource_classes(&self) -> Vec<String> {
        self.source.resource_classes()
    }

    /// Resolves every declared class, in declaration order.
    pub fn resolve_all(&self) -> MetadataResult<Vec<ResourceDescriptorCollection>> {
        self.resource_classes()
            .iter()
            .map(|class| self.resolve(class))
            .collect()
    }
}

impl ResourceMetadataFactory for ResolverChain {
    fn resolve(&self, class: &str) -> MetadataResult<ResourceDescriptorCollection> {
        let declared = self
            .source
            .declared(class)
            .ok_or_else(|| MetadataError::NotAResource {
                class: class.to_string(),
            })?;

        let mut collection = ResourceDescriptorCollection::new(class, declared);
        for stage in &self.stages {
            debug!(class = %class, stage = stage.name(), "Applying metadata stage");
            collection = stage.apply(class, collection)?;
        }
        Ok(collection)
    }
}

impl std::fmt::Debug for ResolverChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverChain")
            .field("stages", &self.stage_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceDescriptor;

    struct Rename(&'static str);

    impl MetadataStage for Rename {
        fn name(&self) -> &'static str {
            "rename"
        }

        fn apply(
            &self,
            _class: &str,
            collection: ResourceDescriptorCollection,
        ) -> MetadataResult<ResourceDescriptorCollection> {
            collection.try_map(|r| Ok(r.with_short_name(self.0)))
        }
    }

    #[test]
    fn test_unknown_class_is_not_a_resource() {
        let chain = ResolverChain::new(Arc::new(InMemoryResourceSource::new()));
        assert_eq!(
            chain.resolve("Book"),
            Err(MetadataError::NotAResource {
                class: "Book".to_string()
            })
        );
    }

    #[test]
    fn test_stages_run_in_order() {
        let source = InMemoryResourceSource::new().with_resource("Book", ResourceDescriptor::new("Book"));
        let chain = ResolverChain::new(Arc::new(source))
            .with_stage(Rename("First"))
            .with_stage(Rename("Second"));

        let resolved = chain.resolve("Book").unwrap();
        assert_eq!(resolved.resources[0].short_name.as_deref(), Some("Second"));
        assert_eq!(chain.stage_names(), vec!["rename", "rename"]);
    }
}
