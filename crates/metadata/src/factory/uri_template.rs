use std::fmt;
use std::sync::Arc;

use crate::config::ResolverConfig;
use crate::error::{MetadataError, MetadataResult};
use crate::naming::{PathSegmentNaming, PathSegmentStyle, short_name_of};
use crate::types::{Operation, ResourceDescriptorCollection};
use crate::uri_template::{self, FORMAT_SUFFIX};

use super::{MetadataStage, ResourceSource};

/// Generates missing URI templates and validates declared ones.
///
/// A generated template is `/{segment}` for collection operations and
/// `/{segment}/{id}` for item operations, where the segment is the
/// pluralized short name. Variables identifying a parent resource come first
/// as `/{parent segment}/{variable}`, and `{._format}` is appended. Declared
/// templates keep their shape, except that the deprecated `.{_format}` suffix
/// is rewritten; every variable they use must be bound in `uriVariables`.
pub struct UriTemplateStage {
    source: Arc<dyn ResourceSource>,
    style: PathSegmentStyle,
    route_prefix: Option<String>,
}

impl UriTemplateStage {
    /// Creates the stage. `source` provides the short names of parent
    /// resources.
    pub fn new(source: Arc<dyn ResourceSource>, config: &ResolverConfig) -> Self {
        Self {
            source,
            style: config.path_segment_style,
            route_prefix: config.route_prefix.clone(),
        }
    }

    fn short_name(&self, class: &str) -> String {
        self.source
            .declared(class)
            .and_then(|resources| resources.into_iter().find_map(|r| r.short_name))
            .unwrap_or_else(|| short_name_of(class).to_string())
    }

    fn template_for(
        &self,
        class: &str,
        short_name: &str,
        naming: &dyn PathSegmentNaming,
        mut op: Operation,
    ) -> MetadataResult<Operation> {
        let variables = op.uri_variables.clone().unwrap_or_default();

        let template = match op.uri_template.take() {
            Some(declared) => {
                let template = uri_template::normalize_format_suffix(&declared);
                for variable in uri_template::path_variables(&template)? {
                    if !variables.contains_key(&variable) {
                        return Err(MetadataError::UnknownUriVariable { template, variable });
                    }
                }
                template
            }
            None => {
                let mut template = String::new();
                for (name, link) in variables.iter().filter(|(_, l)| !l.identifies(class)) {
                    let parent = link.from_class.as_deref().unwrap_or(class);
                    let segment = naming.segment_name(&self.short_name(parent), true);
                    template.push_str(&format!("/{}/{{{}}}", segment, name));
                }
                template.push('/');
                template.push_str(&naming.segment_name(short_name, true));
                for (name, _) in variables.iter().filter(|(_, l)| l.identifies(class)) {
                    template.push_str(&format!("/{{{}}}", name));
                }
                template.push_str(FORMAT_SUFFIX);
                template
            }
        };

        op.uri_template = Some(template);
        if op.route_prefix.is_none() {
            op.route_prefix.clone_from(&self.route_prefix);
        }
        Ok(op)
    }
}

impl MetadataStage for UriTemplateStage {
    fn name(&self) -> &'static str {
        "uri_template"
    }

    fn apply(
        &self,
        class: &str,
        collection: ResourceDescriptorCollection,
    ) -> MetadataResult<ResourceDescriptorCollection> {
        let naming = self.style.generator();

        collection.try_map(|mut resource| {
            let short_name = resource
                .short_name
                .clone()
                .unwrap_or_else(|| short_name_of(class).to_string());
            if let Some(operations) = resource.operations.take() {
                resource.operations = Some(
                    operations
                        .into_iter()
                        .map(|op| self.template_for(class, &short_name, naming.as_ref(), op))
                        .collect::<MetadataResult<Vec<_>>>()?,
                );
            }
            Ok(resource)
        })
    }
}

impl fmt::Debug for UriTemplateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UriTemplateStage")
            .field("style", &self.style)
            .field("route_prefix", &self.route_prefix)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::InMemoryResourceSource;
    use crate::types::{Link, ResourceDescriptor, UriVariables};

    fn stage(config: &ResolverConfig) -> UriTemplateStage {
        let source = InMemoryResourceSource::new()
            .with_resource("Company", ResourceDescriptor::new("Company").with_short_name("Company"));
        UriTemplateStage::new(Arc::new(source), config)
    }

    fn self_link() -> UriVariables {
        let mut vars = UriVariables::new();
        vars.insert(
            "id".to_string(),
            Link::new().with_from_class("Employee").with_identifiers(["id"]),
        );
        vars
    }

    fn template(op: Operation, config: &ResolverConfig) -> MetadataResult<Option<String>> {
        let collection = ResourceDescriptorCollection::new(
            "Employee",
            vec![ResourceDescriptor::new("Employee")
                .with_short_name("Employee")
                .with_operations(vec![op])],
        );
        let resolved = stage(config).apply("Employee", collection)?;
        Ok(resolved.resources[0].operations()[0].path())
    }

    #[test]
    fn test_generated_templates() {
        let config = ResolverConfig::default();
        assert_eq!(
            template(Operation::get_collection().with_uri_variables(UriVariables::new()), &config)
                .unwrap()
                .as_deref(),
            Some("/employees{._format}")
        );
        assert_eq!(
            template(Operation::get().with_uri_variables(self_link()), &config)
                .unwrap()
                .as_deref(),
            Some("/employees/{id}{._format}")
        );
    }

    #[test]
    fn test_parent_variables_prefix_template() {
        let mut vars = UriVariables::new();
        vars.insert(
            "companyId".to_string(),
            Link::new()
                .with_from_class("Company")
                .with_to_property("company")
                .with_identifiers(["id"]),
        );
        vars.extend(self_link());

        let config = ResolverConfig {
            route_prefix: Some("/api".to_string()),
            ..Default::default()
        };
        assert_eq!(
            template(Operation::get().with_uri_variables(vars), &config)
                .unwrap()
                .as_deref(),
            Some("/api/companies/{companyId}/employees/{id}{._format}")
        );
    }

    #[test]
    fn test_legacy_format_suffix_rewritten() {
        let op = Operation::get()
            .with_uri_template("/staff/{id}.{_format}")
            .with_uri_variables(self_link());
        assert_eq!(
            template(op, &ResolverConfig::default()).unwrap().as_deref(),
            Some("/staff/{id}{._format}")
        );
    }

    #[test]
    fn test_declared_template_errors() {
        let op = Operation::get()
            .with_uri_template("/staff/{slug}")
            .with_uri_variables(self_link());
        assert!(matches!(
            template(op, &ResolverConfig::default()),
            Err(MetadataError::UnknownUriVariable { variable, .. }) if variable == "slug"
        ));

        let op = Operation::get()
            .with_uri_template("/staff/{id")
            .with_uri_variables(self_link());
        assert!(matches!(
            template(op, &ResolverConfig::default()),
            Err(MetadataError::MalformedUriTemplate { .. })
        ));
    }
}
