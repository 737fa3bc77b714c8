use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use meridian_metadata::filter::{FilterDescription, FilterDescriptor};
use meridian_metadata::introspection::{PropertyIntrospector, PropertyMetadata, PropertyType};

use crate::error::{FilterError, FilterResult};
use crate::iri::IriResolver;
use crate::property::{describe_path, identifier_column, relation_target};
use crate::sql::{JoinKind, JoinType, Operand, Predicate, SqlParam, foreign_key_column};
use crate::value::FilterValue;

use super::{FilterContext, FilterStrategy, non_empty_values, parse_bool};

/// How a searched value is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Equality, or membership for several values.
    Exact,
    /// Contains the value.
    Partial,
    /// Starts with the value.
    Start,
    /// Ends with the value.
    End,
    /// A word starts with the value.
    WordStart,
}

impl MatchKind {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "exact" => Some(MatchKind::Exact),
            "partial" => Some(MatchKind::Partial),
            "start" => Some(MatchKind::Start),
            "end" => Some(MatchKind::End),
            "word_start" => Some(MatchKind::WordStart),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            MatchKind::Exact => "exact",
            MatchKind::Partial => "partial",
            MatchKind::Start => "start",
            MatchKind::End => "end",
            MatchKind::WordStart => "word_start",
        }
    }
}

/// A match kind and its case sensitivity.
///
/// Written as the kind name, prefixed with `i` when case-insensitive:
/// `exact`, `ipartial`, `iword_start`...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchStrategy {
    /// How values match.
    pub kind: MatchKind,
    /// Whether both sides are lower-cased.
    pub case_insensitive: bool,
}

impl MatchStrategy {
    /// Case-sensitive `kind`.
    pub const fn new(kind: MatchKind) -> Self {
        Self {
            kind,
            case_insensitive: false,
        }
    }

    /// Case-insensitive `kind`.
    pub const fn insensitive(kind: MatchKind) -> Self {
        Self {
            kind,
            case_insensitive: true,
        }
    }

    /// Parses a strategy name.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        if let Some(kind) = MatchKind::parse(&name) {
            return Some(Self::new(kind));
        }
        MatchKind::parse(name.strip_prefix('i')?).map(Self::insensitive)
    }

    /// Strategy name.
    pub fn name(&self) -> String {
        if self.case_insensitive {
            format!("i{}", self.kind.name())
        } else {
            self.kind.name().to_string()
        }
    }

    fn wrap(&self, operand: Operand) -> Operand {
        if self.case_insensitive {
            operand.lower()
        } else {
            operand
        }
    }

    /// Matches `field` against every bound value.
    pub fn predicate(&self, field: Operand, values: Vec<Operand>) -> Predicate {
        let field = self.wrap(field);
        let like = |pattern: Vec<Operand>| {
            Predicate::like(field.clone(), self.wrap(Operand::concat(pattern)))
        };
        match self.kind {
            MatchKind::Exact => Predicate::eq_any(
                field.clone(),
                values.into_iter().map(|v| self.wrap(v)).collect(),
            ),
            MatchKind::Partial => Predicate::or(
                values
                    .into_iter()
                    .map(|v| like(vec![Operand::literal("%"), v, Operand::literal("%")]))
                    .collect(),
            ),
            MatchKind::Start => Predicate::or(
                values
                    .into_iter()
                    .map(|v| like(vec![v, Operand::literal("%")]))
                    .collect(),
            ),
            MatchKind::End => Predicate::or(
                values
                    .into_iter()
                    .map(|v| like(vec![Operand::literal("%"), v]))
                    .collect(),
            ),
            MatchKind::WordStart => Predicate::or(
                values
                    .into_iter()
                    .flat_map(|v| {
                        [
                            like(vec![v.clone(), Operand::literal("%")]),
                            like(vec![Operand::literal("% "), v, Operand::literal("%")]),
                        ]
                    })
                    .collect(),
            ),
        }
    }
}

impl Default for MatchStrategy {
    fn default() -> Self {
        Self::new(MatchKind::Exact)
    }
}

/// Text search with per-property strategies.
///
/// Relation properties accept identifiers or IRIs; IRIs are dereferenced
/// through the configured [`IriResolver`] and always matched exactly. With
/// no configured property, every property is searchable with `exact`.
#[derive(Clone, Default)]
pub struct SearchFilter {
    properties: IndexMap<String, MatchStrategy>,
    iri_resolver: Option<Arc<dyn IriResolver>>,
}

impl SearchFilter {
    /// Creates a filter from property names and strategy names (`exact`
    /// when `None`).
    pub fn new(properties: IndexMap<String, Option<String>>) -> FilterResult<Self> {
        let mut filter = Self::default();
        for (property, strategy) in properties {
            let strategy = match strategy {
                None => MatchStrategy::default(),
                Some(name) => MatchStrategy::parse(&name).ok_or_else(|| {
                    FilterError::UnknownStrategy {
                        property: property.clone(),
                        strategy: name.clone(),
                    }
                })?,
            };
            filter.properties.insert(property, strategy);
        }
        Ok(filter)
    }

    /// Returns a copy searching `property` with `strategy`.
    pub fn with_property(mut self, property: impl Into<String>, strategy: MatchStrategy) -> Self {
        self.properties.insert(property.into(), strategy);
        self
    }

    /// Returns a copy dereferencing IRIs with `resolver`.
    pub fn with_iri_resolver(mut self, resolver: Arc<dyn IriResolver>) -> Self {
        self.iri_resolver = Some(resolver);
        self
    }

    fn strategy_for(&self, property: &str) -> Option<MatchStrategy> {
        if self.properties.is_empty() {
            return Some(MatchStrategy::default());
        }
        self.properties.get(property).copied()
    }

    /// Identifier value designated by `value` on `target`.
    fn identifier_from(&self, value: &str, target: &str) -> Option<String> {
        if !value.starts_with('/') && !value.contains("://") {
            return Some(value.to_string());
        }
        let resolved = self.iri_resolver.as_ref()?.dereference(value)?;
        if resolved.class != target || resolved.identifiers.len() != 1 {
            return None;
        }
        resolved.identifiers.into_values().next()
    }

    fn apply_scalar(
        &self,
        context: &mut FilterContext<'_>,
        property: &str,
        strategy: MatchStrategy,
        values: &[&str],
        leaf: &PropertyMetadata,
    ) {
        let mut params = Vec::new();
        for value in values {
            match coerce(leaf.primary_type(), strategy, value) {
                Some(param) => params.push(param),
                None => context.notice(property, format!("invalid value '{}'", value)),
            }
        }
        if params.is_empty() {
            return;
        }

        let Some(resolved) = context.resolve(property, JoinType::Inner) else {
            return;
        };
        let bound = params
            .into_iter()
            .map(|param| context.surface.bind(property, param))
            .collect();
        context
            .surface
            .add_predicate(strategy.predicate(resolved.operand(), bound));
    }

    fn apply_relation(
        &self,
        context: &mut FilterContext<'_>,
        property: &str,
        target: &str,
        values: &[&str],
    ) {
        let key = identifier_column(context.introspector, target);
        let key_type = context
            .introspector
            .describe_property(target, &key)
            .and_then(|meta| meta.primary_type().cloned());

        let mut params = Vec::new();
        for value in values {
            let param = self
                .identifier_from(value, target)
                .and_then(|id| coerce(key_type.as_ref(), MatchStrategy::default(), &id));
            match param {
                Some(param) => params.push(param),
                None => context.notice(
                    property,
                    format!("cannot resolve '{}' to an identifier of {}", value, target),
                ),
            }
        }
        if params.is_empty() {
            return;
        }

        let Some(resolved) = context.resolve(property, JoinType::Inner) else {
            return;
        };
        let Some(join) = resolved.relation_join(context.introspector, JoinType::Inner) else {
            return;
        };
        let operand = match join.kind {
            JoinKind::ForeignKey => {
                Operand::column(&resolved.alias, foreign_key_column(&resolved.field))
            }
            _ => {
                let target_key = join.target_key.clone();
                let alias = context.surface.ensure_join(join);
                Operand::column(alias, target_key)
            }
        };
        let bound = params
            .into_iter()
            .map(|param| context.surface.bind(property, param))
            .collect();
        context.surface.add_predicate(Predicate::eq_any(operand, bound));
    }
}

/// Binds exact matches with the column type; pattern matches are text.
fn coerce(property_type: Option<&PropertyType>, strategy: MatchStrategy, value: &str) -> Option<SqlParam> {
    if strategy.kind != MatchKind::Exact {
        return Some(SqlParam::String(value.to_string()));
    }
    match property_type {
        Some(PropertyType::Int) => value.parse().ok().map(SqlParam::Integer),
        Some(PropertyType::Float) => value.parse().ok().map(SqlParam::Float),
        Some(PropertyType::Bool) => parse_bool(value).map(SqlParam::Bool),
        _ => Some(SqlParam::String(value.to_string())),
    }
}

impl FilterDescriptor for SearchFilter {
    fn description(
        &self,
        resource_class: &str,
        introspector: &dyn PropertyIntrospector,
    ) -> IndexMap<String, FilterDescription> {
        let entries: Vec<(String, MatchStrategy)> = if self.properties.is_empty() {
            introspector
                .list_properties(resource_class)
                .into_iter()
                .map(|p| (p, MatchStrategy::default()))
                .collect()
        } else {
            self.properties
                .iter()
                .map(|(p, s)| (p.clone(), *s))
                .collect()
        };

        let mut description = IndexMap::new();
        for (property, strategy) in entries {
            let Some(leaf) = describe_path(introspector, resource_class, &property)
                .and_then(|mut segments| segments.pop())
            else {
                continue;
            };
            let value_type = if relation_target(&leaf.metadata).is_some() {
                "string"
            } else {
                leaf.metadata
                    .primary_type()
                    .map(PropertyType::schema_type)
                    .unwrap_or("string")
            };
            description.insert(
                property.clone(),
                FilterDescription::new(&property, value_type).with_strategy(strategy.name()),
            );
            description.insert(
                format!("{}[]", property),
                FilterDescription::new(&property, value_type)
                    .with_strategy(strategy.name())
                    .with_collection(true),
            );
        }
        description
    }
}

impl FilterStrategy for SearchFilter {
    fn apply(&self, context: &mut FilterContext<'_>, property: &str, value: &FilterValue) {
        let Some(strategy) = self.strategy_for(property) else {
            return;
        };
        if value.as_map().is_some() {
            context.notice(
                property,
                "expected one value, or several as `property[]=first&property[]=second`",
            );
            return;
        }
        let values = non_empty_values(value);
        if values.is_empty() {
            return;
        }
        let Some(leaf) = context.describe(property) else {
            context.notice(property, "property is not mapped");
            return;
        };

        match relation_target(&leaf) {
            Some(target) => self.apply_relation(context, property, &target, &values),
            None => self.apply_scalar(context, property, strategy, &values, &leaf),
        }
    }
}

impl fmt::Debug for SearchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchFilter")
            .field("properties", &self.properties)
            .field("iri_resolver", &self.iri_resolver.is_some())
            .finish()
    }
}
