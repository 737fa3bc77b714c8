//! Path segment naming.
//!
//! Default URI templates are built from the resource short name, pluralized
//! and converted to the configured case (`BookReview` becomes `book_reviews`
//! or `book-reviews`).

use heck::{ToKebabCase, ToSnakeCase};
use serde::{Deserialize, Serialize};

/// Turns a short name into a URI path segment.
pub trait PathSegmentNaming: Send + Sync {
    /// Segment for `short_name`, pluralized unless `collection` is false.
    fn segment_name(&self, short_name: &str, collection: bool) -> String;
}

/// `book_reviews`
#[derive(Debug, Clone, Copy, Default)]
pub struct UnderscorePathSegment;

impl PathSegmentNaming for UnderscorePathSegment {
    fn segment_name(&self, short_name: &str, collection: bool) -> String {
        let name = short_name.to_snake_case();
        if collection { pluralize(&name) } else { name }
    }
}

/// `book-reviews`
#[derive(Debug, Clone, Copy, Default)]
pub struct DashPathSegment;

impl PathSegmentNaming for DashPathSegment {
    fn segment_name(&self, short_name: &str, collection: bool) -> String {
        let name = short_name.to_kebab_case();
        if collection { pluralize(&name) } else { name }
    }
}

/// Configurable choice of segment naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathSegmentStyle {
    /// `book_reviews`
    #[default]
    Underscore,
    /// `book-reviews`
    Dash,
}

impl PathSegmentStyle {
    /// Builds the matching generator.
    pub fn generator(&self) -> Box<dyn PathSegmentNaming> {
        match self {
            PathSegmentStyle::Underscore => Box::new(UnderscorePathSegment),
            PathSegmentStyle::Dash => Box::new(DashPathSegment),
        }
    }
}

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("goose", "geese"),
];

/// Pluralizes the last word of an English identifier.
pub fn pluralize(word: &str) -> String {
    let split = word
        .rfind(['_', '-'])
        .map(|pos| pos + 1)
        .unwrap_or(0);
    let (head, last) = word.split_at(split);

    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == last) {
        return format!("{}{}", head, plural);
    }

    let lower = last.to_lowercase();
    if lower.ends_with('y')
        && !lower.ends_with("ay")
        && !lower.ends_with("ey")
        && !lower.ends_with("oy")
        && !lower.ends_with("uy")
    {
        return format!("{}{}ies", head, &last[..last.len() - 1]);
    }
    if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        return format!("{}es", word);
    }
    format!("{}s", word)
}

/// Short name of a class: the segment after the last namespace separator.
pub fn short_name_of(class: &str) -> &str {
    class
        .rsplit(['\\', '.', ':'])
        .find(|s| !s.is_empty())
        .unwrap_or(class)
}
