//! URI template helpers.
//!
//! Templates follow RFC 6570 with the subset the router understands: simple
//! `{name}` path variables, and operator expressions (`{._format}`,
//! `{?page}`) that never bind to links.

use tracing::warn;

use crate::error::{MetadataError, MetadataResult};

/// Optional format extension appended to generated templates.
pub const FORMAT_SUFFIX: &str = "{._format}";

/// Deprecated spelling of [`FORMAT_SUFFIX`].
pub const LEGACY_FORMAT_SUFFIX: &str = ".{_format}";

const OPERATORS: [char; 6] = ['.', '?', '&', '#', ';', '/'];

/// Path variables of a template, in order of appearance.
///
/// Operator expressions and the `_format` variable are skipped. Unbalanced
/// braces, empty expressions and templates that do not start with `/` are
/// configuration errors.
pub fn path_variables(template: &str) -> MetadataResult<Vec<String>> {
    let malformed = |message: &str| MetadataError::MalformedUriTemplate {
        template: template.to_string(),
        message: message.to_string(),
    };

    if !template.starts_with('/') {
        return Err(malformed("template must start with '/'"));
    }

    let mut variables = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find(['{', '}']) {
        if rest.as_bytes()[open] == b'}' {
            return Err(malformed("unexpected '}'"));
        }
        let after = &rest[open + 1..];
        let close = after
            .find(['{', '}'])
            .filter(|&pos| after.as_bytes()[pos] == b'}')
            .ok_or_else(|| malformed("unclosed '{'"))?;
        let expression = &after[..close];
        if expression.is_empty() {
            return Err(malformed("empty expression"));
        }

        let expression = expression.strip_prefix('+').unwrap_or(expression);
        if !expression.starts_with(OPERATORS) && expression != "_format" {
            for name in expression.split(',') {
                let name = name.trim_end_matches('*');
                if !variables.iter().any(|v| v == name) {
                    variables.push(name.to_string());
                }
            }
        }
        rest = &after[close + 1..];
    }

    Ok(variables)
}

/// Rewrites the legacy `.{_format}` suffix to `{._format}`.
///
/// The legacy form is still accepted but logs a deprecation warning.
pub fn normalize_format_suffix(template: &str) -> String {
    match template.strip_suffix(LEGACY_FORMAT_SUFFIX) {
        Some(stripped) => {
            warn!(
                template = %template,
                "URI template uses the deprecated '.{{_format}}' suffix, use '{{._format}}' instead"
            );
            format!("{}{}", stripped, FORMAT_SUFFIX)
        }
        None => template.to_string(),
    }
}

/// Expands the path variables of a template with concrete values.
///
/// Operator expressions are dropped. Returns `None` when a variable has no
/// value.
pub fn expand<'a, F>(template: &str, mut lookup: F) -> Option<String>
where
    F: FnMut(&str) -> Option<&'a str>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}')?;
        let expression = &after[..close];
        if !expression.starts_with(OPERATORS) && expression != "_format" {
            out.push_str(lookup(expression.trim_start_matches('+'))?);
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Some(out)
}

/// Matches a concrete path against a template, returning the variable values.
///
/// Only simple variables are matched; a trailing format extension on the path
/// is tolerated when the template ends with [`FORMAT_SUFFIX`].
pub fn match_path(template: &str, path: &str) -> Option<Vec<(String, String)>> {
    let template = template.strip_suffix(FORMAT_SUFFIX).unwrap_or(template);
    let template_segments: Vec<&str> = template.trim_matches('/').split('/').collect();
    let path_segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    if template_segments.len() != path_segments.len() {
        return None;
    }

    let mut values = Vec::new();
    let last = template_segments.len() - 1;
    for (index, (expected, actual)) in template_segments.iter().zip(&path_segments).enumerate() {
        match expected.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => {
                let actual = if index == last {
                    actual.split_once('.').map(|(v, _)| v).unwrap_or(actual)
                } else {
                    actual
                };
                if actual.is_empty() {
                    return None;
                }
                values.push((name.to_string(), actual.to_string()));
            }
            None if expected == actual => {}
            None => return None,
        }
    }
    Some(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_variables() {
        assert_eq!(
            path_variables("/companies/{companyId}/employees/{id}{._format}").unwrap(),
            vec!["companyId", "id"]
        );
        assert!(path_variables("/books{?page}").unwrap().is_empty());
        assert_eq!(path_variables("/books/{id}.{_format}").unwrap(), vec!["id"]);
    }

    #[test]
    fn test_malformed_templates() {
        assert!(matches!(
            path_variables("books/{id}"),
            Err(MetadataError::MalformedUriTemplate { .. })
        ));
        assert!(path_variables("/books/{id").is_err());
        assert!(path_variables("/books/id}").is_err());
        assert!(path_variables("/books/{}").is_err());
        assert!(path_variables("/books/{a{b}}").is_err());
    }

    #[test]
    fn test_normalize_legacy_suffix() {
        assert_eq!(normalize_format_suffix("/books/{id}.{_format}"), "/books/{id}{._format}");
        assert_eq!(normalize_format_suffix("/books/{id}"), "/books/{id}");
    }

    #[test]
    fn test_expand() {
        let expanded = expand("/books/{id}{._format}", |name| (name == "id").then_some("12"));
        assert_eq!(expanded.as_deref(), Some("/books/12"));
        assert_eq!(expand("/books/{id}", |_| None), None);
    }

    #[test]
    fn test_match_path() {
        let values = match_path("/authors/{authorId}/books/{id}{._format}", "/authors/3/books/7.json");
        assert_eq!(
            values,
            Some(vec![
                ("authorId".to_string(), "3".to_string()),
                ("id".to_string(), "7".to_string())
            ])
        );
        assert_eq!(match_path("/books/{id}{._format}", "/authors/7"), None);
    }
}
