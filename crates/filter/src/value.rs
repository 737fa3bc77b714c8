//! Query string values.
//!
//! Keys follow the bracket convention used by most API clients:
//! `author[]=a&author[]=b` is a list, `order[title]=asc` and
//! `date[after]=2024-01-01` are maps. A repeated plain key keeps the last
//! value.

use indexmap::IndexMap;
use serde::Serialize;

/// One decoded query parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// `key=value`
    Single(String),
    /// `key[]=a&key[]=b`
    List(Vec<String>),
    /// `key[sub]=value`
    Map(IndexMap<String, FilterValue>),
}

impl FilterValue {
    /// The value when it is a single string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FilterValue::Single(value) => Some(value),
            _ => None,
        }
    }

    /// The entries when the value is a map.
    pub fn as_map(&self) -> Option<&IndexMap<String, FilterValue>> {
        match self {
            FilterValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Entry `key` of a map value.
    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Scalar values: one for `Single`, every item for `List`, none for `Map`.
    pub fn values(&self) -> Vec<&str> {
        match self {
            FilterValue::Single(value) => vec![value.as_str()],
            FilterValue::List(values) => values.iter().map(String::as_str).collect(),
            FilterValue::Map(_) => Vec::new(),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Single(value.to_string())
    }
}

/// Decoded query string of one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QueryParameters {
    params: IndexMap<String, FilterValue>,
}

impl QueryParameters {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a query string, with or without its leading `?`.
    ///
    /// ```
    /// use meridian_filter::{FilterValue, QueryParameters};
    ///
    /// let params = QueryParameters::parse("?author[]=a&author[]=b&order[title]=desc");
    /// assert_eq!(params.get("author").unwrap().values(), vec!["a", "b"]);
    /// assert_eq!(params.lookup("order[title]"), Some(&FilterValue::from("desc")));
    /// ```
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut parsed = Self::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            parsed.insert(&key, value.into_owned());
        }
        parsed
    }

    /// Adds one `key=value` pair, honoring brackets in `key`.
    pub fn insert(&mut self, key: &str, value: String) {
        let (base, path) = split_key(key);
        if base.is_empty() {
            return;
        }
        insert_at(&mut self.params, base, &path, value);
    }

    /// Top-level value for `key`.
    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.params.get(key)
    }

    /// Value at a bracketed key such as `order[title]`.
    pub fn lookup(&self, key: &str) -> Option<&FilterValue> {
        let (base, path) = split_key(key);
        let mut current = self.params.get(base)?;
        for segment in path {
            if segment.is_empty() {
                return Some(current);
            }
            current = current.get(segment)?;
        }
        Some(current)
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns true without parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Top-level entries in query order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, FilterValue> {
        self.params.iter()
    }

    /// Where `key` first appears in the query: the index of its top-level
    /// key, then the index of its first sub-key within that map.
    ///
    /// `order[author]=asc&order[title]=desc` puts `order[author]` at
    /// `(0, 0)` and `order[title]` at `(0, 1)`.
    pub fn position(&self, key: &str) -> Option<(usize, usize)> {
        let (base, path) = split_key(key);
        let (index, _, value) = self.params.get_full(base)?;
        let sub = match (path.first(), value.as_map()) {
            (Some(segment), Some(map)) if !segment.is_empty() => map.get_index_of(*segment)?,
            _ => 0,
        };
        Some((index, sub))
    }
}

/// Splits `a[b][]` into `a` and `["b", ""]`. Keys with unbalanced brackets
/// are taken literally.
fn split_key(key: &str) -> (&str, Vec<&str>) {
    let Some(open) = key.find('[') else {
        return (key, Vec::new());
    };

    let mut path = Vec::new();
    let mut rest = &key[open..];
    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else {
            return (key, Vec::new());
        };
        path.push(&inner[..close]);
        rest = &inner[close + 1..];
    }
    if !rest.is_empty() {
        return (key, Vec::new());
    }
    (&key[..open], path)
}

fn insert_at(map: &mut IndexMap<String, FilterValue>, key: &str, path: &[&str], value: String) {
    match path.split_first() {
        None => {
            map.insert(key.to_string(), FilterValue::Single(value));
        }
        Some((&"", _)) => match map.get_mut(key) {
            Some(FilterValue::List(values)) => values.push(value),
            _ => {
                map.insert(key.to_string(), FilterValue::List(vec![value]));
            }
        },
        Some((segment, rest)) => {
            let entry = map
                .entry(key.to_string())
                .or_insert_with(|| FilterValue::Map(IndexMap::new()));
            if !matches!(entry, FilterValue::Map(_)) {
                *entry = FilterValue::Map(IndexMap::new());
            }
            if let FilterValue::Map(inner) = entry {
                insert_at(inner, segment, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_keys_keep_last_value() {
        let params = QueryParameters::parse("title=a&title=b&author=J%20R");
        assert_eq!(params.get("title"), Some(&FilterValue::from("b")));
        assert_eq!(params.get("author").and_then(FilterValue::as_str), Some("J R"));
    }

    #[test]
    fn test_bracket_lists_and_maps() {
        let params =
            QueryParameters::parse("id[]=1&id[]=2&date[after]=2024-01-01&exists[author.name]=true");

        assert_eq!(params.get("id").unwrap().values(), vec!["1", "2"]);
        assert_eq!(
            params.lookup("date[after]").and_then(FilterValue::as_str),
            Some("2024-01-01")
        );
        assert_eq!(
            params.lookup("exists[author.name]").and_then(FilterValue::as_str),
            Some("true")
        );
        assert!(params.get("date").unwrap().values().is_empty());
    }

    #[test]
    fn test_nested_maps() {
        let params = QueryParameters::parse("price[between]=1..5&filter[author][name]=x");
        assert_eq!(
            params.lookup("filter[author][name]").and_then(FilterValue::as_str),
            Some("x")
        );
        assert!(params.lookup("filter[missing]").is_none());
    }

    #[test]
    fn test_position_follows_query_order() {
        let params = QueryParameters::parse("page=2&order[author]=asc&order[title]=desc&title[]=x");
        assert_eq!(params.position("order[title]"), Some((1, 1)));
        assert_eq!(params.position("order[author]"), Some((1, 0)));
        assert_eq!(params.position("title[]"), Some((2, 0)));
        assert_eq!(params.position("title"), Some((2, 0)));
        assert_eq!(params.position("order[pages]"), None);
        assert_eq!(params.position("author"), None);
    }

    #[test]
    fn test_malformed_keys_taken_literally() {
        let params = QueryParameters::parse("a[b=1&[c]=2");
        assert_eq!(params.get("a[b"), Some(&FilterValue::from("1")));
        assert_eq!(params.len(), 1);
    }
}
