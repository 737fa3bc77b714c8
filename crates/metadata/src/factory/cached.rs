use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::MetadataResult;
use crate::types::ResourceDescriptorCollection;

use super::ResourceMetadataFactory;

/// Memoizes resolved metadata per class.
///
/// Resolution is idempotent, so a cached collection is always equal to a
/// fresh one. Collections are shared as `Arc`s and never mutated; errors are
/// not cached.
#[derive(Debug)]
pub struct CachedResolver<F> {
    inner: F,
    cache: RwLock<HashMap<String, Arc<ResourceDescriptorCollection>>>,
}

impl<F: ResourceMetadataFactory> CachedResolver<F> {
    /// Wraps `inner`.
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolves `class`, reusing a previous result.
    pub fn resolve_shared(&self, class: &str) -> MetadataResult<Arc<ResourceDescriptorCollection>> {
        if let Some(hit) = self.cache.read().get(class) {
            return Ok(Arc::clone(hit));
        }

        let resolved = Arc::new(self.inner.resolve(class)?);
        debug!(class = %class, "Caching resolved metadata");
        let mut cache = self.cache.write();
        Ok(Arc::clone(
            cache.entry(class.to_string()).or_insert(resolved),
        ))
    }

    /// Number of cached classes.
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    /// Returns true when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    /// Drops every cached collection.
    pub fn clear(&self) {
        self.cache.write().clear();
    }

    /// The wrapped factory.
    pub fn inner(&self) -> &F {
        &self.inner
    }
}

impl<F: ResourceMetadataFactory> ResourceMetadataFactory for CachedResolver<F> {
    fn resolve(&self, class: &str) -> MetadataResult<ResourceDescriptorCollection> {
        self.resolve_shared(class).map(|shared| (*shared).clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::MetadataError;
    use crate::types::ResourceDescriptor;

    #[derive(Default)]
    struct Counting(AtomicUsize);

    impl ResourceMetadataFactory for Counting {
        fn resolve(&self, class: &str) -> MetadataResult<ResourceDescriptorCollection> {
            self.0.fetch_add(1, Ordering::SeqCst);
            if class == "Missing" {
                return Err(MetadataError::NotAResource {
                    class: class.to_string(),
                });
            }
            Ok(ResourceDescriptorCollection::new(class, vec![ResourceDescriptor::new(class)]))
        }
    }

    #[test]
    fn test_resolves_once() {
        let cached = CachedResolver::new(Counting::default());
        let first = cached.resolve_shared("Book").unwrap();
        let second = cached.resolve_shared("Book").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cached.inner().0.load(Ordering::SeqCst), 1);
        assert_eq!(cached.len(), 1);
    }

    #[test]
    fn test_errors_not_cached() {
        let cached = CachedResolver::new(Counting::default());
        assert!(cached.resolve("Missing").is_err());
        assert!(cached.resolve("Missing").is_err());
        assert_eq!(cached.inner().0.load(Ordering::SeqCst), 2);
        assert!(cached.is_empty());

        cached.resolve("Book").unwrap();
        cached.clear();
        assert!(cached.is_empty());
    }
}
