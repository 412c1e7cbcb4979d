//! Per-type cache of declared handler methods.

use parking_lot::RwLock;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ConfigurationError;
use crate::handler::{HandlerMethod, HandlerTable, Subscriber};

type CachedMethods = Arc<dyn Any + Send + Sync>;

/// Memoized handler lists, keyed by consumer type
///
/// A type's declarations are read and validated at most once; every later
/// lookup for that type returns the same list. Entries are never evicted.
#[derive(Default)]
pub struct DiscoveryCache {
    entries: RwLock<HashMap<TypeId, CachedMethods>>,
}

impl DiscoveryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler methods declared by `C`.
    ///
    /// Fails with the first malformed declaration; nothing is cached for the
    /// type in that case, so the next call reports the same error.
    pub fn discover<C: Subscriber>(&self) -> Result<Arc<[HandlerMethod<C>]>, ConfigurationError> {
        let key = TypeId::of::<C>();
        if let Some(methods) = self.entries.read().get(&key).cloned() {
            return Ok(Self::downcast(methods));
        }

        let mut entries = self.entries.write();
        if let Some(methods) = entries.get(&key).cloned() {
            return Ok(Self::downcast(methods));
        }

        let mut table = HandlerTable::new();
        C::declare_handlers(&mut table);
        let methods: Arc<[HandlerMethod<C>]> = table.build()?.into();

        tracing::debug!(
            "Discovered {} handler(s) on {}",
            methods.len(),
            type_name::<C>()
        );
        entries.insert(key, Arc::new(Arc::clone(&methods)));
        Ok(methods)
    }

    /// Number of consumer types with a cached handler list
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no type has been discovered yet
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Whether `C` has a cached handler list
    pub fn contains<C: Subscriber>(&self) -> bool {
        self.entries.read().contains_key(&TypeId::of::<C>())
    }

    fn downcast<C: Subscriber>(entry: CachedMethods) -> Arc<[HandlerMethod<C>]> {
        // Entries are only ever inserted under their own TypeId.
        match entry.downcast::<Arc<[HandlerMethod<C>]>>() {
            Ok(methods) => Arc::clone(&*methods),
            Err(_) => unreachable!("discovery cache entry stored under a foreign TypeId"),
        }
    }
}

impl std::fmt::Debug for DiscoveryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryCache")
            .field("types", &self.len())
            .finish()
    }
}
