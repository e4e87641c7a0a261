use crate::error::{AnalysisError, Result};
use once_cell::sync::OnceCell;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

type Slot = Arc<OnceCell<Box<dyn Any + Send + Sync>>>;

// The map lock is only held to fetch a slot. Loading happens inside the slot's
// OnceCell, so one loader runs per key and other keys stay available meanwhile.
// A failed loader leaves the slot empty and the next caller retries.
type CacheStorage = HashMap<(TypeId, String), Slot>;

pub struct ModelCache {
    cache: Mutex<CacheStorage>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn storage(&self) -> MutexGuard<'_, CacheStorage> {
        // A panic while holding the map lock cannot leave the map inconsistent.
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn slot<M: 'static>(&self, key: &str) -> Slot {
        let cache_key = (TypeId::of::<M>(), key.to_string());
        self.storage().entry(cache_key).or_default().clone()
    }

    pub fn get_or_create<M, F>(&self, key: &str, loader: F) -> Result<M>
    where
        M: Clone + Send + Sync + 'static,
        F: FnOnce() -> Result<M>,
    {
        let slot = self.slot::<M>(key);
        let boxed = slot.get_or_try_init(|| {
            loader().map(|model| Box::new(model) as Box<dyn Any + Send + Sync>)
        })?;

        boxed.downcast_ref::<M>().cloned().ok_or_else(|| {
            AnalysisError::Inference(format!("Cached model '{key}' has an unexpected type"))
        })
    }

    /// Whether a loaded model is cached under `key`.
    pub fn contains<M: 'static>(&self, key: &str) -> bool {
        let cache_key = (TypeId::of::<M>(), key.to_string());
        self.storage()
            .get(&cache_key)
            .is_some_and(|slot| slot.get().is_some())
    }

    pub fn clear(&self) {
        self.storage().clear();
    }

    /// Number of loaded models.
    pub fn len(&self) -> usize {
        self.storage()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new()
    }
}
