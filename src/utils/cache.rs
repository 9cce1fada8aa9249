// src/utils/cache.rs
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Period;
use crate::error::Result;
use crate::processing::indices::SpectralIndex;
use crate::utils::raster::IndexImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub year: i32,
    pub index: SpectralIndex,
    pub period: Period,
}

/// Thread-safe cache of clipped index images.
///
/// The lock is not held while computing, so two callers racing on the same
/// key may both compute; the first stored image wins.
#[derive(Default)]
pub struct IndexCache {
    images: Mutex<HashMap<CacheKey, Arc<IndexImage>>>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<IndexImage>> {
        self.images.lock().get(key).cloned()
    }

    pub fn get_or_try_insert_with<F>(&self, key: CacheKey, compute: F) -> Result<Arc<IndexImage>>
    where
        F: FnOnce() -> Result<IndexImage>,
    {
        if let Some(image) = self.get(&key) {
            return Ok(image);
        }

        // Not in cache, compute and add it
        let image = Arc::new(compute()?);
        let mut images = self.images.lock();
        Ok(Arc::clone(images.entry(key).or_insert(image)))
    }

    pub fn clear(&self) {
        self.images.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.images.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.lock().is_empty()
    }
}
