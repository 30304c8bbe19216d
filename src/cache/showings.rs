use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::CacheService;
use crate::error::StoreError;
use crate::models::{Showing, ShowingId};
use crate::store::ShowingStore;

/// Read-through кеш поверх любого [`ShowingStore`].
///
/// Ошибки Redis не ломают запрос: логируем и идём в базу.
pub struct CachedShowingStore {
    inner: Arc<dyn ShowingStore>,
    cache: CacheService,
}

impl CachedShowingStore {
    pub fn new(inner: Arc<dyn ShowingStore>, cache: CacheService) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl ShowingStore for CachedShowingStore {
    async fn get(&self, id: ShowingId) -> Result<Option<Showing>, StoreError> {
        match self.cache.get_showing(id).await {
            Ok(Some(showing)) => return Ok(Some(showing)),
            Ok(None) => {}
            // Битая запись в кеше: удаляем, чтобы не спотыкаться о неё до истечения TTL
            Err(e @ StoreError::Serialization(_)) => {
                warn!("showing cache entry for {} is corrupt: {}", id, e);
                self.cache.invalidate_showing(id).await;
            }
            Err(e) => warn!("showing cache read failed for {}: {}", id, e),
        }

        let showing = self.inner.get(id).await?;
        if let Some(ref s) = showing {
            if let Err(e) = self.cache.save_showing(s).await {
                warn!("showing cache write failed for {}: {}", id, e);
            }
        }
        Ok(showing)
    }

    async fn find_by_name(
        &self,
        movie_name: &str,
        theatre_name: &str,
    ) -> Result<Option<Showing>, StoreError> {
        self.inner.find_by_name(movie_name, theatre_name).await
    }

    async fn list(&self) -> Result<Vec<Showing>, StoreError> {
        self.inner.list().await
    }

    async fn search(&self, movie_name: &str) -> Result<Vec<Showing>, StoreError> {
        self.inner.search(movie_name).await
    }

    async fn insert(&self, showing: &Showing) -> Result<(), StoreError> {
        self.inner.insert(showing).await
    }

    async fn delete(&self, id: ShowingId) -> Result<bool, StoreError> {
        let deleted = self.inner.delete(id).await?;
        self.cache.invalidate_showing(id).await;
        Ok(deleted)
    }
}
