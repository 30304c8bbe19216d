//! Кеш каталога сеансов в Redis.
//!
//! Кешируются только записи сеансов: вместимость неизменна, поэтому запись
//! можно держать до удаления сеанса. Занятые места и доступность в кеш не
//! попадают никогда, они всегда вычисляются из реестра мест.

use redis::AsyncCommands;
use tracing::info;

use crate::error::StoreError;
use crate::models::{Showing, ShowingId};
use crate::redis_client::RedisClient;

pub mod showings;

pub use showings::CachedShowingStore;

#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    showing_ttl_seconds: u64,
}

fn showing_key(id: ShowingId) -> String {
    format!("showing:{}", id)
}

fn decode_showing(json: &str) -> Result<Showing, StoreError> {
    Ok(serde_json::from_str(json)?)
}

impl CacheService {
    pub fn new(redis: RedisClient, showing_ttl_seconds: u64) -> Self {
        Self {
            redis,
            showing_ttl_seconds,
        }
    }

    pub async fn get_showing(&self, id: ShowingId) -> Result<Option<Showing>, StoreError> {
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = conn.get(showing_key(id)).await?;
        match data {
            Some(json) => decode_showing(&json).map(Some),
            None => Ok(None),
        }
    }

    pub async fn save_showing(&self, showing: &Showing) -> Result<(), StoreError> {
        let data = serde_json::to_string(showing)?;
        let mut conn = self.redis.conn.clone();
        let _: () = conn
            .set_ex(showing_key(showing.id), data, self.showing_ttl_seconds)
            .await?;
        Ok(())
    }

    pub async fn invalidate_showing(&self, id: ShowingId) {
        let mut conn = self.redis.conn.clone();
        let _: Result<(), _> = conn.del(showing_key(id)).await;
        info!("Invalidated cache for showing {}", id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewShowing;

    #[test]
    fn cached_showing_decodes() {
        let showing = NewShowing {
            movie_name: "Dune".into(),
            theatre_name: "Odeon".into(),
            capacity: 5,
        }
        .into_showing();
        let json = serde_json::to_string(&showing).unwrap();
        assert_eq!(decode_showing(&json).unwrap(), showing);
    }

    #[test]
    fn corrupt_entry_is_a_serialization_error() {
        let err = decode_showing("{\"id\": 42}").unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
