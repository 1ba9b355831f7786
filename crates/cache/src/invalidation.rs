//! 写路径缓存失效
//!
//! 先更新存储再删除缓存键，缓存从不由写路径写入，下一次读取负责重建

use std::sync::Arc;

use review_errors::{AppError, AppResult};
use review_ports::{CachePort, Identified, RecordStore};
use tracing::{debug, warn};

use crate::keys::KeySpace;

/// 更新并失效缓存
pub struct CacheInvalidatingWriter<T> {
    cache: Arc<dyn CachePort>,
    store: Arc<dyn RecordStore<T>>,
    keys: KeySpace,
}

impl<T> CacheInvalidatingWriter<T>
where
    T: Identified + Send + Sync + 'static,
{
    pub fn new(cache: Arc<dyn CachePort>, store: Arc<dyn RecordStore<T>>, keys: KeySpace) -> Self {
        Self { cache, store, keys }
    }

    /// 更新记录并删除对应缓存键
    ///
    /// 没有主键返回 Validation 错误；存储失败时不删除缓存；
    /// 没有行被更新时同样删除缓存键，并返回 NotFound
    pub async fn update(&self, record: &T) -> AppResult<()> {
        let Some(id) = record.id() else {
            return Err(AppError::validation("id must not be empty"));
        };

        let updated = self.store.update(record).await?;
        self.invalidate(id).await?;

        if !updated {
            warn!(id, "Update matched no rows");
            return Err(AppError::not_found(format!("record {} does not exist", id)));
        }
        Ok(())
    }

    /// 删除缓存键
    pub async fn invalidate(&self, id: i64) -> AppResult<()> {
        let key = self.keys.cache_key(id);
        self.cache.delete(&key).await?;
        debug!(key = %key, "Cache invalidated");
        Ok(())
    }
}
