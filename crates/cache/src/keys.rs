//! 缓存键命名空间

/// 一类实体的缓存键与锁资源命名
///
/// `KeySpace::for_entity("shop")` 生成 `cache:shop:{id}` 缓存键和 `shop:{id}` 锁资源名，
/// 锁资源名再由 [`crate::CacheLock`] 加上 `lock:` 前缀
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    cache_prefix: String,
    lock_prefix: String,
}

impl KeySpace {
    pub fn new(cache_prefix: impl Into<String>, lock_prefix: impl Into<String>) -> Self {
        Self {
            cache_prefix: cache_prefix.into(),
            lock_prefix: lock_prefix.into(),
        }
    }

    pub fn for_entity(entity: &str) -> Self {
        Self::new(format!("cache:{}:", entity), format!("{}:", entity))
    }

    pub fn cache_key(&self, id: i64) -> String {
        format!("{}{}", self.cache_prefix, id)
    }

    pub fn lock_resource(&self, id: i64) -> String {
        format!("{}{}", self.lock_prefix, id)
    }
}
