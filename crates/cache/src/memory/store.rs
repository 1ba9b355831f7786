//! 进程内 RecordStore 实现

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use review_common::Pagination;
use review_errors::{AppError, AppResult};
use review_ports::{Identified, RecordStore};

type FieldMatcher<T> = Arc<dyn Fn(&T, &str, &str) -> AppResult<bool> + Send + Sync>;

/// 进程内记录存储
///
/// `list_by_ids` 按主键顺序返回，不按输入顺序
pub struct InMemoryRecordStore<T> {
    records: RwLock<BTreeMap<i64, T>>,
    next_id: AtomicI64,
    latency: Duration,
    unavailable: AtomicBool,
    field_matcher: Option<FieldMatcher<T>>,
    get_calls: AtomicU64,
    list_calls: AtomicU64,
    update_calls: AtomicU64,
}

impl<T> Default for InMemoryRecordStore<T> {
    fn default() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
            latency: Duration::ZERO,
            unavailable: AtomicBool::new(false),
            field_matcher: None,
            get_calls: AtomicU64::new(0),
            list_calls: AtomicU64::new(0),
            update_calls: AtomicU64::new(0),
        }
    }
}

impl<T: Identified + Clone> InMemoryRecordStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次读写前等待的时长，用于模拟慢查询
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// 定义 `query_by_field` 支持的字段，未知字段应返回 Validation 错误
    pub fn with_field_matcher(
        mut self,
        matcher: impl Fn(&T, &str, &str) -> AppResult<bool> + Send + Sync + 'static,
    ) -> Self {
        self.field_matcher = Some(Arc::new(matcher));
        self
    }

    /// 直接写入记录（不计数、不延迟），没有主键时分配一个
    pub fn insert(&self, mut record: T) -> T {
        let id = match record.id() {
            Some(id) => {
                self.next_id.fetch_max(id + 1, Ordering::SeqCst);
                id
            }
            None => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                record.set_id(id);
                id
            }
        };
        self.records.write().insert(id, record.clone());
        record
    }

    /// 直接读取记录（不计数、不延迟）
    pub fn peek(&self, id: i64) -> Option<T> {
        self.records.read().get(&id).cloned()
    }

    /// 切换为不可用状态，后续调用返回 Database 错误
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn get_calls(&self) -> u64 {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> u64 {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> u64 {
        self.update_calls.load(Ordering::SeqCst)
    }

    async fn enter(&self, counter: Option<&AtomicU64>) -> AppResult<()> {
        if let Some(counter) = counter {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::database("record store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl<T> RecordStore<T> for InMemoryRecordStore<T>
where
    T: Identified + Clone + Send + Sync + 'static,
{
    async fn get_by_id(&self, id: i64) -> AppResult<Option<T>> {
        self.enter(Some(&self.get_calls)).await?;
        Ok(self.peek(id))
    }

    async fn save(&self, record: &T) -> AppResult<T> {
        self.enter(None).await?;
        Ok(self.insert(record.clone()))
    }

    async fn update(&self, record: &T) -> AppResult<bool> {
        self.enter(Some(&self.update_calls)).await?;
        let Some(id) = record.id() else {
            return Ok(false);
        };
        let mut records = self.records.write();
        match records.get_mut(&id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_by_ids(&self, ids: &[i64]) -> AppResult<Vec<T>> {
        self.enter(Some(&self.list_calls)).await?;
        let records = self.records.read();
        Ok(records
            .iter()
            .filter(|(id, _)| ids.contains(id))
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn query_by_field(
        &self,
        field: &str,
        value: &str,
        pagination: &Pagination,
    ) -> AppResult<Vec<T>> {
        self.enter(None).await?;
        let Some(matcher) = &self.field_matcher else {
            return Err(AppError::validation(format!(
                "Unsupported query field: {}",
                field
            )));
        };

        let records: Vec<T> = self.records.read().values().cloned().collect();
        let mut matched = Vec::new();
        for record in records {
            if matcher(&record, field, value)? {
                matched.push(record);
            }
        }

        Ok(matched
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.page_size as usize)
            .collect())
    }
}
