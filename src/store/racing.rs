use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use crate::store::{CappedInsert, KeyValueStore, MemoryStore, Precondition, RangeOrder, StoreError};

/// `MemoryStore`, в работу которого вмешивается "другой клиент":
/// может проигрывать каждый compare-and-swap и переписывать ключ прямо
/// перед условной вставкой в хеш.
#[derive(Default)]
pub struct RacingStore {
    pub inner: MemoryStore,
    lose_every_cas: AtomicBool,
    cas_calls: AtomicU32,
    before_capped_insert: Mutex<Option<(String, String)>>,
}

impl RacingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Каждый compare-and-swap отвечает "значение уже поменяли".
    pub fn lose_every_cas(&self) {
        self.lose_every_cas.store(true, Ordering::SeqCst);
    }

    pub fn cas_calls(&self) -> u32 {
        self.cas_calls.load(Ordering::SeqCst)
    }

    /// Один раз записать `key = value` перед следующей `hash_insert_capped`.
    pub fn overwrite_before_next_insert(&self, key: &str, value: &str) {
        *self.before_capped_insert.lock().unwrap() = Some((key.to_string(), value.to_string()));
    }
}

#[async_trait]
impl KeyValueStore for RacingStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set(key, value).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StoreError> {
        self.inner.set_ex(key, value, ttl_seconds).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.inner.delete(key).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: &str,
    ) -> Result<bool, StoreError> {
        self.cas_calls.fetch_add(1, Ordering::SeqCst);
        if self.lose_every_cas.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.inner.compare_and_swap(key, expected, new).await
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        self.inner.incr_by(key, delta).await
    }

    async fn hash_get_all(&self, key: &str) -> Result<BTreeMap<String, String>, StoreError> {
        self.inner.hash_get_all(key).await
    }

    async fn hash_insert_capped(
        &self,
        key: &str,
        fields: &[String],
        value: &str,
        limit: usize,
        precondition: Option<Precondition<'_>>,
    ) -> Result<CappedInsert, StoreError> {
        let overwrite = self.before_capped_insert.lock().unwrap().take();
        if let Some((other_key, other_value)) = overwrite {
            self.inner.set(&other_key, &other_value).await?;
        }
        self.inner
            .hash_insert_capped(key, fields, value, limit, precondition)
            .await
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<bool, StoreError> {
        self.inner.hash_delete(key, field).await
    }

    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError> {
        self.inner.sorted_set_add(key, member, score).await
    }

    async fn sorted_set_range(
        &self,
        key: &str,
        order: RangeOrder,
    ) -> Result<Vec<(String, f64)>, StoreError> {
        self.inner.sorted_set_range(key, order).await
    }

    async fn sorted_set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.inner.sorted_set_remove(key, member).await
    }
}
