//! store
//!
//! Контракт доступа к общему key-value хранилищу.
//!
//! Хранилище - единственный источник правды для схемы зала и корзины:
//! все экземпляры сервиса читают и пишут одни и те же ключи, поэтому
//! атомарность обеспечивается примитивами хранилища, а не локальными
//! блокировками. Реализации:
//! - `RedisStore` (`crate::redis_client`) - Redis, атомарные операции через Lua-скрипты;
//! - `MemoryStore` - в памяти процесса под `tokio::sync::Mutex`, для тестов
//!   и запуска без Redis;
//! - `MonitoredStore` - обёртка, публикующая каждую команду в монитор.

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

pub mod memory;
pub mod monitored;
#[cfg(test)]
pub(crate) mod racing;

pub use memory::MemoryStore;
pub use monitored::MonitoredStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("unexpected value under `{key}`: {value:?}")]
    Corrupt { key: String, value: String },

    #[error("`{0}` holds a value of another type")]
    WrongType(String),

    #[error("gave up on `{key}` after {attempts} conflicting writes")]
    Contention { key: String, attempts: u32 },

    #[error("store is offline")]
    Offline,
}

/// Итог условной вставки полей в хеш.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CappedInsert {
    /// Новые поля записаны; `size` - размер хеша после записи.
    Inserted { added: usize, size: usize },
    /// Лимит был бы превышен, ничего не записано.
    Rejected { current: usize, attempted: usize },
    /// Условие `Precondition` не выполнено, ничего не записано.
    Stale,
}

/// Условие для атомарной записи: строковый ключ `key` должен по-прежнему
/// хранить `expected` (`None` - ключа нет).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precondition<'a> {
    pub key: &'a str,
    pub expected: Option<&'a str>,
}

/// Порядок выдачи sorted set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOrder {
    Ascending,
    Descending,
}

#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StoreError>;

    /// Удаляет ключ целиком. `true`, если ключ существовал.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Записывает `new`, только если текущее значение равно `expected`
    /// (`None` - ключа нет). Возвращает `false`, если значение успели поменять.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: &str,
    ) -> Result<bool, StoreError>;

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, StoreError>;

    async fn hash_get_all(&self, key: &str) -> Result<BTreeMap<String, String>, StoreError>;

    /// Атомарно: проверяет `precondition`, считает, сколько из `fields` ещё
    /// нет в хеше, и если `текущий размер + новые <= limit`, записывает все
    /// новые поля со значением `value`. Существующие поля не трогает.
    async fn hash_insert_capped(
        &self,
        key: &str,
        fields: &[String],
        value: &str,
        limit: usize,
        precondition: Option<Precondition<'_>>,
    ) -> Result<CappedInsert, StoreError>;

    /// `true`, если поле было и удалено.
    async fn hash_delete(&self, key: &str, field: &str) -> Result<bool, StoreError>;

    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError>;

    async fn sorted_set_range(
        &self,
        key: &str,
        order: RangeOrder,
    ) -> Result<Vec<(String, f64)>, StoreError>;

    async fn sorted_set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError>;
}
