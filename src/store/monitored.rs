use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::services::monitor::CommandFeed;
use crate::store::{CappedInsert, KeyValueStore, Precondition, RangeOrder, StoreError};

/// Обёртка над хранилищем: перед каждой командой публикует её в `CommandFeed`.
pub struct MonitoredStore {
    inner: Arc<dyn KeyValueStore>,
    feed: CommandFeed,
}

impl MonitoredStore {
    pub fn new(inner: Arc<dyn KeyValueStore>, feed: CommandFeed) -> Self {
        Self { inner, feed }
    }
}

#[async_trait]
impl KeyValueStore for MonitoredStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.feed.publish(&["PING"]);
        self.inner.ping().await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.feed.publish(&["GET", key]);
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.feed.publish(&["SET", key, value]);
        self.inner.set(key, value).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StoreError> {
        self.feed.publish(&["SETEX", key, ttl_seconds.to_string().as_str(), value]);
        self.inner.set_ex(key, value, ttl_seconds).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.feed.publish(&["DEL", key]);
        self.inner.delete(key).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: &str,
    ) -> Result<bool, StoreError> {
        self.feed.publish(&["EVALSHA", "compare_and_swap", key, expected.unwrap_or("(nil)"), new]);
        self.inner.compare_and_swap(key, expected, new).await
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        self.feed.publish(&["INCRBY", key, delta.to_string().as_str()]);
        self.inner.incr_by(key, delta).await
    }

    async fn hash_get_all(&self, key: &str) -> Result<BTreeMap<String, String>, StoreError> {
        self.feed.publish(&["HGETALL", key]);
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
        let limit_arg = limit.to_string();
        let mut args = vec!["EVALSHA", "hash_insert_capped", key];
        if let Some(guard) = &precondition {
            args.extend([guard.key, guard.expected.unwrap_or("(nil)")]);
        }
        args.extend([value, limit_arg.as_str()]);
        args.extend(fields.iter().map(String::as_str));
        self.feed.publish(&args);
        self.inner
            .hash_insert_capped(key, fields, value, limit, precondition)
            .await
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<bool, StoreError> {
        self.feed.publish(&["HDEL", key, field]);
        self.inner.hash_delete(key, field).await
    }

    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError> {
        self.feed.publish(&["ZADD", key, score.to_string().as_str(), member]);
        self.inner.sorted_set_add(key, member, score).await
    }

    async fn sorted_set_range(
        &self,
        key: &str,
        order: RangeOrder,
    ) -> Result<Vec<(String, f64)>, StoreError> {
        let command = match order {
            RangeOrder::Ascending => "ZRANGE",
            RangeOrder::Descending => "ZREVRANGE",
        };
        self.feed.publish(&[command, key, "0", "-1", "WITHSCORES"]);
        self.inner.sorted_set_range(key, order).await
    }

    async fn sorted_set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.feed.publish(&["ZREM", key, member]);
        self.inner.sorted_set_remove(key, member).await
    }
}
