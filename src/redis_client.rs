use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, Script};
use std::collections::BTreeMap;

use crate::store::{CappedInsert, KeyValueStore, Precondition, RangeOrder, StoreError};

// CAS по строковому ключу. ARGV[1] = '1', если ждём отсутствие ключа.
const COMPARE_AND_SWAP: &str = r#"
local current = redis.call('GET', KEYS[1])
if ARGV[1] == '1' then
    if current ~= false then return 0 end
elseif current ~= ARGV[2] then
    return 0
end
redis.call('SET', KEYS[1], ARGV[3])
return 1
"#;

// Проверка условия, лимита и запись в одном скрипте, иначе между HLEN и HSET
// может вклиниться другой клиент. KEYS[2] - ключ условия, если оно задано:
// ARGV[3] = '0' без условия, '1' - ждём отсутствие ключа, '2' - значение ARGV[4].
const HASH_INSERT_CAPPED: &str = r#"
local mode = ARGV[3]
if mode ~= '0' then
    local guard = redis.call('GET', KEYS[2])
    if mode == '1' then
        if guard ~= false then return {-1, 0, 0} end
    elseif guard ~= ARGV[4] then
        return {-1, 0, 0}
    end
end
local size = redis.call('HLEN', KEYS[1])
local limit = tonumber(ARGV[2])
local fresh = {}
local seen = {}
for i = 5, #ARGV do
    local field = ARGV[i]
    if not seen[field] and redis.call('HEXISTS', KEYS[1], field) == 0 then
        seen[field] = true
        table.insert(fresh, field)
    end
end
if size + #fresh > limit then
    return {0, size, #fresh}
end
for _, field in ipairs(fresh) do
    redis.call('HSET', KEYS[1], field, ARGV[1])
end
return {1, size + #fresh, #fresh}
"#;

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    cas: Script,
    capped_insert: Script,
}

impl RedisStore {
    pub async fn new(redis_url: &str) -> redis::RedisResult<Self> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(RedisStore {
            conn,
            cas: Script::new(COMPARE_AND_SWAP),
            capped_insert: Script::new(HASH_INSERT_CAPPED),
        })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl_seconds).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: &str,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let expect_absent = if expected.is_none() { "1" } else { "0" };
        let swapped: i64 = self
            .cas
            .key(key)
            .arg(expect_absent)
            .arg(expected.unwrap_or_default())
            .arg(new)
            .invoke_async(&mut conn)
            .await?;
        Ok(swapped == 1)
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        Ok(conn.incr(key, delta).await?)
    }

    async fn hash_get_all(&self, key: &str) -> Result<BTreeMap<String, String>, StoreError> {
        let mut conn = self.conn.clone();
        Ok(conn.hgetall(key).await?)
    }

    async fn hash_insert_capped(
        &self,
        key: &str,
        fields: &[String],
        value: &str,
        limit: usize,
        precondition: Option<Precondition<'_>>,
    ) -> Result<CappedInsert, StoreError> {
        let mut conn = self.conn.clone();
        let mut invocation = self.capped_insert.key(key);
        invocation.arg(value).arg(limit);
        match precondition {
            None => {
                invocation.arg("0").arg("");
            }
            Some(guard) => {
                let mode = if guard.expected.is_none() { "1" } else { "2" };
                invocation
                    .key(guard.key)
                    .arg(mode)
                    .arg(guard.expected.unwrap_or_default());
            }
        }
        for field in fields {
            invocation.arg(field);
        }

        let (outcome, size, fresh): (i64, usize, usize) =
            invocation.invoke_async(&mut conn).await?;

        Ok(match outcome {
            1 => CappedInsert::Inserted { added: fresh, size },
            0 => CappedInsert::Rejected { current: size, attempted: fresh },
            _ => CappedInsert::Stale,
        })
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.hdel(key, field).await?;
        Ok(removed > 0)
    }

    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.zadd(key, member, score).await?;
        Ok(())
    }

    async fn sorted_set_range(
        &self,
        key: &str,
        order: RangeOrder,
    ) -> Result<Vec<(String, f64)>, StoreError> {
        let mut conn = self.conn.clone();
        let elements = match order {
            RangeOrder::Ascending => conn.zrange_withscores(key, 0, -1).await?,
            RangeOrder::Descending => conn.zrevrange_withscores(key, 0, -1).await?,
        };
        Ok(elements)
    }

    async fn sorted_set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.zrem(key, member).await?;
        Ok(removed > 0)
    }
}
