use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::store::{CappedInsert, KeyValueStore, Precondition, RangeOrder, StoreError};

enum Value {
    Str(String),
    Hash(BTreeMap<String, String>),
    SortedSet(HashMap<String, f64>),
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

/// Хранилище в памяти процесса с той же семантикой, что и Redis-реализация.
///
/// Один мьютекс на всё хранилище: каждая операция видит и пишет
/// согласованный снимок, как скрипт на стороне Redis.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Имитация недоступного хранилища: все операции падают с `Offline`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Offline)
        } else {
            Ok(())
        }
    }
}

// Ленивое истечение TTL, как в Redis: протухший ключ удаляется при обращении.
fn live<'a>(entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
    let expired = entries
        .get(key)
        .and_then(|e| e.expires_at)
        .is_some_and(|deadline| deadline <= Instant::now());
    if expired {
        entries.remove(key);
    }
    entries.get_mut(key)
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::WrongType(key.to_string())
}

fn string_value<'a>(entries: &'a mut HashMap<String, Entry>, key: &str) -> Result<Option<&'a str>, StoreError> {
    match live(entries, key) {
        None => Ok(None),
        Some(Entry { value: Value::Str(s), .. }) => Ok(Some(s.as_str())),
        Some(_) => Err(wrong_type(key)),
    }
}

fn put_string(entries: &mut HashMap<String, Entry>, key: &str, value: String, expires_at: Option<Instant>) {
    entries.insert(
        key.to_string(),
        Entry { value: Value::Str(value), expires_at },
    );
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check_online()
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        Ok(string_value(&mut entries, key)?.map(str::to_string))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        put_string(&mut entries, key, value.to_string(), None);
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StoreError> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        let deadline = Instant::now() + Duration::from_secs(ttl_seconds);
        put_string(&mut entries, key, value.to_string(), Some(deadline));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        Ok(live(&mut entries, key).is_some() && entries.remove(key).is_some())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: &str,
    ) -> Result<bool, StoreError> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        if string_value(&mut entries, key)? != expected {
            return Ok(false);
        }
        put_string(&mut entries, key, new.to_string(), None);
        Ok(true)
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        let current = match string_value(&mut entries, key)? {
            None => 0,
            Some(raw) => raw.parse::<i64>().map_err(|_| StoreError::Corrupt {
                key: key.to_string(),
                value: raw.to_string(),
            })?,
        };
        let next = current.checked_add(delta).ok_or_else(|| StoreError::Corrupt {
            key: key.to_string(),
            value: format!("{} + {} overflows", current, delta),
        })?;
        // INCR сохраняет TTL ключа
        let expires_at = entries.get(key).and_then(|e| e.expires_at);
        put_string(&mut entries, key, next.to_string(), expires_at);
        Ok(next)
    }

    async fn hash_get_all(&self, key: &str) -> Result<BTreeMap<String, String>, StoreError> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key) {
            None => Ok(BTreeMap::new()),
            Some(Entry { value: Value::Hash(h), .. }) => Ok(h.clone()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn hash_insert_capped(
        &self,
        key: &str,
        fields: &[String],
        value: &str,
        limit: usize,
        precondition: Option<Precondition<'_>>,
    ) -> Result<CappedInsert, StoreError> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        if let Some(guard) = precondition {
            if string_value(&mut entries, guard.key)? != guard.expected {
                return Ok(CappedInsert::Stale);
            }
        }
        live(&mut entries, key);
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Hash(BTreeMap::new()),
            expires_at: None,
        });
        let Value::Hash(hash) = &mut entry.value else {
            return Err(wrong_type(key));
        };

        let mut fresh: Vec<&String> = fields.iter().filter(|f| !hash.contains_key(*f)).collect();
        fresh.sort();
        fresh.dedup();

        let current = hash.len();
        if current + fresh.len() > limit {
            let attempted = fresh.len();
            // пустой хеш не оставляем, в Redis его бы просто не было
            if hash.is_empty() {
                entries.remove(key);
            }
            return Ok(CappedInsert::Rejected { current, attempted });
        }

        let added = fresh.len();
        for field in fresh {
            hash.insert(field.clone(), value.to_string());
        }
        let size = hash.len();
        if size == 0 {
            entries.remove(key);
        }
        Ok(CappedInsert::Inserted { added, size })
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<bool, StoreError> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        let (removed, now_empty) = match live(&mut entries, key) {
            None => return Ok(false),
            Some(Entry { value: Value::Hash(h), .. }) => (h.remove(field).is_some(), h.is_empty()),
            Some(_) => return Err(wrong_type(key)),
        };
        if now_empty {
            entries.remove(key);
        }
        Ok(removed)
    }

    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        live(&mut entries, key);
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::SortedSet(HashMap::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::SortedSet(set) => {
                set.insert(member.to_string(), score);
                Ok(())
            }
            _ => Err(wrong_type(key)),
        }
    }

    async fn sorted_set_range(
        &self,
        key: &str,
        order: RangeOrder,
    ) -> Result<Vec<(String, f64)>, StoreError> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        let set = match live(&mut entries, key) {
            None => return Ok(Vec::new()),
            Some(Entry { value: Value::SortedSet(set), .. }) => set,
            Some(_) => return Err(wrong_type(key)),
        };

        // Как в Redis: по счёту, при равенстве - по имени
        let mut elements: Vec<(String, f64)> =
            set.iter().map(|(m, s)| (m.clone(), *s)).collect();
        elements.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        if order == RangeOrder::Descending {
            elements.reverse();
        }
        Ok(elements)
    }

    async fn sorted_set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        let (removed, now_empty) = match live(&mut entries, key) {
            None => return Ok(false),
            Some(Entry { value: Value::SortedSet(set), .. }) => {
                (set.remove(member).is_some(), set.is_empty())
            }
            Some(_) => return Err(wrong_type(key)),
        };
        if now_empty {
            entries.remove(key);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn compare_and_swap_checks_current_value() {
        let store = MemoryStore::new();
        assert!(store.compare_and_swap("k", None, "1").await.unwrap());
        assert!(!store.compare_and_swap("k", None, "2").await.unwrap());
        assert!(!store.compare_and_swap("k", Some("0"), "2").await.unwrap());
        assert!(store.compare_and_swap("k", Some("1"), "2").await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn capped_insert_counts_only_new_fields() {
        let store = MemoryStore::new();
        let outcome = store
            .hash_insert_capped("cart", &fields(&["a", "b", "c"]), "5", 4, None)
            .await
            .unwrap();
        assert_eq!(outcome, CappedInsert::Inserted { added: 3, size: 3 });

        // a и b уже есть, новое только d
        let outcome = store
            .hash_insert_capped("cart", &fields(&["a", "b", "d"]), "7", 4, None)
            .await
            .unwrap();
        assert_eq!(outcome, CappedInsert::Inserted { added: 1, size: 4 });

        let hash = store.hash_get_all("cart").await.unwrap();
        assert_eq!(hash.get("a").map(String::as_str), Some("5"));
        assert_eq!(hash.get("d").map(String::as_str), Some("7"));
    }

    #[tokio::test]
    async fn capped_insert_rejects_without_writing() {
        let store = MemoryStore::new();
        store
            .hash_insert_capped("cart", &fields(&["a", "b", "c"]), "5", 4, None)
            .await
            .unwrap();
        let before = store.hash_get_all("cart").await.unwrap();

        let outcome = store
            .hash_insert_capped("cart", &fields(&["d", "e", "e"]), "5", 4, None)
            .await
            .unwrap();
        assert_eq!(outcome, CappedInsert::Rejected { current: 3, attempted: 2 });
        assert_eq!(store.hash_get_all("cart").await.unwrap(), before);
    }

    #[tokio::test]
    async fn rejected_insert_into_missing_hash_leaves_no_key() {
        let store = MemoryStore::new();
        let outcome = store
            .hash_insert_capped("cart", &fields(&["a", "b"]), "5", 1, None)
            .await
            .unwrap();
        assert_eq!(outcome, CappedInsert::Rejected { current: 0, attempted: 2 });
        assert!(!store.delete("cart").await.unwrap());
    }

    #[tokio::test]
    async fn capped_insert_checks_precondition_first() {
        let store = MemoryStore::new();
        store.set("seats", "0000000000000001").await.unwrap();

        let stale = Precondition { key: "seats", expected: Some("0000000000000011") };
        let outcome = store
            .hash_insert_capped("cart", &fields(&["seat1"]), "5", 4, Some(stale))
            .await
            .unwrap();
        assert_eq!(outcome, CappedInsert::Stale);
        assert!(store.hash_get_all("cart").await.unwrap().is_empty());

        // отсутствующий ключ не равен никакому значению
        let absent = Precondition { key: "seats", expected: None };
        let outcome = store
            .hash_insert_capped("cart", &fields(&["seat1"]), "5", 4, Some(absent))
            .await
            .unwrap();
        assert_eq!(outcome, CappedInsert::Stale);

        let current = Precondition { key: "seats", expected: Some("0000000000000001") };
        let outcome = store
            .hash_insert_capped("cart", &fields(&["seat1"]), "5", 4, Some(current))
            .await
            .unwrap();
        assert_eq!(outcome, CappedInsert::Inserted { added: 1, size: 1 });
    }

    #[tokio::test]
    async fn types_do_not_mix() {
        let store = MemoryStore::new();
        store.set("k", "v").await.unwrap();
        assert!(matches!(
            store.hash_get_all("k").await,
            Err(StoreError::WrongType(_))
        ));
        assert!(matches!(
            store.sorted_set_add("k", "m", 1.0).await,
            Err(StoreError::WrongType(_))
        ));
    }

    #[tokio::test]
    async fn incr_treats_missing_as_zero() {
        let store = MemoryStore::new();
        assert_eq!(store.incr_by("counter", 1).await.unwrap(), 1);
        assert_eq!(store.incr_by("counter", -3).await.unwrap(), -2);
        store.set("counter", "abc").await.unwrap();
        assert!(matches!(
            store.incr_by("counter", 1).await,
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn set_ex_expires() {
        let store = MemoryStore::new();
        store.set_ex("weather:Oslo", "{}", 300).await.unwrap();
        assert!(store.get("weather:Oslo").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(301)).await;
        assert!(store.get("weather:Oslo").await.unwrap().is_none());
        assert!(!store.delete("weather:Oslo").await.unwrap());
    }

    #[tokio::test]
    async fn sorted_set_orders_by_score_then_member() {
        let store = MemoryStore::new();
        store.sorted_set_add("z", "carol", 2.0).await.unwrap();
        store.sorted_set_add("z", "bob", 2.0).await.unwrap();
        store.sorted_set_add("z", "alice", 9.0).await.unwrap();

        let asc = store.sorted_set_range("z", RangeOrder::Ascending).await.unwrap();
        let names: Vec<&str> = asc.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(names, vec!["bob", "carol", "alice"]);

        let desc = store.sorted_set_range("z", RangeOrder::Descending).await.unwrap();
        assert_eq!(desc[0], ("alice".to_string(), 9.0));

        assert!(store.sorted_set_remove("z", "alice").await.unwrap());
        assert!(!store.sorted_set_remove("z", "alice").await.unwrap());
    }

    #[tokio::test]
    async fn offline_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_offline(true);
        assert!(matches!(store.get("k").await, Err(StoreError::Offline)));
        assert!(matches!(store.ping().await, Err(StoreError::Offline)));
        store.set_offline(false);
        assert!(store.ping().await.is_ok());
    }
}
