//! Hot store: a typed key/value cache with TTL and atomic list operations,
//! backing the fast path described by the hot-store key layout (`game:{id}`,
//! `room:{id}`, `guestQueue`, `ratedQueue`, `player:{id}:*`, ...).
//!
//! The trait is the external contract; [`InMemoryHotStore`] is the one
//! concrete implementation this crate ships, analogous to how the transport
//! layer ships `WebSocketTransport` behind the `Transport` trait.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;

use crate::StoreError;

/// A single step in a hot-store transaction. Transactions are applied
/// atomically (all steps succeed or none do) under one lock acquisition.
#[derive(Debug, Clone)]
pub enum HotOp {
    Set { key: String, value: String, ttl: Option<Duration> },
    Delete { key: String },
    PushHead { list_key: String, value: String },
    RemoveValue { list_key: String, value: String },
}

#[allow(async_fn_in_trait)]
pub trait HotStore: Send + Sync + 'static {
    /// Raw string get; `None` if absent or TTL-expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Raw string set, with an optional TTL.
    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Atomically increments an integer counter (creating it at 0 first),
    /// refreshing its TTL, and returns the new value. Used for
    /// `invalidMoves:{userId}`.
    async fn incr(&self, key: &str, ttl: Option<Duration>) -> Result<i64, StoreError>;

    /// Appends to the head of a list (the most recently queued entry).
    async fn push_head(&self, list_key: &str, value: String) -> Result<(), StoreError>;

    /// Pops the oldest entry (the tail) — queues are FIFO, so "head" is
    /// where entries are added and the oldest entry is served first.
    async fn pop_head(&self, list_key: &str) -> Result<Option<String>, StoreError>;

    /// Atomically pops the two oldest entries, or pops neither if fewer
    /// than two are present. This is the primitive the guest matchmaker
    /// needs for a race-free pairing.
    async fn pop_two_heads(
        &self,
        list_key: &str,
    ) -> Result<Option<(String, String)>, StoreError>;

    async fn len(&self, list_key: &str) -> Result<usize, StoreError>;

    async fn remove_value(&self, list_key: &str, value: &str) -> Result<bool, StoreError>;

    /// Returns every entry currently in the list, oldest first. Used by the
    /// rated matchmaker to scan for an ELO-compatible opponent.
    async fn snapshot(&self, list_key: &str) -> Result<Vec<String>, StoreError>;

    /// Applies a batch of operations atomically. `max_wait` bounds how long
    /// the caller will wait to acquire the store; `timeout` bounds the
    /// whole operation including application. On timeout no operation in
    /// the batch is applied.
    async fn transact(
        &self,
        ops: Vec<HotOp>,
        max_wait: Duration,
        timeout: Duration,
    ) -> Result<(), StoreError>;
}

/// Typed convenience helpers layered over the raw string [`HotStore`]
/// contract via JSON (de)serialization. Every concrete `HotStore` gets
/// these for free.
pub trait HotStoreExt: HotStore {
    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| StoreError::Deserialize {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    async fn set_json<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value).expect("domain types always serialize");
        self.set(key, raw, ttl).await
    }
}

impl<S: HotStore + ?Sized> HotStoreExt for S {}

#[derive(Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(at) => now < at,
            None => true,
        }
    }
}

/// In-memory reference implementation of [`HotStore`]. Suitable for tests
/// and standalone operation; a production deployment would swap this for a
/// client backed by a shared cache without touching any calling service.
pub struct InMemoryHotStore {
    entries: Mutex<HashMap<String, Entry>>,
    lists: Mutex<HashMap<String, Vec<String>>>,
}

impl InMemoryHotStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            lists: Mutex::new(HashMap::new()),
        }
    }

    fn expires_at(ttl: Option<Duration>) -> Option<Instant> {
        ttl.map(|d| Instant::now() + d)
    }
}

impl Default for InMemoryHotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HotStore for InMemoryHotStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(e) if e.is_live(now) => Ok(Some(e.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Self::expires_at(ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn incr(&self, key: &str, ttl: Option<Duration>) -> Result<i64, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let current = match entries.get(key) {
            Some(e) if e.is_live(now) => e.value.parse::<i64>().unwrap_or(0),
            _ => 0,
        };
        let next = current + 1;
        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at: Self::expires_at(ttl),
            },
        );
        Ok(next)
    }

    async fn push_head(&self, list_key: &str, value: String) -> Result<(), StoreError> {
        let mut lists = self.lists.lock().await;
        lists.entry(list_key.to_string()).or_default().push(value);
        Ok(())
    }

    async fn pop_head(&self, list_key: &str) -> Result<Option<String>, StoreError> {
        let mut lists = self.lists.lock().await;
        match lists.get_mut(list_key) {
            Some(list) if !list.is_empty() => Ok(Some(list.remove(0))),
            _ => Ok(None),
        }
    }

    async fn pop_two_heads(
        &self,
        list_key: &str,
    ) -> Result<Option<(String, String)>, StoreError> {
        let mut lists = self.lists.lock().await;
        match lists.get_mut(list_key) {
            Some(list) if list.len() >= 2 => {
                let a = list.remove(0);
                let b = list.remove(0);
                Ok(Some((a, b)))
            }
            _ => Ok(None),
        }
    }

    async fn len(&self, list_key: &str) -> Result<usize, StoreError> {
        Ok(self
            .lists
            .lock()
            .await
            .get(list_key)
            .map(|l| l.len())
            .unwrap_or(0))
    }

    async fn remove_value(&self, list_key: &str, value: &str) -> Result<bool, StoreError> {
        let mut lists = self.lists.lock().await;
        match lists.get_mut(list_key) {
            Some(list) => {
                let before = list.len();
                list.retain(|v| v != value);
                Ok(list.len() != before)
            }
            None => Ok(false),
        }
    }

    async fn snapshot(&self, list_key: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .lists
            .lock()
            .await
            .get(list_key)
            .cloned()
            .unwrap_or_default())
    }

    async fn transact(
        &self,
        ops: Vec<HotOp>,
        max_wait: Duration,
        timeout: Duration,
    ) -> Result<(), StoreError> {
        let budget = max_wait.min(timeout);
        let fut = async {
            let mut entries = self.entries.lock().await;
            let mut lists = self.lists.lock().await;
            for op in ops {
                match op {
                    HotOp::Set { key, value, ttl } => {
                        entries.insert(
                            key,
                            Entry {
                                value,
                                expires_at: Self::expires_at(ttl),
                            },
                        );
                    }
                    HotOp::Delete { key } => {
                        entries.remove(&key);
                    }
                    HotOp::PushHead { list_key, value } => {
                        lists.entry(list_key).or_default().push(value);
                    }
                    HotOp::RemoveValue { list_key, value } => {
                        if let Some(list) = lists.get_mut(&list_key) {
                            list.retain(|v| v != &value);
                        }
                    }
                }
            }
        };
        tokio::time::timeout(budget, fut)
            .await
            .map_err(|_| StoreError::TransactionTimeout(budget))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get_returns_value() {
        let store = InMemoryHotStore::new();
        store.set("k", "v".into(), None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".into()));
    }

    #[tokio::test]
    async fn test_get_missing_key_returns_none() {
        let store = InMemoryHotStore::new();
        assert_eq!(store.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ttl_expiry_hides_value() {
        let store = InMemoryHotStore::new();
        store
            .set("k", "v".into(), Some(Duration::from_millis(10)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_incr_starts_at_one_and_increments() {
        let store = InMemoryHotStore::new();
        assert_eq!(store.incr("ctr", None).await.unwrap(), 1);
        assert_eq!(store.incr("ctr", None).await.unwrap(), 2);
        assert_eq!(store.incr("ctr", None).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_push_pop_head_is_fifo() {
        let store = InMemoryHotStore::new();
        store.push_head("q", "a".into()).await.unwrap();
        store.push_head("q", "b".into()).await.unwrap();
        assert_eq!(store.pop_head("q").await.unwrap(), Some("a".into()));
        assert_eq!(store.pop_head("q").await.unwrap(), Some("b".into()));
        assert_eq!(store.pop_head("q").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pop_two_heads_requires_at_least_two() {
        let store = InMemoryHotStore::new();
        store.push_head("q", "a".into()).await.unwrap();
        assert_eq!(store.pop_two_heads("q").await.unwrap(), None);
        assert_eq!(store.len("q").await.unwrap(), 1);

        store.push_head("q", "b".into()).await.unwrap();
        assert_eq!(
            store.pop_two_heads("q").await.unwrap(),
            Some(("a".into(), "b".into()))
        );
    }

    #[tokio::test]
    async fn test_remove_value_from_list() {
        let store = InMemoryHotStore::new();
        store.push_head("q", "a".into()).await.unwrap();
        store.push_head("q", "b".into()).await.unwrap();
        assert!(store.remove_value("q", "a").await.unwrap());
        assert!(!store.remove_value("q", "a").await.unwrap());
        assert_eq!(store.snapshot("q").await.unwrap(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_transact_applies_all_ops_atomically() {
        let store = InMemoryHotStore::new();
        store
            .transact(
                vec![
                    HotOp::Set {
                        key: "k".into(),
                        value: "v".into(),
                        ttl: None,
                    },
                    HotOp::PushHead {
                        list_key: "q".into(),
                        value: "a".into(),
                    },
                ],
                Duration::from_secs(10),
                Duration::from_secs(20),
            )
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".into()));
        assert_eq!(store.len("q").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_json_round_trip() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Thing {
            n: u32,
        }
        let store = InMemoryHotStore::new();
        store.set_json("k", &Thing { n: 7 }, None).await.unwrap();
        let back: Option<Thing> = store.get_json("k").await.unwrap();
        assert_eq!(back, Some(Thing { n: 7 }));
    }
}
