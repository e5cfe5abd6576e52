use super::{normalize_range, CacheError, CacheTier};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

enum Slot {
    Value(String),
    List(VecDeque<String>),
}

struct Entry {
    slot: Slot,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-process cache tier. Expired keys read as a miss; they are dropped when
/// accessed and swept whenever a new value is written.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let mut entries = self.entries.lock();
        entries.retain(|_, e| !e.is_expired());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live<'a>(entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
        if entries.get(key).is_some_and(|e| e.is_expired()) {
            entries.remove(key);
            return None;
        }
        entries.get_mut(key)
    }
}

#[async_trait]
impl CacheTier for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.lock();
        match Self::live(&mut entries, key) {
            Some(Entry {
                slot: Slot::Value(v),
                ..
            }) => Ok(Some(v.clone())),
            Some(_) => Err(CacheError::WrongType(key.to_string())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.lock();
        entries.retain(|_, e| !e.is_expired());
        entries.insert(
            key.to_string(),
            Entry {
                slot: Slot::Value(value.to_string()),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn list_push(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock();
        match Self::live(&mut entries, key) {
            Some(Entry {
                slot: Slot::List(list),
                ..
            }) => {
                list.push_front(value.to_string());
                Ok(())
            }
            Some(_) => Err(CacheError::WrongType(key.to_string())),
            None => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        slot: Slot::List(VecDeque::from([value.to_string()])),
                        expires_at: None,
                    },
                );
                Ok(())
            }
        }
    }

    async fn list_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, CacheError> {
        let mut entries = self.entries.lock();
        match Self::live(&mut entries, key) {
            Some(Entry {
                slot: Slot::List(list),
                ..
            }) => Ok(match normalize_range(list.len(), start, stop) {
                Some((from, to)) => list.range(from..=to).cloned().collect(),
                None => Vec::new(),
            }),
            Some(_) => Err(CacheError::WrongType(key.to_string())),
            None => Ok(Vec::new()),
        }
    }

    async fn list_trim(&self, key: &str, start: isize, stop: isize) -> Result<(), CacheError> {
        let mut entries = self.entries.lock();
        let bounds = match Self::live(&mut entries, key) {
            Some(Entry {
                slot: Slot::List(list),
                ..
            }) => normalize_range(list.len(), start, stop),
            Some(_) => return Err(CacheError::WrongType(key.to_string())),
            None => return Ok(()),
        };

        match bounds {
            Some((from, to)) => {
                if let Some(Entry {
                    slot: Slot::List(list),
                    ..
                }) = entries.get_mut(key)
                {
                    list.truncate(to + 1);
                    list.drain(..from);
                }
            }
            None => {
                entries.remove(key);
            }
        }
        Ok(())
    }
}
