//! The persistent ranking store, consumed through a small Redis-like surface.
//!
//! Two namespaces live in one store: ordered collections (member -> score,
//! read back highest first) and plain string keys. Implementations must make
//! `z_add_if_greater` atomic per member; the leaderboard relies on it instead
//! of taking any lock of its own.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// One member of an ordered collection with its score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZMember {
    pub member: String,
    pub score: u64,
}

#[async_trait]
pub trait RankingStore: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete plain keys and ordered collections alike.
    async fn del(&self, keys: &[String]) -> Result<(), StoreError>;

    /// Values for `keys`, in order, in one round trip.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError>;

    /// Plain keys starting with `prefix`.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    async fn z_score(&self, set: &str, member: &str) -> Result<Option<u64>, StoreError>;

    /// Write `score` only when the member is absent or holds a lower score.
    /// Returns whether the write happened.
    async fn z_add_if_greater(&self, set: &str, member: &str, score: u64)
        -> Result<bool, StoreError>;

    /// Top `k` members, highest score first; equal scores keep the order in
    /// which they were written.
    async fn z_range_desc(&self, set: &str, k: usize) -> Result<Vec<ZMember>, StoreError>;
}

#[derive(Debug, Default)]
struct SortedSet {
    // member -> (score, write sequence)
    members: HashMap<String, (u64, u64)>,
    // (descending score, write sequence, member)
    order: BTreeSet<(std::cmp::Reverse<u64>, u64, String)>,
}

impl SortedSet {
    fn score(&self, member: &str) -> Option<u64> {
        self.members.get(member).map(|(score, _)| *score)
    }

    fn insert(&mut self, member: &str, score: u64, seq: u64) {
        if let Some((old_score, old_seq)) = self.members.remove(member) {
            self.order
                .remove(&(std::cmp::Reverse(old_score), old_seq, member.to_string()));
        }
        self.members.insert(member.to_string(), (score, seq));
        self.order
            .insert((std::cmp::Reverse(score), seq, member.to_string()));
    }

    fn top(&self, k: usize) -> Vec<ZMember> {
        self.order
            .iter()
            .take(k)
            .map(|(score, _, member)| ZMember {
                member: member.clone(),
                score: score.0,
            })
            .collect()
    }
}

#[derive(Debug, Default)]
struct Inner {
    strings: BTreeMap<String, String>,
    sets: HashMap<String, SortedSet>,
    seq: u64,
}

/// On-disk form of a `MemoryStore`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub strings: BTreeMap<String, String>,
    /// Members per collection in rank order
    pub sets: BTreeMap<String, Vec<ZMember>>,
}

/// In-process store. Every operation holds the mutex for its whole duration,
/// which is what makes the conditional write atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut inner = Inner {
            strings: snapshot.strings,
            ..Inner::default()
        };
        for (name, members) in snapshot.sets {
            let mut set = SortedSet::default();
            for m in members {
                inner.seq += 1;
                set.insert(&m.member, m.score, inner.seq);
            }
            inner.sets.insert(name, set);
        }
        Self {
            inner: Mutex::new(inner),
        }
    }

    pub fn snapshot(&self) -> Result<StoreSnapshot, StoreError> {
        let inner = self.lock()?;
        let sets = inner
            .sets
            .iter()
            .map(|(name, set)| (name.clone(), set.top(usize::MAX)))
            .collect();
        Ok(StoreSnapshot {
            strings: inner.strings.clone(),
            sets,
        })
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let json = std::fs::read_to_string(path)?;
        let snapshot: StoreSnapshot = serde_json::from_str(&json)?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.snapshot()?)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[async_trait]
impl RankingStore for MemoryStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.lock()?
            .strings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        for key in keys {
            inner.strings.remove(key);
            inner.sets.remove(key);
        }
        Ok(())
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError> {
        let inner = self.lock()?;
        Ok(keys.iter().map(|k| inner.strings.get(k).cloned()).collect())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .strings
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn z_score(&self, set: &str, member: &str) -> Result<Option<u64>, StoreError> {
        Ok(self.lock()?.sets.get(set).and_then(|s| s.score(member)))
    }

    async fn z_add_if_greater(
        &self,
        set: &str,
        member: &str,
        score: u64,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        inner.seq += 1;
        let seq = inner.seq;
        let sorted = inner.sets.entry(set.to_string()).or_default();
        match sorted.score(member) {
            Some(current) if current >= score => Ok(false),
            _ => {
                sorted.insert(member, score, seq);
                Ok(true)
            }
        }
    }

    async fn z_range_desc(&self, set: &str, k: usize) -> Result<Vec<ZMember>, StoreError> {
        Ok(self
            .lock()?
            .sets
            .get(set)
            .map(|s| s.top(k))
            .unwrap_or_default())
    }
}

/// `MemoryStore` that rewrites its JSON snapshot after every mutation.
#[derive(Debug)]
pub struct JsonFileStore {
    memory: MemoryStore,
    path: PathBuf,
}

impl JsonFileStore {
    /// Open `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let memory = if path.exists() {
            MemoryStore::load(&path)?
        } else {
            MemoryStore::new()
        };
        tracing::debug!("Opened leaderboard store at {}", path.display());
        Ok(Self { memory, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), StoreError> {
        self.memory.save(&self.path)
    }
}

#[async_trait]
impl RankingStore for JsonFileStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.memory.set(key, value).await?;
        self.persist()
    }

    async fn del(&self, keys: &[String]) -> Result<(), StoreError> {
        self.memory.del(keys).await?;
        self.persist()
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError> {
        self.memory.mget(keys).await
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.memory.scan_prefix(prefix).await
    }

    async fn z_score(&self, set: &str, member: &str) -> Result<Option<u64>, StoreError> {
        self.memory.z_score(set, member).await
    }

    async fn z_add_if_greater(
        &self,
        set: &str,
        member: &str,
        score: u64,
    ) -> Result<bool, StoreError> {
        let written = self.memory.z_add_if_greater(set, member, score).await?;
        if written {
            self.persist()?;
        }
        Ok(written)
    }

    async fn z_range_desc(&self, set: &str, k: usize) -> Result<Vec<ZMember>, StoreError> {
        self.memory.z_range_desc(set, k).await
    }
}
