//! Out-of-order delivery protection for webhook events.
//!
//! Each entity remembers the highest transaction sequence number seen within
//! a sliding TTL. A delivery carrying a lower number than the remembered one
//! is stale and must be dropped; anything else is admitted and becomes the new
//! remembered value.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result, ensure};
use async_trait::async_trait;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

/// Sequence reported for an entity that has never been seen.
pub const UNSEEN: i64 = -1;

pub const DEFAULT_TTL_SECS: u64 = 120;

/// Largest accepted TTL (one day).
pub const MAX_TTL_SECS: u64 = 86_400;

/// Outcome of offering a sequence number for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// A higher sequence number was already recorded.
    Stale { last_seen: i64 },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// Storage for last-seen sequence numbers.
#[async_trait]
pub trait SequenceStore: Send + Sync {
    /// Atomically compares `sequence` with the last recorded value for
    /// `entity_id` and records it unless it is lower.
    async fn admit(&self, entity_id: &str, sequence: i64) -> Result<Admission>;

    /// Last recorded sequence, or [`UNSEEN`] when absent or expired.
    async fn last_seen(&self, entity_id: &str) -> Result<i64>;

    /// Drops expired entries and returns how many were removed.
    async fn purge_expired(&self) -> Result<usize>;
}

pub type SharedSequenceStore = Arc<dyn SequenceStore>;

#[derive(Debug, Clone, Copy)]
struct Entry {
    sequence: i64,
    expires_at: OffsetDateTime,
}

/// Process-local store; contents are lost on restart.
#[derive(Clone)]
pub struct InMemorySequenceStore {
    ttl: Duration,
    inner: Arc<Mutex<HashMap<String, Entry>>>,
}

impl Default for InMemorySequenceStore {
    fn default() -> Self {
        Self::new(StdDuration::from_secs(DEFAULT_TTL_SECS))
    }
}

impl InMemorySequenceStore {
    /// TTLs above [`MAX_TTL_SECS`] are clamped.
    pub fn new(ttl: StdDuration) -> Self {
        let secs = i64::try_from(ttl.as_secs().min(MAX_TTL_SECS)).unwrap_or(i64::MAX);
        Self {
            ttl: Duration::seconds(secs),
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn admit_at(&self, entity_id: &str, sequence: i64, now: OffsetDateTime) -> Admission {
        let mut guard = self.inner.lock().await;
        let last_seen = match guard.get(entity_id) {
            Some(entry) if entry.expires_at > now => entry.sequence,
            _ => UNSEEN,
        };
        if last_seen > sequence {
            return Admission::Stale { last_seen };
        }
        guard.insert(
            entity_id.to_string(),
            Entry {
                sequence,
                expires_at: now
                    .checked_add(self.ttl)
                    .unwrap_or(PrimitiveDateTime::MAX.assume_utc()),
            },
        );
        Admission::Admitted
    }

    pub async fn last_seen_at(&self, entity_id: &str, now: OffsetDateTime) -> i64 {
        let guard = self.inner.lock().await;
        match guard.get(entity_id) {
            Some(entry) if entry.expires_at > now => entry.sequence,
            _ => UNSEEN,
        }
    }

    pub async fn purge_expired_at(&self, now: OffsetDateTime) -> usize {
        let mut guard = self.inner.lock().await;
        let before = guard.len();
        guard.retain(|_, entry| entry.expires_at > now);
        before - guard.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[async_trait]
impl SequenceStore for InMemorySequenceStore {
    async fn admit(&self, entity_id: &str, sequence: i64) -> Result<Admission> {
        Ok(self.admit_at(entity_id, sequence, OffsetDateTime::now_utc()).await)
    }

    async fn last_seen(&self, entity_id: &str) -> Result<i64> {
        Ok(self.last_seen_at(entity_id, OffsetDateTime::now_utc()).await)
    }

    async fn purge_expired(&self) -> Result<usize> {
        Ok(self.purge_expired_at(OffsetDateTime::now_utc()).await)
    }
}

/// Configuration derived at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencingConfig {
    pub ttl_secs: u64,
}

impl Default for SequencingConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

impl SequencingConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(ttl) = lookup("SEQUENCING_TTL_SECS") {
            let parsed: u64 = ttl
                .trim()
                .parse()
                .with_context(|| format!("invalid SEQUENCING_TTL_SECS '{ttl}'"))?;
            ensure!(
                parsed <= MAX_TTL_SECS,
                "SEQUENCING_TTL_SECS '{ttl}' exceeds the maximum of {MAX_TTL_SECS}"
            );
            cfg.ttl_secs = parsed.max(1);
        }
        Ok(cfg)
    }

    pub fn ttl(&self) -> StdDuration {
        StdDuration::from_secs(self.ttl_secs)
    }
}

/// Admission check used by webhook handlers before enqueueing work.
#[derive(Clone)]
pub struct SequencingGuard {
    store: SharedSequenceStore,
}

impl SequencingGuard {
    pub fn new(store: SharedSequenceStore) -> Self {
        Self { store }
    }

    /// Returns `Ok(true)` when the delivery should be processed.
    #[instrument(name = "sequencing.admit", skip(self))]
    pub async fn should_process(&self, entity_id: &str, sequence: i64) -> Result<bool> {
        match self.store.admit(entity_id, sequence).await? {
            Admission::Admitted => {
                debug!("delivery admitted");
                Ok(true)
            }
            Admission::Stale { last_seen } => {
                warn!(entity_id, sequence, last_seen, "out-of-order delivery discarded");
                metrics::counter!("sequencing_stale_total").increment(1);
                Ok(false)
            }
        }
    }
}

/// Periodically purges expired entries until the returned task is aborted.
pub fn spawn_purger(store: SharedSequenceStore, every: StdDuration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "purged expired sequence entries"),
                Err(err) => warn!(error = %err, "sequence purge failed"),
            }
        }
    })
}
