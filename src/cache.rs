//! Summary cache collaborator.
//!
//! Reports are cached per wallet with an explicit time-to-live. The cache is injected into the
//! analyzer; nothing in the engine layer knows it exists.

use crate::domain::Address;
use crate::engine::WalletReport;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[async_trait]
pub trait SummaryCache: Send + Sync + fmt::Debug {
    /// A fresh entry for `wallet`, if any.
    async fn get(&self, wallet: &Address) -> Option<Arc<WalletReport>>;
    async fn put(&self, wallet: Address, report: Arc<WalletReport>);
    async fn invalidate(&self, wallet: &Address);
}

/// Cache that stores nothing. Used when the TTL is zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

#[async_trait]
impl SummaryCache for NoopCache {
    async fn get(&self, _wallet: &Address) -> Option<Arc<WalletReport>> {
        None
    }

    async fn put(&self, _wallet: Address, _report: Arc<WalletReport>) {}

    async fn invalidate(&self, _wallet: &Address) {}
}

#[derive(Debug)]
struct Entry {
    stored_at: Instant,
    report: Arc<WalletReport>,
}

/// In-memory cache whose entries expire `ttl` after insertion.
///
/// Expired entries are evicted on every insert, so the map holds at most the wallets queried
/// within the last `ttl`.
#[derive(Debug)]
pub struct TtlSummaryCache {
    ttl: Duration,
    entries: RwLock<HashMap<Address, Entry>>,
}

impl TtlSummaryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    async fn put_at(&self, wallet: Address, report: Arc<WalletReport>, stored_at: Instant) {
        let mut entries = self.entries.write().await;
        let ttl = self.ttl;
        entries.retain(|_, e| e.stored_at.elapsed() < ttl);
        entries.insert(wallet, Entry { stored_at, report });
    }
}

#[async_trait]
impl SummaryCache for TtlSummaryCache {
    async fn get(&self, wallet: &Address) -> Option<Arc<WalletReport>> {
        let entries = self.entries.read().await;
        entries
            .get(wallet)
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .map(|e| e.report.clone())
    }

    async fn put(&self, wallet: Address, report: Arc<WalletReport>) {
        self.put_at(wallet, report, Instant::now()).await;
    }

    async fn invalidate(&self, wallet: &Address) {
        self.entries.write().await.remove(wallet);
    }
}

/// Build the cache configured by `ttl`: zero disables caching.
pub fn summary_cache_for(ttl: Duration) -> Arc<dyn SummaryCache> {
    if ttl.is_zero() {
        Arc::new(NoopCache)
    } else {
        Arc::new(TtlSummaryCache::new(ttl))
    }
}
