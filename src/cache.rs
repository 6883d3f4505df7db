//! Per-tenant cache of compiled rule sets.
//!
//! Entries are compiled on first use and then served until they age past the
//! configured soft TTL, at which point the current entry is still returned
//! while a single background task recompiles it. Past the hard TTL an entry is
//! never served: `get` compiles synchronously and waits.
//!
//! At most one compile per tenant runs at a time. Callers that queue behind an
//! in-flight compile take its result instead of starting their own.
//!
//! [`TenantRuleCache::invalidate`] drops a tenant's entry and fences out any
//! compile that started fetching before it, so stale text is never installed
//! after the caller learns the rules changed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::{CacheConfig, CompileError, CompiledRuleSet, RuleTextSource, SourceError, TenantId};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to fetch rule text: {0}")]
    Source(#[from] SourceError),

    #[error("failed to compile rule text: {0}")]
    Compile(#[from] CompileError),
}

/// One installed rule set. Replaced wholesale, never mutated.
#[derive(Debug)]
pub struct CacheEntry {
    tenant: TenantId,
    rules: Arc<CompiledRuleSet>,
    compiled_at: Instant,
    serial: u64,
}

impl CacheEntry {
    #[must_use]
    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    #[must_use]
    pub fn rules(&self) -> &Arc<CompiledRuleSet> {
        &self.rules
    }

    /// When the rule text was last fetched and installed.
    #[must_use]
    pub fn compiled_at(&self) -> Instant {
        self.compiled_at
    }

    #[must_use]
    pub fn age(&self) -> Duration {
        self.compiled_at.elapsed()
    }

    /// When a background refresh becomes due under `config`.
    #[must_use]
    pub fn refresh_due(&self, config: &CacheConfig) -> Instant {
        self.compiled_at + config.soft_ttl()
    }

    /// When the entry stops being served under `config`.
    #[must_use]
    pub fn expires_at(&self, config: &CacheConfig) -> Instant {
        self.compiled_at + config.hard_ttl()
    }
}

/// Compile serialization and the invalidation fence for one tenant.
#[derive(Debug, Default)]
struct TenantSlot {
    compile: Arc<Mutex<()>>,
    generation: AtomicU64,
}

/// Result of one fetch and compile. `installed` is false when an
/// invalidation fenced the entry out.
struct Compiled {
    entry: Arc<CacheEntry>,
    installed: bool,
}

struct Inner<S> {
    source: S,
    config: ArcSwap<CacheConfig>,
    entries: DashMap<TenantId, Arc<CacheEntry>>,
    slots: DashMap<TenantId, Arc<TenantSlot>>,
    next_serial: AtomicU64,
}

/// Tenant-scoped cache of [`CompiledRuleSet`]s in front of a
/// [`RuleTextSource`].
///
/// Cloning is cheap and every clone shares the same entries.
pub struct TenantRuleCache<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for TenantRuleCache<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: RuleTextSource> TenantRuleCache<S> {
    pub fn new(source: S, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                config: ArcSwap::from_pointee(config),
                entries: DashMap::new(),
                slots: DashMap::new(),
                next_serial: AtomicU64::new(1),
            }),
        }
    }

    /// The compiled rules for `tenant`, compiling them if nothing servable is
    /// cached.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the rule text cannot be fetched or does not
    /// compile. Nothing is installed in that case.
    #[instrument(skip(self, tenant), fields(tenant = %tenant))]
    pub async fn get(&self, tenant: &TenantId) -> Result<Arc<CompiledRuleSet>, CacheError> {
        let config = self.config();
        let current = self.peek(tenant);
        if let Some(entry) = &current {
            let age = entry.age();
            if age < config.hard_ttl() {
                if age >= config.soft_ttl() {
                    self.spawn_refresh(tenant, entry.serial);
                }
                return Ok(Arc::clone(&entry.rules));
            }
            debug!(age_ms = age.as_millis() as u64, "entry past hard ttl");
        }

        let seen = current.map(|e| e.serial);
        let entry = self.inner.load_exclusive(tenant, seen).await?;
        Ok(Arc::clone(&entry.rules))
    }

    /// Compile `tenant`'s rules now, regardless of what is cached.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    #[instrument(skip(self, tenant), fields(tenant = %tenant))]
    pub async fn warm_up(&self, tenant: &TenantId) -> Result<Arc<CompiledRuleSet>, CacheError> {
        let slot = self.inner.slot(tenant);
        let _guard = slot.compile.lock().await;
        let compiled = self.inner.fetch_and_install(tenant, &slot).await?;
        Ok(Arc::clone(&compiled.entry.rules))
    }

    /// Drop `tenant`'s entry. The next `get` compiles from fresh text, and any
    /// compile already fetching will not install its result.
    #[instrument(skip(self, tenant), fields(tenant = %tenant))]
    pub fn invalidate(&self, tenant: &TenantId) {
        // No slot means no compile ever started, so there is nothing to fence.
        let Some(slot) = self.inner.existing_slot(tenant) else {
            debug!("tenant never loaded, nothing to invalidate");
            return;
        };
        // Bumping under the entry's shard lock orders this against installs.
        let removed = match self.inner.entries.entry(tenant.clone()) {
            Entry::Occupied(occupied) => {
                slot.generation.fetch_add(1, Ordering::SeqCst);
                occupied.remove();
                true
            }
            Entry::Vacant(_) => {
                slot.generation.fetch_add(1, Ordering::SeqCst);
                false
            }
        };
        info!(removed, "circulation rules invalidated");
    }

    /// A callback that invalidates a tenant in this cache, for wiring to a
    /// rule store's change notifications. Holds the cache weakly, so it turns
    /// into a no-op once every clone of the cache is dropped.
    pub fn invalidator(&self) -> impl Fn(&TenantId) + Send + Sync + 'static {
        let inner = Arc::downgrade(&self.inner);
        move |tenant: &TenantId| {
            if let Some(inner) = inner.upgrade() {
                TenantRuleCache { inner }.invalidate(tenant);
            }
        }
    }

    /// Invalidate every tenant this cache has seen.
    pub fn invalidate_all(&self) {
        let tenants: Vec<TenantId> = self.inner.slots.iter().map(|s| s.key().clone()).collect();
        for tenant in &tenants {
            self.invalidate(tenant);
        }
    }

    /// Replace the TTLs. Existing entries are judged against the new values
    /// from the next `get` on.
    pub fn reconfigure(&self, config: CacheConfig) {
        info!(
            soft_ttl_ms = config.soft_ttl().as_millis() as u64,
            hard_ttl_ms = config.hard_ttl().as_millis() as u64,
            "cache reconfigured"
        );
        self.inner.config.store(Arc::new(config));
    }

    #[must_use]
    pub fn config(&self) -> CacheConfig {
        **self.inner.config.load()
    }

    /// The installed entry for `tenant`, whatever its age.
    #[must_use]
    pub fn peek(&self, tenant: &TenantId) -> Option<Arc<CacheEntry>> {
        self.inner.entries.get(tenant).map(|e| Arc::clone(e.value()))
    }

    /// Tenants with an installed entry, in no particular order.
    #[must_use]
    pub fn cached_tenants(&self) -> Vec<TenantId> {
        self.inner.entries.iter().map(|e| e.key().clone()).collect()
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.inner.source
    }

    fn spawn_refresh(&self, tenant: &TenantId, seen: u64) {
        let slot = self.inner.slot(tenant);
        let Ok(guard) = Arc::clone(&slot.compile).try_lock_owned() else {
            debug!("compile already in flight, skipping refresh");
            return;
        };
        let inner = Arc::clone(&self.inner);
        let tenant = tenant.clone();
        tokio::spawn(async move {
            let _guard = guard;
            if inner.entries.get(&tenant).is_some_and(|e| e.serial != seen) {
                return;
            }
            match inner.fetch_and_install(&tenant, &slot).await {
                Ok(Compiled {
                    entry,
                    installed: true,
                }) => debug!(tenant = %tenant, serial = entry.serial, "background refresh done"),
                Ok(Compiled {
                    installed: false, ..
                }) => debug!(tenant = %tenant, "background refresh discarded after invalidation"),
                Err(e) => warn!(
                    tenant = %tenant,
                    error = %e,
                    "background refresh failed, keeping current rules"
                ),
            }
        });
    }
}

impl<S: RuleTextSource> Inner<S> {
    fn slot(&self, tenant: &TenantId) -> Arc<TenantSlot> {
        Arc::clone(self.slots.entry(tenant.clone()).or_default().value())
    }

    fn existing_slot(&self, tenant: &TenantId) -> Option<Arc<TenantSlot>> {
        self.slots.get(tenant).map(|s| Arc::clone(s.value()))
    }

    /// Compile under the tenant lock unless another caller installed
    /// something newer than `seen` while we waited for it.
    async fn load_exclusive(
        &self,
        tenant: &TenantId,
        seen: Option<u64>,
    ) -> Result<Arc<CacheEntry>, CacheError> {
        let slot = self.slot(tenant);
        let _guard = slot.compile.lock().await;

        if let Some(entry) = self.entries.get(tenant).map(|e| Arc::clone(e.value())) {
            let hard_ttl = self.config.load().hard_ttl();
            if Some(entry.serial) != seen && entry.age() < hard_ttl {
                debug!(serial = entry.serial, "took result of concurrent compile");
                return Ok(entry);
            }
        }
        Ok(self.fetch_and_install(tenant, &slot).await?.entry)
    }

    /// Caller must hold `slot.compile`.
    async fn fetch_and_install(
        &self,
        tenant: &TenantId,
        slot: &TenantSlot,
    ) -> Result<Compiled, CacheError> {
        let generation = slot.generation.load(Ordering::SeqCst);
        let text = self.source.fetch_rule_text(tenant).await?;

        let digest = CompiledRuleSet::source_digest(&text);
        let unchanged = self
            .entries
            .get(tenant)
            .map(|e| Arc::clone(&e.rules))
            .filter(|rules| *rules.digest() == digest);
        let rules = match unchanged {
            Some(rules) => {
                debug!("rule text unchanged, reusing compiled rules");
                rules
            }
            None => {
                let compiled = CompiledRuleSet::from_text(&text).inspect_err(|e| {
                    warn!(error = %e, "circulation rules failed to compile");
                })?;
                info!(lines = compiled.len(), "compiled circulation rules");
                Arc::new(compiled)
            }
        };

        let entry = Arc::new(CacheEntry {
            tenant: tenant.clone(),
            rules,
            compiled_at: Instant::now(),
            serial: self.next_serial.fetch_add(1, Ordering::Relaxed),
        });

        // Checked under the entry's shard lock, same as `invalidate`.
        let vacancy = self.entries.entry(tenant.clone());
        let installed = slot.generation.load(Ordering::SeqCst) == generation;
        if installed {
            vacancy.insert(Arc::clone(&entry));
        } else {
            drop(vacancy);
            debug!("rules invalidated during compile, not installing");
        }
        Ok(Compiled { entry, installed })
    }
}
