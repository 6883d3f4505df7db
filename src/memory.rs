//! In-memory collaborators for tests, demos and embedding.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use dashmap::DashMap;

use crate::{
    Location, LocationResolver, ResolveError, RuleTextSource, SourceError, TenantId,
};

type ChangeListener = Arc<dyn Fn(&TenantId) + Send + Sync>;

/// Rule text held in memory, keyed by tenant.
///
/// Clones share storage. Listeners registered with
/// [`on_change`](Self::on_change) are told about every
/// [`set_rules`](Self::set_rules) so a cache can drop the tenant's entry.
#[derive(Clone, Default)]
pub struct MemoryRuleStore {
    rules: Arc<DashMap<TenantId, String>>,
    listeners: Arc<ArcSwap<Vec<ChangeListener>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryRuleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_rules(self, tenant: impl Into<TenantId>, text: impl Into<String>) -> Self {
        self.rules.insert(tenant.into(), text.into());
        self
    }

    /// Register a callback run after each change made through `set_rules` or
    /// `remove_rules`.
    pub fn on_change(&self, listener: impl Fn(&TenantId) + Send + Sync + 'static) {
        let listener: ChangeListener = Arc::new(listener);
        self.listeners.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(Arc::clone(&listener));
            next
        });
    }

    /// Store new rule text for `tenant` and notify listeners.
    pub fn set_rules(&self, tenant: &TenantId, text: impl Into<String>) {
        self.rules.insert(tenant.clone(), text.into());
        self.notify(tenant);
    }

    /// Store new rule text without telling anyone, as a direct write to the
    /// backing store would.
    pub fn replace_without_notice(&self, tenant: &TenantId, text: impl Into<String>) {
        self.rules.insert(tenant.clone(), text.into());
    }

    pub fn remove_rules(&self, tenant: &TenantId) {
        self.rules.remove(tenant);
        self.notify(tenant);
    }

    #[must_use]
    pub fn rules(&self, tenant: &TenantId) -> Option<String> {
        self.rules.get(tenant).map(|text| text.value().clone())
    }

    /// While set, every fetch fails with [`SourceError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn notify(&self, tenant: &TenantId) {
        for listener in self.listeners.load().iter() {
            listener(tenant);
        }
    }
}

#[async_trait]
impl RuleTextSource for MemoryRuleStore {
    async fn fetch_rule_text(&self, tenant: &TenantId) -> Result<String, SourceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable("memory store marked unavailable".into()));
        }
        self.rules(tenant)
            .ok_or_else(|| SourceError::NotFound(tenant.clone()))
    }
}

/// Location hierarchy held in memory, keyed by tenant and location id.
#[derive(Clone, Default)]
pub struct MemoryLocations {
    locations: Arc<DashMap<(TenantId, String), Location>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryLocations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_location(
        self,
        tenant: impl Into<TenantId>,
        location_id: impl Into<String>,
        location: Location,
    ) -> Self {
        self.insert(&tenant.into(), location_id, location);
        self
    }

    pub fn insert(&self, tenant: &TenantId, location_id: impl Into<String>, location: Location) {
        self.locations
            .insert((tenant.clone(), location_id.into()), location);
    }

    /// While set, every lookup fails with [`ResolveError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl LocationResolver for MemoryLocations {
    async fn resolve_location(
        &self,
        tenant: &TenantId,
        location_id: &str,
    ) -> Result<Location, ResolveError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ResolveError::Unavailable("memory locations marked unavailable".into()));
        }
        self.locations
            .get(&(tenant.clone(), location_id.to_owned()))
            .map(|l| l.value().clone())
            .ok_or_else(|| ResolveError::NotFound(location_id.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn set_rules_notifies_listeners() {
        let store = MemoryRuleStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        store.on_change(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let tenant = TenantId::from("t");
        store.set_rules(&tenant, "a");
        store.replace_without_notice(&tenant, "b");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.fetch_rule_text(&tenant).await.unwrap(), "b");
    }

    #[tokio::test]
    async fn clones_share_storage() {
        let store = MemoryRuleStore::new();
        let other = store.clone();
        let tenant = TenantId::from("t");
        store.set_rules(&tenant, "text");
        assert_eq!(other.rules(&tenant).as_deref(), Some("text"));
    }

    #[tokio::test]
    async fn missing_tenant() {
        let store = MemoryRuleStore::new();
        let err = store.fetch_rule_text(&TenantId::from("nobody")).await.unwrap_err();
        assert_eq!(err, SourceError::NotFound(TenantId::from("nobody")));
    }

    #[tokio::test]
    async fn unavailable_store() {
        let store = MemoryRuleStore::new().with_rules("t", "x");
        store.set_unavailable(true);
        assert!(matches!(
            store.fetch_rule_text(&TenantId::from("t")).await,
            Err(SourceError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn locations_are_tenant_scoped() {
        let loc = Location::new("s1", "lib1", "camp1", "inst1");
        let locations = MemoryLocations::new().with_location("t1", "s1", loc.clone());
        assert_eq!(
            locations.resolve_location(&TenantId::from("t1"), "s1").await,
            Ok(loc)
        );
        assert_eq!(
            locations.resolve_location(&TenantId::from("t2"), "s1").await,
            Err(ResolveError::NotFound("s1".into()))
        );
    }
}
