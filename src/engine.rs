use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, instrument};

use crate::{
    CacheConfig, CompiledRuleSet, Criteria, EngineError, LocationResolver, PolicyKind,
    PolicyMatch, RuleMatch, RuleTextSource, TenantId, TenantRuleCache, ValidationError,
};

pub const ITEM_TYPE_ID: &str = "item_type_id";
pub const LOAN_TYPE_ID: &str = "loan_type_id";
pub const PATRON_TYPE_ID: &str = "patron_type_id";
pub const LOCATION_ID: &str = "location_id";

/// Canonical hyphenated form, version 1-5, RFC 4122 variant.
static UUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[1-5][0-9a-fA-F]{3}-[89abAB][0-9a-fA-F]{3}-[0-9a-fA-F]{12}$")
        .expect("uuid pattern is valid")
});

/// The four identifiers of an apply request, exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCriteria {
    pub item_type_id: Option<String>,
    pub loan_type_id: Option<String>,
    pub patron_type_id: Option<String>,
    pub location_id: Option<String>,
}

impl RawCriteria {
    #[must_use]
    pub fn new(
        item_type_id: impl Into<String>,
        loan_type_id: impl Into<String>,
        patron_type_id: impl Into<String>,
        location_id: impl Into<String>,
    ) -> Self {
        Self {
            item_type_id: Some(item_type_id.into()),
            loan_type_id: Some(loan_type_id.into()),
            patron_type_id: Some(patron_type_id.into()),
            location_id: Some(location_id.into()),
        }
    }

    /// Collect the identifiers from decoded query-string pairs. Unrelated
    /// keys are ignored; when a key repeats, the first value is kept.
    pub fn from_query_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut raw = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                ITEM_TYPE_ID => &mut raw.item_type_id,
                LOAN_TYPE_ID => &mut raw.loan_type_id,
                PATRON_TYPE_ID => &mut raw.patron_type_id,
                LOCATION_ID => &mut raw.location_id,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        raw
    }

    /// Check all four identifiers, in parameter order.
    ///
    /// # Errors
    ///
    /// [`ValidationError`] for the first identifier that is missing or not a
    /// UUID.
    pub fn validate(&self) -> Result<ValidCriteria<'_>, ValidationError> {
        Ok(ValidCriteria {
            item_type_id: require_uuid(ITEM_TYPE_ID, self.item_type_id.as_deref())?,
            loan_type_id: require_uuid(LOAN_TYPE_ID, self.loan_type_id.as_deref())?,
            patron_type_id: require_uuid(PATRON_TYPE_ID, self.patron_type_id.as_deref())?,
            location_id: require_uuid(LOCATION_ID, self.location_id.as_deref())?,
        })
    }
}

/// Identifiers that passed [`RawCriteria::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidCriteria<'a> {
    pub item_type_id: &'a str,
    pub loan_type_id: &'a str,
    pub patron_type_id: &'a str,
    pub location_id: &'a str,
}

fn require_uuid<'a>(
    field: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, ValidationError> {
    let value = value.ok_or(ValidationError::Missing { field })?;
    if UUID.is_match(value) {
        Ok(value)
    } else {
        Err(ValidationError::InvalidUuid {
            field,
            value: value.to_owned(),
        })
    }
}

/// Validates requests, finds the tenant's rules and resolves locations, then
/// matches.
pub struct RulesEngine<S, L> {
    cache: TenantRuleCache<S>,
    locations: L,
}

impl<S: RuleTextSource, L: LocationResolver> RulesEngine<S, L> {
    pub fn new(source: S, locations: L, config: CacheConfig) -> Self {
        Self::with_cache(TenantRuleCache::new(source, config), locations)
    }

    pub fn with_cache(cache: TenantRuleCache<S>, locations: L) -> Self {
        Self { cache, locations }
    }

    /// The policy of `kind` from the best matching line.
    ///
    /// # Errors
    ///
    /// [`EngineError::Validation`] before anything else is consulted, then
    /// rule or location failures.
    #[instrument(skip(self, tenant, raw), fields(tenant = %tenant))]
    pub async fn apply(
        &self,
        tenant: &TenantId,
        raw: &RawCriteria,
        kind: PolicyKind,
    ) -> Result<PolicyMatch, EngineError> {
        let hit = self.apply_rule(tenant, raw).await?.policy(kind);
        debug!(policy_id = hit.policy_id(), line = hit.line(), "policy applied");
        Ok(hit)
    }

    /// The policy of `kind` from every matching line, best first, ending with
    /// the fallback.
    ///
    /// # Errors
    ///
    /// Same as [`apply`](Self::apply).
    #[instrument(skip(self, tenant, raw), fields(tenant = %tenant))]
    pub async fn apply_all(
        &self,
        tenant: &TenantId,
        raw: &RawCriteria,
        kind: PolicyKind,
    ) -> Result<Vec<PolicyMatch>, EngineError> {
        let (rules, criteria) = self.prepare(tenant, raw).await?;
        let matches: Vec<PolicyMatch> = rules
            .match_all(&criteria)
            .iter()
            .map(|m| m.policy(kind))
            .collect();
        debug!(matches = matches.len(), "policies applied");
        Ok(matches)
    }

    /// The best matching line with all of its policies.
    ///
    /// # Errors
    ///
    /// Same as [`apply`](Self::apply).
    pub async fn apply_rule(
        &self,
        tenant: &TenantId,
        raw: &RawCriteria,
    ) -> Result<RuleMatch, EngineError> {
        let (rules, criteria) = self.prepare(tenant, raw).await?;
        Ok(rules.match_best(&criteria))
    }

    /// Tell the engine `tenant`'s rule text changed.
    pub fn rules_changed(&self, tenant: &TenantId) {
        self.cache.invalidate(tenant);
    }

    /// See [`TenantRuleCache::invalidator`].
    pub fn change_hook(&self) -> impl Fn(&TenantId) + Send + Sync + 'static {
        self.cache.invalidator()
    }

    pub fn reconfigure_cache(&self, config: CacheConfig) {
        self.cache.reconfigure(config);
    }

    #[must_use]
    pub fn cache(&self) -> &TenantRuleCache<S> {
        &self.cache
    }

    #[must_use]
    pub fn locations(&self) -> &L {
        &self.locations
    }

    async fn prepare(
        &self,
        tenant: &TenantId,
        raw: &RawCriteria,
    ) -> Result<(Arc<CompiledRuleSet>, Criteria), EngineError> {
        let ids = raw.validate()?;
        let rules = self.cache.get(tenant).await?;
        let location = self
            .locations
            .resolve_location(tenant, ids.location_id)
            .await?;
        let criteria = Criteria::new(
            ids.item_type_id,
            ids.loan_type_id,
            ids.patron_type_id,
            location,
        );
        Ok((rules, criteria))
    }
}
