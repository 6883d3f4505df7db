use std::fmt;

use super::PolicyKind;

/// A complete mapping from every [`PolicyKind`] to a policy id.
///
/// Policy ids are opaque to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySet {
    ids: [String; 5],
}

impl PolicySet {
    /// Build a policy set from one id per kind, in [`PolicyKind::ALL`] order.
    #[must_use]
    pub fn new(
        loan: impl Into<String>,
        request: impl Into<String>,
        notice: impl Into<String>,
        overdue_fine: impl Into<String>,
        lost_item_fee: impl Into<String>,
    ) -> Self {
        Self {
            ids: [
                loan.into(),
                request.into(),
                notice.into(),
                overdue_fine.into(),
                lost_item_fee.into(),
            ],
        }
    }

    #[must_use]
    pub fn get(&self, kind: PolicyKind) -> &str {
        &self.ids[kind.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (PolicyKind, &str)> {
        PolicyKind::ALL
            .into_iter()
            .map(move |kind| (kind, self.get(kind)))
    }
}

impl fmt::Display for PolicySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (kind, id) in self.iter() {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{} {id}", kind.code())?;
            first = false;
        }
        Ok(())
    }
}

/// Policy assignments gathered while walking nested rule lines; gaps are
/// filled from ancestors and finally from the fallback.
#[derive(Debug, Clone, Default)]
pub(crate) struct PartialPolicySet {
    ids: [Option<String>; 5],
}

impl PartialPolicySet {
    pub(crate) fn get(&self, kind: PolicyKind) -> Option<&str> {
        self.ids[kind.index()].as_deref()
    }

    /// Returns `false` if `kind` was already assigned.
    pub(crate) fn assign(&mut self, kind: PolicyKind, id: String) -> bool {
        let slot = &mut self.ids[kind.index()];
        if slot.is_some() {
            return false;
        }
        *slot = Some(id);
        true
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.ids.iter().all(Option::is_none)
    }

    /// Layer `self` over `inherited`: own assignments win.
    pub(crate) fn over(&self, inherited: &PartialPolicySet) -> PartialPolicySet {
        let mut merged = inherited.clone();
        for kind in PolicyKind::ALL {
            if let Some(id) = self.get(kind) {
                merged.ids[kind.index()] = Some(id.to_owned());
            }
        }
        merged
    }

    /// Resolve into a complete set, taking every gap from `fallback`.
    pub(crate) fn complete(&self, fallback: &PolicySet) -> PolicySet {
        let ids = PolicyKind::ALL.map(|kind| {
            self.get(kind)
                .map_or_else(|| fallback.get(kind).to_owned(), str::to_owned)
        });
        PolicySet { ids }
    }

    /// Convert without a fallback, reporting the first unassigned kind.
    pub(crate) fn into_complete(self) -> Result<PolicySet, PolicyKind> {
        let mut ids: [String; 5] = Default::default();
        for kind in PolicyKind::ALL {
            match &self.ids[kind.index()] {
                Some(id) => ids[kind.index()] = id.clone(),
                None => return Err(kind),
            }
        }
        Ok(PolicySet { ids })
    }
}
