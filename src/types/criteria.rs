use super::Dimension;

/// A location expanded into its full hierarchy.
///
/// Produced by a [`LocationResolver`](crate::LocationResolver); the matcher
/// never sees a bare location id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub shelving_location: String,
    pub library: String,
    pub campus: String,
    pub institution: String,
}

impl Location {
    #[must_use]
    pub fn new(
        shelving_location: impl Into<String>,
        library: impl Into<String>,
        campus: impl Into<String>,
        institution: impl Into<String>,
    ) -> Self {
        Self {
            shelving_location: shelving_location.into(),
            library: library.into(),
            campus: campus.into(),
            institution: institution.into(),
        }
    }
}

/// The fully resolved tuple a rule set is matched against.
///
/// Built fresh for every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criteria {
    item_type: String,
    loan_type: String,
    patron_group: String,
    location: Location,
}

impl Criteria {
    #[must_use]
    pub fn new(
        item_type: impl Into<String>,
        loan_type: impl Into<String>,
        patron_group: impl Into<String>,
        location: Location,
    ) -> Self {
        Self {
            item_type: item_type.into(),
            loan_type: loan_type.into(),
            patron_group: patron_group.into(),
            location,
        }
    }

    /// The value this request carries for `dimension`.
    #[must_use]
    pub fn value(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::LoanType => &self.loan_type,
            Dimension::ShelvingLocation => &self.location.shelving_location,
            Dimension::Library => &self.location.library,
            Dimension::Campus => &self.location.campus,
            Dimension::Institution => &self.location.institution,
            Dimension::MaterialType => &self.item_type,
            Dimension::PatronGroup => &self.patron_group,
        }
    }

    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }
}
