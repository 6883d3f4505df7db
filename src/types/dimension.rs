use std::fmt;

/// A criterion type a rule line can constrain.
///
/// Each dimension is written in rule text as a single letter. The location
/// dimensions form a hierarchy: a shelving location belongs to a library,
/// which belongs to a campus, which belongs to an institution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dimension {
    LoanType,
    ShelvingLocation,
    Library,
    Campus,
    Institution,
    MaterialType,
    PatronGroup,
}

impl Dimension {
    /// All dimensions, in the conventional `t, s, c, b, a, m, g` order.
    pub const ALL: [Dimension; 7] = [
        Dimension::LoanType,
        Dimension::ShelvingLocation,
        Dimension::Library,
        Dimension::Campus,
        Dimension::Institution,
        Dimension::MaterialType,
        Dimension::PatronGroup,
    ];

    #[must_use]
    pub fn code(self) -> char {
        match self {
            Dimension::LoanType => 't',
            Dimension::ShelvingLocation => 's',
            Dimension::Library => 'c',
            Dimension::Campus => 'b',
            Dimension::Institution => 'a',
            Dimension::MaterialType => 'm',
            Dimension::PatronGroup => 'g',
        }
    }

    /// Look up a dimension by its rule-text token. The token must be exactly
    /// one letter.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        let mut chars = token.chars();
        let code = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        Self::ALL.into_iter().find(|d| d.code() == code)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::LoanType => "loan type",
            Dimension::ShelvingLocation => "shelving location",
            Dimension::Library => "library",
            Dimension::Campus => "campus",
            Dimension::Institution => "institution",
            Dimension::MaterialType => "material type",
            Dimension::PatronGroup => "patron group",
        };
        write!(f, "{name} ({})", self.code())
    }
}

/// The kinds of policy a rule line assigns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PolicyKind {
    Loan,
    Request,
    Notice,
    OverdueFine,
    LostItemFee,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 5] = [
        PolicyKind::Loan,
        PolicyKind::Request,
        PolicyKind::Notice,
        PolicyKind::OverdueFine,
        PolicyKind::LostItemFee,
    ];

    #[must_use]
    pub fn code(self) -> char {
        match self {
            PolicyKind::Loan => 'l',
            PolicyKind::Request => 'r',
            PolicyKind::Notice => 'n',
            PolicyKind::OverdueFine => 'o',
            PolicyKind::LostItemFee => 'i',
        }
    }

    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        let mut chars = token.chars();
        let code = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        Self::ALL.into_iter().find(|k| k.code() == code)
    }

    /// Key under which a match for this kind is reported to API consumers.
    #[must_use]
    pub fn id_key(self) -> &'static str {
        match self {
            PolicyKind::Loan => "loanPolicyId",
            PolicyKind::Request => "requestPolicyId",
            PolicyKind::Notice => "noticePolicyId",
            PolicyKind::OverdueFine => "overdueFinePolicyId",
            PolicyKind::LostItemFee => "lostItemFeePolicyId",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            PolicyKind::Loan => 0,
            PolicyKind::Request => 1,
            PolicyKind::Notice => 2,
            PolicyKind::OverdueFine => 3,
            PolicyKind::LostItemFee => 4,
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PolicyKind::Loan => "loan",
            PolicyKind::Request => "request",
            PolicyKind::Notice => "notice",
            PolicyKind::OverdueFine => "overdue fine",
            PolicyKind::LostItemFee => "lost item fee",
        };
        write!(f, "{name} ({})", self.code())
    }
}
