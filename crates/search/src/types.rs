use serde::Serialize;
use std::fmt;

/// Matcher stage that produced a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    PrefixExpanded,
    OverlapExpanded,
    Semantic,
}

impl MatchTier {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::PrefixExpanded => "prefix_expanded",
            Self::OverlapExpanded => "overlap_expanded",
            Self::Semantic => "semantic",
        }
    }
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ranked row; at most one per code in any result set.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchResult {
    /// Canonical description of the code, not the phrase that matched.
    pub description: String,
    /// `description` with matched query terms wrapped in `**`.
    pub highlighted: String,
    pub code: String,
    pub module: Option<String>,
    pub target_system: Option<String>,
    pub group: Option<String>,
    pub score: f32,
    pub tier: MatchTier,
}

/// How a query was resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Resolution {
    ExactResolved { tier: MatchTier },
    SemanticResolved { confident: bool },
    NoMatch,
    /// No table is loaded; nothing was searched.
    NoData,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExactResolved { tier } => write!(f, "exact ({tier})"),
            Self::SemanticResolved { confident: true } => f.write_str("semantic (confident)"),
            Self::SemanticResolved { confident: false } => f.write_str("semantic"),
            Self::NoMatch => f.write_str("no match"),
            Self::NoData => f.write_str("no data"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    pub text: String,
    /// Category tags every result's group must carry.
    pub categories: Vec<String>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            categories: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_category(mut self, tag: impl Into<String>) -> Self {
        self.categories.push(tag.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchOutcome {
    #[serde(flatten)]
    pub mode: Resolution,
    pub results: Vec<MatchResult>,
}

impl SearchOutcome {
    #[must_use]
    pub const fn no_data() -> Self {
        Self {
            mode: Resolution::NoData,
            results: Vec::new(),
        }
    }

    #[must_use]
    pub const fn no_match() -> Self {
        Self {
            mode: Resolution::NoMatch,
            results: Vec::new(),
        }
    }
}
