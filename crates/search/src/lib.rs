//! # Transaction Search
//!
//! Finds transaction codes for natural-language queries.
//!
//! ## Pipeline
//!
//! ```text
//! query
//!   │ normalize
//!   ├──> ExactMatcher     exact → filler-stripped exact → best token overlap
//!   │        └─ hit ──> ExactResolved { tier }
//!   │
//!   └──> Embedder + EmbeddingIndex ──> SemanticRanker
//!            adaptive threshold, literal/stem bonuses, one row per code
//!            └─ hit ──> SemanticResolved
//! ```
//!
//! [`TransactionFinder`] owns the current [`Snapshot`] and runs the
//! pipeline; [`SearchProfile`] carries every tunable number.

mod error;
mod filter;
mod finder;
mod highlight;
mod matcher;
mod profile;
mod ranker;
mod similarity;
mod snapshot;
mod stem;
mod types;

pub use error::{Result, SearchError};
pub use filter::CategoryFilter;
pub use finder::TransactionFinder;
pub use highlight::Highlighter;
pub use matcher::{ExactMatcher, PhraseHit, TierMatch};
pub use profile::{Bonuses, MatchingConfig, SearchProfile, Thresholds, BUILTIN_PROFILES};
pub use ranker::{RankInput, Ranked, SemanticRanker};
pub use similarity::sequence_ratio;
pub use snapshot::Snapshot;
pub use stem::{StemmerLanguage, TokenStemmer};
pub use tcode_catalog::text::{normalize, tokenize};
pub use types::{MatchResult, MatchTier, Query, Resolution, SearchOutcome};
