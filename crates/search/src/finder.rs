use crate::error::Result;
use crate::filter::CategoryFilter;
use crate::highlight::Highlighter;
use crate::matcher::{ExactMatcher, PhraseHit};
use crate::profile::SearchProfile;
use crate::ranker::{RankInput, SemanticRanker};
use crate::snapshot::Snapshot;
use crate::stem::TokenStemmer;
use crate::types::{MatchResult, MatchTier, Query, Resolution, SearchOutcome};
use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};
use tcode_catalog::text::{normalize, tokenize};
use tcode_catalog::{Catalog, ColumnAliases, LoadReport, TableSource};
use tcode_vector_store::{Embedder, EmbeddingCache};

/// Query dispatcher over the current snapshot.
///
/// ```text
/// Idle ──search──> QueryReceived
///                    ├─ no snapshot ───────────> NoData
///                    ├─ literal tier hit ──────> ExactResolved { tier }
///                    ├─ semantic hit ──────────> SemanticResolved
///                    └─ otherwise ─────────────> NoMatch
/// ```
///
/// A missing match is an outcome, not an error.
pub struct TransactionFinder {
    embedder: Arc<dyn Embedder>,
    stemmer: TokenStemmer,
    matcher: ExactMatcher,
    ranker: SemanticRanker,
    categories: BTreeSet<String>,
    max_results: usize,
    aliases: ColumnAliases,
    cache: Option<EmbeddingCache>,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
}

impl TransactionFinder {
    #[must_use]
    pub fn new(profile: &SearchProfile, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            stemmer: profile.stemmer(),
            matcher: profile.matcher(),
            ranker: profile.ranker(),
            categories: profile.categories().clone(),
            max_results: profile.max_results(),
            aliases: profile.column_aliases(),
            cache: None,
            snapshot: RwLock::new(None),
        }
    }

    /// Persists phrase vectors under `cache` keyed by model and fingerprint.
    #[must_use]
    pub fn with_cache(mut self, cache: EmbeddingCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Reads `source` and publishes a snapshot for it.
    ///
    /// An unreadable source clears the current snapshot, so later queries
    /// resolve to [`Resolution::NoData`], and the error is returned once.
    pub async fn load_source(&self, source: &dyn TableSource) -> Result<LoadReport> {
        match Catalog::load(source, &self.aliases) {
            Ok(catalog) => {
                let snapshot = self.load(&catalog).await?;
                Ok(snapshot.report().clone())
            }
            Err(err) => {
                log::error!("Transaction table unavailable: {err}");
                self.clear();
                Err(err.into())
            }
        }
    }

    /// Publishes a snapshot for `catalog`, reusing the current one when the
    /// fingerprint and model are unchanged.
    pub async fn load(&self, catalog: &Catalog) -> Result<Arc<Snapshot>> {
        if let Some(current) = self.snapshot() {
            if current.fingerprint() == catalog.fingerprint()
                && current.model_id() == self.embedder.model_id()
            {
                log::debug!("Snapshot {} unchanged; reusing", current.fingerprint());
                return Ok(current);
            }
        }

        let snapshot = Arc::new(
            Snapshot::build(
                catalog,
                self.embedder.as_ref(),
                &self.stemmer,
                self.cache.as_ref(),
            )
            .await?,
        );
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        Ok(snapshot)
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    #[must_use]
    pub const fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    pub async fn search(&self, query: &Query) -> Result<SearchOutcome> {
        let filter = CategoryFilter::new(query.categories.as_slice(), &self.categories)?;
        let Some(snapshot) = self.snapshot() else {
            log::debug!("No transaction table loaded; query resolves to no data");
            return Ok(SearchOutcome::no_data());
        };

        let normalized = normalize(&query.text);
        if normalized.is_empty() {
            return Ok(SearchOutcome::no_match());
        }
        let tokens = tokenize(&normalized);
        let highlighter = Highlighter::new(&query.text);
        let phrases = snapshot.phrases().phrases();

        if let Some(found) = self.matcher.find(
            &normalized,
            &tokens,
            snapshot.phrases(),
            snapshot.phrase_tokens(),
        ) {
            let hits: Vec<PhraseHit> = found
                .hits
                .into_iter()
                .filter(|h| filter.admits(phrases[h.phrase].group.as_deref()))
                .take(self.max_results)
                .collect();
            if hits.is_empty() {
                log::debug!("{} hits filtered out by categories", found.tier);
            } else {
                log::debug!("Resolved '{}' via {} tier", query.text, found.tier);
                return Ok(SearchOutcome {
                    mode: Resolution::ExactResolved { tier: found.tier },
                    results: self.results(&snapshot, &hits, found.tier, &highlighter),
                });
            }
        }

        if snapshot.index().is_empty() {
            return Ok(SearchOutcome::no_match());
        }

        let query_vector = self.embedder.embed(&normalized).await?;
        let scores = snapshot.index().scores(&query_vector)?;
        let query_stems = self.stemmer.stems(&tokens);
        let ranked = self.ranker.rank(
            &RankInput {
                query: &normalized,
                query_tokens: &tokens,
                query_stems: &query_stems,
                scores: &scores,
                phrases,
                phrase_stems: snapshot.phrase_stems(),
            },
            &filter,
        );

        if ranked.hits.is_empty() {
            log::debug!("No match for '{}'", query.text);
            return Ok(SearchOutcome::no_match());
        }
        Ok(SearchOutcome {
            mode: Resolution::SemanticResolved {
                confident: ranked.confident,
            },
            results: self.results(&snapshot, &ranked.hits, MatchTier::Semantic, &highlighter),
        })
    }

    fn results(
        &self,
        snapshot: &Snapshot,
        hits: &[PhraseHit],
        tier: MatchTier,
        highlighter: &Highlighter,
    ) -> Vec<MatchResult> {
        let table = snapshot.phrases();
        hits.iter()
            .filter_map(|hit| {
                let phrase = table.get(hit.phrase)?;
                let description = table
                    .canonical_description(&phrase.code)
                    .unwrap_or(phrase.text.as_str())
                    .to_string();
                Some(MatchResult {
                    highlighted: highlighter.apply(&description),
                    description,
                    code: phrase.code.clone(),
                    module: phrase.module.clone(),
                    target_system: phrase.target_system.clone(),
                    group: table.group(&phrase.code).map(str::to_string),
                    score: hit.score,
                    tier,
                })
            })
            .collect()
    }
}
