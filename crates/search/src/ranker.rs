use crate::filter::CategoryFilter;
use crate::matcher::PhraseHit;
use crate::profile::{Bonuses, Thresholds};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use tcode_catalog::SearchablePhrase;

/// Everything the ranker reads for one query. Slices are phrase-aligned.
#[derive(Clone, Copy, Debug)]
pub struct RankInput<'a> {
    /// Normalized query.
    pub query: &'a str,
    pub query_tokens: &'a BTreeSet<String>,
    pub query_stems: &'a BTreeSet<String>,
    /// Cosine similarity of the query against each phrase.
    pub scores: &'a [f32],
    pub phrases: &'a [SearchablePhrase],
    pub phrase_stems: &'a [BTreeSet<String>],
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ranked {
    /// Best phrase per code, best first.
    pub hits: Vec<PhraseHit>,
    /// Some admitted phrase reached the confident threshold.
    pub confident: bool,
}

/// Semantic stage: bonuses, adaptive threshold, per-code dedup, ordering.
#[derive(Clone, Copy, Debug)]
pub struct SemanticRanker {
    thresholds: Thresholds,
    bonuses: Bonuses,
    max_results: usize,
}

impl SemanticRanker {
    #[must_use]
    pub const fn new(thresholds: Thresholds, bonuses: Bonuses, max_results: usize) -> Self {
        Self {
            thresholds,
            bonuses,
            max_results,
        }
    }

    #[must_use]
    pub fn rank(&self, input: &RankInput<'_>, filter: &CategoryFilter) -> Ranked {
        if input.query.is_empty() || input.phrases.is_empty() {
            return Ranked::default();
        }

        let threshold = self.thresholds.for_token_count(input.query_tokens.len());
        let mut confident = false;
        let mut best: HashMap<&str, PhraseHit> = HashMap::new();

        for (idx, phrase) in input.phrases.iter().enumerate() {
            if !filter.admits(phrase.group.as_deref()) {
                continue;
            }
            let cosine = input.scores.get(idx).copied().unwrap_or(0.0);
            if cosine >= self.thresholds.confident {
                confident = true;
            }

            let literal = if phrase.normalized.contains(input.query) {
                self.bonuses.literal
            } else {
                0.0
            };
            let stem = match input.phrase_stems.get(idx) {
                Some(stems) if !stems.is_disjoint(input.query_stems) => self.bonuses.stem,
                _ => 0.0,
            };
            let score = cosine + literal + stem;

            // A verbatim hit qualifies even below the threshold.
            if score < threshold && literal <= 0.0 {
                continue;
            }

            let hit = PhraseHit { phrase: idx, score };
            best.entry(phrase.code.as_str())
                .and_modify(|kept| {
                    if score > kept.score {
                        *kept = hit;
                    }
                })
                .or_insert(hit);
        }

        let mut hits: Vec<PhraseHit> = best.into_values().collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| input.phrases[a.phrase].code.cmp(&input.phrases[b.phrase].code))
        });
        let limit = if confident { 1 } else { self.max_results };
        hits.truncate(limit);

        log::debug!(
            "Semantic ranking: threshold {threshold:.2}, {} hit(s){}",
            hits.len(),
            if confident { " (confident)" } else { "" }
        );
        Ranked { hits, confident }
    }
}
