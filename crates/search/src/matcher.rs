use crate::similarity::sequence_ratio;
use crate::types::MatchTier;
use std::collections::{BTreeSet, HashSet};
use tcode_catalog::text::normalize;
use tcode_catalog::{PhraseTable, SearchablePhrase};

/// Phrase hit from the literal tiers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhraseHit {
    pub phrase: usize,
    pub score: f32,
}

/// Tier that fired plus its hits, at most one per code.
#[derive(Clone, Debug, PartialEq)]
pub struct TierMatch {
    pub tier: MatchTier,
    pub hits: Vec<PhraseHit>,
}

/// Literal matching over expanded phrases: exact, filler-stripped exact,
/// then best token overlap. The first tier with a hit wins.
#[derive(Clone, Debug)]
pub struct ExactMatcher {
    /// Normalized, longest first.
    filler_prefixes: Vec<String>,
    min_shared_tokens: usize,
}

impl ExactMatcher {
    pub fn new<I, S>(filler_prefixes: I, min_shared_tokens: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut prefixes: Vec<String> = filler_prefixes
            .into_iter()
            .map(|p| normalize(p.as_ref()))
            .filter(|p| !p.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        prefixes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Self {
            filler_prefixes: prefixes,
            min_shared_tokens: min_shared_tokens.max(1),
        }
    }

    /// `query` and `query_tokens` must already be normalized; `phrase_tokens`
    /// is aligned with the table's phrases.
    #[must_use]
    pub fn find(
        &self,
        query: &str,
        query_tokens: &BTreeSet<String>,
        table: &PhraseTable,
        phrase_tokens: &[BTreeSet<String>],
    ) -> Option<TierMatch> {
        if query.is_empty() || table.is_empty() {
            return None;
        }

        let exact = exact_hits(query, table);
        if !exact.is_empty() {
            return Some(TierMatch {
                tier: MatchTier::Exact,
                hits: exact,
            });
        }

        if let Some(stripped) = self.strip_filler(query) {
            let hits = exact_hits(stripped, table);
            if !hits.is_empty() {
                return Some(TierMatch {
                    tier: MatchTier::PrefixExpanded,
                    hits,
                });
            }
        }

        self.best_overlap(query, query_tokens, table.phrases(), phrase_tokens)
            .map(|hit| TierMatch {
                tier: MatchTier::OverlapExpanded,
                hits: vec![hit],
            })
    }

    /// Query with its filler prefix removed, if one matched on a word
    /// boundary and something is left.
    #[must_use]
    pub fn strip_filler<'q>(&self, query: &'q str) -> Option<&'q str> {
        self.filler_prefixes.iter().find_map(|prefix| {
            let rest = query.strip_prefix(prefix.as_str())?.strip_prefix(' ')?;
            let rest = rest.trim();
            (!rest.is_empty()).then_some(rest)
        })
    }

    fn best_overlap(
        &self,
        query: &str,
        query_tokens: &BTreeSet<String>,
        phrases: &[SearchablePhrase],
        phrase_tokens: &[BTreeSet<String>],
    ) -> Option<PhraseHit> {
        if query_tokens.len() < self.min_shared_tokens {
            return None;
        }

        let mut best: Option<PhraseHit> = None;
        for (idx, (phrase, tokens)) in phrases.iter().zip(phrase_tokens).enumerate() {
            if tokens.intersection(query_tokens).count() < self.min_shared_tokens {
                continue;
            }
            let score = sequence_ratio(&phrase.normalized, query);
            if best.map_or(true, |b| score > b.score) {
                best = Some(PhraseHit { phrase: idx, score });
            }
        }
        best
    }
}

fn exact_hits(query: &str, table: &PhraseTable) -> Vec<PhraseHit> {
    let phrases = table.phrases();
    let mut seen = HashSet::new();
    table
        .exact_matches(query)
        .into_iter()
        .filter(|idx| seen.insert(phrases[*idx].code.as_str()))
        .map(|idx| PhraseHit {
            phrase: idx,
            score: 1.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tcode_catalog::text::tokenize;
    use tcode_catalog::{PhraseTable, TransactionRecord};

    fn table() -> PhraseTable {
        PhraseTable::expand(&[
            TransactionRecord::new("ME23N", "Display Purchase Order, View PO"),
            TransactionRecord::new("ME22N", "Change Purchase Order"),
            TransactionRecord::new("ME21N", "Create Purchase Order").alternate("new po; view po"),
            TransactionRecord::new("FB03", "Display Financial Document"),
        ])
    }

    fn run(matcher: &ExactMatcher, table: &PhraseTable, query: &str) -> Option<TierMatch> {
        let query = normalize(query);
        let tokens: Vec<_> = table.phrases().iter().map(|p| tokenize(&p.normalized)).collect();
        matcher.find(&query, &tokenize(&query), table, &tokens)
    }

    fn matcher() -> ExactMatcher {
        ExactMatcher::new(["transaction for", "Transaction that"], 2)
    }

    fn codes(table: &PhraseTable, found: &TierMatch) -> Vec<String> {
        found
            .hits
            .iter()
            .map(|h| table.phrases()[h.phrase].code.clone())
            .collect()
    }

    #[test]
    fn exact_tier_returns_every_code_with_the_phrase() {
        let table = table();
        let found = run(&matcher(), &table, "View PO!").unwrap();
        assert_eq!(found.tier, MatchTier::Exact);
        assert_eq!(codes(&table, &found), vec!["ME23N", "ME21N"]);
        assert!(found.hits.iter().all(|h| (h.score - 1.0).abs() < f32::EPSILON));
    }

    #[test]
    fn whole_multi_part_description_is_an_exact_hit() {
        let table = PhraseTable::expand(&[
            TransactionRecord::new("AAA1", "create order, x"),
            TransactionRecord::new("BBB2", "create order xx"),
        ]);
        let found = run(&matcher(), &table, "Create order, X").unwrap();
        assert_eq!(found.tier, MatchTier::Exact);
        assert_eq!(codes(&table, &found), vec!["AAA1"]);
    }

    #[test]
    fn filler_prefix_is_stripped_before_retrying() {
        let table = table();
        let found = run(&matcher(), &table, "transaction for change purchase order").unwrap();
        assert_eq!(found.tier, MatchTier::PrefixExpanded);
        assert_eq!(codes(&table, &found), vec!["ME22N"]);
    }

    #[test]
    fn prefix_must_end_on_a_word_boundary() {
        let m = matcher();
        assert_eq!(m.strip_filler("transaction format"), None);
        assert_eq!(m.strip_filler("transaction for"), None);
        assert_eq!(m.strip_filler("transaction that posts"), Some("posts"));
    }

    #[test]
    fn overlap_returns_single_best_ratio() {
        let table = table();
        let found = run(&matcher(), &table, "display purchase orders").unwrap();
        assert_eq!(found.tier, MatchTier::OverlapExpanded);
        assert_eq!(codes(&table, &found), vec!["ME23N"]);
        assert!(found.hits[0].score > 0.9 && found.hits[0].score < 1.0);
    }

    #[test]
    fn overlap_needs_enough_shared_tokens() {
        let table = table();
        assert_eq!(run(&matcher(), &table, "display invoice"), None);
        let lenient = ExactMatcher::new(Vec::<String>::new(), 1);
        assert!(run(&lenient, &table, "display invoice").is_some());
    }

    #[test]
    fn empty_inputs_never_match() {
        let table = table();
        assert_eq!(run(&matcher(), &table, "  ?? "), None);
        assert_eq!(run(&matcher(), &PhraseTable::default(), "view po"), None);
    }
}
