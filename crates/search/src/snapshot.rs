use crate::error::Result;
use crate::stem::TokenStemmer;
use std::collections::BTreeSet;
use tcode_catalog::text::tokenize;
use tcode_catalog::{Catalog, Fingerprint, LoadReport, PhraseTable};
use tcode_vector_store::{Embedder, EmbeddingCache, EmbeddingIndex};

/// Phrases, their vectors and per-phrase token data, all derived from one
/// catalog. Read-only once built.
#[derive(Debug)]
pub struct Snapshot {
    fingerprint: Fingerprint,
    model_id: String,
    report: LoadReport,
    phrases: PhraseTable,
    phrase_tokens: Vec<BTreeSet<String>>,
    phrase_stems: Vec<BTreeSet<String>>,
    index: EmbeddingIndex,
}

impl Snapshot {
    pub async fn build(
        catalog: &Catalog,
        embedder: &dyn Embedder,
        stemmer: &TokenStemmer,
        cache: Option<&EmbeddingCache>,
    ) -> Result<Self> {
        let phrases = PhraseTable::expand(catalog.records());
        let phrase_tokens: Vec<BTreeSet<String>> = phrases
            .phrases()
            .iter()
            .map(|p| tokenize(&p.normalized))
            .collect();
        let phrase_stems = phrase_tokens.iter().map(|t| stemmer.stems(t)).collect();

        let texts = phrases.normalized_texts();
        let index = match cache {
            Some(cache) => {
                EmbeddingIndex::build_cached(&texts, embedder, cache, catalog.fingerprint().value())
                    .await?
            }
            None => EmbeddingIndex::build(&texts, embedder).await?,
        };

        log::info!(
            "Built snapshot {} with {} phrase(s) for {} code(s) using {}",
            catalog.fingerprint(),
            phrases.len(),
            catalog.len(),
            embedder.model_id()
        );

        Ok(Self {
            fingerprint: catalog.fingerprint(),
            model_id: embedder.model_id().to_string(),
            report: catalog.report().clone(),
            phrases,
            phrase_tokens,
            phrase_stems,
            index,
        })
    }

    #[must_use]
    pub const fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    #[must_use]
    pub const fn report(&self) -> &LoadReport {
        &self.report
    }

    #[must_use]
    pub const fn phrases(&self) -> &PhraseTable {
        &self.phrases
    }

    #[must_use]
    pub fn phrase_tokens(&self) -> &[BTreeSet<String>] {
        &self.phrase_tokens
    }

    #[must_use]
    pub fn phrase_stems(&self) -> &[BTreeSet<String>] {
        &self.phrase_stems
    }

    #[must_use]
    pub const fn index(&self) -> &EmbeddingIndex {
        &self.index
    }
}
