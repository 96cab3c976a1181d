use crate::embedding_cache::EmbeddingCache;
use crate::embeddings::{cosine_similarity, Embedder};
use crate::error::{Result, VectorStoreError};

/// Phrase-aligned vector index: `vectors[i]` embeds phrase `i`.
///
/// Brute-force cosine scan. Transaction tables hold a few thousand phrases,
/// so a full pass per query is cheaper than maintaining a graph.
#[derive(Clone, Debug)]
pub struct EmbeddingIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl EmbeddingIndex {
    /// Wraps precomputed vectors, one per phrase.
    ///
    /// A count or dimension mismatch is an error; vectors are never
    /// truncated or padded to fit.
    pub fn new(dimension: usize, phrase_count: usize, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if vectors.len() != phrase_count {
            return Err(VectorStoreError::CountMismatch {
                phrases: phrase_count,
                vectors: vectors.len(),
            });
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(VectorStoreError::InvalidDimension {
                expected: dimension,
                actual: bad.len(),
            });
        }
        Ok(Self { dimension, vectors })
    }

    /// Embeds `texts` in order with `embedder`.
    pub async fn build(texts: &[&str], embedder: &dyn Embedder) -> Result<Self> {
        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            embedder.embed_batch(texts.to_vec()).await?
        };
        Self::new(embedder.dimension(), texts.len(), vectors)
    }

    /// Like [`EmbeddingIndex::build`], but consults the on-disk cache under
    /// `key` first and stores freshly built vectors there afterwards.
    pub async fn build_cached(
        texts: &[&str],
        embedder: &dyn Embedder,
        cache: &EmbeddingCache,
        key: u64,
    ) -> Result<Self> {
        let model_id = embedder.model_id();
        if let Some(vectors) = cache
            .get(model_id, key, embedder.dimension(), texts.len())
            .await
        {
            log::debug!("Embedding cache hit for {model_id}/{key:016x}");
            return Self::new(embedder.dimension(), texts.len(), vectors);
        }

        log::debug!(
            "Embedding cache miss for {model_id}/{key:016x}; encoding {} phrase(s)",
            texts.len()
        );
        let index = Self::build(texts, embedder).await?;
        if let Err(err) = cache.put(model_id, key, index.dimension, &index.vectors).await {
            log::warn!("Failed to write embedding cache: {err}");
        }
        Ok(index)
    }

    /// Cosine similarity of `query` against every phrase, in phrase order.
    pub fn scores(&self, query: &[f32]) -> Result<Vec<f32>> {
        if query.len() != self.dimension {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        Ok(self
            .vectors
            .iter()
            .map(|vector| cosine_similarity(query, vector))
            .collect())
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}
