use crate::error::Result;
use std::path::{Path, PathBuf};

const CACHE_MAGIC: &[u8; 4] = b"TV01";
const HEADER_LEN: usize = 12;

/// Whole-index vector files: `<base>/<model>/<key>.bin`.
///
/// Layout: magic, `u32` dimension, `u32` count, then `count * dimension`
/// little-endian `f32`s. Reads that fail validation are treated as misses.
#[derive(Clone, Debug)]
pub struct EmbeddingCache {
    base_dir: PathBuf,
}

impl EmbeddingCache {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self, model_id: &str, key: u64) -> PathBuf {
        self.base_dir
            .join(safe_component(model_id))
            .join(format!("{key:016x}.bin"))
    }

    pub async fn get(
        &self,
        model_id: &str,
        key: u64,
        dimension: usize,
        count: usize,
    ) -> Option<Vec<Vec<f32>>> {
        let path = self.path(model_id, key);
        let bytes = tokio::fs::read(&path).await.ok()?;
        let decoded = decode_vectors(&bytes, dimension, count);
        if decoded.is_none() {
            log::debug!("Ignoring stale embedding cache file {}", path.display());
        }
        decoded
    }

    pub async fn put(
        &self,
        model_id: &str,
        key: u64,
        dimension: usize,
        vectors: &[Vec<f32>],
    ) -> Result<()> {
        let path = self.path(model_id, key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = encode_vectors(dimension, vectors);
        let tmp = path.with_extension("bin.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(err) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        Ok(())
    }
}

fn safe_component(raw: &str) -> String {
    let out: String = raw
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() || out.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        out
    }
}

#[allow(clippy::cast_possible_truncation)]
fn encode_vectors(dimension: usize, vectors: &[Vec<f32>]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + vectors.len() * dimension * 4);
    out.extend_from_slice(CACHE_MAGIC);
    out.extend_from_slice(&(dimension as u32).to_le_bytes());
    out.extend_from_slice(&(vectors.len() as u32).to_le_bytes());
    for vector in vectors {
        for v in vector {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
    out
}

fn decode_vectors(bytes: &[u8], dimension: usize, count: usize) -> Option<Vec<Vec<f32>>> {
    if bytes.len() < HEADER_LEN || &bytes[0..4] != CACHE_MAGIC {
        return None;
    }
    let dim = u32::from_le_bytes(bytes[4..8].try_into().ok()?) as usize;
    let stored = u32::from_le_bytes(bytes[8..12].try_into().ok()?) as usize;
    if dim != dimension || stored != count {
        return None;
    }
    let expected_len = HEADER_LEN.saturating_add(dim.saturating_mul(stored).saturating_mul(4));
    if bytes.len() != expected_len {
        return None;
    }

    let body = &bytes[HEADER_LEN..];
    let mut vectors = Vec::with_capacity(stored);
    for row in body.chunks_exact(dim.max(1) * 4).take(stored) {
        let mut vector = Vec::with_capacity(dim);
        for chunk in row.chunks_exact(4) {
            vector.push(f32::from_le_bytes(chunk.try_into().ok()?));
        }
        vectors.push(vector);
    }
    if vectors.len() != stored {
        return None;
    }
    Some(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn put_then_get_returns_vectors() {
        let dir = TempDir::new().unwrap();
        let cache = EmbeddingCache::new(dir.path());
        let vectors = vec![vec![0.5, -0.5], vec![1.0, 0.0]];

        cache.put("stub-2", 7, 2, &vectors).await.unwrap();
        assert_eq!(cache.get("stub-2", 7, 2, 2).await, Some(vectors));
    }

    #[tokio::test]
    async fn mismatched_shape_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = EmbeddingCache::new(dir.path());
        cache
            .put("m", 1, 3, &[vec![1.0, 2.0, 3.0]])
            .await
            .unwrap();

        assert!(cache.get("m", 1, 4, 1).await.is_none());
        assert!(cache.get("m", 1, 3, 2).await.is_none());
        assert!(cache.get("m", 2, 3, 1).await.is_none());
    }

    #[tokio::test]
    async fn corrupt_file_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = EmbeddingCache::new(dir.path());
        let path = cache.path("m", 9);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"TV01\x02\x00\x00\x00\x01\x00\x00\x00\x00").unwrap();
        assert!(cache.get("m", 9, 2, 1).await.is_none());
    }

    #[test]
    fn model_ids_become_safe_directory_names() {
        assert_eq!(safe_component("sentence-transformers/all-MiniLM"), "sentence-transformers_all-MiniLM");
        assert_eq!(safe_component(".."), "_");
        assert_eq!(safe_component(""), "_");
    }
}
