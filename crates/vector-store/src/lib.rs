//! # Transaction Vector Store
//!
//! Sentence embeddings and a phrase-aligned similarity index for the
//! semantic stage of transaction search.
//!
//! ## Architecture
//!
//! ```text
//! normalized phrases[]
//!     │
//!     ├──> Embedder (ONNX Runtime | stub)
//!     │      └─> Vec<f32> per phrase, L2 normalized
//!     │
//!     ├──> EmbeddingCache  <cache>/<model>/<fingerprint>.bin
//!     │
//!     └──> EmbeddingIndex
//!            └─> cosine score per phrase
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use tcode_vector_store::{Embedder, EmbeddingIndex, EmbeddingModel};
//!
//! #[tokio::main]
//! async fn main() -> tcode_vector_store::Result<()> {
//!     let model = EmbeddingModel::from_env()?;
//!     let index = EmbeddingIndex::build(&["display purchase order", "view po"], &model).await?;
//!
//!     let query = model.embed("show purchase order").await?;
//!     for score in index.scores(&query)? {
//!         println!("{score:.3}");
//!     }
//!     Ok(())
//! }
//! ```

mod embedding_cache;
mod embeddings;
mod error;
mod index;
mod paths;

pub use embedding_cache::EmbeddingCache;
pub use embeddings::{
    cosine_similarity, l2_normalize, Embedder, EmbeddingMode, EmbeddingModel, DEFAULT_MODEL_ID,
};
pub use error::{Result, VectorStoreError};
pub use index::EmbeddingIndex;
pub use paths::{default_cache_dir, model_dir};
