use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] tcode_vector_store::VectorStoreError),

    #[error("Catalog error: {0}")]
    CatalogError(#[from] tcode_catalog::CatalogError),

    #[error("Unknown category '{tag}' (known: {})", known.join(", "))]
    UnknownCategory { tag: String, known: Vec<String> },
}
