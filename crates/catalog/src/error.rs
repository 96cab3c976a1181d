use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Transaction table unavailable ({source_name}): {reason}")]
    SourceUnavailable { source_name: String, reason: String },
}

impl CatalogError {
    pub fn unavailable(source_name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}
