//! # Transaction catalog
//!
//! Turns a tabular transaction source into immutable records and the flat
//! list of searchable phrases the matcher and the embedding index work on.
//!
//! ```text
//! TableSource (CSV / memory)
//!     │
//!     ├──> ColumnAliases::resolve ──> Catalog { records, fingerprint, report }
//!     │
//!     └──> PhraseTable::expand
//!            └─> SearchablePhrase[] + code -> canonical description
//! ```

mod catalog;
mod columns;
mod error;
mod expand;
mod record;
mod source;
pub mod text;

pub use catalog::{Catalog, Fingerprint, LoadReport};
pub use columns::{ColumnAliases, ColumnMapping, Field};
pub use error::{CatalogError, Result};
pub use expand::{PhraseSource, PhraseTable, SearchablePhrase};
pub use record::{group_tags, TransactionRecord};
pub use source::{CsvSource, MemorySource, RawTable, TableSource};
