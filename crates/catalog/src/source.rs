use crate::error::{CatalogError, Result};
use std::path::{Path, PathBuf};

/// Header row plus string cells, exactly as the source supplied them.
#[derive(Clone, Debug, Default)]
pub struct RawTable {
    pub source_name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Cell at (`row`, `col`); short rows read as empty.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map_or("", String::as_str)
    }
}

/// A tabular record source read once per session.
pub trait TableSource {
    fn name(&self) -> String;
    fn load(&self) -> Result<RawTable>;
}

/// Comma-separated file with a header row.
#[derive(Clone, Debug)]
pub struct CsvSource {
    path: PathBuf,
    delimiter: u8,
}

impl CsvSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            delimiter: b',',
        }
    }

    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

impl TableSource for CsvSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<RawTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| CatalogError::unavailable(self.name(), e))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| CatalogError::unavailable(self.name(), e))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            match record {
                Ok(record) => rows.push(record.iter().map(str::to_string).collect()),
                // Undecodable rows are skipped; the rest of the table stays usable.
                Err(err) => log::warn!("Skipping unreadable row {} in {}: {err}", idx + 1, self.name()),
            }
        }

        log::debug!("Read {} rows from {}", rows.len(), self.name());
        Ok(RawTable {
            source_name: self.name(),
            headers,
            rows,
        })
    }
}

/// In-memory table, used by embedders of the library and by tests.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl MemorySource {
    pub fn new<H, S>(name: impl Into<String>, headers: H) -> Self
    where
        H: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn row<R, S>(mut self, cells: R) -> Self
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
        self
    }
}

impl TableSource for MemorySource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn load(&self) -> Result<RawTable> {
        Ok(RawTable {
            source_name: self.name.clone(),
            headers: self.headers.clone(),
            rows: self.rows.clone(),
        })
    }
}
