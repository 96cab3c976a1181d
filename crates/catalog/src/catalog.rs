use crate::columns::{ColumnAliases, ColumnMapping, Field};
use crate::error::Result;
use crate::record::{canonical_code, non_empty, TransactionRecord};
use crate::source::{RawTable, TableSource};
use crate::text::clean_cell;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;

/// Content fingerprint of a loaded table; equal tables hash equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Fingerprint(u64);

impl Fingerprint {
    #[must_use]
    pub fn of(records: &[TransactionRecord]) -> Self {
        let mut hasher = Sha256::new();
        for record in records {
            hasher.update(record.code.as_bytes());
            hasher.update([0x1f_u8]);
            hasher.update(record.description.as_bytes());
            hasher.update([0x1f_u8]);
            for phrase in &record.alternate_phrases {
                hasher.update(phrase.as_bytes());
                hasher.update([0x1d_u8]);
            }
            for field in [&record.module, &record.target_system, &record.group] {
                hasher.update([0x1f_u8]);
                hasher.update(field.as_deref().unwrap_or_default().as_bytes());
            }
            hasher.update([0x1e_u8]);
        }
        let digest = hasher.finalize();
        Self(u64::from_be_bytes([
            digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
        ]))
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// What happened while turning a raw table into records.
#[derive(Clone, Debug, Default, Serialize)]
pub struct LoadReport {
    pub source_name: String,
    pub rows_read: usize,
    pub rows_kept: usize,
    /// Rows dropped for an empty description or code.
    pub rows_dropped: usize,
    /// Kept records whose code an earlier record already used. The first
    /// one owns the display lookups; later phrases still map to the code.
    pub duplicate_codes: usize,
    /// Required columns absent after alias resolution (values read as empty).
    pub missing_columns: Vec<Field>,
    pub missing_optional_columns: Vec<Field>,
}

impl LoadReport {
    #[must_use]
    pub fn schema_incomplete(&self) -> bool {
        !self.missing_columns.is_empty()
    }
}

/// An immutable, loaded transaction table.
#[derive(Clone, Debug)]
pub struct Catalog {
    records: Vec<TransactionRecord>,
    fingerprint: Fingerprint,
    report: LoadReport,
}

impl Catalog {
    /// Reads `source` once and resolves its columns through `aliases`.
    ///
    /// Only an unreadable source is an error. Missing columns and malformed
    /// cells degrade to empty values and are recorded in the [`LoadReport`].
    pub fn load(source: &dyn TableSource, aliases: &ColumnAliases) -> Result<Self> {
        let table = source.load()?;
        Ok(Self::from_table(&table, aliases))
    }

    #[must_use]
    pub fn from_table(table: &RawTable, aliases: &ColumnAliases) -> Self {
        let mapping = aliases.resolve(&table.headers);
        let missing = mapping.missing_required();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|f| f.as_str()).collect();
            log::warn!(
                "Table {} is missing required column(s) {}; substituting empty values",
                table.source_name,
                names.join(", ")
            );
        }

        let mut records = Vec::with_capacity(table.rows.len());
        let mut dropped = 0usize;
        for row in 0..table.rows.len() {
            match record_from_row(table, &mapping, row) {
                Some(record) => records.push(record),
                None => dropped += 1,
            }
        }

        let report = LoadReport {
            source_name: table.source_name.clone(),
            rows_read: table.rows.len(),
            rows_kept: records.len(),
            rows_dropped: dropped,
            duplicate_codes: count_duplicates(&records),
            missing_columns: missing,
            missing_optional_columns: mapping.missing_optional(),
        };
        log::info!(
            "Loaded {} transaction(s) from {} ({} dropped)",
            report.rows_kept,
            report.source_name,
            report.rows_dropped
        );

        Self::with_report(records, report)
    }

    /// Builds a catalog straight from records (already canonical).
    #[must_use]
    pub fn from_records(records: Vec<TransactionRecord>) -> Self {
        let report = LoadReport {
            source_name: "<memory>".to_string(),
            rows_read: records.len(),
            rows_kept: records.len(),
            duplicate_codes: count_duplicates(&records),
            ..LoadReport::default()
        };
        Self::with_report(records, report)
    }

    fn with_report(records: Vec<TransactionRecord>, report: LoadReport) -> Self {
        let fingerprint = Fingerprint::of(&records);
        Self {
            records,
            fingerprint,
            report,
        }
    }

    #[must_use]
    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    #[must_use]
    pub const fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    #[must_use]
    pub const fn report(&self) -> &LoadReport {
        &self.report
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn count_duplicates(records: &[TransactionRecord]) -> usize {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| !seen.insert(r.code.as_str()))
        .count()
}

fn record_from_row(table: &RawTable, mapping: &ColumnMapping, row: usize) -> Option<TransactionRecord> {
    let get = |field: Field| -> String {
        mapping
            .position(field)
            .map(|col| clean_cell(table.cell(row, col)))
            .unwrap_or_default()
    };

    let description = get(Field::Description);
    let code = canonical_code(&get(Field::Code));
    if description.is_empty() || code.is_empty() {
        return None;
    }

    let alternates = get(Field::AlternatePhrases);
    Some(TransactionRecord {
        code,
        description,
        alternate_phrases: if alternates.is_empty() {
            Vec::new()
        } else {
            vec![alternates]
        },
        module: non_empty(get(Field::Module)),
        target_system: non_empty(get(Field::TargetSystem)),
        group: non_empty(get(Field::Group)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use pretty_assertions::assert_eq;

    fn source() -> MemorySource {
        MemorySource::new("memory", ["Descrição", "Transação", "Módulo", "SAP", "Sinônimos"])
            .row(["display purchase order, view PO", "me23n", "MM", "ECC", "show po; po display"])
            .row(["create purchase requisition", "ME51N", "nan", "", ""])
            .row(["", "XX01", "", "", ""])
            .row(["orphan description", "None", "", "", ""])
    }

    #[test]
    fn loads_records_and_drops_incomplete_rows() {
        let catalog = Catalog::load(&source(), &ColumnAliases::default()).unwrap();
        assert_eq!(catalog.len(), 2);

        let first = &catalog.records()[0];
        assert_eq!(first.code, "ME23N");
        assert_eq!(first.module.as_deref(), Some("MM"));
        assert_eq!(first.target_system.as_deref(), Some("ECC"));
        assert_eq!(first.alternate_phrases, vec!["show po; po display".to_string()]);

        let second = &catalog.records()[1];
        assert_eq!(second.module, None);
        assert!(second.alternate_phrases.is_empty());

        let report = catalog.report();
        assert_eq!(report.rows_read, 4);
        assert_eq!(report.rows_kept, 2);
        assert_eq!(report.rows_dropped, 2);
        assert_eq!(report.duplicate_codes, 0);
        assert!(!report.schema_incomplete());
        assert_eq!(report.missing_optional_columns, vec![Field::Group]);
    }

    #[test]
    fn missing_required_column_degrades_to_empty_catalog() {
        let src = MemorySource::new("memory", ["description", "module"])
            .row(["display purchase order", "MM"]);
        let catalog = Catalog::load(&src, &ColumnAliases::default()).unwrap();
        assert!(catalog.is_empty());
        assert!(catalog.report().schema_incomplete());
        assert_eq!(catalog.report().missing_columns, vec![Field::Code]);
    }

    #[test]
    fn repeated_codes_are_kept_and_counted() {
        let src = source()
            .row(["view purchase order", "ME23N", "MM", "", ""])
            .row(["po overview", " me23n ", "", "", ""]);
        let catalog = Catalog::load(&src, &ColumnAliases::default()).unwrap();
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.report().duplicate_codes, 2);

        let records = vec![
            TransactionRecord::new("FB03", "display document"),
            TransactionRecord::new("FB03", "show document"),
        ];
        assert_eq!(Catalog::from_records(records).report().duplicate_codes, 1);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = Catalog::load(&source(), &ColumnAliases::default()).unwrap();
        let b = Catalog::load(&source(), &ColumnAliases::default()).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());

        let changed = source().row(["post goods receipt", "MIGO", "MM", "", ""]);
        let c = Catalog::load(&changed, &ColumnAliases::default()).unwrap();
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().to_string().len(), 16);
    }
}
