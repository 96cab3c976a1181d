use crate::record::TransactionRecord;
use crate::text::normalize;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Where a phrase came from inside its record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhraseSource {
    Description,
    Alternate,
}

/// One searchable phrasing of a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchablePhrase {
    /// Trimmed, lower-cased phrase as written in the table.
    pub text: String,
    /// `normalize(text)`; what every comparison uses.
    pub normalized: String,
    pub code: String,
    pub module: Option<String>,
    pub target_system: Option<String>,
    pub group: Option<String>,
    pub source: PhraseSource,
}

/// Flat phrase list plus the per-code lookups used for display.
///
/// Regenerated whenever the table changes and never mutated afterwards.
#[derive(Clone, Debug, Default)]
pub struct PhraseTable {
    phrases: Vec<SearchablePhrase>,
    canonical: HashMap<String, String>,
    groups: HashMap<String, String>,
    /// Whole normalized description of multi-part records, pointing at the
    /// record's first phrase. Exact-match keys only, never embedded.
    whole_descriptions: Vec<(String, usize)>,
    seen: HashMap<(String, String), usize>,
}

impl PhraseTable {
    /// Expands every record into its description parts and alternate phrases.
    #[must_use]
    pub fn expand(records: &[TransactionRecord]) -> Self {
        let mut table = Self::default();
        for record in records {
            table.push_record(record);
        }
        log::debug!(
            "Expanded {} record(s) into {} phrase(s)",
            records.len(),
            table.phrases.len()
        );
        table
    }

    fn push_record(&mut self, record: &TransactionRecord) {
        // First record with a given code owns the display lookups.
        self.canonical
            .entry(record.code.clone())
            .or_insert_with(|| record.description.trim().to_string());
        if let Some(group) = &record.group {
            self.groups
                .entry(record.code.clone())
                .or_insert_with(|| group.clone());
        }

        let parts = description_parts(&record.description);
        let multi_part = parts.len() > 1;
        let mut first = None;
        for part in parts {
            let idx = self.push_phrase(record, part, PhraseSource::Description);
            first = first.or(idx);
        }
        if let Some(idx) = first.filter(|_| multi_part) {
            let whole = normalize(&record.description);
            if !whole.is_empty() {
                self.whole_descriptions.push((whole, idx));
            }
        }

        for entry in &record.alternate_phrases {
            for part in entry.split(';') {
                self.push_phrase(record, part, PhraseSource::Alternate);
            }
        }
    }

    /// Index of the phrase for `raw`; a phrase already present for the same
    /// code is reused rather than pushed twice.
    fn push_phrase(
        &mut self,
        record: &TransactionRecord,
        raw: &str,
        source: PhraseSource,
    ) -> Option<usize> {
        let text = raw.trim().to_lowercase();
        let normalized = normalize(&text);
        if normalized.is_empty() {
            return None;
        }
        let key = (record.code.clone(), normalized.clone());
        if let Some(idx) = self.seen.get(&key) {
            return Some(*idx);
        }

        let idx = self.phrases.len();
        self.seen.insert(key, idx);
        self.phrases.push(SearchablePhrase {
            text,
            normalized,
            code: record.code.clone(),
            module: record.module.clone(),
            target_system: record.target_system.clone(),
            group: record.group.clone(),
            source,
        });
        Some(idx)
    }

    /// Phrases `normalized` equals exactly, in table order.
    ///
    /// Besides each phrase, a multi-part description also matches as a
    /// whole, resolving to that record's first phrase.
    #[must_use]
    pub fn exact_matches(&self, normalized: &str) -> Vec<usize> {
        let phrases = self
            .phrases
            .iter()
            .enumerate()
            .filter(|(_, p)| p.normalized == normalized)
            .map(|(idx, _)| idx);
        let wholes = self
            .whole_descriptions
            .iter()
            .filter(|(whole, _)| whole == normalized)
            .map(|(_, idx)| *idx);
        phrases
            .chain(wholes)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    #[must_use]
    pub fn phrases(&self) -> &[SearchablePhrase] {
        &self.phrases
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&SearchablePhrase> {
        self.phrases.get(idx)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// Official description for `code`.
    #[must_use]
    pub fn canonical_description(&self, code: &str) -> Option<&str> {
        self.canonical.get(code).map(String::as_str)
    }

    #[must_use]
    pub fn group(&self, code: &str) -> Option<&str> {
        self.groups.get(code).map(String::as_str)
    }

    /// Normalized texts in phrase order, the embedding input.
    #[must_use]
    pub fn normalized_texts(&self) -> Vec<&str> {
        self.phrases.iter().map(|p| p.normalized.as_str()).collect()
    }
}

/// Comma-separated parts of a description, or the whole string when
/// splitting yields nothing usable.
fn description_parts(description: &str) -> Vec<&str> {
    let parts: Vec<&str> = description
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        vec![description.trim()]
    } else {
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn comma_separated_description_yields_one_phrase_per_part() {
        let records = vec![TransactionRecord::new("ME23N", "Display Purchase Order, View PO")];
        let table = PhraseTable::expand(&records);

        let texts: Vec<&str> = table.phrases().iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["display purchase order", "view po"]);
        assert!(table.phrases().iter().all(|p| p.code == "ME23N"));
        assert_eq!(
            table.canonical_description("ME23N"),
            Some("Display Purchase Order, View PO")
        );
    }

    #[test]
    fn alternate_phrases_split_on_semicolons() {
        let records = vec![TransactionRecord::new("MIGO", "goods movement")
            .alternate("post goods receipt; entrada de mercadoria;  ")
            .group("Inventory")];
        let table = PhraseTable::expand(&records);

        assert_eq!(table.len(), 3);
        assert_eq!(table.phrases()[1].source, PhraseSource::Alternate);
        assert_eq!(table.phrases()[2].normalized, "entrada de mercadoria");
        assert_eq!(table.group("MIGO"), Some("Inventory"));
    }

    #[test]
    fn punctuation_only_parts_are_skipped() {
        let records = vec![TransactionRecord::new("FB03", ",, - ,display document")];
        let table = PhraseTable::expand(&records);
        assert_eq!(table.len(), 1);
        assert_eq!(table.phrases()[0].normalized, "display document");
    }

    #[test]
    fn duplicate_codes_keep_first_canonical_description() {
        let records = vec![
            TransactionRecord::new("ME21N", "create purchase order"),
            TransactionRecord::new("ME21N", "new po"),
        ];
        let table = PhraseTable::expand(&records);
        assert_eq!(table.len(), 2);
        assert_eq!(table.canonical_description("ME21N"), Some("create purchase order"));
    }

    #[test]
    fn repeated_phrases_of_one_code_are_kept_once() {
        let records = vec![
            TransactionRecord::new("ME21N", "create purchase order, new PO")
                .alternate("New PO; create  purchase order"),
            TransactionRecord::new("ME21N", "Create Purchase Order"),
            TransactionRecord::new("ME22N", "new po"),
        ];
        let table = PhraseTable::expand(&records);
        let pairs: Vec<(&str, &str)> = table
            .phrases()
            .iter()
            .map(|p| (p.code.as_str(), p.normalized.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("ME21N", "create purchase order"),
                ("ME21N", "new po"),
                ("ME22N", "new po"),
            ]
        );
    }

    #[test]
    fn whole_description_matches_exactly() {
        let records = vec![
            TransactionRecord::new("AAA1", "create order, x"),
            TransactionRecord::new("BBB2", "create order xx"),
        ];
        let table = PhraseTable::expand(&records);

        assert_eq!(table.exact_matches("create order x"), vec![0]);
        assert_eq!(table.exact_matches("create order"), vec![0]);
        assert_eq!(table.exact_matches("create order xx"), vec![2]);
        assert!(table.exact_matches("order").is_empty());
        // Whole-description keys are not phrases and are never embedded.
        assert_eq!(table.normalized_texts(), vec!["create order", "x", "create order xx"]);
    }

    #[test]
    fn carries_record_metadata() {
        let records = vec![TransactionRecord::new("VA01", "create sales order")
            .module("SD")
            .target_system("S4")];
        let table = PhraseTable::expand(&records);
        let phrase = &table.phrases()[0];
        assert_eq!(phrase.module.as_deref(), Some("SD"));
        assert_eq!(phrase.target_system.as_deref(), Some("S4"));
    }
}
