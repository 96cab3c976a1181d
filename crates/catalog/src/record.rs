use crate::text::normalize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One row of the transaction table after column resolution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Upper-cased, unique key.
    pub code: String,
    /// Official description; may hold several comma-separated phrasings.
    pub description: String,
    /// Extra phrasings; each entry may itself hold `;`-separated phrases.
    #[serde(default)]
    pub alternate_phrases: Vec<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub target_system: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

impl TransactionRecord {
    pub fn new(code: impl AsRef<str>, description: impl Into<String>) -> Self {
        Self {
            code: canonical_code(code.as_ref()),
            description: description.into(),
            alternate_phrases: Vec::new(),
            module: None,
            target_system: None,
            group: None,
        }
    }

    #[must_use]
    pub fn alternate(mut self, phrase: impl Into<String>) -> Self {
        self.alternate_phrases.push(phrase.into());
        self
    }

    #[must_use]
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = non_empty(module.into());
        self
    }

    #[must_use]
    pub fn target_system(mut self, system: impl Into<String>) -> Self {
        self.target_system = non_empty(system.into());
        self
    }

    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = non_empty(group.into());
        self
    }

    /// Normalized category tags of the `group` column (split on `;`, `,`, `|`).
    #[must_use]
    pub fn group_tags(&self) -> BTreeSet<String> {
        group_tags(self.group.as_deref())
    }
}

#[must_use]
pub fn group_tags(group: Option<&str>) -> BTreeSet<String> {
    group
        .unwrap_or_default()
        .split([';', ',', '|'])
        .map(normalize)
        .filter(|t| !t.is_empty())
        .collect()
}

pub(crate) fn canonical_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

pub(crate) fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}
