use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Canonical record fields a source column can map onto.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Description,
    Code,
    Module,
    TargetSystem,
    Group,
    AlternatePhrases,
}

impl Field {
    pub const ALL: [Self; 6] = [
        Self::Description,
        Self::Code,
        Self::Module,
        Self::TargetSystem,
        Self::Group,
        Self::AlternatePhrases,
    ];

    /// Fields without which a row cannot produce a searchable record.
    #[must_use]
    pub const fn is_required(self) -> bool {
        matches!(self, Self::Description | Self::Code)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Code => "code",
            Self::Module => "module",
            Self::TargetSystem => "target_system",
            Self::Group => "group",
            Self::AlternatePhrases => "alternate_phrases",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const DEFAULT_ALIASES: &[(Field, &[&str])] = &[
    (
        Field::Description,
        &["descrição", "descricao", "description", "desc"],
    ),
    (
        Field::Code,
        &["transação", "transacao", "código", "codigo", "tcode", "code"],
    ),
    (Field::Module, &["módulo", "modulo", "module"]),
    (
        Field::TargetSystem,
        &[
            "sap",
            "sistema",
            "sap_system",
            "sap alvo",
            "target_sap",
            "system",
            "target_system",
        ],
    ),
    (Field::Group, &["grupo", "group", "categoria", "category"]),
    (
        Field::AlternatePhrases,
        &[
            "sinônimos",
            "sinonimos",
            "synonyms",
            "alternates",
            "alternate_phrases",
            "palavras-chave",
            "keywords",
        ],
    ),
];

/// Declarative mapping `canonical field -> accepted header aliases`.
///
/// Headers are compared after trimming and lower-casing. Resolution happens
/// once per load and yields a [`ColumnMapping`] with a fixed shape.
#[derive(Clone, Debug)]
pub struct ColumnAliases {
    aliases: BTreeMap<Field, BTreeSet<String>>,
}

impl Default for ColumnAliases {
    fn default() -> Self {
        let aliases = DEFAULT_ALIASES
            .iter()
            .map(|(field, names)| {
                let set = names.iter().map(|n| (*n).to_string()).collect();
                (*field, set)
            })
            .collect();
        Self { aliases }
    }
}

impl ColumnAliases {
    /// Adds extra accepted header names for `field`.
    pub fn extend<I, S>(&mut self, field: Field, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = self.aliases.entry(field).or_default();
        for name in names {
            let key = header_key(name.as_ref());
            if !key.is_empty() {
                set.insert(key);
            }
        }
    }

    #[must_use]
    pub fn aliases(&self, field: Field) -> Option<&BTreeSet<String>> {
        self.aliases.get(&field)
    }

    /// Resolves `headers` to column positions. The first header matching an
    /// alias wins; a header is never assigned to two fields.
    #[must_use]
    pub fn resolve(&self, headers: &[String]) -> ColumnMapping {
        let keys: Vec<String> = headers.iter().map(|h| header_key(h)).collect();
        let mut claimed = vec![false; keys.len()];
        let mut positions = BTreeMap::new();

        for field in Field::ALL {
            let Some(aliases) = self.aliases.get(&field) else {
                continue;
            };
            let hit = keys
                .iter()
                .enumerate()
                .find(|(idx, key)| !claimed[*idx] && aliases.contains(key.as_str()));
            if let Some((idx, _)) = hit {
                claimed[idx] = true;
                positions.insert(field, idx);
            }
        }

        ColumnMapping { positions }
    }
}

fn header_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Column positions for one concrete table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    positions: BTreeMap<Field, usize>,
}

impl ColumnMapping {
    #[must_use]
    pub fn position(&self, field: Field) -> Option<usize> {
        self.positions.get(&field).copied()
    }

    /// Required fields that no header resolved to.
    #[must_use]
    pub fn missing_required(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| f.is_required() && !self.positions.contains_key(f))
            .collect()
    }

    #[must_use]
    pub fn missing_optional(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| !f.is_required() && !self.positions.contains_key(f))
            .collect()
    }
}
