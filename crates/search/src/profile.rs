use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tcode_catalog::text::normalize;
use tcode_catalog::{ColumnAliases, Field};

use crate::matcher::ExactMatcher;
use crate::ranker::SemanticRanker;
use crate::stem::{StemmerLanguage, TokenStemmer};

const BUILTIN_GENERAL: &str = include_str!("../../../profiles/general.json");
const BUILTIN_STRICT: &str = include_str!("../../../profiles/strict.json");

pub const BUILTIN_PROFILES: [&str; 2] = ["general", "strict"];

/// Adaptive similarity thresholds keyed by query length in tokens.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    /// One token or fewer.
    pub short: f32,
    /// Two or three tokens.
    pub medium: f32,
    /// More than three tokens.
    pub long: f32,
    /// Raw cosine at which only the top semantic row is returned.
    pub confident: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            short: 0.55,
            medium: 0.45,
            long: 0.35,
            confident: 0.85,
        }
    }
}

impl Thresholds {
    #[must_use]
    pub const fn for_token_count(&self, tokens: usize) -> f32 {
        match tokens {
            0 | 1 => self.short,
            2 | 3 => self.medium,
            _ => self.long,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bonuses {
    /// Query text appears verbatim in the phrase.
    pub literal: f32,
    /// Query and phrase share a token stem.
    pub stem: f32,
}

impl Default for Bonuses {
    fn default() -> Self {
        Self {
            literal: 0.15,
            stem: 0.05,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchingConfig {
    pub filler_prefixes: Vec<String>,
    pub min_shared_tokens: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            filler_prefixes: [
                "transaction for",
                "transaction that",
                "transaction to",
                "transaction which",
                "tcode for",
                "code for",
                "transacao para",
                "transacao que",
                "transacao de",
                "codigo para",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            min_shared_tokens: 2,
        }
    }
}

/// Tunable search parameters, loaded from JSON or TOML.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchProfile {
    name: String,
    description: Option<String>,
    thresholds: Thresholds,
    bonuses: Bonuses,
    matching: MatchingConfig,
    max_results: usize,
    categories: BTreeSet<String>,
    stemmer: StemmerLanguage,
    columns: BTreeMap<Field, Vec<String>>,
}

impl Default for SearchProfile {
    fn default() -> Self {
        Self {
            name: "general".to_string(),
            description: Some("Balanced thresholds for free-text audit queries".to_string()),
            thresholds: Thresholds::default(),
            bonuses: Bonuses::default(),
            matching: MatchingConfig::default(),
            max_results: 20,
            categories: [
                "purchasing",
                "sales",
                "finance",
                "controlling",
                "inventory",
                "master data",
                "reporting",
                "security",
                "audit",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            stemmer: StemmerLanguage::English,
            columns: BTreeMap::new(),
        }
    }
}

impl SearchProfile {
    /// Bundled profile by name; every builtin other than `general` is
    /// layered over `general`.
    pub fn builtin(name: &str) -> Result<Self> {
        match name {
            "general" => Self::from_bytes("general", BUILTIN_GENERAL.as_bytes(), None),
            "strict" => Self::from_bytes("strict", BUILTIN_STRICT.as_bytes(), Some("general")),
            other => Err(anyhow!(
                "Unknown profile '{other}' (bundled: {})",
                BUILTIN_PROFILES.join(", ")
            )),
        }
    }

    pub fn from_file(profile_name: &str, path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read profile file {}", path.display()))?;
        Self::from_bytes(profile_name, &bytes, Some("general"))
    }

    pub fn from_bytes(profile_name: &str, bytes: &[u8], base: Option<&str>) -> Result<Self> {
        let raw = parse_raw(bytes).with_context(|| {
            format!("Profile '{profile_name}' is not valid JSON/TOML configuration")
        })?;
        let merged_raw = if let Some(base_name) = base {
            let base_raw = builtin_raw(base_name)?;
            merge_raw_profiles(base_raw, raw)
        } else {
            raw
        };
        Self::from_raw(merged_raw, profile_name)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub const fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    #[must_use]
    pub const fn bonuses(&self) -> &Bonuses {
        &self.bonuses
    }

    #[must_use]
    pub const fn matching(&self) -> &MatchingConfig {
        &self.matching
    }

    #[must_use]
    pub const fn max_results(&self) -> usize {
        self.max_results
    }

    /// Normalized category tags queries may filter on.
    #[must_use]
    pub const fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    #[must_use]
    pub const fn stemmer_language(&self) -> StemmerLanguage {
        self.stemmer
    }

    /// Built-in column aliases extended with the profile's `columns`.
    #[must_use]
    pub fn column_aliases(&self) -> ColumnAliases {
        let mut aliases = ColumnAliases::default();
        for (field, names) in &self.columns {
            aliases.extend(*field, names);
        }
        aliases
    }

    #[must_use]
    pub fn matcher(&self) -> ExactMatcher {
        ExactMatcher::new(&self.matching.filler_prefixes, self.matching.min_shared_tokens)
    }

    #[must_use]
    pub const fn ranker(&self) -> SemanticRanker {
        SemanticRanker::new(self.thresholds, self.bonuses, self.max_results)
    }

    #[must_use]
    pub fn stemmer(&self) -> TokenStemmer {
        TokenStemmer::new(self.stemmer)
    }

    fn from_raw(raw: RawProfile, fallback_name: &str) -> Result<Self> {
        if let Some(schema_version) = raw.schema_version {
            if schema_version != 1 {
                return Err(anyhow!(
                    "profile.schema_version {schema_version} is not supported (expected 1)"
                ));
            }
        }

        let defaults = Self::default();
        let name = raw
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| fallback_name.to_string());

        let thresholds = merge_thresholds(raw.thresholds, defaults.thresholds);
        let bonuses = merge_bonuses(raw.bonuses, defaults.bonuses);
        let matching = raw.matching.unwrap_or_default();
        let matching = MatchingConfig {
            filler_prefixes: matching
                .filler_prefixes
                .unwrap_or(defaults.matching.filler_prefixes),
            min_shared_tokens: matching
                .min_shared_tokens
                .unwrap_or(defaults.matching.min_shared_tokens),
        };
        let categories = raw
            .categories
            .map_or(defaults.categories, |tags| {
                tags.iter()
                    .map(|t| normalize(t))
                    .filter(|t| !t.is_empty())
                    .collect()
            });

        let profile = Self {
            description: raw.description,
            thresholds,
            bonuses,
            matching,
            max_results: raw.max_results.unwrap_or(defaults.max_results),
            categories,
            stemmer: raw.stemmer.unwrap_or(defaults.stemmer),
            columns: raw.columns.unwrap_or_default(),
            name,
        };
        profile
            .validate()
            .with_context(|| format!("Invalid search profile '{}'", profile.name))?;
        Ok(profile)
    }

    fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        for (key, value) in [
            ("thresholds.short", t.short),
            ("thresholds.medium", t.medium),
            ("thresholds.long", t.long),
            ("thresholds.confident", t.confident),
            ("bonuses.literal", self.bonuses.literal),
            ("bonuses.stem", self.bonuses.stem),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("{key} must be within [0, 1], got {value}"));
            }
        }
        if t.short < t.medium || t.medium < t.long {
            return Err(anyhow!(
                "thresholds must not increase with query length (short {} >= medium {} >= long {})",
                t.short,
                t.medium,
                t.long
            ));
        }
        if t.confident < t.short {
            return Err(anyhow!(
                "thresholds.confident ({}) must not be below thresholds.short ({})",
                t.confident,
                t.short
            ));
        }
        if self.max_results == 0 {
            return Err(anyhow!("max_results must be at least 1"));
        }
        if self.matching.min_shared_tokens == 0 {
            return Err(anyhow!("matching.min_shared_tokens must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RawProfile {
    #[serde(default)]
    schema_version: Option<u32>,
    name: Option<String>,
    description: Option<String>,
    thresholds: Option<RawThresholds>,
    bonuses: Option<RawBonuses>,
    matching: Option<RawMatching>,
    max_results: Option<usize>,
    categories: Option<Vec<String>>,
    stemmer: Option<StemmerLanguage>,
    columns: Option<BTreeMap<Field, Vec<String>>>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
struct RawThresholds {
    short: Option<f32>,
    medium: Option<f32>,
    long: Option<f32>,
    confident: Option<f32>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
struct RawBonuses {
    literal: Option<f32>,
    stem: Option<f32>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RawMatching {
    filler_prefixes: Option<Vec<String>>,
    min_shared_tokens: Option<usize>,
}

fn builtin_raw(name: &str) -> Result<RawProfile> {
    match name {
        "general" => parse_raw(BUILTIN_GENERAL.as_bytes()),
        "strict" => parse_raw(BUILTIN_STRICT.as_bytes()),
        other => Err(anyhow!("Base profile '{other}' not bundled")),
    }
}

/// Overlay scalars win; overlay lists replace base lists; `columns` merge
/// per field.
fn merge_raw_profiles(base: RawProfile, overlay: RawProfile) -> RawProfile {
    let thresholds = match (base.thresholds, overlay.thresholds) {
        (Some(b), Some(o)) => Some(RawThresholds {
            short: o.short.or(b.short),
            medium: o.medium.or(b.medium),
            long: o.long.or(b.long),
            confident: o.confident.or(b.confident),
        }),
        (b, o) => o.or(b),
    };
    let bonuses = match (base.bonuses, overlay.bonuses) {
        (Some(b), Some(o)) => Some(RawBonuses {
            literal: o.literal.or(b.literal),
            stem: o.stem.or(b.stem),
        }),
        (b, o) => o.or(b),
    };
    let matching = match (base.matching, overlay.matching) {
        (Some(b), Some(o)) => Some(RawMatching {
            filler_prefixes: o.filler_prefixes.or(b.filler_prefixes),
            min_shared_tokens: o.min_shared_tokens.or(b.min_shared_tokens),
        }),
        (b, o) => o.or(b),
    };
    let columns = match (base.columns, overlay.columns) {
        (Some(mut b), Some(o)) => {
            for (field, names) in o {
                b.entry(field).or_default().extend(names);
            }
            Some(b)
        }
        (b, o) => o.or(b),
    };

    RawProfile {
        schema_version: overlay.schema_version.or(base.schema_version),
        name: overlay.name.or(base.name),
        description: overlay.description.or(base.description),
        thresholds,
        bonuses,
        matching,
        max_results: overlay.max_results.or(base.max_results),
        categories: overlay.categories.or(base.categories),
        stemmer: overlay.stemmer.or(base.stemmer),
        columns,
    }
}

fn merge_thresholds(raw: Option<RawThresholds>, defaults: Thresholds) -> Thresholds {
    let raw = raw.unwrap_or_default();
    Thresholds {
        short: raw.short.unwrap_or(defaults.short),
        medium: raw.medium.unwrap_or(defaults.medium),
        long: raw.long.unwrap_or(defaults.long),
        confident: raw.confident.unwrap_or(defaults.confident),
    }
}

fn merge_bonuses(raw: Option<RawBonuses>, defaults: Bonuses) -> Bonuses {
    let raw = raw.unwrap_or_default();
    Bonuses {
        literal: raw.literal.unwrap_or(defaults.literal),
        stem: raw.stem.unwrap_or(defaults.stem),
    }
}

fn parse_raw(bytes: &[u8]) -> Result<RawProfile> {
    let value: serde_json::Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(json_err) => {
            let utf8 = std::str::from_utf8(bytes).map_err(|err| anyhow!("{json_err}; {err}"))?;
            let toml_value: toml::Value = toml::from_str(utf8).map_err(|toml_err| {
                anyhow!(
                    "Profile is not valid JSON or TOML ({json_err}); TOML parse error: {toml_err}"
                )
            })?;
            serde_json::to_value(toml_value)
                .map_err(|err| anyhow!("Failed to convert TOML profile to JSON: {err}"))?
        }
    };

    validate_profile_value(&value)?;
    serde_json::from_value(value).map_err(|err| anyhow!("Profile parse error: {err}"))
}

/// Rejects unknown keys, naming every offender by its dotted path.
fn validate_profile_value(value: &serde_json::Value) -> Result<()> {
    fn validate_object_keys(
        unknown: &mut Vec<String>,
        obj: &serde_json::Map<String, serde_json::Value>,
        base: &str,
        allowed: &[&str],
    ) {
        for key in obj.keys() {
            if !allowed.iter().any(|a| a == &key.as_str()) {
                if base.is_empty() {
                    unknown.push(key.clone());
                } else {
                    unknown.push(format!("{base}.{key}"));
                }
            }
        }
    }

    const fn object_at(
        value: &serde_json::Value,
    ) -> Option<&serde_json::Map<String, serde_json::Value>> {
        match value {
            serde_json::Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    let serde_json::Value::Object(root) = value else {
        return Err(anyhow!("Profile config must be a JSON object"));
    };

    let mut unknown = Vec::new();
    validate_object_keys(
        &mut unknown,
        root,
        "",
        &[
            "schema_version",
            "name",
            "description",
            "thresholds",
            "bonuses",
            "matching",
            "max_results",
            "categories",
            "stemmer",
            "columns",
        ],
    );

    if let Some(thresholds) = root.get("thresholds").and_then(object_at) {
        validate_object_keys(
            &mut unknown,
            thresholds,
            "thresholds",
            &["short", "medium", "long", "confident"],
        );
    }
    if let Some(bonuses) = root.get("bonuses").and_then(object_at) {
        validate_object_keys(&mut unknown, bonuses, "bonuses", &["literal", "stem"]);
    }
    if let Some(matching) = root.get("matching").and_then(object_at) {
        validate_object_keys(
            &mut unknown,
            matching,
            "matching",
            &["filler_prefixes", "min_shared_tokens"],
        );
    }
    if let Some(columns) = root.get("columns").and_then(object_at) {
        let fields: Vec<&str> = Field::ALL.iter().map(|f| f.as_str()).collect();
        validate_object_keys(&mut unknown, columns, "columns", &fields);
    }

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(anyhow!(
            "Profile config has unknown fields: {}",
            unknown.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn builtin_general_matches_defaults() {
        let profile = SearchProfile::builtin("general").unwrap();
        assert_eq!(profile, SearchProfile::default());
    }

    #[test]
    fn strict_layers_over_general() {
        let strict = SearchProfile::builtin("strict").unwrap();
        assert_eq!(strict.name(), "strict");
        assert!((strict.thresholds().short - 0.65).abs() < f32::EPSILON);
        assert_eq!(strict.max_results(), 5);
        assert_eq!(strict.matching().min_shared_tokens, 3);
        // Inherited from general.
        assert_eq!(
            strict.matching().filler_prefixes,
            MatchingConfig::default().filler_prefixes
        );
        assert!(strict.categories().contains("purchasing"));
    }

    #[test]
    fn unknown_builtin_is_an_error() {
        let err = SearchProfile::builtin("turbo").unwrap_err();
        assert!(err.to_string().contains("general, strict"), "{err}");
    }

    #[test]
    fn threshold_picks_by_token_count() {
        let t = Thresholds::default();
        assert!((t.for_token_count(1) - 0.55).abs() < f32::EPSILON);
        assert!((t.for_token_count(3) - 0.45).abs() < f32::EPSILON);
        assert!((t.for_token_count(4) - 0.35).abs() < f32::EPSILON);
    }

    #[test]
    fn profile_rejects_unknown_fields_with_paths() {
        let bytes = br#"
        {
          "schema_version": 1,
          "thresholds": { "short": 0.6, "tiny": 0.9 },
          "matching": { "prefixes": [] },
          "columns": { "sku": ["item"] },
          "colour": "blue"
        }
        "#;

        let err = SearchProfile::from_bytes("custom", bytes, None).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("thresholds.tiny"), "{msg}");
        assert!(msg.contains("matching.prefixes"), "{msg}");
        assert!(msg.contains("columns.sku"), "{msg}");
        assert!(msg.contains("colour"), "{msg}");
    }

    #[test]
    fn profile_rejects_unsupported_schema_version() {
        let bytes = br#"{ "schema_version": 999, "name": "x" }"#;
        let err = SearchProfile::from_bytes("custom", bytes, None).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("profile.schema_version"), "{msg}");
    }

    #[test]
    fn profile_rejects_inverted_thresholds() {
        let bytes = br#"{ "thresholds": { "short": 0.3, "long": 0.5 } }"#;
        let err = SearchProfile::from_bytes("custom", bytes, Some("general")).unwrap_err();
        assert!(format!("{err:#}").contains("must not increase"), "{err:#}");
    }

    #[test]
    fn profile_rejects_confident_below_short() {
        let bytes = br#"{ "thresholds": { "confident": 0.5 } }"#;
        let err = SearchProfile::from_bytes("custom", bytes, Some("general")).unwrap_err();
        assert!(format!("{err:#}").contains("thresholds.confident"), "{err:#}");

        let bytes = br#"{ "thresholds": { "short": 0.9, "confident": 0.9 } }"#;
        assert!(SearchProfile::from_bytes("custom", bytes, Some("general")).is_ok());
    }

    #[test]
    fn toml_profile_file_extends_columns_and_categories() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
name = "payables"
stemmer = "portuguese"
categories = ["Contas a Pagar", "Audit"]

[bonuses]
literal = 0.2

[columns]
code = ["t-code"]
"#
        )
        .unwrap();
        file.flush().unwrap();

        let profile = SearchProfile::from_file("custom", file.path()).unwrap();
        assert_eq!(profile.name(), "payables");
        assert_eq!(profile.stemmer_language(), StemmerLanguage::Portuguese);
        assert!((profile.bonuses().literal - 0.2).abs() < f32::EPSILON);
        assert!((profile.bonuses().stem - 0.05).abs() < f32::EPSILON);
        assert_eq!(
            profile.categories().iter().cloned().collect::<Vec<_>>(),
            vec!["audit".to_string(), "contas a pagar".to_string()]
        );

        let mapping = profile
            .column_aliases()
            .resolve(&["Descrição".to_string(), "T-Code".to_string()]);
        assert_eq!(mapping.position(Field::Code), Some(1));
    }
}
