use rust_stemmers::{Algorithm, Stemmer};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;

/// Snowball stemmer language used for the stem bonus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StemmerLanguage {
    #[default]
    English,
    Portuguese,
}

impl StemmerLanguage {
    const fn algorithm(self) -> Algorithm {
        match self {
            Self::English => Algorithm::English,
            Self::Portuguese => Algorithm::Portuguese,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::English => "english",
            Self::Portuguese => "portuguese",
        }
    }
}

/// Stems normalized tokens. Immutable; build once and share.
pub struct TokenStemmer {
    language: StemmerLanguage,
    stemmer: Stemmer,
}

impl TokenStemmer {
    #[must_use]
    pub fn new(language: StemmerLanguage) -> Self {
        Self {
            language,
            stemmer: Stemmer::create(language.algorithm()),
        }
    }

    #[must_use]
    pub const fn language(&self) -> StemmerLanguage {
        self.language
    }

    /// Stems of every token in `tokens`.
    pub fn stems<'a, I>(&self, tokens: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        tokens
            .into_iter()
            .map(|token| self.stemmer.stem(token).into_owned())
            .collect()
    }
}

impl fmt::Debug for TokenStemmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStemmer")
            .field("language", &self.language)
            .finish()
    }
}
