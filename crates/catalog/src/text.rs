//! Text canonicalization shared by the expander, the matcher and the ranker.
//!
//! Every comparison in the pipeline happens between strings produced by
//! [`normalize`], so two phrases that differ only in case, accents,
//! punctuation or spacing compare equal.

use std::collections::BTreeSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Canonical comparable form of `text`.
///
/// Lower-cases, decomposes (NFKD) and drops diacritics, maps every char
/// outside `[a-z0-9 ]` to a space, collapses whitespace runs and trims.
///
/// ```
/// use tcode_catalog::text::normalize;
///
/// assert_eq!(normalize("  Exibir Pedido, de Compra! "), "exibir pedido de compra");
/// assert_eq!(normalize("Transação São-Paulo"), "transacao sao paulo");
/// ```
#[must_use]
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .chars()
        .flat_map(fold_char)
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                ' '
            }
        })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lower-cased, accent-free rendering of one char. Compatibility
/// decompositions may expand it (`ﬁ` folds to `fi`) or drop it entirely.
pub fn fold_char(c: char) -> impl Iterator<Item = char> {
    std::iter::once(c)
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

/// Distinct word tokens of `normalize(text)`.
#[must_use]
pub fn tokenize(text: &str) -> BTreeSet<String> {
    normalize(text)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Cell values that spreadsheets and dataframes emit for "no value".
pub(crate) fn is_null_marker(cell: &str) -> bool {
    matches!(cell, "None" | "none" | "nan" | "NaN" | "NAN" | "null" | "NULL" | "<NA>")
}

/// Trim a raw cell and coerce null markers to empty.
pub(crate) fn clean_cell(cell: &str) -> String {
    let trimmed = cell.trim();
    if is_null_marker(trimmed) {
        String::new()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_accents_and_punctuation() {
        assert_eq!(normalize("Criação de Requisição"), "criacao de requisicao");
        assert_eq!(normalize("ME23N/PO-display"), "me23n po display");
        assert_eq!(normalize("a\t\tb\n c"), "a b c");
    }

    #[test]
    fn empty_and_symbol_only_inputs_collapse_to_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  ,.;!? "), "");
    }

    #[test]
    fn non_latin_letters_become_separators() {
        assert_eq!(normalize("tax ß rate"), "tax rate");
        assert_eq!(normalize("日本 code"), "code");
    }

    #[test]
    fn fold_char_drops_marks_and_case() {
        assert_eq!(fold_char('Ç').collect::<String>(), "c");
        assert_eq!(fold_char('ﬁ').collect::<String>(), "fi");
        assert_eq!(fold_char('\u{301}').count(), 0);
    }

    #[test]
    fn tokenize_collapses_duplicates() {
        let tokens = tokenize("View PO, view po");
        assert_eq!(tokens.len(), 2);
        assert!(tokens.contains("view"));
        assert!(tokens.contains("po"));
    }

    #[test]
    fn null_markers_are_cleaned() {
        assert_eq!(clean_cell(" nan "), "");
        assert_eq!(clean_cell("None"), "");
        assert_eq!(clean_cell(" MM "), "MM");
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(input in ".{0,64}") {
            let once = normalize(&input);
            prop_assert_eq!(normalize(&once), once.clone());
        }

        #[test]
        fn normalized_output_is_canonical(input in ".{0,64}") {
            let out = normalize(&input);
            prop_assert!(out.chars().all(|c| c == ' ' || c.is_ascii_lowercase() || c.is_ascii_digit()));
            prop_assert!(!out.contains("  "));
            prop_assert_eq!(out.trim(), out.as_str());
        }
    }
}
