use regex::{Regex, RegexBuilder};
use tcode_catalog::text::fold_char;

const TRIMMED: &[char] = &['.', ',', ';', ':', '!', '?', '(', ')', '"', '\''];

/// Wraps occurrences of query terms in `**`, ignoring case and accents.
///
/// Built once per query and applied to every result description. Matching
/// runs on the accent-folded text, so "criacao" marks "Criação"; the
/// original characters are what end up between the markers.
#[derive(Clone, Debug)]
pub struct Highlighter {
    pattern: Option<Regex>,
}

impl Highlighter {
    #[must_use]
    pub fn new(query: &str) -> Self {
        let mut terms: Vec<String> = query
            .split_whitespace()
            .map(|t| fold(t.trim_matches(TRIMMED)))
            .filter(|t| t.chars().count() >= 2)
            .collect();
        // Longest first so "order" wins over "or" inside the alternation.
        terms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        terms.dedup();

        let pattern = if terms.is_empty() {
            None
        } else {
            let alternation = terms
                .iter()
                .map(|t| regex::escape(t))
                .collect::<Vec<_>>()
                .join("|");
            RegexBuilder::new(&alternation)
                .case_insensitive(true)
                .build()
                .ok()
        };
        Self { pattern }
    }

    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        let Some(pattern) = &self.pattern else {
            return text.to_string();
        };

        // `origin[i]` is the byte range in `text` of the char that produced
        // byte `i` of `folded`.
        let mut folded = String::with_capacity(text.len());
        let mut origin: Vec<(usize, usize)> = Vec::with_capacity(text.len());
        for (start, c) in text.char_indices() {
            let end = start + c.len_utf8();
            for f in fold_char(c) {
                folded.push(f);
                origin.extend(std::iter::repeat((start, end)).take(f.len_utf8()));
            }
        }

        let mut out = String::with_capacity(text.len() + 8);
        let mut last = 0;
        for m in pattern.find_iter(&folded) {
            let (Some(&(start, _)), Some(&(_, end))) =
                (origin.get(m.start()), origin.get(m.end().saturating_sub(1)))
            else {
                continue;
            };
            if start < last {
                continue;
            }
            out.push_str(&text[last..start]);
            out.push_str("**");
            out.push_str(&text[start..end]);
            out.push_str("**");
            last = end;
        }
        out.push_str(&text[last..]);
        out
    }
}

fn fold(term: &str) -> String {
    term.chars().flat_map(fold_char).collect()
}
