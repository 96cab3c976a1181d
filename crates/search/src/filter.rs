use crate::error::{Result, SearchError};
use std::collections::BTreeSet;
use tcode_catalog::group_tags;
use tcode_catalog::text::normalize;

/// Requested category tags; a record passes when its group carries all of them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryFilter {
    required: BTreeSet<String>,
}

impl CategoryFilter {
    /// Validates `requested` against the closed set `known` (both compared
    /// normalized). Blank tags are ignored.
    pub fn new<S: AsRef<str>>(requested: &[S], known: &BTreeSet<String>) -> Result<Self> {
        let mut required = BTreeSet::new();
        for tag in requested {
            let tag = normalize(tag.as_ref());
            if tag.is_empty() {
                continue;
            }
            if !known.contains(&tag) {
                return Err(SearchError::UnknownCategory {
                    tag,
                    known: known.iter().cloned().collect(),
                });
            }
            required.insert(tag);
        }
        Ok(Self { required })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
    }

    #[must_use]
    pub fn admits(&self, group: Option<&str>) -> bool {
        if self.required.is_empty() {
            return true;
        }
        let tags = group_tags(group);
        self.required.iter().all(|tag| tags.contains(tag))
    }
}
