use serde::Deserialize;

/// Keyword rule made of OR-groups, each group a comma separated list of
/// AND-terms.
///
/// `["invoice, paid", "receipt"]` matches text containing both "invoice" and
/// "paid", or text containing "receipt". Matching is case-insensitive and
/// substring based. A rule without groups matches nothing; a group without
/// terms (e.g. `""`) matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Vec<String>")]
pub struct FilterRule {
    /// Lowercased, trimmed, non-empty terms per group.
    groups: Vec<Vec<String>>,
}

impl FilterRule {
    pub fn new<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let groups = groups
            .into_iter()
            .map(|group| {
                group
                    .as_ref()
                    .split(',')
                    .map(|term| term.trim().to_lowercase())
                    .filter(|term| !term.is_empty())
                    .collect()
            })
            .collect();

        Self { groups }
    }

    /// A rule with a single empty group, which accepts any text.
    pub fn match_all() -> Self {
        Self {
            groups: vec![Vec::new()],
        }
    }

    /// A rule with no groups, which rejects any text.
    pub fn match_none() -> Self {
        Self { groups: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> &[Vec<String>] {
        &self.groups
    }

    /// Returns true if at least one group has all of its terms in `text`.
    pub fn matches(&self, text: &str) -> bool {
        if self.groups.is_empty() {
            return false;
        }

        let haystack = text.to_lowercase();
        self.groups
            .iter()
            .any(|group| group.iter().all(|term| haystack.contains(term.as_str())))
    }
}

impl From<Vec<String>> for FilterRule {
    fn from(groups: Vec<String>) -> Self {
        Self::new(groups)
    }
}

/// Evaluates `rule` against `text`.
pub fn matches(rule: &FilterRule, text: &str) -> bool {
    rule.matches(text)
}
