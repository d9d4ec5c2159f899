//! Ranked fuzzy matching for local filtering of lists (service catalogue,
//! page picker, profile picker, table rows).
//!
//! Ranking is tiered: exact prefix matches first, then substring matches,
//! then subsequence matches. Within a tier the skim score decides, then the
//! shorter candidate, then the original order.

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum MatchTier {
    Subsequence,
    Substring,
    Prefix,
}

/// A scored match: index into the searched slice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FuzzyMatch {
    pub index: usize,
    pub score: i64,
    /// Character positions of the matched needle characters.
    pub positions: Vec<usize>,
}

pub struct FuzzySearch {
    matcher: SkimMatcherV2,
}

impl Default for FuzzySearch {
    fn default() -> Self {
        Self::new()
    }
}

impl FuzzySearch {
    pub fn new() -> Self {
        Self {
            matcher: SkimMatcherV2::default().ignore_case(),
        }
    }

    /// Rank `candidates` against `query`. An empty query keeps every
    /// candidate in its original order.
    pub fn rank<S: AsRef<str>>(&self, candidates: &[S], query: &str) -> Vec<FuzzyMatch> {
        let query = query.trim();
        if query.is_empty() {
            return (0..candidates.len())
                .map(|index| FuzzyMatch {
                    index,
                    score: 0,
                    positions: Vec::new(),
                })
                .collect();
        }

        let needle = query.to_lowercase();
        let mut scored: Vec<(MatchTier, i64, usize, FuzzyMatch)> = candidates
            .iter()
            .enumerate()
            .filter_map(|(index, candidate)| {
                let text = candidate.as_ref();
                let (score, positions) = self.matcher.fuzzy_indices(text, &needle)?;
                let lower = text.to_lowercase();
                let tier = if lower.starts_with(&needle) {
                    MatchTier::Prefix
                } else if lower.contains(&needle) {
                    MatchTier::Substring
                } else {
                    MatchTier::Subsequence
                };
                Some((
                    tier,
                    score,
                    text.chars().count(),
                    FuzzyMatch {
                        index,
                        score,
                        positions,
                    },
                ))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then_with(|| b.1.cmp(&a.1))
                .then_with(|| a.2.cmp(&b.2))
                .then_with(|| a.3.index.cmp(&b.3.index))
        });
        scored.into_iter().map(|(_, _, _, m)| m).collect()
    }

    /// Convenience wrapper returning the matching candidates themselves.
    pub fn filter<'a, S: AsRef<str>>(&self, candidates: &'a [S], query: &str) -> Vec<&'a S> {
        self.rank(candidates, query)
            .into_iter()
            .map(|m| &candidates[m.index])
            .collect()
    }

    pub fn matches(&self, candidate: &str, query: &str) -> bool {
        let query = query.trim();
        query.is_empty()
            || self
                .matcher
                .fuzzy_match(candidate, &query.to_lowercase())
                .is_some()
    }
}
