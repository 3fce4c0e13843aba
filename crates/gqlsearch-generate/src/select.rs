//! Root-field resolution from a model's answer.
//!
//! The model is asked to name a candidate id. Its answer is resolved by an
//! ordered chain of matchers; the last tier always succeeds on a non-empty
//! candidate list.

use gqlsearch_core::SearchResult;

use crate::context::SelectionTier;

/// One resolution strategy.
pub trait RootFieldMatcher: Send + Sync {
    /// Tier reported when this matcher resolves the answer.
    fn tier(&self) -> SelectionTier;

    /// Index into `candidates`, or `None` to defer to the next matcher.
    fn find(&self, answer: &str, candidates: &[SearchResult]) -> Option<usize>;
}

/// The answer equals a candidate id.
#[derive(Debug, Default)]
pub struct ExactIdMatcher;

impl RootFieldMatcher for ExactIdMatcher {
    fn tier(&self) -> SelectionTier {
        SelectionTier::Exact
    }

    fn find(&self, answer: &str, candidates: &[SearchResult]) -> Option<usize> {
        candidates.iter().position(|c| c.document.id == answer)
    }
}

/// The answer is a fragment of a candidate id, or embeds one.
///
/// Checked in order: candidate id starts with the answer, candidate id
/// contains the answer, answer contains the candidate id. Within a rule the
/// highest-scoring candidate wins, ties going to the earlier one. For the
/// last rule the longest contained id wins first.
#[derive(Debug, Default)]
pub struct PartialIdMatcher;

impl RootFieldMatcher for PartialIdMatcher {
    fn tier(&self) -> SelectionTier {
        SelectionTier::Partial
    }

    fn find(&self, answer: &str, candidates: &[SearchResult]) -> Option<usize> {
        if answer.is_empty() {
            return None;
        }

        best_by_score(candidates, |c| c.document.id.starts_with(answer))
            .or_else(|| best_by_score(candidates, |c| c.document.id.contains(answer)))
            .or_else(|| {
                let longest = candidates
                    .iter()
                    .filter(|c| !c.document.id.is_empty() && answer.contains(&c.document.id))
                    .map(|c| c.document.id.len())
                    .max()?;
                best_by_score(candidates, |c| {
                    c.document.id.len() == longest && answer.contains(&c.document.id)
                })
            })
    }
}

/// Fallback: the best-scoring candidate.
#[derive(Debug, Default)]
pub struct HighestScoreMatcher;

impl RootFieldMatcher for HighestScoreMatcher {
    fn tier(&self) -> SelectionTier {
        SelectionTier::HighestScore
    }

    fn find(&self, _answer: &str, candidates: &[SearchResult]) -> Option<usize> {
        best_by_score(candidates, |_| true)
    }
}

fn best_by_score(
    candidates: &[SearchResult],
    predicate: impl Fn(&SearchResult) -> bool,
) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        if !predicate(candidate) {
            continue;
        }
        match best {
            Some(current) if candidates[current].score >= candidate.score => {}
            _ => best = Some(index),
        }
    }
    best
}

/// Strip whitespace, quotes and trailing punctuation a model tends to add.
#[must_use]
pub fn normalize_answer(answer: &str) -> &str {
    let line = answer.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    line.trim_start_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*'))
        .trim_end_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*' | '.' | ','))
        .trim()
}

/// Ordered matcher chain.
pub struct MatcherChain {
    matchers: Vec<Box<dyn RootFieldMatcher>>,
}

impl Default for MatcherChain {
    fn default() -> Self {
        Self::new(vec![
            Box::new(ExactIdMatcher),
            Box::new(PartialIdMatcher),
            Box::new(HighestScoreMatcher),
        ])
    }
}

impl MatcherChain {
    #[must_use]
    pub fn new(matchers: Vec<Box<dyn RootFieldMatcher>>) -> Self {
        Self { matchers }
    }

    /// Resolve `answer` to a candidate index and the tier that found it.
    #[must_use]
    pub fn resolve(
        &self,
        answer: &str,
        candidates: &[SearchResult],
    ) -> Option<(usize, SelectionTier)> {
        let answer = normalize_answer(answer);
        self.matchers
            .iter()
            .find_map(|m| m.find(answer, candidates).map(|index| (index, m.tier())))
    }

    /// Highest-score fallback, used when the model could not be asked.
    #[must_use]
    pub fn fallback(candidates: &[SearchResult]) -> Option<(usize, SelectionTier)> {
        HighestScoreMatcher
            .find("", candidates)
            .map(|index| (index, SelectionTier::HighestScore))
    }
}
