//! Query spelling correction against the index vocabulary.
//!
//! Each out-of-vocabulary word is first offered to an optional dictionary
//! corrector; when that has nothing, the closest vocabulary term within a
//! fixed edit distance is taken from a deterministic candidate subset.

use crate::error::Result;
use crate::index::Vocabulary;
use crate::normalize::{is_alphanumeric, surface_tokens};
use crate::tokenizer::TextAnalyzer;
use tracing::{debug, warn};

pub const DEFAULT_MAX_DISTANCE: usize = 2;
pub const DEFAULT_FALLBACK_CANDIDATES: usize = 1000;

/// Dictionary-based spell corrector capability.
pub trait SpellSuggest: Send + Sync {
    /// Best correction for a single word, or `None` when there is no suggestion.
    fn suggest(&self, word: &str) -> Result<Option<String>>;
}

/// Levenshtein distance over Unicode scalar values.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() { return b.len(); }
    if b.is_empty() { return a.len(); }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            cur[j + 1] = substitution.min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

#[derive(Debug, Clone, Copy)]
pub struct QueryCorrector {
    pub max_distance: usize,
    pub fallback_candidates: usize,
}

impl Default for QueryCorrector {
    fn default() -> Self {
        Self { max_distance: DEFAULT_MAX_DISTANCE, fallback_candidates: DEFAULT_FALLBACK_CANDIDATES }
    }
}

impl QueryCorrector {
    pub fn new(max_distance: usize, fallback_candidates: usize) -> Self {
        Self { max_distance, fallback_candidates }
    }

    /// Rewrite a raw query into surface tokens, one output token per tokenizer
    /// token, in order. Never fails: uncorrectable words come back as-is.
    pub fn correct(
        &self,
        analyzer: &dyn TextAnalyzer,
        suggester: Option<&dyn SpellSuggest>,
        query: &str,
        vocabulary: &Vocabulary,
    ) -> Vec<String> {
        surface_tokens(analyzer, query)
            .into_iter()
            .map(|token| self.correct_token(analyzer, suggester, token, vocabulary))
            .collect()
    }

    fn correct_token(
        &self,
        analyzer: &dyn TextAnalyzer,
        suggester: Option<&dyn SpellSuggest>,
        token: String,
        vocabulary: &Vocabulary,
    ) -> String {
        if !is_alphanumeric(&token) || analyzer.is_stopword(&token) {
            return token;
        }
        // The vocabulary holds stems, so a known inflection is left alone too.
        if vocabulary.contains(&token) || vocabulary.contains(&analyzer.stem(&token)) {
            return token;
        }
        if let Some(suggester) = suggester {
            match suggester.suggest(&token) {
                Ok(Some(suggestion)) => {
                    debug!(%token, %suggestion, "dictionary correction");
                    return suggestion;
                }
                Ok(None) => {}
                Err(e) => warn!(%token, error = %e, "spell suggester failed, using vocabulary fallback"),
            }
        }
        match self.nearest(&token, vocabulary) {
            Some(best) => {
                debug!(%token, %best, "vocabulary correction");
                best.to_string()
            }
            None => token,
        }
    }

    /// Candidates: vocabulary in lexicographic order, limited to terms whose
    /// length is within `max_distance` of the word, first `fallback_candidates`
    /// of those. The first candidate at the minimum distance wins.
    pub fn nearest<'v>(&self, word: &str, vocabulary: &'v Vocabulary) -> Option<&'v str> {
        let len = word.chars().count();
        let mut best: Option<(&str, usize)> = None;
        let candidates = vocabulary
            .iter()
            .filter(|c| c.chars().count().abs_diff(len) <= self.max_distance)
            .take(self.fallback_candidates);
        for candidate in candidates {
            let d = edit_distance(word, candidate);
            if d <= self.max_distance && best.map_or(true, |(_, bd)| d < bd) {
                best = Some((candidate, d));
            }
        }
        best.map(|(c, _)| c)
    }
}
