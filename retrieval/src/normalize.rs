//! The normalization pipeline: raw text to an ordered sequence of terms.

use crate::phonetic::PhoneticCoder;
use crate::tokenizer::TextAnalyzer;
use crate::Term;

/// Normalized terms plus, when a coder was supplied, one phonetic code per term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedText {
    pub terms: Vec<Term>,
    pub phonetic: Option<Vec<String>>,
}

pub(crate) fn is_alphanumeric(token: &str) -> bool {
    !token.is_empty() && token.chars().all(char::is_alphanumeric)
}

/// Lowercased tokens exactly as the tokenizer emits them, before any filtering.
pub fn surface_tokens(analyzer: &dyn TextAnalyzer, text: &str) -> Vec<String> {
    analyzer.tokenize(text)
}

/// Lowercase, tokenize, keep alphanumeric tokens, drop stopwords, stem.
/// Duplicates survive; output order follows the input.
pub fn normalize(analyzer: &dyn TextAnalyzer, text: &str) -> Vec<Term> {
    analyzer
        .tokenize(text)
        .into_iter()
        .filter(|t| is_alphanumeric(t) && !analyzer.is_stopword(t))
        .map(|t| analyzer.stem(&t))
        .collect()
}

pub fn normalize_with_phonetics(
    analyzer: &dyn TextAnalyzer,
    coder: Option<&dyn PhoneticCoder>,
    text: &str,
) -> NormalizedText {
    let terms = normalize(analyzer, text);
    let phonetic = coder.map(|c| terms.iter().map(|t| c.code(t)).collect());
    NormalizedText { terms, phonetic }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phonetic::Soundex;
    use crate::tokenizer::EnglishAnalyzer;

    #[test]
    fn empty_input_is_empty_sequence() {
        assert!(normalize(&EnglishAnalyzer::new(), "").is_empty());
    }

    #[test]
    fn punctuation_only_tokens_are_dropped() {
        let terms = normalize(&EnglishAnalyzer::new(), "cats -- dogs!!");
        assert_eq!(terms, vec!["cat", "dog"]);
    }

    #[test]
    fn duplicates_are_kept_in_order() {
        let terms = normalize(&EnglishAnalyzer::new(), "dog cat dog");
        assert_eq!(terms, vec!["dog", "cat", "dog"]);
    }

    #[test]
    fn one_code_per_term() {
        let out = normalize_with_phonetics(&EnglishAnalyzer::new(), Some(&Soundex), "Robert and Rupert");
        let codes = out.phonetic.unwrap();
        assert_eq!(codes.len(), out.terms.len());
        assert_eq!(codes[0], codes[1]);
    }

    #[test]
    fn no_coder_no_codes() {
        let out = normalize_with_phonetics(&EnglishAnalyzer::new(), None, "robert");
        assert!(out.phonetic.is_none());
    }
}
