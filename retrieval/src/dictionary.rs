//! Frequency-list spelling dictionary.
//!
//! Lookups use symmetric deletes: every dictionary word is indexed under all
//! strings reachable by deleting up to `max_edit_distance` characters, so a
//! query only has to generate its own deletes to find every word within that
//! distance.

use crate::correct::{edit_distance, SpellSuggest};
use crate::error::{Error, Result};
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone)]
pub struct SymSpellDictionary {
    words: Vec<(String, u64)>,
    lookup: HashMap<String, usize>,
    deletes: HashMap<String, Vec<usize>>,
    max_edit_distance: usize,
}

impl SymSpellDictionary {
    pub fn new(max_edit_distance: usize) -> Self {
        Self { words: Vec::new(), lookup: HashMap::new(), deletes: HashMap::new(), max_edit_distance }
    }

    /// Read a frequency list: one `word [count]` pair per line, count defaults to 1.
    pub fn load<P: AsRef<Path>>(path: P, max_edit_distance: usize) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let dict = Self::parse(&text, max_edit_distance)?;
        info!(path = %path.display(), words = dict.len(), "spelling dictionary loaded");
        Ok(dict)
    }

    pub fn parse(text: &str, max_edit_distance: usize) -> Result<Self> {
        let mut dict = Self::new(max_edit_distance);
        for (lineno, line) in text.lines().enumerate() {
            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else { continue };
            let count = match fields.next() {
                Some(c) => c
                    .parse::<u64>()
                    .map_err(|_| Error::InvalidInput(format!("dictionary line {}: bad count {c:?}", lineno + 1)))?,
                None => 1,
            };
            dict.add_word(&word.to_lowercase(), count);
        }
        Ok(dict)
    }

    /// Adds `count` to the word's frequency, indexing its deletes on first sight.
    pub fn add_word(&mut self, word: &str, count: u64) {
        if let Some(&id) = self.lookup.get(word) {
            self.words[id].1 += count;
            return;
        }
        let id = self.words.len();
        self.words.push((word.to_string(), count));
        self.lookup.insert(word.to_string(), id);
        for edit in self.generate_edits(word) {
            self.deletes.entry(edit).or_default().push(id);
        }
    }

    pub fn len(&self) -> usize { self.words.len() }

    pub fn is_empty(&self) -> bool { self.words.is_empty() }

    /// Closest known word: smallest edit distance, then highest frequency,
    /// then alphabetical. A known word is its own correction.
    pub fn correction<'a>(&'a self, input: &'a str) -> Option<&'a str> {
        if self.lookup.contains_key(input) {
            return Some(input);
        }
        let mut candidates: HashSet<usize> = HashSet::new();
        for edit in self.generate_edits(input) {
            if let Some(ids) = self.deletes.get(&edit) {
                candidates.extend(ids.iter().copied());
            }
        }
        candidates
            .into_iter()
            .filter_map(|id| {
                let (word, count) = &self.words[id];
                let d = edit_distance(input, word);
                (d <= self.max_edit_distance).then_some((d, Reverse(*count), word.as_str()))
            })
            .min()
            .map(|(_, _, word)| word)
    }

    /// The word itself plus every variant with up to `max_edit_distance` characters deleted.
    fn generate_edits(&self, word: &str) -> HashSet<String> {
        let mut edits = HashSet::new();
        edits.insert(word.to_string());
        let mut current = edits.clone();
        for _ in 0..self.max_edit_distance {
            let mut next = HashSet::new();
            for edit in &current {
                let chars: Vec<char> = edit.chars().collect();
                for i in 0..chars.len() {
                    let variant: String = chars[..i].iter().chain(&chars[i + 1..]).collect();
                    next.insert(variant);
                }
            }
            edits.extend(next.iter().cloned());
            current = next;
        }
        edits
    }
}

impl SpellSuggest for SymSpellDictionary {
    fn suggest(&self, word: &str) -> Result<Option<String>> {
        Ok(self.correction(word).map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORDS: &str = "the 500\ncart 120\ncat 80\ncar 300\nreceive 40\n\n";

    #[test]
    fn parses_counts_and_defaults() {
        let dict = SymSpellDictionary::parse("Apple 3\npear\napple 2\n", 2).unwrap();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.correction("apple"), Some("apple"));
        assert_eq!(dict.correction("pear"), Some("pear"));
    }

    #[test]
    fn bad_count_is_rejected() {
        assert!(matches!(SymSpellDictionary::parse("word many", 2), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn nearest_word_wins() {
        let dict = SymSpellDictionary::parse(WORDS, 2).unwrap();
        assert_eq!(dict.correction("recieve"), Some("receive"));
        assert_eq!(dict.correction("recive"), Some("receive"));
    }

    #[test]
    fn frequency_breaks_distance_ties() {
        let dict = SymSpellDictionary::parse(WORDS, 2).unwrap();
        // "catt" is one edit from "cart" and from "cat"; cart is more frequent
        assert_eq!(dict.correction("catt"), Some("cart"));
    }

    #[test]
    fn nothing_within_range() {
        let dict = SymSpellDictionary::parse(WORDS, 2).unwrap();
        assert_eq!(dict.correction("xylophone"), None);
        assert_eq!(dict.suggest("xylophone").unwrap(), None);
    }

    #[test]
    fn handles_non_ascii_words() {
        let dict = SymSpellDictionary::parse("café 10\n", 1).unwrap();
        assert_eq!(dict.correction("cafés"), Some("café"));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.txt");
        fs::write(&path, WORDS).unwrap();
        let dict = SymSpellDictionary::load(&path, 2).unwrap();
        assert_eq!(dict.len(), 5);
        assert!(SymSpellDictionary::load(dir.path().join("missing.txt"), 2).is_err());
    }
}
