use crate::error::{Error, Result};
use crate::Term;
use serde::Serialize;
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Stable identifier supplied by the corpus source, e.g. a file name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Rejects empty ids and ids with surrounding whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() || id.trim() != id {
            return Err(Error::InvalidInput(format!("malformed document id {id:?}")));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl Borrow<str> for DocumentId {
    fn borrow(&self) -> &str { &self.0 }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Posting {
    pub doc_id: DocumentId,
    pub term_frequency: u32, // always >= 1
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TermEntry {
    pub document_frequency: u32,
    pub postings: Vec<Posting>, // ascending doc_id
}

/// Index terms in lexicographic order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    sorted: Vec<Term>,
}

impl Vocabulary {
    pub fn contains(&self, word: &str) -> bool {
        self.sorted.binary_search_by(|t| t.as_str().cmp(word)).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.sorted.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize { self.sorted.len() }

    pub fn is_empty(&self) -> bool { self.sorted.is_empty() }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermStats {
    pub term: Term,
    pub document_frequency: u32,
    pub total_occurrences: u64,
}

#[derive(Debug, Default)]
pub struct InvertedIndex {
    terms: HashMap<Term, TermEntry>,
    documents: Vec<DocumentId>, // every indexed document, empty ones included
    vocabulary: Vocabulary,
}

impl InvertedIndex {
    /// Build from normalized documents. Documents are visited in ascending id
    /// order, so postings lists come out sorted by `DocumentId`.
    pub fn build(documents: &BTreeMap<DocumentId, Vec<Term>>) -> Self {
        let mut terms: HashMap<Term, TermEntry> = HashMap::new();
        for (doc_id, doc_terms) in documents {
            let mut tf_counts: BTreeMap<&str, u32> = BTreeMap::new();
            for term in doc_terms {
                *tf_counts.entry(term.as_str()).or_insert(0) += 1;
            }
            for (term, tf) in tf_counts {
                let entry = terms.entry(term.to_string()).or_default();
                entry.postings.push(Posting { doc_id: doc_id.clone(), term_frequency: tf });
                entry.document_frequency += 1;
            }
        }

        let mut sorted: Vec<Term> = terms.keys().cloned().collect();
        sorted.sort_unstable();
        Self {
            terms,
            documents: documents.keys().cloned().collect(),
            vocabulary: Vocabulary { sorted },
        }
    }

    pub fn get(&self, term: &str) -> Option<&TermEntry> { self.terms.get(term) }

    pub fn contains(&self, term: &str) -> bool { self.terms.contains_key(term) }

    pub fn vocabulary(&self) -> &Vocabulary { &self.vocabulary }

    pub fn documents(&self) -> &[DocumentId] { &self.documents }

    pub fn num_docs(&self) -> usize { self.documents.len() }

    pub fn num_terms(&self) -> usize { self.terms.len() }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &TermEntry)> + '_ {
        self.terms.iter().map(|(t, e)| (t.as_str(), e))
    }

    /// Most widespread terms: document frequency descending, then term ascending.
    pub fn top_terms(&self, limit: usize) -> Vec<TermStats> {
        let mut stats: Vec<TermStats> = self
            .terms
            .iter()
            .map(|(term, entry)| TermStats {
                term: term.clone(),
                document_frequency: entry.document_frequency,
                total_occurrences: entry.postings.iter().map(|p| u64::from(p.term_frequency)).sum(),
            })
            .collect();
        stats.sort_by(|a, b| b.document_frequency.cmp(&a.document_frequency).then_with(|| a.term.cmp(&b.term)));
        stats.truncate(limit);
        stats
    }
}

/// Log-tf weight shared by document norms and document-side scoring.
pub(crate) fn log_tf(tf: u32) -> f64 {
    if tf > 0 { 1.0 + f64::from(tf).log10() } else { 0.0 }
}

/// Euclidean length of each document's log-tf vector (no idf factor).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentNorms {
    norms: HashMap<DocumentId, f64>,
}

impl DocumentNorms {
    pub fn compute(index: &InvertedIndex) -> Self {
        let mut sums: HashMap<DocumentId, f64> =
            index.documents().iter().map(|d| (d.clone(), 0.0)).collect();
        for (_, entry) in index.entries() {
            for p in &entry.postings {
                let w = log_tf(p.term_frequency);
                *sums.entry(p.doc_id.clone()).or_insert(0.0) += w * w;
            }
        }
        let norms = sums.into_iter().map(|(d, s)| (d, s.sqrt())).collect();
        Self { norms }
    }

    pub fn get(&self, doc_id: &DocumentId) -> Option<f64> { self.norms.get(doc_id).copied() }

    /// Corpus size as seen by the ranker.
    pub fn len(&self) -> usize { self.norms.len() }

    pub fn is_empty(&self) -> bool { self.norms.is_empty() }
}
