use crate::correct::{QueryCorrector, SpellSuggest, DEFAULT_FALLBACK_CANDIDATES, DEFAULT_MAX_DISTANCE};
use crate::corpus::load_text_dir;
use crate::error::Result;
use crate::index::{DocumentId, DocumentNorms, InvertedIndex, TermStats};
use crate::normalize::{normalize, normalize_with_phonetics, surface_tokens};
use crate::phonetic::{PhoneticCoder, Soundex};
use crate::rank::{rank, ScoredDocument};
use crate::tokenizer::{EnglishAnalyzer, TextAnalyzer};
use crate::Term;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest edit distance accepted by the vocabulary fallback.
    pub max_edit_distance: usize,
    /// How many vocabulary terms the fallback inspects per word.
    pub fallback_candidates: usize,
    /// Store Soundex codes next to each document's terms.
    pub phonetic: bool,
    pub preview_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_edit_distance: DEFAULT_MAX_DISTANCE,
            fallback_candidates: DEFAULT_FALLBACK_CANDIDATES,
            phonetic: true,
            preview_chars: 300,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    pub id: DocumentId,
    pub text: String,
    pub terms: Vec<Term>,
    pub phonetic: Option<Vec<String>>,
}

impl Document {
    /// First `max_chars` characters, with "..." appended when cut.
    pub fn preview(&self, max_chars: usize) -> String {
        match self.text.char_indices().nth(max_chars) {
            Some((cut, _)) => format!("{}...", &self.text[..cut]),
            None => self.text.clone(),
        }
    }

    pub fn char_count(&self) -> usize { self.text.chars().count() }

    pub fn word_count(&self) -> usize { self.text.split_whitespace().count() }
}

#[derive(Debug, Clone, Serialize)]
pub struct CorpusStats {
    pub documents: usize,
    pub unique_terms: usize,
    pub top_terms: Vec<TermStats>,
}

/// One immutable corpus snapshot: documents, index and norms built together.
/// A reload builds a fresh value; nothing here is mutated after `load`.
#[derive(Debug)]
pub struct LoadedCorpus {
    documents: BTreeMap<DocumentId, Document>,
    index: InvertedIndex,
    norms: DocumentNorms,
}

impl LoadedCorpus {
    pub fn index(&self) -> &InvertedIndex { &self.index }

    pub fn norms(&self) -> &DocumentNorms { &self.norms }

    pub fn document(&self, id: &str) -> Option<&Document> { self.documents.get(id) }

    pub fn documents(&self) -> impl Iterator<Item = &Document> + '_ { self.documents.values() }

    pub fn len(&self) -> usize { self.documents.len() }

    pub fn is_empty(&self) -> bool { self.documents.is_empty() }

    pub fn stats(&self, top_terms: usize) -> CorpusStats {
        CorpusStats {
            documents: self.documents.len(),
            unique_terms: self.index.num_terms(),
            top_terms: self.index.top_terms(top_terms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub top_k: usize,
    pub spell_check: bool,
}

impl Default for SearchOptions {
    fn default() -> Self { Self { top_k: 10, spell_check: true } }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    /// Set only when correction changed at least one token.
    pub corrected_query: Option<String>,
    pub query_terms: Vec<Term>,
    pub total_hits: usize,
    pub hits: Vec<ScoredDocument>,
}

pub struct SearchEngine {
    analyzer: Box<dyn TextAnalyzer>,
    suggester: Option<Box<dyn SpellSuggest>>,
    coder: Option<Box<dyn PhoneticCoder>>,
    corrector: QueryCorrector,
    config: EngineConfig,
}

impl SearchEngine {
    pub fn new(config: EngineConfig) -> Self {
        let coder: Option<Box<dyn PhoneticCoder>> = if config.phonetic { Some(Box::new(Soundex)) } else { None };
        Self {
            analyzer: Box::new(EnglishAnalyzer::new()),
            suggester: None,
            coder,
            corrector: QueryCorrector::new(config.max_edit_distance, config.fallback_candidates),
            config,
        }
    }

    pub fn with_analyzer(mut self, analyzer: impl TextAnalyzer + 'static) -> Self {
        self.analyzer = Box::new(analyzer);
        self
    }

    pub fn with_suggester(mut self, suggester: impl SpellSuggest + 'static) -> Self {
        self.suggester = Some(Box::new(suggester));
        self
    }

    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn analyzer(&self) -> &dyn TextAnalyzer { self.analyzer.as_ref() }

    pub fn normalize(&self, text: &str) -> Vec<Term> { normalize(self.analyzer(), text) }

    /// Normalize and index a full corpus snapshot.
    pub fn load(&self, raw: BTreeMap<DocumentId, String>) -> LoadedCorpus {
        let start = Instant::now();
        let mut documents = BTreeMap::new();
        let mut normalized = BTreeMap::new();
        for (id, text) in raw {
            let out = normalize_with_phonetics(self.analyzer(), self.coder.as_deref(), &text);
            normalized.insert(id.clone(), out.terms.clone());
            documents.insert(id.clone(), Document { id, text, terms: out.terms, phonetic: out.phonetic });
        }
        let index = InvertedIndex::build(&normalized);
        let norms = DocumentNorms::compute(&index);
        info!(
            num_docs = documents.len(),
            num_terms = index.num_terms(),
            took_ms = start.elapsed().as_millis() as u64,
            "index built"
        );
        LoadedCorpus { documents, index, norms }
    }

    pub fn load_dir<P: AsRef<Path>>(&self, dir: P) -> Result<LoadedCorpus> {
        Ok(self.load(load_text_dir(dir)?))
    }

    /// Surface tokens of `query` after spelling correction.
    pub fn correct(&self, corpus: &LoadedCorpus, query: &str) -> Vec<String> {
        self.corrector
            .correct(self.analyzer(), self.suggester.as_deref(), query, corpus.index.vocabulary())
    }

    /// Correct (optionally), normalize and rank a free-text query.
    pub fn search(&self, corpus: &LoadedCorpus, query: &str, opts: SearchOptions) -> Result<SearchOutcome> {
        let mut corrected_query = None;
        if opts.spell_check {
            let corrected = self.correct(corpus, query);
            if corrected != surface_tokens(self.analyzer(), query) {
                corrected_query = Some(corrected.join(" "));
            }
        }
        let effective = corrected_query.as_deref().unwrap_or(query);
        let query_terms = self.normalize(effective);
        let ranked = rank(&query_terms, &corpus.index, &corpus.norms, opts.top_k)?;
        debug!(query, ?corrected_query, ?query_terms, total_hits = ranked.total_hits, "search");
        Ok(SearchOutcome { corrected_query, query_terms, total_hits: ranked.total_hits, hits: ranked.hits })
    }
}

impl Default for SearchEngine {
    fn default() -> Self { Self::new(EngineConfig::default()) }
}
