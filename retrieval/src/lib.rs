//! Document retrieval core: normalization, inverted index, lnc.ltc cosine
//! ranking and vocabulary-bounded query correction.

pub mod corpus;
pub mod correct;
pub mod dictionary;
pub mod engine;
pub mod error;
pub mod index;
pub mod normalize;
pub mod phonetic;
pub mod rank;
pub mod tokenizer;

/// A normalized (lowercased, stopword-filtered, stemmed) token.
pub type Term = String;

pub use correct::{QueryCorrector, SpellSuggest};
pub use dictionary::SymSpellDictionary;
pub use engine::{CorpusStats, Document, EngineConfig, LoadedCorpus, SearchEngine, SearchOptions, SearchOutcome};
pub use error::{Error, Result};
pub use index::{DocumentId, DocumentNorms, InvertedIndex, Posting, TermEntry, TermStats, Vocabulary};
pub use rank::{rank, RankedList, ScoredDocument};
