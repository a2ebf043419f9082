use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use lazy_static::lazy_static;
use parking_lot::{Mutex, RwLock};
use regex::{Captures, Regex};
use retrieval::tokenizer::TextAnalyzer;
use retrieval::{CorpusStats, EngineConfig, LoadedCorpus, SearchEngine, SearchOptions, SymSpellDictionary, Term};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_K: usize = 100;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub corpus_dir: PathBuf,
    pub engine: EngineConfig,
    /// Frequency list (`word count` per line) used before the vocabulary fallback.
    pub dictionary: Option<PathBuf>,
    /// Required in `X-ADMIN-TOKEN` for `/reload`; reload is refused when unset.
    pub admin_token: Option<String>,
}

impl ServerConfig {
    /// Takes the admin token from `ADMIN_TOKEN`.
    pub fn from_env(corpus_dir: impl Into<PathBuf>, engine: EngineConfig, dictionary: Option<PathBuf>) -> Self {
        Self { corpus_dir: corpus_dir.into(), engine, dictionary, admin_token: std::env::var("ADMIN_TOKEN").ok() }
    }
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_spell")]
    pub spell: bool,
}
fn default_k() -> usize { 10 }
fn default_spell() -> bool { true }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub corrected_query: Option<String>,
    pub took_ms: u128,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: String,
    pub score: f64,
    pub snippet: Option<String>,
    pub chars: usize,
    pub words: usize,
}

#[derive(Serialize)]
pub struct DocResponse {
    pub doc_id: String,
    pub text: String,
    pub chars: usize,
    pub words: usize,
    pub terms: usize,
}

#[derive(Deserialize)]
pub struct StatsParams {
    #[serde(default = "default_limit")]
    pub limit: usize,
}
fn default_limit() -> usize { 20 }

#[derive(Serialize)]
pub struct StatsResponse {
    pub corpus_dir: String,
    pub loaded_at: String,
    #[serde(flatten)]
    pub stats: CorpusStats,
}

struct Snapshot {
    corpus: LoadedCorpus,
    loaded_at: String,
}

struct Shared {
    engine: SearchEngine,
    corpus_dir: PathBuf,
    current: RwLock<Arc<Snapshot>>,
    reload_lock: Mutex<()>,
    admin_token: Option<String>,
}

impl Shared {
    fn load_snapshot(&self) -> retrieval::Result<Snapshot> {
        load_snapshot(&self.engine, &self.corpus_dir)
    }
}

fn load_snapshot(engine: &SearchEngine, corpus_dir: &std::path::Path) -> retrieval::Result<Snapshot> {
    let corpus = engine.load_dir(corpus_dir)?;
    if corpus.is_empty() {
        tracing::warn!(corpus_dir = %corpus_dir.display(), "no documents found");
    }
    let loaded_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "".into());
    Ok(Snapshot { corpus, loaded_at })
}

#[derive(Clone)]
pub struct AppState {
    shared: Arc<Shared>,
}

impl AppState {
    /// The corpus in effect right now. Queries keep their snapshot even if a
    /// reload swaps in a new one meanwhile.
    fn snapshot(&self) -> Arc<Snapshot> { self.shared.current.read().clone() }
}

pub fn build_app(config: ServerConfig) -> Result<Router> {
    let mut engine = SearchEngine::new(config.engine);
    if let Some(path) = &config.dictionary {
        let dict = SymSpellDictionary::load(path, engine.config().max_edit_distance)?;
        engine = engine.with_suggester(dict);
    }
    let initial = load_snapshot(&engine, &config.corpus_dir)?;
    tracing::info!(corpus_dir = %config.corpus_dir.display(), documents = initial.corpus.len(), "corpus loaded");
    let shared = Shared {
        engine,
        corpus_dir: config.corpus_dir,
        current: RwLock::new(Arc::new(initial)),
        reload_lock: Mutex::new(()),
        admin_token: config.admin_token,
    };
    let app_state = AppState { shared: Arc::new(shared) };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/stats", get(stats_handler))
        .route("/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

fn error_response(e: retrieval::Error) -> (StatusCode, String) {
    match e {
        retrieval::Error::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        other => {
            tracing::error!(error = %other, "request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let snap = state.snapshot();
    let engine = &state.shared.engine;
    let opts = SearchOptions { top_k: params.k.min(MAX_K), spell_check: params.spell };
    let outcome = engine.search(&snap.corpus, &params.q, opts).map_err(error_response)?;

    // Highlight the words that were actually searched for
    let effective = outcome.corrected_query.as_deref().unwrap_or(&params.q);
    let matcher = QueryMatcher::new(engine.analyzer(), effective, &outcome.query_terms);

    let preview_chars = engine.config().preview_chars;
    let results = outcome
        .hits
        .iter()
        .filter_map(|hit| {
            let doc = snap.corpus.document(hit.doc_id.as_str())?;
            Some(SearchHit {
                doc_id: hit.doc_id.to_string(),
                score: hit.score,
                snippet: snippet_from_text(&doc.text, &matcher, preview_chars),
                chars: doc.char_count(),
                words: doc.word_count(),
            })
        })
        .collect();

    let elapsed = start.elapsed();
    Ok(Json(SearchResponse {
        query: params.q,
        corrected_query: outcome.corrected_query,
        took_ms: elapsed.as_millis(),
        took_s: elapsed.as_secs_f64(),
        total_hits: outcome.total_hits,
        results,
    }))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<String>) -> Result<Json<DocResponse>, (StatusCode, String)> {
    let snap = state.snapshot();
    match snap.corpus.document(&doc_id) {
        Some(doc) => Ok(Json(DocResponse {
            doc_id,
            text: doc.text.clone(),
            chars: doc.char_count(),
            words: doc.word_count(),
            terms: doc.terms.len(),
        })),
        None => Err((StatusCode::NOT_FOUND, format!("document {doc_id} not found"))),
    }
}

pub async fn stats_handler(State(state): State<AppState>, Query(params): Query<StatsParams>) -> Json<StatsResponse> {
    let snap = state.snapshot();
    Json(StatsResponse {
        corpus_dir: state.shared.corpus_dir.display().to_string(),
        loaded_at: snap.loaded_at.clone(),
        stats: snap.corpus.stats(params.limit),
    })
}

/// Rebuild from the corpus folder and swap the new snapshot in whole.
/// A rebuild that finds no documents is refused with 409 and the current
/// snapshot stays in place.
async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let shared = state.shared.clone();
    let loaded = tokio::task::spawn_blocking(move || -> Result<Arc<Snapshot>, (StatusCode, String)> {
        let _guard = shared.reload_lock.lock();
        let snap = shared.load_snapshot().map_err(error_response)?;
        if snap.corpus.is_empty() {
            let kept = shared.current.read().corpus.len();
            tracing::warn!(corpus_dir = %shared.corpus_dir.display(), kept, "reload found no documents, keeping current corpus");
            return Err((
                StatusCode::CONFLICT,
                format!("no documents found in {}; keeping current corpus", shared.corpus_dir.display()),
            ));
        }
        let snap = Arc::new(snap);
        *shared.current.write() = snap.clone();
        Ok(snap)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))??;

    tracing::info!(documents = loaded.corpus.len(), "corpus reloaded");
    Ok(Json(serde_json::json!({
        "documents": loaded.corpus.len(),
        "unique_terms": loaded.corpus.index().num_terms(),
        "loaded_at": loaded.loaded_at,
    })))
}

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}_]+").expect("valid regex");
}

/// Which words of a document count as hits for a query: the words that were
/// typed, and any word that stems to one of the query terms.
struct QueryMatcher<'a> {
    analyzer: &'a dyn TextAnalyzer,
    words: HashSet<String>,
    stems: HashSet<&'a str>,
}

impl<'a> QueryMatcher<'a> {
    fn new(analyzer: &'a dyn TextAnalyzer, effective_query: &str, query_terms: &'a [Term]) -> Self {
        let words = analyzer
            .tokenize(effective_query)
            .into_iter()
            .filter(|t| t.chars().all(char::is_alphanumeric) && !analyzer.is_stopword(t))
            .collect();
        Self { analyzer, words, stems: query_terms.iter().map(String::as_str).collect() }
    }

    fn is_match(&self, word: &str) -> bool {
        let lower = word.to_lowercase();
        if self.words.contains(&lower) { return true; }
        !self.analyzer.is_stopword(&lower) && self.stems.contains(self.analyzer.stem(&lower).as_str())
    }
}

fn snippet_from_text(text: &str, matcher: &QueryMatcher<'_>, window: usize) -> Option<String> {
    if text.is_empty() { return None; }
    let first_idx = WORD_RE.find_iter(text).find(|m| matcher.is_match(m.as_str())).map(|m| m.start());
    let snippet = match first_idx {
        Some(idx) => {
            let start = floor_char_boundary(text, idx.saturating_sub(window / 3));
            let end = floor_char_boundary(text, (start + window).min(text.len()));
            &text[start..end]
        }
        None => match text.char_indices().nth(window) {
            Some((cut, _)) => &text[..cut],
            None => text,
        },
    };
    Some(highlight_terms(snippet, matcher))
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) { idx -= 1; }
    idx
}

/// Wraps every matching whole word in `<em>`, in a single pass.
fn highlight_terms(snippet: &str, matcher: &QueryMatcher<'_>) -> String {
    WORD_RE
        .replace_all(snippet, |caps: &Captures| {
            let word = &caps[0];
            if matcher.is_match(word) { format!("<em>{word}</em>") } else { word.to_string() }
        })
        .into_owned()
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.shared.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrieval::tokenizer::EnglishAnalyzer;

    fn snippet(text: &str, query: &str, window: usize) -> String {
        let analyzer = EnglishAnalyzer::new();
        let terms = retrieval::normalize::normalize(&analyzer, query);
        let matcher = QueryMatcher::new(&analyzer, query, &terms);
        snippet_from_text(text, &matcher, window).unwrap()
    }

    #[test]
    fn snippet_highlights_first_match() {
        let s = snippet("Intro text. The cat sat on the mat.", "cat", 300);
        assert!(s.contains("<em>cat</em>"));
    }

    #[test]
    fn snippet_without_match_is_prefix() {
        assert_eq!(snippet("ééééé", "zzz", 3), "ééé");
    }

    #[test]
    fn snippet_window_respects_char_boundaries() {
        let text = format!("{} cat {}", "é".repeat(200), "ü".repeat(200));
        let s = snippet(&text, "cat", 90);
        assert!(s.contains("<em>cat</em>"));
    }

    #[test]
    fn later_terms_do_not_touch_earlier_markup() {
        let s = snippet("the cat and em dash", "cat em", 300);
        assert_eq!(s, "the <em>cat</em> and <em>em</em> dash");
    }

    #[test]
    fn only_whole_words_are_highlighted() {
        let s = snippet("a catalog about one cat", "cat", 300);
        assert_eq!(s, "a catalog about one <em>cat</em>");
    }

    #[test]
    fn inflected_forms_share_a_stem() {
        assert_eq!(snippet("The Cat sat.", "cats", 300), "The <em>Cat</em> sat.");
        assert_eq!(snippet("two cats ran", "cat", 300), "two <em>cats</em> ran");
    }

    #[test]
    fn stopwords_are_never_highlighted() {
        assert_eq!(snippet("the cat", "the cat", 300), "the <em>cat</em>");
    }
}
