use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use retrieval::EngineConfig;
use serde_json::Value;
use server::{build_app, ServerConfig};
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

const TOKEN: &str = "secret";

fn write_corpus(dir: &Path) {
    fs::write(dir.join("a.txt"), "The cat sat on the mat.").unwrap();
    fs::write(dir.join("b.txt"), "A cat and another cat chased the dog.").unwrap();
    fs::write(dir.join("c.txt"), "Birds fly over the river.").unwrap();
}

fn config(dir: &Path) -> ServerConfig {
    ServerConfig { corpus_dir: dir.to_path_buf(), engine: EngineConfig::default(), dictionary: None, admin_token: Some(TOKEN.into()) }
}

fn app(dir: &Path) -> Router {
    build_app(config(dir)).unwrap()
}

fn reload_request() -> Request<Body> {
    Request::post("/reload").header("X-ADMIN-TOKEN", TOKEN).body(Body::empty()).unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    write_corpus(dir.path());

    let (status, json) = get(app(dir.path()), "/search?q=cat&k=5").await;
    assert_eq!(status, StatusCode::OK);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["doc_id"], "b.txt");
    assert_eq!(arr[1]["doc_id"], "a.txt");
    assert!(arr[0]["snippet"].as_str().unwrap().contains("<em>cat</em>"));
    assert_eq!(json["total_hits"], 2);
}

#[tokio::test]
async fn search_reports_correction() {
    let dir = tempdir().unwrap();
    write_corpus(dir.path());

    let (status, json) = get(app(dir.path()), "/search?q=catt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["corrected_query"], "cat");
    assert_eq!(json["results"].as_array().unwrap().len(), 2);

    let (_, json) = get(app(dir.path()), "/search?q=catt&spell=false").await;
    assert!(json["corrected_query"].is_null());
    assert!(json["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn zero_k_is_bad_request() {
    let dir = tempdir().unwrap();
    write_corpus(dir.path());
    let (status, _) = get(app(dir.path()), "/search?q=cat&k=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn doc_and_stats() {
    let dir = tempdir().unwrap();
    write_corpus(dir.path());

    let (status, json) = get(app(dir.path()), "/doc/c.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["text"], "Birds fly over the river.");

    let (status, _) = get(app(dir.path()), "/doc/missing.txt").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = get(app(dir.path()), "/stats?limit=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["documents"], 3);
    assert_eq!(json["top_terms"][0]["term"], "cat");
    assert_eq!(json["top_terms"][0]["total_occurrences"], 3);
}

#[tokio::test]
async fn reload_requires_token_and_swaps_corpus() {
    let dir = tempdir().unwrap();
    write_corpus(dir.path());
    let app = app(dir.path());

    let req = Request::post("/reload").body(Body::empty()).unwrap();
    let (status, _) = send(app.clone(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    fs::write(dir.path().join("d.txt"), "Rivers and birds.").unwrap();
    let (status, json) = send(app.clone(), reload_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["documents"], 4);

    let (_, json) = get(app, "/stats").await;
    assert_eq!(json["documents"], 4);
}

#[tokio::test]
async fn reload_of_emptied_folder_keeps_current_corpus() {
    let dir = tempdir().unwrap();
    write_corpus(dir.path());
    let app = app(dir.path());

    for name in ["a.txt", "b.txt", "c.txt"] {
        fs::remove_file(dir.path().join(name)).unwrap();
    }
    let (status, _) = send(app.clone(), reload_request()).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, json) = get(app.clone(), "/stats").await;
    assert_eq!(json["documents"], 3);
    let (_, json) = get(app, "/search?q=cat").await;
    assert_eq!(json["total_hits"], 2);
}

#[tokio::test]
async fn reload_of_missing_folder_keeps_current_corpus() {
    let dir = tempdir().unwrap();
    let corpus = dir.path().join("corpus");
    fs::create_dir(&corpus).unwrap();
    write_corpus(&corpus);
    let app = app(&corpus);

    fs::remove_dir_all(&corpus).unwrap();
    let (status, _) = send(app.clone(), reload_request()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (_, json) = get(app, "/stats").await;
    assert_eq!(json["documents"], 3);
}

#[tokio::test]
async fn highlights_every_query_word_once() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "the cat and em dash").unwrap();
    fs::write(dir.path().join("b.txt"), "dog").unwrap();

    let (status, json) = get(app(dir.path()), "/search?q=cat%20em").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["results"][0]["snippet"], "the <em>cat</em> and <em>em</em> dash");
}

#[tokio::test]
async fn highlights_words_sharing_the_query_stem() {
    let dir = tempdir().unwrap();
    write_corpus(dir.path());

    let (_, json) = get(app(dir.path()), "/search?q=cats").await;
    assert_eq!(json["results"][1]["doc_id"], "a.txt");
    assert_eq!(json["results"][1]["snippet"], "The <em>cat</em> sat on the mat.");
}

fn write_dictionary_corpus(dir: &Path) {
    fs::write(dir.join("a.txt"), "bats in a cave").unwrap();
    fs::write(dir.join("b.txt"), "the cat sat").unwrap();
    fs::write(dir.join("c.txt"), "a dog barked").unwrap();
}

#[tokio::test]
async fn dictionary_suggestion_beats_vocabulary_fallback() {
    let dir = tempdir().unwrap();
    let corpus = dir.path().join("corpus");
    fs::create_dir(&corpus).unwrap();
    write_dictionary_corpus(&corpus);
    let words = dir.path().join("words.txt");
    fs::write(&words, "cave 500\nbat 20\n").unwrap();

    // the vocabulary alone prefers "cat", one edit away
    let (_, json) = get(app(&corpus), "/search?q=catt").await;
    assert_eq!(json["corrected_query"], "cat");
    assert_eq!(json["results"][0]["doc_id"], "b.txt");

    let app = build_app(ServerConfig { dictionary: Some(words), ..config(&corpus) }).unwrap();
    let (status, json) = get(app, "/search?q=catt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["corrected_query"], "cave");
    assert_eq!(json["results"][0]["doc_id"], "a.txt");
    assert_eq!(json["results"][0]["snippet"], "bats in a <em>cave</em>");
}

#[tokio::test]
async fn unreadable_dictionary_fails_startup() {
    let dir = tempdir().unwrap();
    write_corpus(dir.path());
    let missing = dir.path().join("no-such-words.txt");
    assert!(build_app(ServerConfig { dictionary: Some(missing), ..config(dir.path()) }).is_err());
}
