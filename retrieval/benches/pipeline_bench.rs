use criterion::{criterion_group, criterion_main, Criterion};
use retrieval::normalize::normalize;
use retrieval::tokenizer::EnglishAnalyzer;
use retrieval::{DocumentId, SearchEngine, SearchOptions};
use std::collections::BTreeMap;

const TEXT: &str = "Information retrieval systems index documents, rank them by relevance \
    and tolerate misspelled queries. Vector space models weigh terms by frequency.";

fn bench_normalize(c: &mut Criterion) {
    let analyzer = EnglishAnalyzer::new();
    c.bench_function("normalize_paragraph", |b| b.iter(|| normalize(&analyzer, TEXT)));
}

fn bench_search(c: &mut Criterion) {
    let engine = SearchEngine::default();
    let raw: BTreeMap<DocumentId, String> = (0..500)
        .map(|i| (DocumentId::new(format!("doc{i:04}.txt")).unwrap(), format!("{TEXT} document number {i}")))
        .collect();
    let corpus = engine.load(raw);
    c.bench_function("search_misspelled", |b| {
        b.iter(|| engine.search(&corpus, "retreival of documnets", SearchOptions::default()))
    });
}

criterion_group!(benches, bench_normalize, bench_search);
criterion_main!(benches);
