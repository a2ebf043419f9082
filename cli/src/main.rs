use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use retrieval::{EngineConfig, LoadedCorpus, SearchEngine, SearchOptions, SymSpellDictionary};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "docsearch")]
#[command(about = "Rank a folder of text documents against free-text queries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CorpusArgs {
    /// Folder of .txt documents
    #[arg(long, default_value = "./corpus")]
    corpus: String,
    /// Largest edit distance for vocabulary spelling fallback
    #[arg(long, default_value_t = 2)]
    max_edit_distance: usize,
    /// Vocabulary terms inspected per misspelled word
    #[arg(long, default_value_t = 1000)]
    fallback_candidates: usize,
    /// Spelling dictionary, one `word count` pair per line
    #[arg(long)]
    dictionary: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the corpus
    Search {
        #[command(flatten)]
        source: CorpusArgs,
        /// Free-text query
        #[arg(long)]
        query: String,
        /// Number of results
        #[arg(long, default_value_t = 10)]
        k: usize,
        /// Do not rewrite misspelled query words
        #[arg(long, default_value_t = false)]
        no_spell: bool,
        /// Print JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show corpus statistics and the most widespread terms
    Stats {
        #[command(flatten)]
        source: CorpusArgs,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Serialize)]
struct Hit<'a> {
    rank: usize,
    doc_id: &'a str,
    score: f64,
    preview: String,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Search { source, query, k, no_spell, json } => {
            let (engine, loaded) = load(&source)?;
            search(&engine, &loaded, &query, SearchOptions { top_k: k, spell_check: !no_spell }, json)
        }
        Commands::Stats { source, limit, json } => {
            let (_, loaded) = load(&source)?;
            stats(&loaded, &source.corpus, limit, json)
        }
    }
}

fn load(args: &CorpusArgs) -> Result<(SearchEngine, LoadedCorpus)> {
    let mut engine = SearchEngine::new(EngineConfig {
        max_edit_distance: args.max_edit_distance,
        fallback_candidates: args.fallback_candidates,
        ..EngineConfig::default()
    });
    if let Some(path) = &args.dictionary {
        engine = engine.with_suggester(SymSpellDictionary::load(path, args.max_edit_distance)?);
    }
    let loaded = engine.load_dir(&args.corpus)?;
    if loaded.is_empty() {
        bail!("no documents found in {}", args.corpus);
    }
    Ok((engine, loaded))
}

fn search(engine: &SearchEngine, loaded: &LoadedCorpus, query: &str, opts: SearchOptions, json: bool) -> Result<()> {
    let outcome = engine.search(loaded, query, opts)?;
    let preview_chars = engine.config().preview_chars;
    let hits: Vec<Hit> = outcome
        .hits
        .iter()
        .enumerate()
        .map(|(i, h)| Hit {
            rank: i + 1,
            doc_id: h.doc_id.as_str(),
            score: h.score,
            preview: loaded.document(h.doc_id.as_str()).map(|d| d.preview(preview_chars)).unwrap_or_default(),
        })
        .collect();

    if json {
        let out = serde_json::json!({
            "query": query,
            "corrected_query": outcome.corrected_query,
            "total_hits": outcome.total_hits,
            "results": hits,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if let Some(corrected) = &outcome.corrected_query {
        println!("spell check: '{query}' -> '{corrected}'");
    }
    if hits.is_empty() {
        println!("no results");
        return Ok(());
    }
    println!("found {} relevant documents", outcome.total_hits);
    for hit in hits {
        println!("#{} {} (score {:.4})", hit.rank, hit.doc_id, hit.score);
        println!("    {}", hit.preview.replace('\n', " "));
    }
    Ok(())
}

fn stats(loaded: &LoadedCorpus, corpus_dir: &str, limit: usize, json: bool) -> Result<()> {
    let stats = loaded.stats(limit);
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    println!("corpus folder: {corpus_dir}");
    println!("documents:     {}", stats.documents);
    println!("unique terms:  {}", stats.unique_terms);
    println!("{:<24} {:>8} {:>12}", "term", "df", "occurrences");
    for t in &stats.top_terms {
        println!("{:<24} {:>8} {:>12}", t.term, t.document_frequency, t.total_occurrences);
    }
    Ok(())
}
