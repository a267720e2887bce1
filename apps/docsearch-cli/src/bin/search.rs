use std::env;
use std::path::PathBuf;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use docsearch_core::{Config, DirectoryCorpus, SearchSettings};
use docsearch_text::{SearchManager, SearchQuery};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "docsearch_text=warn".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <query | searchWord=...&field=...> [corpus_dir]", args[0]);
        eprintln!("Example: {} '\"data structures\" NOT tree' ./docs", args[0]);
        eprintln!("Example: {} 'searchWord=index&scope=guide&maxHits=5'", args[0]);
        std::process::exit(1);
    }

    let config = Config::load()?;
    let settings = SearchSettings::from_config(&config)?;
    // A request in wire form is recognised by its searchWord key.
    let query = if args[1].contains("searchWord=") { SearchQuery::parse(&args[1]) } else { SearchQuery::new(args[1].clone()) };
    let corpus_dir = args.get(2).map(PathBuf::from).unwrap_or_else(|| {
        PathBuf::from(config.get::<String>("data.corpus_dir").unwrap_or_else(|_| "./docs".to_string()))
    });
    let corpus = DirectoryCorpus::open(&corpus_dir)?;

    let manager = SearchManager::new(settings);
    println!("Query: {}", query.search_word);
    let results = manager.search(&query, &corpus);
    if results.index_missing {
        eprintln!("No usable index for this locale, run docsearch-indexer first");
        std::process::exit(2);
    }
    println!("Found {} results", results.hits.len());
    for (i, hit) in results.hits.iter().enumerate() {
        println!("\n  {}. score={:.4}  {}", i + 1, hit.score, hit.label);
        println!("     {}  [{}]", hit.href, hit.collection.as_deref().unwrap_or("-"));
    }
    manager.close();
    Ok(())
}
