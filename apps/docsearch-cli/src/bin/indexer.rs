use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use docsearch_core::{Config, DirectoryCorpus, SearchSettings};
use docsearch_text::{IndexingOutcome, ProgressMonitor, SearchManager};

/// Terminal progress bar fed by the locale's progress distributor.
struct BarMonitor {
    bar: ProgressBar,
    canceled: AtomicBool,
}

impl BarMonitor {
    fn new() -> anyhow::Result<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")?
                .progress_chars("#>-"),
        );
        Ok(Self { bar, canceled: AtomicBool::new(false) })
    }
}

impl ProgressMonitor for BarMonitor {
    fn begin_task(&self, name: &str, total_work: u64) {
        self.bar.set_length(total_work);
        self.bar.set_position(0);
        self.bar.set_message(name.to_string());
    }
    fn worked(&self, work: u64) { self.bar.inc(work); }
    fn sub_task(&self, name: &str) { self.bar.set_message(name.to_string()); }
    fn set_canceled(&self, canceled: bool) { self.canceled.store(canceled, Ordering::SeqCst); }
    fn is_canceled(&self) -> bool { self.canceled.load(Ordering::SeqCst) }
    fn done(&self) { self.bar.finish_and_clear(); }
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} [corpus_dir] [--lang <locale>] [--check]", program);
    eprintln!("  corpus_dir defaults to data.corpus_dir from config.toml");
    std::process::exit(1);
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "docsearch_text=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = SearchSettings::from_config(&config)?;

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("docsearch-indexer");
    let mut corpus_dir = None;
    let mut lang = None;
    let mut check_only = false;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--lang" | "-l" => {
                let Some(code) = args.get(i + 1) else { usage(program) };
                lang = Some(code.clone());
                i += 1;
            }
            "--check" => check_only = true,
            "--help" | "-h" => usage(program),
            arg if !arg.starts_with('-') => corpus_dir = Some(PathBuf::from(arg)),
            other => {
                eprintln!("Unknown option: {}", other);
                usage(program);
            }
        }
        i += 1;
    }
    let corpus_dir = match corpus_dir {
        Some(dir) => dir,
        None => PathBuf::from(config.get::<String>("data.corpus_dir").unwrap_or_else(|_| "./docs".to_string())),
    };

    let corpus = DirectoryCorpus::open(&corpus_dir)?;
    let manager = SearchManager::new(settings);
    let locale = manager.resolve_locale(lang.as_deref());
    println!("Corpus: {}", corpus_dir.display());
    println!("Index: {} ({})", manager.settings().state_dir.join(locale.to_string()).display(), locale);

    let needs_updating = manager.needs_updating(lang.as_deref(), &corpus)?;
    if check_only {
        println!("{}", if needs_updating { "Index is out of date" } else { "Index is up to date" });
        manager.close();
        std::process::exit(if needs_updating { 2 } else { 0 });
    }

    let progress = manager.progress(lang.as_deref())?;
    let monitor = progress.add_monitor(Arc::new(BarMonitor::new()?));
    let outcome = manager.update_index(lang.as_deref(), &corpus);
    progress.remove_monitor(monitor);
    manager.close();

    match outcome? {
        IndexingOutcome::UpToDate => println!("Index is up to date"),
        IndexingOutcome::Completed { removed, added, skipped } => {
            println!("Indexed {} documents, removed {}, skipped {}", added, removed, skipped);
        }
        IndexingOutcome::Cancelled => println!("Indexing canceled, the index will be rebuilt on the next run"),
    }
    Ok(())
}
