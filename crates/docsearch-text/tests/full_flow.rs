use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use zip::write::SimpleFileOptions;

use docsearch_core::{DirectoryCorpus, Locale, SearchSettings};
use docsearch_text::{AnalyzerKind, IndexStore, IndexingOutcome, LocaleAnalyzer, SearchManager, SearchQuery, StemLanguage};

fn write(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn corpus(root: &Path) -> DirectoryCorpus {
    write(&root.join("guide/VERSION"), "1.0\n");
    write(
        &root.join("guide/intro.html"),
        "<html><head><title>Data Structures</title></head><body><p>An overview of data structures and algorithms.</p></body></html>",
    );
    write(
        &root.join("guide/trees.html"),
        "<html><head><title>Trees</title></head><body><p>Trees keep structures of data in a hierarchy.</p></body></html>",
    );
    write(&root.join("ref/notes.txt"), "Notes\nThe structure of the data is described elsewhere.");
    write(&root.join("ref/logo.png"), "binary");
    DirectoryCorpus::open(root).unwrap()
}

fn manager(state: &Path) -> SearchManager {
    SearchManager::new(SearchSettings::default().with_state_dir(state))
}

fn hrefs(manager: &SearchManager, query: &SearchQuery, corpus: &DirectoryCorpus) -> Vec<String> {
    manager.search(query, corpus).hits.into_iter().map(|h| h.href).collect()
}

#[test]
fn index_then_search() {
    let tmp = TempDir::new().unwrap();
    let corpus = corpus(&tmp.path().join("docs"));
    let manager = manager(&tmp.path().join("state"));

    let before = manager.search(&SearchQuery::new("data"), &corpus);
    assert!(before.index_missing);
    assert!(before.hits.is_empty());
    assert!(manager.needs_updating(None, &corpus).unwrap());

    let outcome = manager.update_index(None, &corpus).unwrap();
    assert_eq!(outcome, IndexingOutcome::Completed { removed: 0, added: 3, skipped: 0 });
    assert!(!manager.needs_updating(None, &corpus).unwrap());
    assert_eq!(manager.update_index(None, &corpus).unwrap(), IndexingOutcome::UpToDate);

    let results = manager.search(&SearchQuery::new("data structures"), &corpus);
    assert!(!results.index_missing);
    assert!(!results.hits.is_empty());
    let top = &results.hits[0];
    assert_eq!(top.href, "/guide/intro.html?resultof=data%20structures");
    assert_eq!(top.label, "Data Structures");
    assert_eq!(top.collection.as_deref(), Some("guide"));
    assert!(top.score > 0.0 && top.score <= 1.0);
    assert!(results.hits.windows(2).all(|w| w[0].score >= w[1].score));

    // Stemming matches "structures" and "structure".
    let stemmed = hrefs(&manager, &SearchQuery::new("structure"), &corpus);
    assert_eq!(stemmed.len(), 3);

    let mut scoped = SearchQuery::new("structure");
    scoped.scopes = vec!["ref".to_string()];
    assert_eq!(hrefs(&manager, &scoped, &corpus), vec!["/ref/notes.txt?resultof=structure".to_string()]);

    let mut limited = SearchQuery::new("structure");
    limited.max_hits = Some(1);
    assert_eq!(hrefs(&manager, &limited, &corpus).len(), 1);

    let mut exact = SearchQuery::new("\"structures of data\"");
    exact.fields = vec!["contents".to_string()];
    exact.field_search = true;
    assert_eq!(hrefs(&manager, &exact, &corpus), vec!["/guide/trees.html?resultof=%22structures%20of%20data%22".to_string()]);

    let excluded = hrefs(&manager, &SearchQuery::parse("searchWord=structure+NOT+trees"), &corpus);
    assert_eq!(excluded.len(), 2);
    assert!(excluded.iter().all(|h| !h.starts_with("/guide/trees.html")));
}

#[test]
fn exact_phrase_ranks_above_scattered_words() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("docs");
    write(&root.join("topics/scattered.html"), "<html><head><title>Notes</title></head><body><p>search the tree binary lookup</p></body></html>");
    write(&root.join("topics/phrase.html"), "<html><head><title>Notes</title></head><body><p>the binary search tree lookup</p></body></html>");
    let corpus = DirectoryCorpus::open(&root).unwrap();
    let manager = manager(&tmp.path().join("state"));
    manager.update_index(None, &corpus).unwrap();

    assert_eq!(
        hrefs(&manager, &SearchQuery::new("binary search"), &corpus),
        vec![
            "/topics/phrase.html?resultof=binary%20search".to_string(),
            "/topics/scattered.html?resultof=binary%20search".to_string(),
        ]
    );
}

#[test]
fn unknown_locale_and_fields_fall_back() {
    let tmp = TempDir::new().unwrap();
    let corpus = corpus(&tmp.path().join("docs"));
    let manager = manager(&tmp.path().join("state"));
    manager.update_index(None, &corpus).unwrap();

    let query = SearchQuery::parse("searchWord=hierarchy&lang=xx");
    assert!(manager.search(&query, &corpus).index_missing);
    manager.update_index(Some("xx"), &corpus).unwrap();
    let results = manager.search(&query, &corpus);
    assert!(!results.index_missing);
    assert_eq!(results.hits.len(), 1);

    let mut fields = SearchQuery::new("hierarchy");
    fields.fields = vec!["no_such_field".to_string()];
    fields.field_search = true;
    assert_eq!(hrefs(&manager, &fields, &corpus).len(), 1);

    assert!(manager.search(&SearchQuery::new("NOT hierarchy"), &corpus).hits.is_empty());
    assert!(manager.search(&SearchQuery::new(""), &corpus).hits.is_empty());
}

#[test]
fn max_hits_setting_is_only_a_default() {
    let tmp = TempDir::new().unwrap();
    let corpus = corpus(&tmp.path().join("docs"));
    let mut settings = SearchSettings::default().with_state_dir(tmp.path().join("state"));
    settings.max_hits = 1;
    let manager = SearchManager::new(settings);
    manager.update_index(None, &corpus).unwrap();

    assert_eq!(hrefs(&manager, &SearchQuery::new("structure"), &corpus).len(), 1);
    let wide = SearchQuery::parse("searchWord=structure&maxHits=500");
    assert_eq!(hrefs(&manager, &wide, &corpus).len(), 3);
}

#[test]
fn locale_without_analyzer_keeps_its_own_index() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("docs");
    write(&root.join("guide/a.html"), "<html><head><title>A</title></head><body><p>hello world</p></body></html>");
    write(&root.join("guide/nl/ja/a.html"), "<html><head><title>A</title></head><body><p>konnichiwa sekai</p></body></html>");
    write(&root.join("guide/nl/ja/b.html"), "<html><head><title>B</title></head><body><p>sayonara</p></body></html>");
    let corpus = DirectoryCorpus::open(&root).unwrap();
    let state = tmp.path().join("state");
    let manager = manager(&state);

    assert_eq!(manager.resolve_locale(Some("ja")).to_string(), "ja");
    let outcome = manager.update_index(Some("ja"), &corpus).unwrap();
    assert_eq!(outcome, IndexingOutcome::Completed { removed: 0, added: 2, skipped: 0 });
    assert!(state.join("ja").is_dir());
    assert!(!state.join("en").exists());

    let search = |word: &str| hrefs(&manager, &SearchQuery::parse(&format!("searchWord={}&lang=ja", word)), &corpus);
    assert_eq!(search("konnichiwa"), vec!["/guide/a.html?resultof=konnichiwa".to_string()]);
    assert_eq!(search("sayonara"), vec!["/guide/b.html?resultof=sayonara".to_string()]);
    assert!(search("hello").is_empty());

    // The default locale is indexed separately and sees only the untranslated file.
    assert!(manager.search(&SearchQuery::new("hello"), &corpus).index_missing);
    manager.update_index(None, &corpus).unwrap();
    assert_eq!(hrefs(&manager, &SearchQuery::new("hello"), &corpus).len(), 1);
    assert!(hrefs(&manager, &SearchQuery::new("konnichiwa"), &corpus).is_empty());
}

#[test]
fn closed_manager_returns_nothing() {
    let tmp = TempDir::new().unwrap();
    let corpus = corpus(&tmp.path().join("docs"));
    let manager = manager(&tmp.path().join("state"));
    manager.update_index(None, &corpus).unwrap();
    manager.close();

    let results = manager.search(&SearchQuery::new("data"), &corpus);
    assert!(results.hits.is_empty());
    assert!(!results.index_missing);
    assert!(manager.update_index(None, &corpus).is_err());
}

fn zip_dir(dir: &Path, archive: &Path) {
    fs::create_dir_all(archive.parent().unwrap()).unwrap();
    let mut zip = zip::ZipWriter::new(fs::File::create(archive).unwrap());
    for entry in fs::read_dir(dir).unwrap() {
        let entry = entry.unwrap();
        if !entry.file_type().unwrap().is_file() {
            continue;
        }
        zip.start_file(entry.file_name().to_string_lossy().to_string(), SimpleFileOptions::default()).unwrap();
        zip.write_all(&fs::read(entry.path()).unwrap()).unwrap();
    }
    zip.finish().unwrap();
}

#[test]
fn prebuilt_index_is_used_without_indexing() {
    let tmp = TempDir::new().unwrap();
    let corpus = corpus(&tmp.path().join("docs"));

    let builder = manager(&tmp.path().join("build"));
    builder.update_index(None, &corpus).unwrap();
    builder.close();
    zip_dir(&tmp.path().join("build/en"), &tmp.path().join("prebuilt/en/doc_index.zip"));

    let mut settings = SearchSettings::default().with_state_dir(tmp.path().join("state"));
    settings.prebuilt_dir = Some(tmp.path().join("prebuilt"));
    let manager = SearchManager::new(settings);

    let results = manager.search(&SearchQuery::new("hierarchy"), &corpus);
    assert!(!results.index_missing);
    assert_eq!(results.hits.len(), 1);
    assert!(!manager.needs_updating(None, &corpus).unwrap());
}

fn copy_files(from: &Path, to: &Path) {
    fs::create_dir_all(to).unwrap();
    for entry in fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        if entry.file_type().unwrap().is_file() {
            fs::copy(entry.path(), to.join(entry.file_name())).unwrap();
        }
    }
}

#[test]
fn source_with_shipped_index_is_merged_not_reindexed() {
    let tmp = TempDir::new().unwrap();
    let en = Locale::parse("en").unwrap();
    let analyzer = Arc::new(LocaleAnalyzer::new(AnalyzerKind::Smart(StemLanguage::English), &en));
    {
        let mut store = IndexStore::open(&tmp.path().join("build"), en, analyzer, 20_000_000).unwrap();
        store.begin_add_batch(true).unwrap();
        store.add_document("/guide/intro.html", "<title>Intro</title><p>shipped glossary</p>".as_bytes()).unwrap();
        store.end_add_batch(true, true).unwrap();
    }
    let root = tmp.path().join("docs");
    // The file on disk differs from what the shipped index holds.
    write(&root.join("guide/intro.html"), "<title>Intro</title><p>local draft</p>");
    copy_files(&tmp.path().join("build/en"), &root.join("guide/index"));
    write(&root.join("ref/notes.txt"), "Notes\nlocal glossary");
    let corpus = DirectoryCorpus::open(&root).unwrap();
    let manager = manager(&tmp.path().join("state"));

    let outcome = manager.update_index(None, &corpus).unwrap();
    assert_eq!(outcome, IndexingOutcome::Completed { removed: 0, added: 2, skipped: 0 });
    assert_eq!(hrefs(&manager, &SearchQuery::new("shipped"), &corpus), vec!["/guide/intro.html?resultof=shipped".to_string()]);
    assert!(hrefs(&manager, &SearchQuery::new("draft"), &corpus).is_empty());
    assert_eq!(hrefs(&manager, &SearchQuery::new("glossary"), &corpus).len(), 2);
}
