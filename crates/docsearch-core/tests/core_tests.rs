use std::fs;
use std::io::Read;
use tempfile::TempDir;

use docsearch_core::{
    indexable_name, source_id, Collections, Config, Corpus, DirectoryCorpus, Locale, SearchSettings,
    StaticCollections,
};
use figment::{providers::{Format, Toml}, Figment};

fn read_all(corpus: &DirectoryCorpus, name: &str, locale: &Locale) -> String {
    let mut s = String::new();
    corpus.open(name, locale).expect("open").read_to_string(&mut s).unwrap();
    s
}

#[test]
fn locale_parse_normalizes_case_and_separator() {
    let a = Locale::parse("en-us").unwrap();
    let b = Locale::parse("EN_US").unwrap();
    assert_eq!(a, b);
    assert_eq!(a.to_string(), "en_US");
    assert_eq!(a.language_only().to_string(), "en");
    assert!(Locale::parse("").is_none());
    assert!(Locale::parse("e").is_none());
    assert!(Locale::parse("en_").is_none());
}

#[test]
fn directory_corpus_lists_sources_and_documents() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    fs::create_dir_all(root.join("guide/topics")).unwrap();
    fs::create_dir_all(root.join("guide/nl/de/topics")).unwrap();
    fs::create_dir_all(root.join("ref")).unwrap();
    fs::write(root.join("guide/VERSION"), "1.2.0\n").unwrap();
    fs::write(root.join("guide/topics/a.html"), "<title>A</title>english").unwrap();
    fs::write(root.join("guide/nl/de/topics/a.html"), "<title>A</title>deutsch").unwrap();
    fs::write(root.join("guide/nl/de/topics/only_de.html"), "<title>Nur</title>deutsch").unwrap();
    fs::write(root.join("ref/b.txt"), "reference").unwrap();

    let corpus = DirectoryCorpus::open(root).expect("corpus");
    let sources = corpus.sources();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0].id, "guide");
    assert_eq!(sources[0].version, "1.2.0");
    assert_eq!(sources[1].id, "ref");
    assert!(!sources[1].version.is_empty(), "fingerprint version for unversioned source");

    let en = Locale::parse("en").unwrap();
    let de = Locale::parse("de_DE").unwrap();
    assert_eq!(corpus.documents("guide", &en), vec!["/guide/topics/a.html".to_string()]);
    assert_eq!(
        corpus.documents("guide", &de),
        vec!["/guide/topics/a.html".to_string(), "/guide/topics/only_de.html".to_string()]
    );
    assert_eq!(read_all(&corpus, "/guide/topics/only_de.html", &de), "<title>Nur</title>deutsch");
    assert!(corpus.open("/guide/topics/only_de.html", &en).is_err());
    assert_eq!(read_all(&corpus, "/guide/topics/a.html", &en), "<title>A</title>english");
    assert_eq!(read_all(&corpus, "/guide/topics/a.html", &de), "<title>A</title>deutsch");
    assert!(corpus.open("/guide/../ref/b.txt", &en).is_err());
}

#[test]
fn fingerprint_version_changes_with_content() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("src")).unwrap();
    fs::write(tmp.path().join("src/a.txt"), "one").unwrap();
    let corpus = DirectoryCorpus::open(tmp.path()).unwrap();
    let before = corpus.sources()[0].version.clone();
    fs::write(tmp.path().join("src/b.txt"), "two").unwrap();
    let after = corpus.sources()[0].version.clone();
    assert_ne!(before, after);
}

#[test]
fn missing_corpus_root_is_an_error() {
    let tmp = TempDir::new().unwrap();
    assert!(DirectoryCorpus::open(tmp.path().join("nope")).is_err());
}

#[test]
fn indexable_names_and_source_ids() {
    assert_eq!(indexable_name("/s/a.html#intro").as_deref(), Some("/s/a.html"));
    assert_eq!(indexable_name("/s/b.TXT").as_deref(), Some("/s/b.TXT"));
    assert!(indexable_name("/s/c.png").is_none());
    assert!(indexable_name("/s/noext").is_none());
    assert_eq!(source_id("/guide/topics/a.html"), Some("guide"));
    assert_eq!(source_id("guide"), None);
}

#[test]
fn static_collections_scope_and_labels() {
    let c = StaticCollections::new()
        .with_document("/s/doc1.html", "S", Some("Doc One"))
        .with_scope("S1", ["/s/doc1.html"]);
    assert_eq!(c.owning_collection("/s/doc1.html").as_deref(), Some("S"));
    assert_eq!(c.label("/s/doc1.html").as_deref(), Some("Doc One"));
    assert!(c.scope_contains("S1", "/s/doc1.html"));
    assert!(!c.scope_contains("S1", "/s/doc2.html"));
    assert!(!c.scope_contains("S2", "/s/doc1.html"));
}

#[test]
fn search_settings_defaults_and_overrides() {
    let cfg = Config::from_figment(Figment::new());
    let s = SearchSettings::from_config(&cfg).expect("defaults");
    assert_eq!(s.max_hits, 200);
    assert_eq!(s.default_locale, "en");

    let tmp = TempDir::new().unwrap();
    let toml = format!(
        "[search]\nstate_dir = \"{}\"\nmax_hits = 50\nraw_hit_limit = 10\nprebuilt_dir = \"prebuilt\"\n[search.analyzers]\nde = \"stemming:german\"\n",
        tmp.path().display()
    );
    let cfg = Config::from_figment(Figment::new().merge(Toml::string(&toml)));
    let s = SearchSettings::from_config(&cfg).expect("settings");
    assert_eq!(s.max_hits, 50);
    assert_eq!(s.raw_hit_limit, 50, "raw limit raised to max_hits");
    assert_eq!(s.prebuilt_dir.as_deref(), Some(tmp.path().join("prebuilt").as_path()));
    assert_eq!(s.analyzers.get("de").map(String::as_str), Some("stemming:german"));
}

#[test]
fn invalid_settings_are_rejected() {
    let cfg = Config::from_figment(Figment::new().merge(Toml::string("[search]\nmax_hits = 0\n")));
    assert!(SearchSettings::from_config(&cfg).is_err());
    let cfg = Config::from_figment(Figment::new().merge(Toml::string("[search]\ndefault_locale = \"?\"\n")));
    assert!(SearchSettings::from_config(&cfg).is_err());
}
