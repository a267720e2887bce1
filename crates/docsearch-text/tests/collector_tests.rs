use docsearch_core::StaticCollections;
use docsearch_text::collector::{rescale_scores, ResultCollector};
use docsearch_text::search::RawHit;

fn hit(name: &str, title: &str, score: f32) -> RawHit {
    RawHit { name: name.to_string(), raw_title: title.to_string(), score }
}

fn collections() -> StaticCollections {
    StaticCollections::new()
        .with_document("/guide/doc1.html", "User Guide", Some("Doc One"))
        .with_document("/guide/doc2.html", "User Guide", Some("Doc Two"))
        .with_scope("S1", ["/guide/doc1.html"])
}

#[test]
fn scope_filters_hits() {
    let collections = collections();
    let scopes = vec!["S1".to_string()];
    let raw = vec![hit("/guide/doc2.html", "Two", 3.0), hit("/guide/doc1.html", "One", 2.0)];
    let hits = ResultCollector::new(&collections, &scopes, 10, "foo").collect(&raw);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].href, "/guide/doc1.html?resultof=foo");
    assert_eq!(hits[0].collection.as_deref(), Some("User Guide"));
}

#[test]
fn unknown_scope_matches_nothing() {
    let collections = collections();
    let scopes = vec!["missing".to_string()];
    let hits = ResultCollector::new(&collections, &scopes, 10, "foo").collect(&[hit("/guide/doc1.html", "", 1.0)]);
    assert!(hits.is_empty());
}

#[test]
fn label_falls_back_to_navigation_then_name() {
    let collections = collections();
    let raw = vec![
        hit("/guide/doc1.html", "Stored Title", 3.0),
        hit("/guide/doc2.html", "  ", 2.0),
        hit("/other/page.html", "", 1.0),
    ];
    let labels: Vec<String> = ResultCollector::new(&collections, &[], 10, "").collect(&raw).into_iter().map(|h| h.label).collect();
    assert_eq!(labels, vec!["Stored Title", "Doc Two", "/other/page.html"]);
}

#[test]
fn empty_query_leaves_href_untouched() {
    let collections = collections();
    let hits = ResultCollector::new(&collections, &[], 10, " ").collect(&[hit("/guide/doc1.html", "", 1.0)]);
    assert_eq!(hits[0].href, "/guide/doc1.html");
}

#[test]
fn max_hits_keeps_engine_order() {
    let collections = collections();
    let raw: Vec<RawHit> = (0..10).map(|i| hit(&format!("/guide/p{}.html", i), "t", 10.0 - i as f32)).collect();
    let hits = ResultCollector::new(&collections, &[], 3, "q").collect(&raw);
    let hrefs: Vec<&str> = hits.iter().map(|h| h.href.as_str()).collect();
    assert_eq!(hrefs, vec!["/guide/p0.html?resultof=q", "/guide/p1.html?resultof=q", "/guide/p2.html?resultof=q"]);
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn rescaled_scores_stay_in_unit_interval() {
    let scores = rescale_scores(&[12.0, 12.0, 5.0, 0.0, 30.0]);
    assert!(scores.iter().all(|s| *s > 0.0 && *s <= 1.0), "{:?}", scores);
    assert!(scores.windows(2).all(|w| w[0] >= w[1]), "{:?}", scores);
    assert!(rescale_scores(&[]).is_empty());
}
