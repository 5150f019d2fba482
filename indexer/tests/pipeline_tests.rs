use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use quarry_core::analysis::Analyzer;
use quarry_core::store::SearchStore;
use quarry_indexer::Indexer;
use tempfile::TempDir;

async fn setup() -> (Indexer, SearchStore, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("index.db").display());
    let store = SearchStore::connect(&url).await.unwrap();
    let analyzer = Arc::new(Analyzer::english());
    (Indexer::new(analyzer, store.clone()), store, dir)
}

#[tokio::test]
async fn indexes_txt_and_md_only() {
    let (indexer, store, dir) = setup().await;
    let data = dir.path().join("data");
    std::fs::create_dir(&data).unwrap();
    std::fs::write(data.join("a.txt"), "alpha document").unwrap();
    std::fs::write(data.join("b.md"), "bravo document").unwrap();
    std::fs::write(data.join("c.html"), "charlie document").unwrap();

    indexer.index_directory(&data).await.unwrap();

    let stats = store.get_index_stats().await.unwrap();
    assert_eq!(stats.total_documents, 2);
    assert!(store
        .get_document_by_path(&data.join("c.html").display().to_string())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn postings_reproduce_analysis_counts() {
    let (indexer, store, dir) = setup().await;
    let data = dir.path().join("data");
    std::fs::create_dir(&data).unwrap();
    let content = "Rust programs index rust documents while indexing";
    std::fs::write(data.join("doc.txt"), content).unwrap();

    indexer.index_directory(&data).await.unwrap();

    let doc = store
        .get_document_by_path(&data.join("doc.txt").display().to_string())
        .await
        .unwrap()
        .expect("document indexed");

    // Re-running the analyzer over the stored content must reproduce the
    // recorded term frequencies exactly.
    let analyzer = Analyzer::english();
    let tokens = analyzer.analyze(&doc.content);
    let mut expected: HashMap<&str, u32> = HashMap::new();
    for token in &tokens {
        *expected.entry(token.as_str()).or_insert(0) += 1;
    }

    let terms: Vec<String> = expected.keys().map(|t| t.to_string()).collect();
    let entries = store.get_postings_for_terms(&terms).await.unwrap();
    assert_eq!(entries.len(), expected.len());
    for (term, tf) in expected {
        let entry = &entries[term];
        assert_eq!(entry.df, 1);
        let posting = &entry.postings[0];
        assert_eq!(posting.doc_id, doc.id);
        assert_eq!(posting.tf, tf);
        assert_eq!(posting.tf as usize, posting.positions.len());
        assert!(posting.positions.windows(2).all(|w| w[0] < w[1]));
    }
}

#[tokio::test]
async fn unchanged_file_is_skipped_on_reindex() {
    let (indexer, store, dir) = setup().await;
    let data = dir.path().join("data");
    std::fs::create_dir(&data).unwrap();
    std::fs::write(data.join("hello.txt"), "hello world").unwrap();

    indexer.index_directory(&data).await.unwrap();
    let first = store
        .get_document_by_path(&data.join("hello.txt").display().to_string())
        .await
        .unwrap()
        .unwrap();

    indexer.index_directory(&data).await.unwrap();
    let second = store
        .get_document_by_path(&data.join("hello.txt").display().to_string())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(store.get_index_stats().await.unwrap().total_documents, 1);

    let entries = store
        .get_postings_for_terms(&["hello".into(), "world".into()])
        .await
        .unwrap();
    assert_eq!(entries["hello"].df, 1);
    assert_eq!(entries["world"].df, 1);
}

#[tokio::test]
async fn modified_file_is_reindexed_with_fresh_id() {
    let (indexer, store, dir) = setup().await;
    let data = dir.path().join("data");
    std::fs::create_dir(&data).unwrap();
    let file = data.join("note.txt");
    std::fs::write(&file, "original wording here today").unwrap();

    indexer.index_directory(&data).await.unwrap();
    let old = store
        .get_document_by_path(&file.display().to_string())
        .await
        .unwrap()
        .unwrap();

    // Coarse-mtime filesystems need a real gap before the rewrite.
    tokio::time::sleep(Duration::from_millis(1100)).await;
    std::fs::write(&file, "replacement phrasing entirely").unwrap();

    indexer.index_directory(&data).await.unwrap();
    let new = store
        .get_document_by_path(&file.display().to_string())
        .await
        .unwrap()
        .unwrap();

    assert_ne!(old.id, new.id);

    // Old terms no longer point at the old id.
    let entries = store
        .get_postings_for_terms(&["origin".into(), "word".into(), "replac".into()])
        .await
        .unwrap();
    for entry in entries.values() {
        assert!(entry.postings.iter().all(|p| p.doc_id != old.id));
    }
    assert!(entries.contains_key("replac"));
    assert_eq!(entries["replac"].postings[0].doc_id, new.id);
}

#[tokio::test]
async fn web_page_shorter_than_minimum_is_rejected() {
    let (indexer, _store, _dir) = setup().await;
    let html = "<html><body><p>tiny</p></body></html>";
    let err = indexer
        .index_web_page("https://example.com/tiny", "Tiny", html)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("too short"));
}

#[tokio::test]
async fn web_page_is_indexed_and_searchable_by_term() {
    let (indexer, store, _dir) = setup().await;
    let body = "Ferris the crab explores asynchronous indexing pipelines. ".repeat(4);
    let html = format!("<html><head><title>t</title></head><body><p>{body}</p></body></html>");

    indexer
        .index_web_page("https://example.com/ferris", "Ferris", &html)
        .await
        .unwrap();

    let entries = store
        .get_postings_for_terms(&["ferri".into()])
        .await
        .unwrap();
    assert_eq!(entries["ferri"].df, 1);
    assert_eq!(store.get_index_stats().await.unwrap().total_documents, 1);
}
