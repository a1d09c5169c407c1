//! Tests for the template store adapters.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use pipeline::{
    ManualClock, ServiceError, StoreError, TemplateCache, TemplateFilter, TemplateRecord,
    TemplateStore, TenantId, Timestamp,
};
use store::*;

fn tenant(id: &str) -> TenantId {
    TenantId::new(id).unwrap()
}

fn record(name: &str, tenant_id: Option<&str>, body: &str) -> TemplateRecord {
    TemplateRecord {
        name: name.into(),
        tenant_id: tenant_id.map(tenant),
        body: body.into(),
    }
}

// ===========================================================================
// MemoryTemplateStore
// ===========================================================================

#[tokio::test]
async fn find_one_matches_name_and_tenant_exactly() {
    let store = MemoryTemplateStore::from_records([
        record("clean_invoice", None, "global"),
        record("clean_invoice", Some("acme"), "acme"),
    ])
    .unwrap();

    let acme = store
        .find_one(&TemplateFilter::for_tenant("clean_invoice", tenant("acme")))
        .await
        .unwrap();
    let global = store
        .find_one(&TemplateFilter::global("clean_invoice"))
        .await
        .unwrap();
    let globex = store
        .find_one(&TemplateFilter::for_tenant("clean_invoice", tenant("globex")))
        .await
        .unwrap();

    assert_eq!(acme.map(|r| r.body), Some("acme".into()));
    assert_eq!(global.map(|r| r.body), Some("global".into()));
    assert_eq!(globex, None, "tenant lookups never fall back inside the store");
}

#[test]
fn duplicate_pair_is_rejected() {
    let store = MemoryTemplateStore::new();
    store.insert(record("chat", Some("acme"), "a")).unwrap();
    store.insert(record("chat", None, "g")).unwrap();

    let err = store.insert(record("chat", Some("acme"), "b")).unwrap_err();
    assert_eq!(
        err,
        StoreError::Duplicate {
            name: "chat".into(),
            scope: "acme".into()
        }
    );
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn upsert_replaces_in_place() {
    let store = MemoryTemplateStore::new();
    store.upsert(record("chat", None, "v1"));
    store.upsert(record("chat", None, "v2"));

    assert_eq!(store.len(), 1);
    let found = store.find_one(&TemplateFilter::global("chat")).await.unwrap();
    assert_eq!(found.map(|r| r.body), Some("v2".into()));
}

// ===========================================================================
// YamlFileTemplateStore
// ===========================================================================

const DOCUMENT: &str = r#"
templates:
  - name: clean_invoice
    body: "Extract: {invoice_data}"
  - name: clean_invoice
    tenant_id: acme
    body: "Acme. Extract: {invoice_data}"
  - name: explain_generic
    text: "Explain: {data_to_explain}"
"#;

#[tokio::test]
async fn loads_records_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(DOCUMENT.as_bytes()).unwrap();

    let store = YamlFileTemplateStore::open(file.path()).await.unwrap();

    assert_eq!(store.snapshot().await.unwrap().len(), 3);
    let acme = store
        .find_one(&TemplateFilter::for_tenant("clean_invoice", tenant("acme")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(acme.body, "Acme. Extract: {invoice_data}");
    let explain = store
        .find_one(&TemplateFilter::global("explain_generic"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(explain.body, "Explain: {data_to_explain}");
}

#[test]
fn duplicate_records_in_file_fail_to_load() {
    let text = r#"
templates:
  - name: chat
    body: a
  - name: chat
    body: b
"#;
    let err = YamlFileTemplateStore::parse(text).unwrap_err();
    assert!(matches!(err, StoreError::Duplicate { .. }));
}

#[test]
fn malformed_document_is_unavailable() {
    let err = YamlFileTemplateStore::parse("templates: [ {name: x} ]").unwrap_err();
    assert!(matches!(err, StoreError::Unavailable { .. }));
}

#[tokio::test]
async fn missing_file_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let err = YamlFileTemplateStore::open(dir.path().join("absent.yaml"))
        .await
        .unwrap_err();
    match err {
        StoreError::Unavailable { message } => assert!(message.contains("absent.yaml")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn empty_document_is_allowed() {
    let store = YamlFileTemplateStore::parse("templates: []").unwrap();
    assert!(store.is_empty());
}

fn write_templates(path: &Path, text: &str) {
    std::fs::write(path, text).unwrap();
}

#[tokio::test]
async fn edits_are_visible_to_the_next_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("templates.yaml");
    write_templates(&path, "templates: []");
    let store = YamlFileTemplateStore::open(&path).await.unwrap();
    let filter = TemplateFilter::global("chat");

    assert_eq!(store.find_one(&filter).await.unwrap(), None);

    write_templates(&path, "templates:\n  - name: chat\n    body: hello\n");
    let found = store.find_one(&filter).await.unwrap();
    assert_eq!(found.map(|r| r.body), Some("hello".into()));
}

#[tokio::test]
async fn file_becoming_invalid_surfaces_on_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("templates.yaml");
    write_templates(&path, "templates: []");
    let store = YamlFileTemplateStore::open(&path).await.unwrap();

    write_templates(&path, "templates:\n  - name: chat\n    body: a\n  - name: chat\n    body: b\n");
    let err = store
        .find_one(&TemplateFilter::global("chat"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Duplicate { .. }));
}

// ===========================================================================
// TemplateCache over YamlFileTemplateStore
// ===========================================================================

fn cache_over(store: YamlFileTemplateStore) -> (TemplateCache, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Timestamp::now()));
    let cache = TemplateCache::with_clock(Arc::new(store), Duration::from_secs(900), clock.clone());
    (cache, clock)
}

#[tokio::test]
async fn template_added_after_miss_is_served_on_next_call() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("templates.yaml");
    write_templates(&path, "templates: []");
    let (cache, _clock) = cache_over(YamlFileTemplateStore::open(&path).await.unwrap());
    let acme = tenant("acme");

    let err = cache
        .get_template("clean_invoice", Some(&acme))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ServiceError::TemplateMissing {
            name: "clean_invoice".into()
        }
    );

    write_templates(
        &path,
        "templates:\n  - name: clean_invoice\n    body: \"Extract: {invoice_data}\"\n",
    );
    let body = cache.get_template("clean_invoice", Some(&acme)).await.unwrap();
    assert_eq!(body, "Extract: {invoice_data}");
}

#[tokio::test]
async fn edited_template_is_served_once_ttl_elapses() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("templates.yaml");
    write_templates(&path, "templates:\n  - name: chat\n    body: v1\n");
    let (cache, clock) = cache_over(YamlFileTemplateStore::open(&path).await.unwrap());

    assert_eq!(cache.get_template("chat", None).await.unwrap(), "v1");

    write_templates(&path, "templates:\n  - name: chat\n    body: v2\n");
    clock.advance(Duration::from_secs(899));
    assert_eq!(cache.get_template("chat", None).await.unwrap(), "v1");

    clock.advance(Duration::from_secs(1));
    assert_eq!(cache.get_template("chat", None).await.unwrap(), "v2");
}
