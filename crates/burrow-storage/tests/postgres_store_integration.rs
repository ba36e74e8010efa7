use std::time::Duration;

use burrow_core::{DeleteRequest, LinkId, LinkRecord, ShortCode, Stats, StoredLink};
use burrow_storage::{LinkStore, PostgresStore, StorageError};
use burrow_test_infra::postgres::{PostgresConfig, PostgresServer};

struct Fixture {
    _postgres: PostgresServer,
    store: PostgresStore,
}

impl Fixture {
    async fn start() -> Self {
        let postgres = PostgresServer::new(PostgresConfig::builder().build())
            .await
            .expect("start postgres");
        let url = postgres.database_url().await.expect("postgres url");
        let store = connect_with_retry(&url).await;

        store.migrate().await.expect("create schema");

        Self {
            _postgres: postgres,
            store,
        }
    }
}

async fn connect_with_retry(url: &str) -> PostgresStore {
    let mut last_error = None;

    for _ in 0..20 {
        match PostgresStore::connect(url).await {
            Ok(store) => return store,
            Err(err) => {
                last_error = Some(err);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }

    panic!("failed to connect postgres: {last_error:?}");
}

fn code(value: &str) -> ShortCode {
    ShortCode::new_unchecked(value)
}

fn record(short: &str, url: &str, owner: &str) -> LinkRecord {
    LinkRecord::new(LinkId::new(format!("id-{short}")), code(short), url, owner)
}

#[tokio::test]
async fn add_and_get_record() {
    let fixture = Fixture::start().await;

    let stored = fixture
        .store
        .add(record("abcdefgh", "https://example.com", "u1"))
        .await
        .unwrap();
    assert!(matches!(stored, StoredLink::Inserted(_)));

    let got = fixture.store.get(&code("abcdefgh")).await.unwrap().unwrap();
    assert_eq!(got.id, LinkId::new("id-abcdefgh"));
    assert_eq!(got.original_url, "https://example.com");
    assert_eq!(got.owner_id, "u1");
    assert!(!got.is_deleted);

    assert!(fixture.store.get(&code("nopenope")).await.unwrap().is_none());
}

#[tokio::test]
async fn add_reports_existing_code_for_duplicate_url() {
    let fixture = Fixture::start().await;

    fixture
        .store
        .add(record("aaaaaaaa", "https://example.com", "u1"))
        .await
        .unwrap();
    let second = fixture
        .store
        .add(record("bbbbbbbb", "https://example.com", "u2"))
        .await
        .unwrap();

    assert_eq!(second, StoredLink::Existing(code("aaaaaaaa")));
    assert!(fixture.store.get(&code("bbbbbbbb")).await.unwrap().is_none());
    assert_eq!(fixture.store.stats().await.unwrap().urls, 1);
}

#[tokio::test]
async fn anonymous_owner_round_trips_as_empty_string() {
    let fixture = Fixture::start().await;

    fixture
        .store
        .add(record("abcdefgh", "https://example.com", ""))
        .await
        .unwrap();

    let got = fixture.store.get(&code("abcdefgh")).await.unwrap().unwrap();
    assert_eq!(got.owner_id, "");
    assert_eq!(fixture.store.get_all_by_owner("").await.unwrap().len(), 1);

    fixture
        .store
        .delete_batch(&[DeleteRequest::new(code("abcdefgh"), "")])
        .await
        .unwrap();
    assert!(fixture.store.get(&code("abcdefgh")).await.unwrap().unwrap().is_deleted);
}

#[tokio::test]
async fn add_batch_is_all_or_nothing() {
    let fixture = Fixture::start().await;

    fixture
        .store
        .add(record("aaaaaaaa", "https://taken.example", "u1"))
        .await
        .unwrap();

    let err = fixture
        .store
        .add_batch(vec![
            record("bbbbbbbb", "https://fresh.example", "u1"),
            record("cccccccc", "https://taken.example", "u1"),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Query(_)));

    assert!(fixture.store.get(&code("bbbbbbbb")).await.unwrap().is_none());
    assert_eq!(fixture.store.stats().await.unwrap().urls, 1);

    let stored = fixture
        .store
        .add_batch(vec![
            record("bbbbbbbb", "https://fresh.example", "u1"),
            record("cccccccc", "https://other.example", "u1"),
        ])
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(fixture.store.stats().await.unwrap().urls, 3);
}

#[tokio::test]
async fn delete_batch_respects_ownership_and_is_idempotent() {
    let fixture = Fixture::start().await;

    fixture
        .store
        .add_batch(vec![
            record("aaaaaaaa", "https://a.example", "u1"),
            record("bbbbbbbb", "https://b.example", "u2"),
        ])
        .await
        .unwrap();

    let requests = [
        DeleteRequest::new(code("aaaaaaaa"), "u1"),
        DeleteRequest::new(code("bbbbbbbb"), "u1"),
        DeleteRequest::new(code("zzzzzzzz"), "u1"),
    ];
    fixture.store.delete_batch(&requests).await.unwrap();
    fixture.store.delete_batch(&requests).await.unwrap();

    assert!(fixture.store.get(&code("aaaaaaaa")).await.unwrap().unwrap().is_deleted);
    assert!(!fixture.store.get(&code("bbbbbbbb")).await.unwrap().unwrap().is_deleted);
}

#[tokio::test]
async fn get_all_by_owner_includes_deleted_records() {
    let fixture = Fixture::start().await;

    fixture
        .store
        .add_batch(vec![
            record("aaaaaaaa", "https://a.example", "u1"),
            record("bbbbbbbb", "https://b.example", "u1"),
            record("cccccccc", "https://c.example", "u2"),
        ])
        .await
        .unwrap();
    fixture
        .store
        .delete_batch(&[DeleteRequest::new(code("aaaaaaaa"), "u1")])
        .await
        .unwrap();

    let mut links = fixture.store.get_all_by_owner("u1").await.unwrap();
    links.sort_by(|a, b| a.short_code.cmp(&b.short_code));

    assert_eq!(links.len(), 2);
    assert!(links[0].is_deleted);
    assert!(!links[1].is_deleted);
}

#[tokio::test]
async fn stats_counts_anonymous_as_one_owner() {
    let fixture = Fixture::start().await;

    fixture
        .store
        .add_batch(vec![
            record("aaaaaaaa", "https://a.example", "u1"),
            record("bbbbbbbb", "https://b.example", ""),
            record("cccccccc", "https://c.example", ""),
        ])
        .await
        .unwrap();

    assert_eq!(fixture.store.stats().await.unwrap(), Stats::new(3, 2));
}

#[tokio::test]
async fn ping_and_migrate_are_repeatable() {
    let fixture = Fixture::start().await;

    fixture.store.ping().await.unwrap();
    fixture.store.migrate().await.unwrap();
    fixture.store.ping().await.unwrap();
}
