use std::time::Duration;

use linkbox_storage::postgres::{DELETE_CHUNK_SIZE, SCHEMA};
use linkbox_storage::{OwnerId, PostgresRegistry, Registry, SaveOutcome, ShortCode, StorageError};
use linkbox_test_infra::postgres::{PostgresConfig, PostgresServer};
use sqlx::postgres::PgPoolOptions;

struct Fixture {
    _postgres: PostgresServer,
    repo: PostgresRegistry,
}

impl Fixture {
    async fn start() -> Self {
        let postgres = PostgresServer::new(PostgresConfig::builder().build())
            .await
            .expect("start postgres");
        let url = postgres.database_url().await.expect("postgres url");
        let pool = connect_with_retry(&url).await;

        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .expect("create schema");

        Self {
            _postgres: postgres,
            repo: PostgresRegistry::new(pool),
        }
    }
}

async fn connect_with_retry(url: &str) -> sqlx::PgPool {
    let mut last_error = None;

    for _ in 0..20 {
        match PgPoolOptions::new().max_connections(5).connect(url).await {
            Ok(pool) => return pool,
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

fn owner(value: &str) -> OwnerId {
    OwnerId::new(value).unwrap()
}

#[tokio::test]
async fn save_dedups_per_owner_in_one_statement() {
    let fixture = Fixture::start().await;
    let repo = &fixture.repo;

    let first = repo
        .save(&code("ghi"), "https://a.com", &owner("u1"))
        .await
        .unwrap();
    let second = repo
        .save(&code("xyz"), "https://a.com", &owner("u1"))
        .await
        .unwrap();
    let other = repo
        .save(&code("zzz"), "https://a.com", &owner("u2"))
        .await
        .unwrap();

    assert_eq!(first, SaveOutcome::Created(code("ghi")));
    assert_eq!(second, SaveOutcome::Existing(code("ghi")));
    assert_eq!(other, SaveOutcome::Created(code("zzz")));
    assert!(repo.get(&code("xyz")).await.unwrap().is_none());
}

#[tokio::test]
async fn save_reports_taken_code() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .save(&code("ghi"), "https://a.com", &owner("u1"))
        .await
        .unwrap();

    let err = fixture
        .repo
        .save(&code("ghi"), "https://b.com", &owner("u1"))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::CodeTaken(_)));
}

#[tokio::test]
async fn concurrent_saves_of_one_pair_create_one_record() {
    let fixture = Fixture::start().await;
    let repo = &fixture.repo;

    let (left_code, right_code) = (code("left"), code("right"));
    let (left_owner, right_owner) = (owner("u1"), owner("u1"));
    let (left, right) = tokio::join!(
        repo.save(&left_code, "https://a.com", &left_owner),
        repo.save(&right_code, "https://a.com", &right_owner),
    );
    let (left, right) = (left.unwrap(), right.unwrap());

    assert_eq!(
        [left.is_new(), right.is_new()].iter().filter(|new| **new).count(),
        1
    );
    assert_eq!(left.code(), right.code());
    assert_eq!(repo.owner_urls(&owner("u1")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn batch_save_is_all_or_nothing() {
    let fixture = Fixture::start().await;
    let repo = &fixture.repo;

    repo.save(&code("ghi"), "https://a.com", &owner("u1"))
        .await
        .unwrap();

    let items = vec![
        (code("aaa"), "https://fresh.com".to_string()),
        (code("bbb"), "https://a.com".to_string()),
    ];
    let err = repo.batch_save(&items, &owner("u1")).await.unwrap_err();

    assert!(matches!(err, StorageError::Conflict(_)));
    assert!(repo.get(&code("aaa")).await.unwrap().is_none());
    assert!(repo.get(&code("bbb")).await.unwrap().is_none());

    let items = vec![
        (code("aaa"), "https://fresh.com".to_string()),
        (code("bbb"), "https://other.com".to_string()),
    ];
    repo.batch_save(&items, &owner("u1")).await.unwrap();
    assert_eq!(repo.owner_urls(&owner("u1")).await.unwrap().len(), 3);
}

#[tokio::test]
async fn delete_is_owner_scoped_soft_delete() {
    let fixture = Fixture::start().await;
    let repo = &fixture.repo;

    repo.save(&code("ghi"), "https://a.com", &owner("u1"))
        .await
        .unwrap();

    repo.delete(&[code("ghi")], &owner("u2")).await.unwrap();
    assert!(!repo.get(&code("ghi")).await.unwrap().unwrap().deleted);

    repo.delete(&[code("ghi")], &owner("u1")).await.unwrap();
    let record = repo.get(&code("ghi")).await.unwrap().unwrap();
    assert!(record.deleted);
    assert_eq!(record.original_url, "https://a.com");
}

#[tokio::test]
async fn delete_spans_multiple_chunks() {
    let fixture = Fixture::start().await;
    let repo = &fixture.repo;
    let total = DELETE_CHUNK_SIZE * 2 + 17;

    let items: Vec<_> = (0..total)
        .map(|i| (code(&format!("c{i}")), format!("https://example.com/{i}")))
        .collect();
    repo.batch_save(&items, &owner("u1")).await.unwrap();

    let codes: Vec<_> = items.iter().map(|(c, _)| c.clone()).collect();
    repo.delete(&codes, &owner("u1")).await.unwrap();

    for c in &codes {
        assert!(repo.get(c).await.unwrap().unwrap().deleted);
    }
}

#[tokio::test]
async fn ping_and_close() {
    let fixture = Fixture::start().await;

    fixture.repo.ping(Duration::from_secs(5)).await.unwrap();
    fixture.repo.close().await.unwrap();
    fixture.repo.close().await.unwrap();

    assert!(fixture.repo.ping(Duration::from_secs(1)).await.is_err());
}
