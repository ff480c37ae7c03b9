//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p persistence --test postgres_integration
//! ```

use std::sync::Arc;

use persistence::{
    AggregateRef, ChangeOp, DataStore, EntityId, EntityVersion, PersistenceError,
    PostgresDataStore, RecordChange, StoredRecord,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Run migrations using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_aggregates_table.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresDataStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE aggregates")
        .execute(&pool)
        .await
        .unwrap();

    PostgresDataStore::new(pool)
}

fn record(aggregate_type: &str, id: EntityId, version: EntityVersion) -> StoredRecord {
    StoredRecord {
        id,
        aggregate_type: aggregate_type.to_string(),
        payload: serde_json::json!({"id": id, "name": "test"}),
        version,
    }
}

fn insert(aggregate_type: &str, id: EntityId) -> RecordChange {
    RecordChange {
        op: ChangeOp::Insert,
        record: record(aggregate_type, id, EntityVersion::default()),
        references: Vec::new(),
    }
}

#[tokio::test]
#[serial]
async fn insert_and_fetch_roundtrip() {
    let store = get_test_store().await;
    let id = EntityId::new();

    let assigned = store.save(vec![insert("Dish", id)]).await.unwrap();
    assert_eq!(assigned.len(), 1);
    let version = assigned[0].1.clone();
    assert!(!version.is_unset());

    let fetched = store.fetch("Dish", id).await.unwrap().unwrap();
    assert_eq!(fetched.id, id);
    assert_eq!(fetched.version, version);
    assert_eq!(fetched.payload["name"], "test");

    // Same id under a different type tag is a different row.
    assert!(store.fetch("Meal", id).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn update_rotates_the_row_version() {
    let store = get_test_store().await;
    let id = EntityId::new();
    let assigned = store.save(vec![insert("Dish", id)]).await.unwrap();
    let current = assigned[0].1.clone();

    let change = RecordChange {
        op: ChangeOp::Update,
        record: record("Dish", id, current.clone()),
        references: Vec::new(),
    };
    let assigned = store.save(vec![change]).await.unwrap();

    assert_ne!(assigned[0].1, current);
}

#[tokio::test]
#[serial]
async fn stale_update_is_a_version_mismatch() {
    let store = get_test_store().await;
    let id = EntityId::new();
    store.save(vec![insert("Dish", id)]).await.unwrap();

    let stale = RecordChange {
        op: ChangeOp::Update,
        record: record("Dish", id, EntityVersion::from_bytes(vec![0; 8])),
        references: Vec::new(),
    };

    let result = store.save(vec![stale]).await;
    assert!(matches!(
        result,
        Err(PersistenceError::VersionMismatch { .. })
    ));
}

#[tokio::test]
#[serial]
async fn duplicate_insert_is_a_version_mismatch() {
    let store = get_test_store().await;
    let id = EntityId::new();
    store.save(vec![insert("Dish", id)]).await.unwrap();

    let result = store.save(vec![insert("Dish", id)]).await;
    assert!(matches!(
        result,
        Err(PersistenceError::VersionMismatch { .. })
    ));
}

#[tokio::test]
#[serial]
async fn version_checked_delete() {
    let store = get_test_store().await;
    let id = EntityId::new();
    let assigned = store.save(vec![insert("Meal", id)]).await.unwrap();

    let stale = RecordChange {
        op: ChangeOp::Delete,
        record: record("Meal", id, EntityVersion::from_bytes(vec![1; 8])),
        references: Vec::new(),
    };
    assert!(store.save(vec![stale]).await.is_err());
    assert!(store.exists("Meal", id).await.unwrap());

    let current = RecordChange {
        op: ChangeOp::Delete,
        record: record("Meal", id, assigned[0].1.clone()),
        references: Vec::new(),
    };
    store.save(vec![current]).await.unwrap();
    assert!(!store.exists("Meal", id).await.unwrap());
}

#[tokio::test]
#[serial]
async fn missing_reference_rolls_back_the_batch() {
    let store = get_test_store().await;
    let meal_id = EntityId::new();

    let mut change = insert("Meal", meal_id);
    change
        .references
        .push(AggregateRef::new("Dish", EntityId::new()));

    let result = store.save(vec![change]).await;
    assert!(matches!(
        result,
        Err(PersistenceError::ReferenceNotFound { .. })
    ));
    assert!(!store.exists("Meal", meal_id).await.unwrap());
}

#[tokio::test]
#[serial]
async fn reference_satisfied_within_the_batch() {
    let store = get_test_store().await;
    let dish_id = EntityId::new();
    let meal_id = EntityId::new();

    let mut meal = insert("Meal", meal_id);
    meal.references.push(AggregateRef::new("Dish", dish_id));

    store
        .save(vec![insert("Dish", dish_id), meal])
        .await
        .unwrap();

    assert!(store.exists("Dish", dish_id).await.unwrap());
    assert!(store.exists("Meal", meal_id).await.unwrap());
}

#[tokio::test]
#[serial]
async fn two_writers_race_and_the_second_loses() {
    let store = get_test_store().await;
    let id = EntityId::new();
    let assigned = store.save(vec![insert("Dish", id)]).await.unwrap();
    let loaded_version = assigned[0].1.clone();

    // Writer A commits first.
    let mut winning = record("Dish", id, loaded_version.clone());
    winning.payload = serde_json::json!({"id": id, "name": "winner"});
    store
        .save(vec![RecordChange {
            op: ChangeOp::Update,
            record: winning,
            references: Vec::new(),
        }])
        .await
        .unwrap();

    // Writer B still holds the version it loaded before A committed.
    let mut losing = record("Dish", id, loaded_version);
    losing.payload = serde_json::json!({"id": id, "name": "loser"});
    let result = store
        .save(vec![RecordChange {
            op: ChangeOp::Update,
            record: losing,
            references: Vec::new(),
        }])
        .await;

    assert!(matches!(
        result,
        Err(PersistenceError::VersionMismatch { .. })
    ));

    let stored = store.fetch("Dish", id).await.unwrap().unwrap();
    assert_eq!(stored.payload["name"], "winner");
}
