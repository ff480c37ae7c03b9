use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    EntityId, EntityVersion, PersistenceError, Result,
    store::{ChangeOp, DataStore, RecordChange, StoredRecord},
};

/// PostgreSQL-backed aggregate store.
///
/// One row per aggregate root: the whole document as jsonb plus a bytea row
/// version drawn from a sequence. A save batch runs in a single transaction,
/// so version checks, referential checks and writes are all-or-nothing.
#[derive(Clone)]
pub struct PostgresDataStore {
    pool: PgPool,
}

impl PostgresDataStore {
    /// Creates a new PostgreSQL aggregate store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_record(aggregate_type: &str, row: PgRow) -> Result<StoredRecord> {
        Ok(StoredRecord {
            id: EntityId::from_uuid(row.try_get::<Uuid, _>("id")?),
            aggregate_type: aggregate_type.to_string(),
            payload: row.try_get("payload")?,
            version: EntityVersion::from_bytes(row.try_get::<Vec<u8>, _>("row_version")?),
        })
    }

    async fn next_version(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<EntityVersion> {
        let value: i64 = sqlx::query_scalar("SELECT nextval('aggregate_row_version')")
            .fetch_one(&mut **tx)
            .await?;
        Ok(EntityVersion::from_bytes(value.to_be_bytes().to_vec()))
    }

    fn mismatch(change: &RecordChange) -> PersistenceError {
        PersistenceError::VersionMismatch {
            aggregate_type: change.record.aggregate_type.clone(),
            aggregate_id: change.record.id,
        }
    }
}

#[async_trait]
impl DataStore for PostgresDataStore {
    async fn fetch(&self, aggregate_type: &str, id: EntityId) -> Result<Option<StoredRecord>> {
        let row: Option<PgRow> = sqlx::query(
            "SELECT id, payload, row_version FROM aggregates WHERE aggregate_type = $1 AND id = $2",
        )
        .bind(aggregate_type)
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| Self::row_to_record(aggregate_type, row))
            .transpose()
    }

    async fn exists(&self, aggregate_type: &str, id: EntityId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM aggregates WHERE aggregate_type = $1 AND id = $2)",
        )
        .bind(aggregate_type)
        .bind(id.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn save(&self, changes: Vec<RecordChange>) -> Result<Vec<(EntityId, EntityVersion)>> {
        let mut tx = self.pool.begin().await?;
        let mut assigned = Vec::with_capacity(changes.len());

        for change in &changes {
            match change.op {
                ChangeOp::Insert => {
                    let version = Self::next_version(&mut tx).await?;
                    sqlx::query(
                        r#"
                        INSERT INTO aggregates (id, aggregate_type, payload, row_version)
                        VALUES ($1, $2, $3, $4)
                        "#,
                    )
                    .bind(change.record.id.as_uuid())
                    .bind(&change.record.aggregate_type)
                    .bind(&change.record.payload)
                    .bind(version.as_bytes())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        if let sqlx::Error::Database(ref db_err) = e
                            && db_err.constraint() == Some("aggregates_pkey")
                        {
                            return Self::mismatch(change);
                        }
                        PersistenceError::Database(e)
                    })?;
                    assigned.push((change.record.id, version));
                }
                ChangeOp::Update => {
                    let version = Self::next_version(&mut tx).await?;
                    let result = sqlx::query(
                        r#"
                        UPDATE aggregates
                        SET payload = $1, row_version = $2, updated_at = now()
                        WHERE aggregate_type = $3 AND id = $4 AND row_version = $5
                        "#,
                    )
                    .bind(&change.record.payload)
                    .bind(version.as_bytes())
                    .bind(&change.record.aggregate_type)
                    .bind(change.record.id.as_uuid())
                    .bind(change.record.version.as_bytes())
                    .execute(&mut *tx)
                    .await?;

                    if result.rows_affected() == 0 {
                        return Err(Self::mismatch(change));
                    }
                    assigned.push((change.record.id, version));
                }
                ChangeOp::Delete => {
                    let result = sqlx::query(
                        r#"
                        DELETE FROM aggregates
                        WHERE aggregate_type = $1 AND id = $2 AND row_version = $3
                        "#,
                    )
                    .bind(&change.record.aggregate_type)
                    .bind(change.record.id.as_uuid())
                    .bind(change.record.version.as_bytes())
                    .execute(&mut *tx)
                    .await?;

                    if result.rows_affected() == 0 {
                        return Err(Self::mismatch(change));
                    }
                }
            }
        }

        // Referential check for surviving rows, inside the same transaction
        // so it sees the batch's own inserts and deletes.
        for change in &changes {
            if matches!(change.op, ChangeOp::Delete) {
                continue;
            }
            for reference in &change.references {
                let exists: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM aggregates WHERE aggregate_type = $1 AND id = $2)",
                )
                .bind(reference.aggregate_type)
                .bind(reference.id.as_uuid())
                .fetch_one(&mut *tx)
                .await?;

                if !exists {
                    return Err(PersistenceError::ReferenceNotFound {
                        aggregate_type: change.record.aggregate_type.clone(),
                        aggregate_id: change.record.id,
                        referenced_type: reference.aggregate_type.to_string(),
                        referenced_id: reference.id,
                    });
                }
            }
        }

        tx.commit().await?;
        Ok(assigned)
    }
}
