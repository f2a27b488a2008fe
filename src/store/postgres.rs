use anyhow::Context;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Row};

use crate::error::DatastoreError;
use crate::model::{merge_changes, Collection, Filter, Fqid, Id, Position};
use crate::store::traits::{Datastore, VersionedRecord, WriteEvent, WriteRequest};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS models (
        fqid TEXT PRIMARY KEY,
        collection TEXT NOT NULL,
        id BIGINT NOT NULL,
        data JSONB NOT NULL,
        position BIGINT NOT NULL,
        deleted BOOLEAN NOT NULL DEFAULT FALSE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS models_collection_idx ON models (collection, id)",
    r#"
    CREATE TABLE IF NOT EXISTS positions (
        position BIGSERIAL PRIMARY KEY,
        written_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS id_sequences (
        collection TEXT PRIMARY KEY,
        max_id BIGINT NOT NULL
    )
    "#,
];

/// Datastore backed by a single JSONB document table
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Create the tables if they do not exist yet
    pub async fn migrate(&self) -> anyhow::Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to run schema migration")?;
        }
        Ok(())
    }

    fn versioned(row: &sqlx::postgres::PgRow) -> Result<VersionedRecord, DatastoreError> {
        let fqid: String = row.get("fqid");
        let fqid: Fqid = fqid.parse().map_err(DatastoreError::InvalidData)?;
        let data: Value = row.get("data");
        let Value::Object(fields) = data else {
            return Err(DatastoreError::InvalidData(format!(
                "{} is not stored as an object",
                fqid
            )));
        };
        let position: i64 = row.get("position");
        Ok(VersionedRecord {
            fqid,
            fields,
            position: position as Position,
        })
    }

    async fn apply_event(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        event: &WriteEvent,
        position: i64,
    ) -> Result<(), DatastoreError> {
        match event {
            WriteEvent::Create { fqid, fields } => {
                let existing = sqlx::query("SELECT deleted FROM models WHERE fqid = $1 FOR UPDATE")
                    .bind(fqid.to_string())
                    .fetch_optional(&mut **tx)
                    .await
                    .context("Failed to check for existing model")?;
                if let Some(row) = existing {
                    let deleted: bool = row.get("deleted");
                    if !deleted {
                        return Err(DatastoreError::ModelExists(*fqid));
                    }
                }
                sqlx::query(
                    r#"
                    INSERT INTO models (fqid, collection, id, data, position, deleted)
                    VALUES ($1, $2, $3, $4, $5, FALSE)
                    ON CONFLICT (fqid) DO UPDATE SET
                        data = EXCLUDED.data,
                        position = EXCLUDED.position,
                        deleted = FALSE
                    "#,
                )
                .bind(fqid.to_string())
                .bind(fqid.collection.as_str())
                .bind(fqid.id as i64)
                .bind(Value::Object(fields.clone()))
                .bind(position)
                .execute(&mut **tx)
                .await
                .context("Failed to insert model")?;

                sqlx::query(
                    r#"
                    INSERT INTO id_sequences (collection, max_id) VALUES ($1, $2)
                    ON CONFLICT (collection) DO UPDATE SET
                        max_id = GREATEST(id_sequences.max_id, EXCLUDED.max_id)
                    "#,
                )
                .bind(fqid.collection.as_str())
                .bind(fqid.id as i64)
                .execute(&mut **tx)
                .await
                .context("Failed to advance id sequence")?;
            }
            WriteEvent::Update { fqid, fields } => {
                let row = sqlx::query(
                    "SELECT data FROM models WHERE fqid = $1 AND NOT deleted FOR UPDATE",
                )
                .bind(fqid.to_string())
                .fetch_optional(&mut **tx)
                .await
                .context("Failed to fetch model for update")?
                .ok_or(DatastoreError::DoesNotExist(*fqid))?;

                let Value::Object(mut data) = row.get::<Value, _>("data") else {
                    return Err(DatastoreError::InvalidData(format!(
                        "{} is not stored as an object",
                        fqid
                    )));
                };
                merge_changes(&mut data, fields);
                sqlx::query("UPDATE models SET data = $2, position = $3 WHERE fqid = $1")
                    .bind(fqid.to_string())
                    .bind(Value::Object(data))
                    .bind(position)
                    .execute(&mut **tx)
                    .await
                    .context("Failed to update model")?;
            }
            WriteEvent::Delete { fqid } => {
                let result = sqlx::query(
                    "UPDATE models SET deleted = TRUE, position = $2 WHERE fqid = $1 AND NOT deleted",
                )
                .bind(fqid.to_string())
                .bind(position)
                .execute(&mut **tx)
                .await
                .context("Failed to delete model")?;
                if result.rows_affected() == 0 {
                    return Err(DatastoreError::DoesNotExist(*fqid));
                }
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Datastore for PostgresStore {
    async fn get(&self, fqid: &Fqid) -> Result<Option<VersionedRecord>, DatastoreError> {
        let row = sqlx::query(
            "SELECT fqid, data, position FROM models WHERE fqid = $1 AND NOT deleted",
        )
        .bind(fqid.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch model")?;

        row.as_ref().map(Self::versioned).transpose()
    }

    async fn get_many(&self, fqids: &[Fqid]) -> Result<Vec<VersionedRecord>, DatastoreError> {
        let keys: Vec<String> = fqids.iter().map(Fqid::to_string).collect();
        let rows = sqlx::query(
            "SELECT fqid, data, position FROM models WHERE fqid = ANY($1) AND NOT deleted",
        )
        .bind(keys)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch models")?;

        rows.iter().map(Self::versioned).collect()
    }

    async fn filter(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<VersionedRecord>, DatastoreError> {
        // Filters are evaluated in process against the collection's documents.
        let rows = sqlx::query(
            "SELECT fqid, data, position FROM models WHERE collection = $1 AND NOT deleted ORDER BY id",
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list collection")?;

        let mut records = Vec::new();
        for row in &rows {
            let record = Self::versioned(row)?;
            if filter.matches(&record.fields) {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn reserve_ids(
        &self,
        collection: Collection,
        amount: usize,
    ) -> Result<Vec<Id>, DatastoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO id_sequences (collection, max_id) VALUES ($1, $2)
            ON CONFLICT (collection) DO UPDATE SET
                max_id = id_sequences.max_id + EXCLUDED.max_id
            RETURNING max_id
            "#,
        )
        .bind(collection.as_str())
        .bind(amount as i64)
        .fetch_one(&self.pool)
        .await
        .context("Failed to reserve ids")?;

        let max: i64 = row.get("max_id");
        let max = max as Id;
        Ok((max + 1 - amount as Id..=max).collect())
    }

    async fn write(&self, request: WriteRequest) -> Result<Position, DatastoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        for (fqid, read_position) in &request.locked_fields {
            let row = sqlx::query("SELECT position FROM models WHERE fqid = $1 FOR UPDATE")
                .bind(fqid.to_string())
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to lock model")?;
            if let Some(row) = row {
                let position: i64 = row.get("position");
                if position as Position > *read_position {
                    log::warn!("Rejecting write: {} changed since position {}", fqid, read_position);
                    return Err(DatastoreError::ModelLocked(*fqid));
                }
            }
        }

        let row = sqlx::query("INSERT INTO positions DEFAULT VALUES RETURNING position")
            .fetch_one(&mut *tx)
            .await
            .context("Failed to allocate position")?;
        let position: i64 = row.get("position");

        for event in &request.events {
            Self::apply_event(&mut tx, event, position).await?;
        }

        tx.commit().await.context("Failed to commit transaction")?;
        log::debug!(
            "Applied {} events at position {}",
            request.events.len(),
            position
        );
        Ok(position as Position)
    }
}
