use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::info;

use shared::domain::SubmissionRecord;

/// Append-only destination for submitted records.
///
/// One successful `append` writes exactly one row. Implementations never
/// deduplicate and never retry on their own.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn append(&self, record: &SubmissionRecord) -> Result<()>;

    /// Short human-readable target description for logs.
    fn describe(&self) -> String;
}

/// Local ledger kept in a SQLite file, used for development and offline entry.
#[derive(Clone)]
pub struct SqliteLedger {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub id: i64,
    pub record: SubmissionRecord,
    pub inserted_at: DateTime<Utc>,
}

impl SqliteLedger {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        let ledger = Self { pool };
        ledger.ensure_registros_table().await?;
        Ok(ledger)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_registros_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS registros (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                data         TEXT NOT NULL,
                orgao        TEXT NOT NULL,
                dotacao      TEXT NOT NULL,
                sequencial   TEXT NOT NULL,
                valor        TEXT NOT NULL,
                inserted_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure registros table exists")?;

        let pragma_rows = sqlx::query("PRAGMA table_info(registros)")
            .fetch_all(&self.pool)
            .await
            .context("failed to inspect registros schema")?;

        let mut has_usuario_nome = false;
        for row in pragma_rows {
            let col_name: String = row.try_get("name")?;
            if col_name == "usuario_nome" {
                has_usuario_nome = true;
            }
        }

        if !has_usuario_nome {
            sqlx::query("ALTER TABLE registros ADD COLUMN usuario_nome TEXT NOT NULL DEFAULT ''")
                .execute(&self.pool)
                .await
                .context("failed adding usuario_nome column to registros")?;
            info!("added usuario_nome column to registros");
        }

        Ok(())
    }

    pub async fn insert_record(&self, record: &SubmissionRecord) -> Result<i64> {
        let rec = sqlx::query(
            "INSERT INTO registros (data, orgao, dotacao, sequencial, valor, usuario_nome, inserted_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&record.date)
        .bind(&record.organization)
        .bind(&record.allocation_code)
        .bind(&record.sequence_number)
        .bind(&record.formatted_value)
        .bind(&record.user_name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("failed to insert registro")?;
        Ok(rec.get::<i64, _>(0))
    }

    pub async fn list_records(&self) -> Result<Vec<StoredRecord>> {
        let rows = sqlx::query(
            "SELECT id, data, orgao, dotacao, sequencial, valor, usuario_nome, inserted_at
             FROM registros
             ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to list registros")?;

        rows.into_iter()
            .map(|row| -> Result<StoredRecord> {
                Ok(StoredRecord {
                    id: row.try_get("id")?,
                    record: SubmissionRecord {
                        date: row.try_get("data")?,
                        organization: row.try_get("orgao")?,
                        allocation_code: row.try_get("dotacao")?,
                        sequence_number: row.try_get("sequencial")?,
                        formatted_value: row.try_get("valor")?,
                        user_name: row.try_get("usuario_nome")?,
                    },
                    inserted_at: row.try_get("inserted_at")?,
                })
            })
            .collect()
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM registros")
            .fetch_one(&self.pool)
            .await
            .context("failed to count registros")?;
        Ok(count)
    }
}

#[async_trait]
impl Ledger for SqliteLedger {
    async fn append(&self, record: &SubmissionRecord) -> Result<()> {
        self.insert_record(record).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        "sqlite:registros".to_string()
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
