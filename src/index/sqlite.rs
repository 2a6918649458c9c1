use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::chunker::PassageSplitter;
use super::scoring::rank_passages;
use super::{IndexProvider, IngestReport, Passage, ProjectInfo, Retriever};
use crate::config::{DatabaseConfig, RESULTS_DIR_NAME};
use crate::error::{RetrievalError, RetrievalResult};

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed passage index holding every project
#[derive(Clone)]
pub struct SqliteIndex {
    pool: SqlitePool,
}

impl SqliteIndex {
    /// Open (or create) the index database
    pub async fn new(config: &DatabaseConfig) -> RetrievalResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RetrievalError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| RetrievalError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| RetrievalError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let index = Self { pool };
        index.run_migrations().await?;

        Ok(index)
    }

    /// Create a private in-memory index (single connection, lives as long as the pool)
    pub async fn new_in_memory() -> RetrievalResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
            RetrievalError::Connection {
                message: format!("Invalid database URL: {}", e),
            }
        })?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| RetrievalError::Connection {
                message: format!("Failed to open in-memory database: {}", e),
            })?;

        let index = Self { pool };
        index.run_migrations().await?;

        Ok(index)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> RetrievalResult<()> {
        info!("Running index migrations...");

        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| RetrievalError::Migration {
                message: format!("Failed to run migrations: {}", e),
            })?;

        info!("Index migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Build (or rebuild) a project's passages from the files in `source_dir`.
    ///
    /// Only regular files directly inside `source_dir` are read; the
    /// project's results directory and non-UTF-8 files are skipped. The
    /// project's previous passages are replaced in a single transaction, so
    /// re-ingesting unchanged sources never duplicates entries.
    pub async fn ingest(&self, project: &str, source_dir: &Path) -> RetrievalResult<IngestReport> {
        let ingestion_error = |message: String| RetrievalError::Ingestion {
            path: source_dir.to_path_buf(),
            message,
        };

        let mut entries = tokio::fs::read_dir(source_dir)
            .await
            .map_err(|e| ingestion_error(e.to_string()))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ingestion_error(e.to_string()))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| ingestion_error(e.to_string()))?;
            if file_type.is_file() && entry.file_name() != RESULTS_DIR_NAME {
                files.push(entry.path());
            }
        }
        files.sort();

        let mut documents = Vec::new();
        let mut skipped = Vec::new();
        for path in files {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| ingestion_error(format!("{}: {}", name, e)))?;

            match String::from_utf8(bytes) {
                Ok(text) if !text.trim().is_empty() => documents.push((name, text)),
                Ok(_) => {
                    debug!(project = %project, file = %name, "Skipping empty document");
                    skipped.push(name);
                }
                Err(_) => {
                    warn!(project = %project, file = %name, "Skipping non-text document");
                    skipped.push(name);
                }
            }
        }

        if documents.is_empty() {
            return Err(ingestion_error("no readable documents found".to_string()));
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM passages WHERE project = ?")
            .bind(project)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO projects (name, source_path, document_count, passage_count, ingested_at)
            VALUES (?, ?, 0, 0, ?)
            ON CONFLICT(name) DO UPDATE SET source_path = excluded.source_path
            "#,
        )
        .bind(project)
        .bind(source_dir.display().to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        let splitter = PassageSplitter::default();
        let mut passage_count = 0usize;
        for (source, text) in &documents {
            for (position, content) in splitter.split(text).into_iter().enumerate()
            {
                sqlx::query(
                    r#"
                    INSERT INTO passages (project, source, position, content)
                    VALUES (?, ?, ?, ?)
                    "#,
                )
                .bind(project)
                .bind(source)
                .bind(position as i64)
                .bind(&content)
                .execute(&mut *tx)
                .await?;
                passage_count += 1;
            }
        }

        sqlx::query(
            r#"
            UPDATE projects
            SET document_count = ?, passage_count = ?, ingested_at = ?
            WHERE name = ?
            "#,
        )
        .bind(documents.len() as i64)
        .bind(passage_count as i64)
        .bind(Utc::now().to_rfc3339())
        .bind(project)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            project = %project,
            documents = documents.len(),
            passages = passage_count,
            skipped = skipped.len(),
            "Project ingested"
        );

        Ok(IngestReport {
            project: project.to_string(),
            documents: documents.len(),
            passages: passage_count,
            skipped,
        })
    }

    /// Look up an ingested project
    pub async fn get_project(&self, project: &str) -> RetrievalResult<Option<ProjectInfo>> {
        let row: Option<ProjectRow> = sqlx::query_as(
            r#"
            SELECT name, source_path, document_count, passage_count, ingested_at
            FROM projects
            WHERE name = ?
            "#,
        )
        .bind(project)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    /// List all ingested projects, by name
    pub async fn list_projects(&self) -> RetrievalResult<Vec<ProjectInfo>> {
        let rows: Vec<ProjectRow> = sqlx::query_as(
            r#"
            SELECT name, source_path, document_count, passage_count, ingested_at
            FROM projects
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    /// Irreversibly delete a project and its passages.
    ///
    /// Returns whether the project existed.
    pub async fn drop_project(&self, project: &str) -> RetrievalResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM passages WHERE project = ?")
            .bind(project)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM projects WHERE name = ?")
            .bind(project)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let existed = result.rows_affected() > 0;
        info!(project = %project, existed, "Project dropped");
        Ok(existed)
    }

    /// Open a project's index for querying
    pub async fn project_index(&self, project: &str) -> RetrievalResult<ProjectIndex> {
        if self.get_project(project).await?.is_none() {
            return Err(RetrievalError::ProjectNotFound {
                project: project.to_string(),
            });
        }

        Ok(ProjectIndex {
            pool: self.pool.clone(),
            project: project.to_string(),
        })
    }
}

#[async_trait]
impl IndexProvider for SqliteIndex {
    async fn open_index(&self, project: &str) -> RetrievalResult<Arc<dyn Retriever>> {
        let index = self.project_index(project).await?;
        Ok(Arc::new(index))
    }
}

/// Read-only view of one project's passages
#[derive(Clone)]
pub struct ProjectIndex {
    pool: SqlitePool,
    project: String,
}

impl ProjectIndex {
    /// Project this index serves
    pub fn project(&self) -> &str {
        &self.project
    }
}

#[async_trait]
impl Retriever for ProjectIndex {
    async fn retrieve(&self, query: &str, top_k: usize) -> RetrievalResult<Vec<Passage>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT source, content
            FROM passages
            WHERE project = ?
            ORDER BY id ASC
            "#,
        )
        .bind(&self.project)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RetrievalError::Query {
            message: e.to_string(),
        })?;

        let passages = rank_passages(query, rows, top_k);

        debug!(
            project = %self.project,
            top_k,
            returned = passages.len(),
            "Retrieved passages"
        );

        Ok(passages)
    }
}

// Internal row type for SQLx mapping
#[derive(sqlx::FromRow)]
struct ProjectRow {
    name: String,
    source_path: String,
    document_count: i64,
    passage_count: i64,
    ingested_at: String,
}

impl From<ProjectRow> for ProjectInfo {
    fn from(row: ProjectRow) -> Self {
        Self {
            name: row.name,
            source_path: row.source_path,
            document_count: row.document_count,
            passage_count: row.passage_count,
            ingested_at: DateTime::parse_from_rfc3339(&row.ingested_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        }
    }
}
