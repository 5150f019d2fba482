//! SQLite-backed document store.
//!
//! Three tables mirror the persisted layout: `documents` (unique on `url`
//! and on `file_path`), `inverted_index` (term primary key, postings as a
//! JSON array column, stored `df`), and `stats` (the `global_stats`
//! singleton). Term upserts are single statements using SQLite's JSON
//! functions, so each one atomically appends a posting and bumps `df`.

use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::collections::{HashMap, HashSet};

use crate::error::StoreError;
use crate::models::{now_millis, Document, IndexStats, InvertedIndexEntry, Posting, SourceType};

const STATS_ID: &str = "global_stats";

/// One inverted-index upsert model: append `posting` under `term`,
/// incrementing `df`, creating the entry if the term is new.
#[derive(Debug, Clone)]
pub struct TermUpsert {
    pub term: String,
    pub posting: Posting,
}

/// Shared handle to the search database. Cloning is cheap (pool handle).
#[derive(Clone)]
pub struct SearchStore {
    pool: SqlitePool,
}

impl SearchStore {
    /// Opens the database, verifies connectivity and runs migrations.
    /// Connection failures here are fatal at startup.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(database_url)
            .await?;

        // WAL keeps the writer from starving concurrent readers.
        sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
        sqlx::query("PRAGMA busy_timeout=10000").execute(&pool).await?;

        let store = Self { pool };
        store.run_migrations().await?;
        tracing::info!("connected to search database");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                source_type TEXT NOT NULL,
                url TEXT NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                indexed_at INTEGER NOT NULL,
                modified_at INTEGER NOT NULL,
                file_path TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_url ON documents(url)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_file_path ON documents(file_path)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS inverted_index (
                term TEXT PRIMARY KEY,
                postings TEXT NOT NULL DEFAULT '[]',
                df INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stats (
                id TEXT PRIMARY KEY,
                total_documents INTEGER NOT NULL DEFAULT 0,
                last_indexed_at INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts one document, returning its id.
    pub async fn add_document(&self, doc: &Document) -> Result<String, StoreError> {
        insert_document(&self.pool, doc).await?;
        Ok(doc.id.clone())
    }

    /// Batch document insert. Runs in one transaction; any failed insert
    /// fails the batch, which the indexing writer treats as fatal anyway.
    pub async fn bulk_write_documents(&self, docs: &[Document]) -> Result<(), StoreError> {
        if docs.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for doc in docs {
            insert_document(&mut *tx, doc).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Batch term upsert: for every model, push the posting onto the term's
    /// list and increment `df`, creating the entry when absent.
    pub async fn bulk_write_inverted_index(
        &self,
        models: &[TermUpsert],
    ) -> Result<(), StoreError> {
        if models.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for model in models {
            let posting_json =
                serde_json::to_string(&model.posting).map_err(StoreError::EncodePosting)?;
            sqlx::query(
                r#"
                INSERT INTO inverted_index (term, postings, df)
                VALUES (?1, json_array(json(?2)), 1)
                ON CONFLICT(term) DO UPDATE SET
                    postings = json_insert(postings, '$[#]', json(?2)),
                    df = df + 1
                "#,
            )
            .bind(&model.term)
            .bind(&posting_json)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Looks a document up by filesystem path. Absence is not an error.
    pub async fn get_document_by_path(
        &self,
        file_path: &str,
    ) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query("SELECT * FROM documents WHERE file_path = ?1")
            .bind(file_path)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_document(&r)).transpose()
    }

    pub async fn delete_document(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM documents WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Pulls every posting of `doc_id` out of the listed terms and lowers
    /// each term's `df` by the number of postings removed, so `df` keeps
    /// counting distinct documents across re-indexing.
    pub async fn remove_postings_for_document(
        &self,
        doc_id: &str,
        terms: &[String],
    ) -> Result<(), StoreError> {
        let unique = dedupe(terms);
        if unique.is_empty() {
            return Ok(());
        }
        let placeholders = numbered_placeholders(2, unique.len());
        let sql = format!(
            r#"
            UPDATE inverted_index SET
                df = max(df - (
                    SELECT count(*) FROM json_each(postings)
                    WHERE json_extract(value, '$.doc_id') = ?1
                ), 0),
                postings = (
                    SELECT coalesce(json_group_array(json(value)), '[]')
                    FROM json_each(postings)
                    WHERE json_extract(value, '$.doc_id') <> ?1
                )
            WHERE term IN ({placeholders})
            "#
        );
        let mut query = sqlx::query(&sql).bind(doc_id);
        for term in &unique {
            query = query.bind(term.as_str());
        }
        query.execute(&self.pool).await?;
        Ok(())
    }

    /// Loads the inverted-index entries for the given terms, keyed by term.
    /// Terms with no entry are simply absent from the map.
    pub async fn get_postings_for_terms(
        &self,
        terms: &[String],
    ) -> Result<HashMap<String, InvertedIndexEntry>, StoreError> {
        let unique = dedupe(terms);
        if unique.is_empty() {
            return Ok(HashMap::new());
        }
        let placeholders = numbered_placeholders(1, unique.len());
        let sql =
            format!("SELECT term, postings, df FROM inverted_index WHERE term IN ({placeholders})");
        let mut query = sqlx::query(&sql);
        for term in &unique {
            query = query.bind(term.as_str());
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut entries = HashMap::with_capacity(rows.len());
        for row in rows {
            let term: String = row.get("term");
            let raw: String = row.get("postings");
            let postings: Vec<Posting> =
                serde_json::from_str(&raw).map_err(|source| StoreError::CorruptPostings {
                    term: term.clone(),
                    source,
                })?;
            let df: i64 = row.get("df");
            entries.insert(term.clone(), InvertedIndexEntry { term, postings, df });
        }
        Ok(entries)
    }

    /// Loads one page of the documents matching `ids`. `total` is the count
    /// over the whole id filter, independent of the page window. Pages are
    /// 1-based; values below 1 clamp to the first page.
    pub async fn get_documents(
        &self,
        ids: &[String],
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Document>, i64), StoreError> {
        let unique = dedupe(ids);
        if unique.is_empty() {
            return Ok((Vec::new(), 0));
        }
        let placeholders = numbered_placeholders(1, unique.len());

        let count_sql = format!("SELECT count(*) AS n FROM documents WHERE id IN ({placeholders})");
        let mut count_query = sqlx::query(&count_sql);
        for id in &unique {
            count_query = count_query.bind(id.as_str());
        }
        let total: i64 = count_query.fetch_one(&self.pool).await?.get("n");

        let limit = limit.max(0);
        let offset = (page.max(1) - 1) * limit;
        let next = unique.len() + 1;
        // Deterministic order keeps page windows disjoint.
        let page_sql = format!(
            "SELECT * FROM documents WHERE id IN ({placeholders}) ORDER BY id LIMIT ?{next} OFFSET ?{after}",
            after = next + 1
        );
        let mut page_query = sqlx::query(&page_sql);
        for id in &unique {
            page_query = page_query.bind(id.as_str());
        }
        let rows = page_query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let documents = rows
            .iter()
            .map(row_to_document)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((documents, total))
    }

    /// Returns the singleton stats record, zero-valued when none exists yet.
    pub async fn get_index_stats(&self) -> Result<IndexStats, StoreError> {
        let row = sqlx::query("SELECT total_documents, last_indexed_at FROM stats WHERE id = ?1")
            .bind(STATS_ID)
            .fetch_optional(&self.pool)
            .await?;
        Ok(match row {
            Some(row) => IndexStats {
                total_documents: row.get("total_documents"),
                last_indexed_at: row.get("last_indexed_at"),
            },
            None => IndexStats::default(),
        })
    }

    /// Accumulates `delta` onto `total_documents` and stamps
    /// `last_indexed_at`, creating the singleton on first use.
    pub async fn update_index_stats(&self, delta: i64) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO stats (id, total_documents, last_indexed_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                total_documents = total_documents + ?2,
                last_indexed_at = ?3
            "#,
        )
        .bind(STATS_ID)
        .bind(delta)
        .bind(now_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

async fn insert_document<'e, E>(executor: E, doc: &Document) -> Result<(), StoreError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO documents (id, source_type, url, title, content, indexed_at, modified_at, file_path)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&doc.id)
    .bind(doc.source_type.as_str())
    .bind(&doc.url)
    .bind(&doc.title)
    .bind(&doc.content)
    .bind(doc.indexed_at)
    .bind(doc.modified_at)
    .bind(&doc.file_path)
    .execute(executor)
    .await?;
    Ok(())
}

fn row_to_document(row: &SqliteRow) -> Result<Document, StoreError> {
    let id: String = row.get("id");
    let raw_type: String = row.get("source_type");
    let source_type =
        SourceType::parse(&raw_type).ok_or_else(|| StoreError::CorruptDocument {
            id: id.clone(),
            detail: format!("unknown source_type {raw_type:?}"),
        })?;
    Ok(Document {
        id,
        source_type,
        url: row.get("url"),
        title: row.get("title"),
        content: row.get("content"),
        indexed_at: row.get("indexed_at"),
        modified_at: row.get("modified_at"),
        file_path: row.get("file_path"),
    })
}

fn dedupe(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .filter(|v| seen.insert(v.as_str()))
        .cloned()
        .collect()
}

fn numbered_placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}
