use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::BoxFuture;
use rusqlite::{params, Connection};
use tracing::debug;

use flowfusion_core::error::{FlowError, Result};
use flowfusion_core::traits::Retriever;
use flowfusion_core::types::Document;

use crate::embeddings::{cosine_similarity, EmbeddingProvider};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS documents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        doc_id TEXT NOT NULL UNIQUE,
        content TEXT NOT NULL
    );

    CREATE VIRTUAL TABLE IF NOT EXISTS documents_fts USING fts5(
        content,
        doc_id UNINDEXED,
        tokenize='porter unicode61'
    );

    CREATE TRIGGER IF NOT EXISTS documents_ai AFTER INSERT ON documents BEGIN
        INSERT INTO documents_fts(rowid, content, doc_id)
        VALUES (new.id, new.content, new.doc_id);
    END;

    CREATE TABLE IF NOT EXISTS embeddings (
        document_id INTEGER PRIMARY KEY REFERENCES documents(id),
        embedding BLOB NOT NULL
    );";

/// SQLite-backed passage store with FTS5 ranking and optional embedding search.
///
/// Built once at startup and shared read-only by every request.
pub struct KnowledgeBase {
    conn: Arc<Mutex<Connection>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
}

impl KnowledgeBase {
    /// Open or create a corpus database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                FlowError::Database(format!("Failed to create db directory: {}", e))
            })?;
        }

        let conn = Connection::open(path).map_err(db_err)?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        debug!(path = %path.display(), "Knowledge base opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            embedder: None,
        })
    }

    /// Open an in-memory corpus.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            embedder: None,
        })
    }

    /// Rank by embedding similarity instead of full-text relevance.
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn has_embedder(&self) -> bool {
        self.embedder.is_some()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        lock(&self.conn)
    }

    /// Insert documents, skipping ids already present. Returns how many were added.
    pub fn add_documents(&self, docs: &[Document]) -> Result<usize> {
        let conn = self.lock()?;
        let mut added = 0;
        for doc in docs {
            added += conn
                .execute(
                    "INSERT OR IGNORE INTO documents (doc_id, content) VALUES (?1, ?2)",
                    params![doc.id, doc.text],
                )
                .map_err(db_err)?;
        }
        Ok(added)
    }

    pub fn len(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(db_err)?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Compute and store embeddings for every document that lacks one.
    pub async fn index_embeddings(&self) -> Result<usize> {
        let Some(embedder) = self.embedder.clone() else {
            return Ok(0);
        };

        let pending = self.unindexed_documents()?;
        if pending.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = pending.iter().map(|(_, text)| text.clone()).collect();
        let vectors = embedder.embed(&texts).await?;
        if vectors.len() != pending.len() {
            return Err(FlowError::Embedding(format!(
                "expected {} vectors, got {}",
                pending.len(),
                vectors.len()
            )));
        }

        let conn = self.lock()?;
        for ((id, _), vector) in pending.iter().zip(vectors.iter()) {
            let blob: Vec<u8> = vector.iter().flat_map(|f| f.to_le_bytes()).collect();
            conn.execute(
                "INSERT OR REPLACE INTO embeddings (document_id, embedding) VALUES (?1, ?2)",
                params![id, blob],
            )
            .map_err(db_err)?;
        }
        Ok(pending.len())
    }

    fn unindexed_documents(&self) -> Result<Vec<(i64, String)>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT d.id, d.content FROM documents d
                 LEFT JOIN embeddings e ON e.document_id = d.id
                 WHERE e.document_id IS NULL
                 ORDER BY d.id",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(db_err)?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(db_err)
    }

    /// Full-text ranked passages, topped up with the remaining corpus in insertion order.
    pub fn search_text(&self, text: &str, limit: usize) -> Result<Vec<String>> {
        let conn = self.lock()?;
        rank_text(&conn, text, limit)
    }

    /// Passages sorted by cosine similarity to `query_vec`. Empty when nothing is indexed.
    pub fn search_similar(&self, query_vec: &[f32], limit: usize) -> Result<Vec<String>> {
        let conn = self.lock()?;
        rank_similar(&conn, query_vec, limit)
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|e| FlowError::Database(e.to_string()))
}

fn rank_text(conn: &Connection, text: &str, limit: usize) -> Result<Vec<String>> {
    if limit == 0 {
        return Ok(vec![]);
    }

    let mut seen = HashSet::new();
    let mut passages = Vec::new();

    if let Some(expr) = match_expression(text) {
        let mut stmt = conn
            .prepare(
                "SELECT rowid, content FROM documents_fts
                 WHERE documents_fts MATCH ?1
                 ORDER BY rank
                 LIMIT ?2",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![expr, limit as i64], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(db_err)?;
        for row in rows {
            let (id, content) = row.map_err(db_err)?;
            seen.insert(id);
            passages.push(content);
        }
    }

    if passages.len() < limit {
        let mut stmt = conn
            .prepare("SELECT id, content FROM documents ORDER BY id")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(db_err)?;
        for row in rows {
            let (id, content) = row.map_err(db_err)?;
            if passages.len() >= limit {
                break;
            }
            if seen.insert(id) {
                passages.push(content);
            }
        }
    }

    Ok(passages)
}

fn rank_similar(conn: &Connection, query_vec: &[f32], limit: usize) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT e.embedding, d.content
             FROM embeddings e
             JOIN documents d ON d.id = e.document_id
             ORDER BY d.id",
        )
        .map_err(db_err)?;

    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(db_err)?;

    let mut scored: Vec<(f32, String)> = Vec::new();
    for row in rows {
        let (blob, content) = row.map_err(db_err)?;
        let embedding: Vec<f32> = blob
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        scored.push((cosine_similarity(query_vec, &embedding), content));
    }

    // Stable sort keeps insertion order among ties
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);

    Ok(scored.into_iter().map(|(_, content)| content).collect())
}

impl Retriever for KnowledgeBase {
    fn query(&self, text: &str, top_k: usize) -> BoxFuture<'_, Result<Vec<String>>> {
        let text = text.to_string();
        let conn = self.conn.clone();

        Box::pin(async move {
            let query_vec = match self.embedder {
                Some(ref embedder) => embedder.embed(std::slice::from_ref(&text)).await?.pop(),
                None => None,
            };

            // SQLite work runs off the async workers
            tokio::task::spawn_blocking(move || {
                let conn = lock(&conn)?;
                if let Some(query_vec) = query_vec {
                    let passages = rank_similar(&conn, &query_vec, top_k)?;
                    if !passages.is_empty() {
                        return Ok(passages);
                    }
                    debug!("No embeddings indexed, falling back to full-text ranking");
                }
                rank_text(&conn, &text, top_k)
            })
            .await
            .map_err(|e| FlowError::Retrieval(e.to_string()))?
        })
    }
}

/// Build an FTS5 `OR` query from the words in `text`.
///
/// Every term is quoted so punctuation and FTS operators in user input never
/// reach the query parser. Returns `None` when no term survives.
fn match_expression(text: &str) -> Option<String> {
    let mut terms: Vec<String> = Vec::new();
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        let word = word.to_lowercase();
        if word.chars().count() < 2 || terms.contains(&word) {
            continue;
        }
        terms.push(word);
    }

    if terms.is_empty() {
        return None;
    }

    Some(
        terms
            .iter()
            .map(|t| format!("\"{}\"", t))
            .collect::<Vec<_>>()
            .join(" OR "),
    )
}

fn db_err(e: rusqlite::Error) -> FlowError {
    FlowError::Database(e.to_string())
}
