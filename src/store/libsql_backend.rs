//! libSQL backend: read-only `DocumentStore` over JSON document tables.
//!
//! Each collection lives in a table named `"<database>.<collection>"` with a
//! single `doc TEXT` column holding one JSON document per row. Supports local
//! database files and remote libSQL servers.

use std::future::Future;
use std::path::Path;

use async_trait::async_trait;
use libsql::{Connection, Database as LibSqlDatabase};
use secrecy::ExposeSecret;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::store::traits::{Collection, Document, DocumentStore, canonicalize_document_id};

struct Handle {
    // Owns the database `conn` was opened from.
    _db: LibSqlDatabase,
    conn: Connection,
}

/// libSQL document store.
///
/// The connection is opened lazily on first use and reused for the lifetime
/// of the process. A failed connect or ping is never memoized, so the next
/// call retries from scratch.
pub struct LibSqlDocumentStore {
    config: StoreConfig,
    handle: Mutex<Option<Handle>>,
}

impl LibSqlDocumentStore {
    /// Create a store. No I/O happens until the first ping or fetch.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            handle: Mutex::new(None),
        }
    }

    /// Quoted table name of a collection.
    fn table_name(&self, collection: Collection) -> String {
        format!("\"{}.{}\"", self.config.database, collection.as_str())
    }

    async fn with_timeout<T, F>(&self, collection: &str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.config.query_timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout {
                collection: collection.to_string(),
                timeout: self.config.query_timeout,
            })?
    }

    async fn open(&self) -> Result<Handle, StoreError> {
        let db = if self.config.is_remote() {
            let token = self
                .config
                .auth_token
                .as_ref()
                .map(|t| t.expose_secret().to_string())
                .unwrap_or_default();
            libsql::Builder::new_remote(self.config.uri.clone(), token)
                .build()
                .await
        } else {
            let path = Path::new(&self.config.uri);
            if self.config.uri != ":memory:" && !path.exists() {
                return Err(StoreError::Connection(format!(
                    "database file {} does not exist",
                    path.display()
                )));
            }
            libsql::Builder::new_local(path).build().await
        }
        .map_err(|e| StoreError::Connection(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("Failed to create connection: {e}")))?;

        ping_connection(&conn).await?;

        Ok(Handle { _db: db, conn })
    }

    /// Get the shared connection, connecting and pinging on first use.
    async fn connection(&self) -> Result<Connection, StoreError> {
        let mut guard = self.handle.lock().await;
        if let Some(handle) = guard.as_ref() {
            return Ok(handle.conn.clone());
        }

        match self.with_timeout("(connect)", self.open()).await {
            Ok(handle) => {
                info!(
                    database = %self.config.database,
                    remote = self.config.is_remote(),
                    "Connected to document store"
                );
                let conn = handle.conn.clone();
                *guard = Some(handle);
                Ok(conn)
            }
            Err(e) => {
                warn!(error = %e, "Document store connection failed");
                Err(e)
            }
        }
    }

    /// Drop the cached connection so the next call reconnects.
    async fn reset(&self) {
        self.handle.lock().await.take();
    }

    async fn read_collection(
        &self,
        conn: &Connection,
        collection: Collection,
    ) -> Result<Vec<Document>, StoreError> {
        let name = collection.as_str();
        let sql = format!("SELECT doc FROM {} ORDER BY rowid", self.table_name(collection));

        let mut rows = match conn.query(&sql, ()).await {
            Ok(rows) => rows,
            Err(e) if e.to_string().contains("no such table") => {
                warn!(collection = name, "Collection table does not exist, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(StoreError::Query {
                    collection: name.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let mut docs = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| StoreError::Query {
            collection: name.to_string(),
            reason: e.to_string(),
        })? {
            let raw: String = row.get(0).map_err(|e| StoreError::Decode {
                collection: name.to_string(),
                reason: e.to_string(),
            })?;
            docs.push(parse_document(name, &raw)?);
        }
        Ok(docs)
    }
}

async fn ping_connection(conn: &Connection) -> Result<(), StoreError> {
    conn.query("SELECT 1", ())
        .await
        .map(|_| ())
        .map_err(|e| StoreError::Connection(format!("Ping failed: {e}")))
}

fn parse_document(collection: &str, raw: &str) -> Result<Document, StoreError> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| StoreError::Decode {
        collection: collection.to_string(),
        reason: e.to_string(),
    })?;
    match value {
        serde_json::Value::Object(mut doc) => {
            canonicalize_document_id(&mut doc);
            Ok(doc)
        }
        other => Err(StoreError::Decode {
            collection: collection.to_string(),
            reason: format!("expected a JSON object, got `{other}`"),
        }),
    }
}

#[async_trait]
impl DocumentStore for LibSqlDocumentStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let conn = self.connection().await?;
        let result = self.with_timeout("(ping)", ping_connection(&conn)).await;
        if result.is_err() {
            self.reset().await;
        }
        result
    }

    async fn fetch_collection(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        let conn = self.connection().await?;
        let result = self
            .with_timeout(collection.as_str(), self.read_collection(&conn, collection))
            .await;

        match &result {
            Ok(docs) => debug!(collection = %collection, documents = docs.len(), "Collection fetched"),
            Err(StoreError::Timeout { .. }) => self.reset().await,
            Err(_) => {}
        }
        result
    }
}
