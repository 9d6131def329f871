use std::path::{Path, PathBuf};
use std::time::Duration;

use flowbridge_core::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::retry::with_retry;

/// Total lookup attempts against the store.
const LOOKUP_ATTEMPTS: u32 = 2;
/// Pause between attempts.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// A persisted flow definition. Read-only from this side; the orchestration
/// framework owns its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub id: String,
    pub user_id: String,
    pub name: Option<String>,
    pub data: Value,
}

/// Canonical lowercase-hyphenated form when the value parses as a UUID,
/// otherwise the stored text as-is.
fn canonical_id(raw: String) -> String {
    match Uuid::parse_str(raw.trim()) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => raw,
    }
}

/// Access to the flow table.
///
/// One SQLite connection is opened per lookup and dropped on every exit
/// path, success or failure.
pub struct FlowStore {
    path: PathBuf,
    retry_delay: Duration,
}

impl FlowStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            retry_delay: RETRY_DELAY,
        }
    }

    /// Create the flow table if the database is new.
    pub fn init_schema(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = self.open()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS flow (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT,
                data TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| Error::Store(e.to_string()))?;
        Ok(())
    }

    fn open(&self) -> Result<Connection> {
        Connection::open(&self.path).map_err(|e| Error::Store(e.to_string()))
    }

    fn query_by_name(conn: &Connection, name: &str) -> Result<Option<FlowRecord>> {
        let row = conn
            .query_row(
                "SELECT id, user_id, name, data FROM flow WHERE name = ?1 LIMIT 1",
                params![name],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| Error::Store(e.to_string()))?;

        match row {
            None => Ok(None),
            Some((id, user_id, name, data)) => {
                let data: Value = serde_json::from_str(&data)
                    .map_err(|e| Error::Store(format!("malformed flow definition: {}", e)))?;
                Ok(Some(FlowRecord {
                    id: canonical_id(id),
                    user_id: canonical_id(user_id),
                    name,
                    data,
                }))
            }
        }
    }

    /// Fetch the flow whose name matches exactly.
    pub async fn lookup(&self, name: &str) -> Result<FlowRecord> {
        if name.trim().is_empty() {
            return Err(Error::Validation("name parameter is required".to_string()));
        }

        debug!(name = %name, db = %self.path.display(), "Looking up flow");

        with_retry(LOOKUP_ATTEMPTS, self.retry_delay, || {
            let conn = self.open()?;
            match Self::query_by_name(&conn, name)? {
                Some(record) => Ok(record),
                None => Err(Error::NotFound(format!("no flow named '{}'", name))),
            }
        })
        .await
    }

    /// Insert a flow definition. Used by provisioning and tests; the lookup
    /// path never writes.
    pub fn insert(&self, record: &FlowRecord) -> Result<()> {
        let conn = self.open()?;
        conn.execute(
            "INSERT OR REPLACE INTO flow (id, user_id, name, data) VALUES (?1, ?2, ?3, ?4)",
            params![
                record.id,
                record.user_id,
                record.name,
                record.data.to_string()
            ],
        )
        .map_err(|e| Error::Store(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> FlowStore {
        let mut store = FlowStore::new(&dir.path().join("flows.db"));
        store.retry_delay = Duration::ZERO;
        store.init_schema().unwrap();
        store
    }

    fn sample_record() -> FlowRecord {
        FlowRecord {
            id: "6fa459ea-ee8a-3ca4-894e-db77e160355e".to_string(),
            user_id: "886313e1-3b8a-5372-9b90-0c9aee199e5d".to_string(),
            name: Some("daily-report".to_string()),
            data: json!({ "nodes": [], "edges": [] }),
        }
    }

    #[tokio::test]
    async fn test_lookup_empty_name_is_validation_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(matches!(store.lookup("").await, Err(Error::Validation(_))));
        assert!(matches!(store.lookup("   ").await, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_lookup_missing_flow_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let err = store.lookup("nonexistent").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_lookup_returns_record() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.insert(&sample_record()).unwrap();

        let record = store.lookup("daily-report").await.unwrap();
        assert_eq!(record.name.as_deref(), Some("daily-report"));
        assert_eq!(record.data["nodes"], json!([]));
    }

    #[tokio::test]
    async fn test_lookup_normalizes_ids() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut record = sample_record();
        record.id = "6FA459EA-EE8A-3CA4-894E-DB77E160355E".to_string();
        store.insert(&record).unwrap();

        let found = store.lookup("daily-report").await.unwrap();
        assert_eq!(found.id, "6fa459ea-ee8a-3ca4-894e-db77e160355e");
    }

    #[tokio::test]
    async fn test_lookup_exact_name_match_only() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.insert(&sample_record()).unwrap();

        assert!(matches!(
            store.lookup("daily").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.lookup("DAILY-REPORT").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_lookup_unreadable_store_is_store_error() {
        // Point at a directory: opening the database fails on every attempt.
        let dir = TempDir::new().unwrap();
        let mut store = FlowStore::new(dir.path());
        store.retry_delay = Duration::ZERO;

        let err = store.lookup("daily-report").await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    #[test]
    fn test_canonical_id_passthrough_for_non_uuid() {
        assert_eq!(canonical_id("operator".to_string()), "operator");
    }
}
