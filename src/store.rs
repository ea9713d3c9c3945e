// 🗄️ Snapshot Store - Replace-on-write persistence of the whole portfolio
//
// The portfolio is persisted as one JSON document per record id. Every save
// replaces the previous document; a SHA-256 of the payload lets unchanged
// snapshots skip the write entirely.

use crate::model::Portfolio;
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Where portfolio snapshots come from and go back to
pub trait SnapshotStore {
    /// Latest snapshot for `record_id`, or None if nothing was saved yet
    fn load(&self, record_id: &str) -> Result<Option<Portfolio>>;

    /// Replace the snapshot. Returns false when the stored one is identical.
    fn save(&self, record_id: &str, portfolio: &Portfolio) -> Result<bool>;
}

// ============================================================================
// SQLITE STORE
// ============================================================================

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Hash of the stored payload, if any
    pub fn stored_hash(&self, record_id: &str) -> Result<Option<String>> {
        let hash = self
            .conn
            .query_row(
                "SELECT content_hash FROM snapshots WHERE record_id = ?1",
                params![record_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash)
    }

    /// Every record id with its last write time (RFC 3339)
    pub fn list_records(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT record_id, updated_at FROM snapshots ORDER BY record_id")?;

        let records = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}

impl SnapshotStore for SqliteStore {
    fn load(&self, record_id: &str) -> Result<Option<Portfolio>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM snapshots WHERE record_id = ?1",
                params![record_id],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(json) => {
                let portfolio: Portfolio = serde_json::from_str(&json)
                    .with_context(|| format!("Failed to parse snapshot '{}'", record_id))?;
                Ok(Some(portfolio))
            }
            None => Ok(None),
        }
    }

    fn save(&self, record_id: &str, portfolio: &Portfolio) -> Result<bool> {
        let payload = serde_json::to_string(portfolio).context("Failed to serialize portfolio")?;
        let hash = snapshot_hash(&payload);

        if self.stored_hash(record_id)?.as_deref() == Some(hash.as_str()) {
            tracing::debug!(record_id, "snapshot unchanged, skipping write");
            return Ok(false);
        }

        self.conn.execute(
            "INSERT INTO snapshots (record_id, content_hash, payload, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(record_id) DO UPDATE SET
                content_hash = excluded.content_hash,
                payload = excluded.payload,
                updated_at = excluded.updated_at",
            params![record_id, hash, payload, Utc::now().to_rfc3339()],
        )?;

        tracing::info!(
            record_id,
            clients = portfolio.clients.len(),
            bytes = payload.len(),
            "snapshot saved"
        );
        Ok(true)
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS snapshots (
            record_id TEXT PRIMARY KEY,
            content_hash TEXT NOT NULL,
            payload TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

/// Hex SHA-256 of a serialized snapshot
pub fn snapshot_hash(payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// JSON FILES
// ============================================================================

/// Read a portfolio exported as a JSON array of clients
pub fn load_portfolio_json(path: &Path) -> Result<Portfolio> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let portfolio: Portfolio = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse portfolio JSON in {}", path.display()))?;

    tracing::info!(
        path = %path.display(),
        clients = portfolio.clients.len(),
        contracts = portfolio.contract_count(),
        "portfolio loaded"
    );
    Ok(portfolio)
}

pub fn write_portfolio_json(path: &Path, portfolio: &Portfolio) -> Result<()> {
    let json = serde_json::to_string_pretty(portfolio).context("Failed to serialize portfolio")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
