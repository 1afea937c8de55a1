//! Local history of provisioning operations.
//!
//! Every command that changes something (deploys, rekeys, backups,
//! secret generation) appends a row to a SQLite database under the
//! project state dir. Logging is strictly best-effort: a missing or
//! unwritable database must never fail the operation being logged.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::errors::{MatrixUpError, Result};

const DB_FILE: &str = "audit.db";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS audit_log (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp   TEXT NOT NULL,
    operation   TEXT NOT NULL,
    environment TEXT NOT NULL,
    target      TEXT,
    details     TEXT
)";

/// One recorded operation.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub environment: String,
    pub target: Option<String>,
    pub details: Option<String>,
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
    let ts: String = row.get(1)?;
    Ok(AuditEntry {
        id: row.get(0)?,
        timestamp: DateTime::parse_from_rfc3339(&ts)
            .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc)),
        operation: row.get(2)?,
        environment: row.get(3)?,
        target: row.get(4)?,
        details: row.get(5)?,
    })
}

/// Handle on the audit database.
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open (creating if needed) the database under `state_dir`.
    ///
    /// `None` means audit logging is unavailable; callers continue
    /// without it.
    pub fn open(state_dir: &Path) -> Option<Self> {
        std::fs::create_dir_all(state_dir).ok()?;
        let db_path = state_dir.join(DB_FILE);
        let conn = Connection::open(&db_path).ok()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(&db_path, std::fs::Permissions::from_mode(0o600));
        }

        conn.execute(SCHEMA, []).ok()?;
        Some(Self { conn })
    }

    /// Append one row. Errors are swallowed.
    pub fn log(
        &self,
        operation: &str,
        environment: &str,
        target: Option<&str>,
        details: Option<&str>,
    ) {
        let _ = self.conn.execute(
            "INSERT INTO audit_log (timestamp, operation, environment, target, details)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![Utc::now().to_rfc3339(), operation, environment, target, details],
        );
    }

    /// The most recent entries, newest first, optionally bounded by a
    /// lower timestamp.
    pub fn recent(&self, limit: usize, since: Option<DateTime<Utc>>) -> Result<Vec<AuditEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let map_err = |e: rusqlite::Error| MatrixUpError::AuditError(e.to_string());

        let entries = match since {
            Some(ts) => {
                let mut stmt = self
                    .conn
                    .prepare(
                        "SELECT id, timestamp, operation, environment, target, details
                         FROM audit_log WHERE timestamp >= ?1
                         ORDER BY id DESC LIMIT ?2",
                    )
                    .map_err(map_err)?;
                let rows = stmt
                    .query_map(params![ts.to_rfc3339(), limit], entry_from_row)
                    .map_err(map_err)?;
                rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_err)?
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare(
                        "SELECT id, timestamp, operation, environment, target, details
                         FROM audit_log ORDER BY id DESC LIMIT ?1",
                    )
                    .map_err(map_err)?;
                let rows = stmt
                    .query_map(params![limit], entry_from_row)
                    .map_err(map_err)?;
                rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_err)?
            }
        };

        Ok(entries)
    }

    /// Where the database lives for a given state dir.
    pub fn db_path(state_dir: &Path) -> PathBuf {
        state_dir.join(DB_FILE)
    }
}

/// Per-project state directory holding the audit database.
pub fn state_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(".matrixup")
}

/// Open, log, and forget. Never fails the calling operation.
pub fn log_audit(
    project_dir: &Path,
    env: &str,
    op: &str,
    target: Option<&str>,
    details: Option<&str>,
) {
    if let Some(audit) = AuditLog::open(&state_dir(project_dir)) {
        audit.log(op, env, target, details);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_creates_the_database_file() {
        let dir = TempDir::new().unwrap();
        assert!(AuditLog::open(dir.path()).is_some());
        assert!(AuditLog::db_path(dir.path()).exists());
    }

    #[test]
    fn entries_come_back_newest_first() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::open(dir.path()).unwrap();

        audit.log("deploy", "production", Some("site.yml"), Some("attempt 1"));
        audit.log("deploy", "production", Some("site.yml"), Some("attempt 2"));
        audit.log("vault-backup", "production", None, None);

        let entries = audit.recent(10, None).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].operation, "vault-backup");
        assert_eq!(entries[2].details.as_deref(), Some("attempt 1"));
    }

    #[test]
    fn limit_bounds_the_result() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::open(dir.path()).unwrap();

        for i in 0..10 {
            audit.log("deploy", "production", Some(&format!("run_{i}")), None);
        }

        assert_eq!(audit.recent(3, None).unwrap().len(), 3);
    }

    #[test]
    fn since_filters_out_older_entries() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::open(dir.path()).unwrap();
        audit.log("rekey", "production", None, None);

        let past = Utc::now() - chrono::Duration::hours(1);
        assert_eq!(audit.recent(10, Some(past)).unwrap().len(), 1);

        let future = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(audit.recent(10, Some(future)).unwrap().len(), 0);
    }

    #[test]
    fn environment_and_target_are_recorded() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::open(dir.path()).unwrap();
        audit.log("secrets-generate", "staging", None, Some("7 tokens"));

        let entries = audit.recent(1, None).unwrap();
        assert_eq!(entries[0].environment, "staging");
        assert!(entries[0].target.is_none());
        assert_eq!(entries[0].details.as_deref(), Some("7 tokens"));
    }

    #[test]
    fn log_audit_helper_creates_state_dir() {
        let dir = TempDir::new().unwrap();
        log_audit(dir.path(), "production", "init", None, Some("wizard run"));
        assert!(dir.path().join(".matrixup/audit.db").exists());
    }

    #[cfg(unix)]
    #[test]
    fn database_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let _audit = AuditLog::open(dir.path()).unwrap();

        let mode = std::fs::metadata(AuditLog::db_path(dir.path()))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
