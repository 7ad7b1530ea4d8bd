use crate::core::db;
use crate::core::error;
use crate::core::time;
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The DB Broker is the single path to the record store.
///
/// Every call opens a fresh connection, runs the closure inside one
/// transaction, commits on `Ok` and rolls back on `Err`, then closes the
/// connection. No connection or transaction outlives a single operation.
#[derive(Debug, Clone)]
pub struct DbBroker {
    db_path: PathBuf,
    audit_log_path: Option<PathBuf>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BrokerEvent {
    pub ts: String,
    pub event_id: String,
    pub actor: String,
    pub op: String,
    pub db_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

impl DbBroker {
    pub fn new(db_path: &Path) -> Self {
        Self {
            db_path: db_path.to_path_buf(),
            audit_log_path: None,
        }
    }

    /// Append one JSON line per brokered operation to `path`.
    pub fn with_audit_log(mut self, path: &Path) -> Self {
        self.audit_log_path = Some(path.to_path_buf());
        self
    }

    /// Run a read-only closure inside a deferred transaction.
    pub fn with_read<F, R>(&self, op_name: &str, f: F) -> Result<R, error::RosterError>
    where
        F: FnOnce(&Connection) -> Result<R, error::RosterError>,
    {
        self.run(Access::Read, op_name, f)
    }

    /// Run a mutating closure inside an IMMEDIATE transaction, so that
    /// anything it reads (e.g. existing ids) cannot change before it writes.
    pub fn with_write<F, R>(&self, op_name: &str, f: F) -> Result<R, error::RosterError>
    where
        F: FnOnce(&Connection) -> Result<R, error::RosterError>,
    {
        self.run(Access::Write, op_name, f)
    }

    fn run<F, R>(&self, access: Access, op_name: &str, f: F) -> Result<R, error::RosterError>
    where
        F: FnOnce(&Connection) -> Result<R, error::RosterError>,
    {
        let mut conn = db::db_connect(&self.db_path.to_string_lossy())?;
        let behavior = match access {
            Access::Read => TransactionBehavior::Deferred,
            Access::Write => TransactionBehavior::Immediate,
        };
        let tx = conn.transaction_with_behavior(behavior)?;

        // The audit line is written before commit; if it cannot be written the
        // transaction is dropped, which rolls it back.
        match f(&*tx) {
            Ok(value) => {
                self.log_event("roster", op_name, "success")?;
                tx.commit()?;
                tracing::debug!(op = op_name, status = "success", "store operation");
                Ok(value)
            }
            Err(err) => {
                drop(tx);
                tracing::debug!(op = op_name, status = "error", "store operation");
                if let Err(audit_err) = self.log_event("roster", op_name, "error") {
                    tracing::warn!(op = op_name, error = %audit_err, "audit log append failed");
                }
                Err(err)
            }
        }
    }

    /// Fail early when the configured audit log cannot be opened for append.
    pub fn check_audit_log(&self) -> Result<(), error::RosterError> {
        match &self.audit_log_path {
            Some(path) => open_audit_log(path).map(|_| ()),
            None => Ok(()),
        }
    }

    fn log_event(&self, actor: &str, op: &str, status: &str) -> Result<(), error::RosterError> {
        use std::io::Write;

        let Some(audit_log_path) = &self.audit_log_path else {
            return Ok(());
        };

        let ev = BrokerEvent {
            ts: time::now_iso(),
            event_id: time::new_event_id(),
            actor: actor.to_string(),
            op: op.to_string(),
            db_id: self
                .db_path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
            status: status.to_string(),
        };

        let mut f = open_audit_log(audit_log_path)?;
        writeln!(f, "{}", serde_json::to_string(&ev)?).map_err(error::RosterError::IoError)?;
        Ok(())
    }
}

fn open_audit_log(path: &Path) -> Result<std::fs::File, error::RosterError> {
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(error::RosterError::IoError)
}
