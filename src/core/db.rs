use crate::core::error;
use crate::core::schemas;
use rusqlite::Connection;
use std::fs;
use std::path::Path;

pub fn db_connect(db_path: &str) -> Result<Connection, error::RosterError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(error::RosterError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(error::RosterError::RusqliteError)?;
    Ok(conn)
}

/// Create the parent directory and the users table if they are missing.
/// Safe to call on every worker start.
pub fn initialize_users_db(db_path: &Path) -> Result<(), error::RosterError> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(error::RosterError::IoError)?;
    }
    let conn = db_connect(&db_path.to_string_lossy())?;
    conn.execute(schemas::USERS_DB_SCHEMA, [])?;
    Ok(())
}
