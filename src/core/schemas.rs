//! Database schema definitions for the roster store.
//!
//! Roster keeps a single SQLite file with one table of user records. The
//! table is text-keyed (`id`) and carries one uniqueness constraint (`email`).

pub const USERS_DB_NAME: &str = "users.db";

pub const USERS_TABLE: &str = "users";

pub const USERS_DB_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        role TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
";

pub const USER_COLUMNS: &str = "id, name, email, role, created_at";
