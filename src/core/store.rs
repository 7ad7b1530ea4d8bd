//! Record store adapter for user records.
//!
//! The contract with the storage engine is deliberately small: insert,
//! select, update and delete on one text-keyed table with a unique `email`
//! column. Everything goes through [`DbBroker`], so each call is one
//! connection and one transaction.

use crate::core::broker::DbBroker;
use crate::core::error::RosterError;
use crate::core::ids::ShortIdAllocator;
use crate::core::schemas;
use crate::core::time;
use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: String,
}

impl User {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            role: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

/// Fields of a new record. Values are stored as given; callers normalize.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: String,
}

/// Partial update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.role.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct UserStore {
    broker: DbBroker,
    ids: ShortIdAllocator,
}

impl UserStore {
    pub fn new(broker: DbBroker, ids: ShortIdAllocator) -> Self {
        Self { broker, ids }
    }

    /// Allocate the next short id and insert, atomically.
    pub fn create(&self, new: &NewUser) -> Result<User, RosterError> {
        self.broker.with_write("users.create", |conn| {
            let existing = existing_ids(conn)?;
            let id = self.ids.next_id(existing.iter().map(String::as_str));
            let user = User {
                id,
                name: new.name.clone(),
                email: new.email.clone(),
                role: new.role.clone(),
                created_at: time::now_iso(),
            };
            insert_row(conn, &user)?;
            Ok(user)
        })
    }

    /// Insert a fully formed record, id included.
    pub fn insert(&self, user: &User) -> Result<(), RosterError> {
        self.broker
            .with_write("users.insert", |conn| insert_row(conn, user))
    }

    /// All records, ordered by the numeric part of the id.
    pub fn list(&self) -> Result<Vec<User>, RosterError> {
        let mut users = self.broker.with_read("users.list", |conn| {
            let sql = format!(
                "SELECT {} FROM {}",
                schemas::USER_COLUMNS,
                schemas::USERS_TABLE
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], User::from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })?;
        users.sort_by(|a, b| self.ids.compare(&a.id, &b.id));
        Ok(users)
    }

    pub fn get(&self, id: &str) -> Result<Option<User>, RosterError> {
        self.broker.with_read("users.get", |conn| select_one(conn, id))
    }

    /// Apply `patch` to the record `id`. `Ok(None)` when no row matched.
    pub fn update(&self, id: &str, patch: &UserPatch) -> Result<Option<User>, RosterError> {
        if patch.is_empty() {
            return Err(RosterError::ValidationError(
                "nothing to update".to_string(),
            ));
        }
        self.broker.with_write("users.update", |conn| {
            let mut updates = vec![];
            let mut values: Vec<&dyn ToSql> = vec![];
            if let Some(name) = &patch.name {
                updates.push("name = ?");
                values.push(name);
            }
            if let Some(email) = &patch.email {
                updates.push("email = ?");
                values.push(email);
            }
            if let Some(role) = &patch.role {
                updates.push("role = ?");
                values.push(role);
            }
            values.push(&id);

            let sql = format!(
                "UPDATE {} SET {} WHERE id = ?",
                schemas::USERS_TABLE,
                updates.join(", ")
            );
            let changed = conn
                .execute(&sql, rusqlite::params_from_iter(values))
                .map_err(|e| RosterError::from_write(e, "email already in use"))?;
            if changed == 0 {
                return Ok(None);
            }
            select_one(conn, id)
        })
    }

    /// Remove the record `id`. Returns whether a row was removed.
    pub fn delete(&self, id: &str) -> Result<bool, RosterError> {
        self.broker.with_write("users.delete", |conn| {
            let sql = format!("DELETE FROM {} WHERE id = ?1", schemas::USERS_TABLE);
            let removed = conn.execute(&sql, params![id])?;
            Ok(removed > 0)
        })
    }
}

fn existing_ids(conn: &Connection) -> Result<Vec<String>, RosterError> {
    let sql = format!("SELECT id FROM {}", schemas::USERS_TABLE);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn insert_row(conn: &Connection, user: &User) -> Result<(), RosterError> {
    let sql = format!(
        "INSERT INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5)",
        schemas::USERS_TABLE,
        schemas::USER_COLUMNS
    );
    conn.execute(
        &sql,
        params![user.id, user.name, user.email, user.role, user.created_at],
    )
    .map_err(|e| RosterError::from_write(e, "email or id already in use"))?;
    Ok(())
}

fn select_one(conn: &Connection, id: &str) -> Result<Option<User>, RosterError> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?1",
        schemas::USER_COLUMNS,
        schemas::USERS_TABLE
    );
    Ok(conn
        .query_row(&sql, params![id], User::from_row)
        .optional()?)
}
