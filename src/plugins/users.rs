//! User record operations.
//!
//! `get_user` reports a missing record as an empty result, while
//! `update_user` and `delete_user` report it as `NotFound`. Callers rely on
//! that difference; keep it.

use crate::core::config::Config;
use crate::core::error::RosterError;
use crate::core::registry::{FieldSpec, Registry, ToolContext, ToolDescriptor};
use crate::core::store::{NewUser, UserPatch};
use crate::core::validate;
use serde_json::{Map, Value, json};

const ADD_REQUIRED: [&str; 3] = ["name", "email", "role"];

/// Trimmed, non-empty string argument.
fn text(params: &Map<String, Value>, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn require_id(params: &Map<String, Value>) -> Result<String, RosterError> {
    text(params, "id").ok_or_else(|| RosterError::ValidationError("id is required".to_string()))
}

pub fn add_user(ctx: &ToolContext<'_>, params: &Map<String, Value>) -> Result<Value, RosterError> {
    let missing = validate::missing_required(&ADD_REQUIRED, params);
    let (Some(name), Some(email), Some(role)) = (
        text(params, "name"),
        text(params, "email"),
        text(params, "role"),
    ) else {
        let missing = if missing.is_empty() {
            ADD_REQUIRED.join(", ")
        } else {
            missing.join(", ")
        };
        return Err(RosterError::ValidationError(format!(
            "name, email and role are required (missing: {missing})"
        )));
    };

    let user = ctx.store.create(&NewUser {
        name,
        email: email.to_lowercase(),
        role,
    })?;
    tracing::info!(id = %user.id, "user added");
    Ok(serde_json::to_value(user)?)
}

pub fn list_users(ctx: &ToolContext<'_>, _params: &Map<String, Value>) -> Result<Value, RosterError> {
    let users = ctx.store.list()?;
    Ok(json!({ "users": users }))
}

pub fn get_user(ctx: &ToolContext<'_>, params: &Map<String, Value>) -> Result<Value, RosterError> {
    let id = require_id(params)?;
    match ctx.store.get(&id)? {
        Some(user) => Ok(json!({ "user": user })),
        None => Ok(json!({})),
    }
}

pub fn update_user(ctx: &ToolContext<'_>, params: &Map<String, Value>) -> Result<Value, RosterError> {
    let id = require_id(params)?;
    let patch = UserPatch {
        name: text(params, "name"),
        email: text(params, "email").map(|e| e.to_lowercase()),
        role: text(params, "role"),
    };
    if patch.is_empty() {
        return Err(RosterError::ValidationError(
            "nothing to update: provide at least one of name, email, role".to_string(),
        ));
    }
    let user = ctx
        .store
        .update(&id, &patch)?
        .ok_or_else(|| RosterError::NotFound(format!("no user with id {id}")))?;
    tracing::info!(id = %user.id, "user updated");
    Ok(json!({ "message": "user updated", "user": user }))
}

pub fn delete_user(ctx: &ToolContext<'_>, params: &Map<String, Value>) -> Result<Value, RosterError> {
    let id = require_id(params)?;
    if !ctx.store.delete(&id)? {
        return Err(RosterError::NotFound(format!("no user with id {id}")));
    }
    tracing::info!(id = %id, "user deleted");
    Ok(json!({ "message": "user deleted", "id": id }))
}

pub fn register(registry: &mut Registry, config: &Config) -> Result<(), RosterError> {
    let id_example = config.allocator()?.example();
    let id_field = || FieldSpec::string(&format!("Short user ID like {id_example}"));

    registry.register(
        ToolDescriptor::new("add_user", "Add a new user")
            .param("name", FieldSpec::string("Full name"))
            .param("email", FieldSpec::string("Email (unique)"))
            .param("role", FieldSpec::string("Role e.g. viewer, editor, admin"))
            .required(&ADD_REQUIRED),
        add_user,
    )?;
    registry.register(ToolDescriptor::new("list_users", "List all users"), list_users)?;
    registry.register(
        ToolDescriptor::new(
            "get_user",
            &format!("Get a single user by short ID (e.g., {id_example})"),
        )
        .param("id", id_field())
        .required(&["id"]),
        get_user,
    )?;
    registry.register(
        ToolDescriptor::new("update_user", "Update fields for an existing user by short ID")
            .param("id", id_field())
            .param("name", FieldSpec::string("New name (optional)"))
            .param("email", FieldSpec::string("New email (optional)"))
            .param("role", FieldSpec::string("New role (optional)"))
            .required(&["id"]),
        update_user,
    )?;
    registry.register(
        ToolDescriptor::new("delete_user", "Delete user by short ID")
            .param("id", id_field())
            .required(&["id"]),
        delete_user,
    )?;
    Ok(())
}
