//! Demonstration `send_email` tool. Nothing is sent; the handler only echoes
//! what it would have sent. Registered when `demo_tools` is enabled.

use crate::core::config::Config;
use crate::core::error::RosterError;
use crate::core::registry::{FieldSpec, Registry, ToolContext, ToolDescriptor};
use crate::core::validate;
use serde_json::{Map, Value, json};

const PREVIEW_CHARS: usize = 50;
const REQUIRED: [&str; 3] = ["to", "subject", "body"];

pub fn send_email(_ctx: &ToolContext<'_>, params: &Map<String, Value>) -> Result<Value, RosterError> {
    let missing = validate::missing_required(&REQUIRED, params);
    if !missing.is_empty() {
        return Err(RosterError::ValidationError(format!(
            "to, subject and body are required (missing: {})",
            missing.join(", ")
        )));
    }
    let field = |key: &str| {
        params
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default()
    };
    let to = field("to");
    Ok(json!({
        "message": format!("Email successfully sent to {to}"),
        "subject": field("subject"),
        "preview": preview(field("body")),
    }))
}

/// First `PREVIEW_CHARS` characters of `body` as written, `...` when cut.
fn preview(body: &str) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

pub fn register(registry: &mut Registry, _config: &Config) -> Result<(), RosterError> {
    registry.register(
        ToolDescriptor::new("send_email", "Send an email to a user (demo)")
            .param("to", FieldSpec::string("Recipient email"))
            .param("subject", FieldSpec::string("Email subject"))
            .param("body", FieldSpec::string("Email body"))
            .required(&REQUIRED),
        send_email,
    )
}
