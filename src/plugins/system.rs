//! Meta operations: catalog discovery and liveness.

use crate::core::config::Config;
use crate::core::error::RosterError;
use crate::core::registry::{Registry, ToolContext, ToolDescriptor};
use serde_json::{Map, Value, json};

pub fn list_tools(ctx: &ToolContext<'_>, _params: &Map<String, Value>) -> Result<Value, RosterError> {
    Ok(ctx.registry.catalog())
}

pub fn ping(_ctx: &ToolContext<'_>, _params: &Map<String, Value>) -> Result<Value, RosterError> {
    Ok(json!({ "ok": true }))
}

pub fn register(registry: &mut Registry, _config: &Config) -> Result<(), RosterError> {
    registry.register(
        ToolDescriptor::new("list_tools", "List every available operation and its parameters"),
        list_tools,
    )?;
    registry.register(ToolDescriptor::new("ping", "Liveness check"), ping)?;
    Ok(())
}
