//! Plugin registration: the one place the operation catalog is assembled.
//!
//! Adding a new operation group: append one entry to `PLUGINS`.

use crate::core::config::Config;
use crate::core::error;
use crate::core::registry::Registry;
use crate::plugins::{mail, system, users};

pub(crate) struct PluginInit {
    /// Plugin identifier (used for diagnostics).
    pub name: &'static str,
    pub enabled: fn(&Config) -> bool,
    pub register: fn(&mut Registry, &Config) -> Result<(), error::RosterError>,
}

fn always(_: &Config) -> bool {
    true
}

fn demo_tools(config: &Config) -> bool {
    config.demo_tools
}

/// Catalog order follows this table.
pub(crate) const PLUGINS: &[PluginInit] = &[
    PluginInit { name: "system", enabled: always, register: system::register },
    PluginInit { name: "users", enabled: always, register: users::register },
    PluginInit { name: "mail", enabled: demo_tools, register: mail::register },
];

/// Build the registry the worker serves. Called once at startup; the result
/// is immutable afterwards.
pub fn standard_registry(config: &Config) -> Result<Registry, error::RosterError> {
    let mut registry = Registry::new();
    for plugin in PLUGINS {
        if !(plugin.enabled)(config) {
            continue;
        }
        (plugin.register)(&mut registry, config)?;
        tracing::debug!(plugin = plugin.name, "registered");
    }
    Ok(registry)
}
