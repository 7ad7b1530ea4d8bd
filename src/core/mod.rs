//! Core modules for the roster worker.
//!
//! Wire format, registry, dispatcher, validation, proposal recovery and the
//! record store adapter live here. Operation handlers live in `plugins`.

pub mod broker;
pub mod client;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod ids;
pub mod logging;
pub mod output;
pub mod proposal;
pub mod registry;
pub mod rpc;
pub mod schemas;
pub mod store;
pub mod time;
pub mod validate;
