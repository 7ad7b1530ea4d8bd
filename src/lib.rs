//! Roster: a stdio tool worker for user records
//!
//! **Roster is a long-lived worker process that exposes a discoverable catalog
//! of named operations over one JSON message per line.**
//!
//! A client (a form UI, a chat front end, a script) owns the worker's stdin
//! and stdout. It asks `list_tools` for the catalog, then calls operations by
//! name. Free text can be turned into a call by an external router; its
//! output is recovered with [`core::proposal::recover`] and validated like
//! any other call before anything runs.
//!
//! # Wire format
//!
//! ```text
//! -> {"id": "1", "method": "add_user", "params": {"name": "Ann", "email": "ann@x.com", "role": "admin"}}
//! <- {"id": "1", "method": "add_user", "result": {"id": "U001", ...}}
//! -> {"id": "2", "method": "delete_user", "params": {"id": "U999"}}
//! <- {"id": "2", "method": "delete_user", "error": "not found: no user with id U999"}
//! ```
//!
//! # Examples
//!
//! ```bash
//! # Run the worker on stdin/stdout
//! roster serve --db users.db
//!
//! # One call through a fresh worker
//! roster call add_user --params '{"name":"Ann","email":"ann@x.com","role":"admin"}'
//!
//! # Recover a router answer and check it against the catalog
//! echo 'Sure! {"tool":"list_users","params":{}}' | roster recover
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: wire format, registry, dispatcher, validation, store adapter
//! - [`plugins`]: operation handlers (users, system, demo mail)

pub mod core;
pub mod plugins;
mod subsystems;

pub use subsystems::standard_registry;

use core::{
    broker::DbBroker,
    client::WorkerClient,
    config::Config,
    db,
    dispatch::Dispatcher,
    error, logging, output, proposal,
    store::UserStore,
};

use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "roster",
    version = env!("CARGO_PKG_VERSION"),
    about = "Line-delimited JSON tool worker for user records"
)]
struct Cli {
    /// Config file (defaults to ./roster.toml when present).
    #[clap(long, global = true)]
    config: Option<PathBuf>,
    /// SQLite database path (overrides config and ROSTER_DB_PATH).
    #[clap(long, global = true)]
    db: Option<PathBuf>,
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve requests on stdin/stdout until stdin closes (default)
    Serve,

    /// Start a worker, perform one call, print the response
    Call {
        /// Operation name, e.g. add_user
        method: String,
        /// Arguments as a JSON object
        #[clap(long, default_value = "{}")]
        params: String,
    },

    /// Print the worker's operation catalog
    Tools,

    /// Recover a router answer (from --text or stdin) and check it against the catalog
    Recover {
        #[clap(long)]
        text: Option<String>,
    },

    /// Print the router prompt for a free-text request
    Prompt {
        /// What the user asked for
        request: String,
    },
}

/// Resolve the effective configuration for this invocation.
fn load_config(cli: &Cli) -> Result<Config, error::RosterError> {
    let cwd = std::env::current_dir()?;
    let mut config = Config::load(cli.config.as_deref(), &cwd)?;
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Run the stdio worker with `config` until stdin closes.
pub fn serve(config: &Config) -> Result<(), error::RosterError> {
    db::initialize_users_db(&config.db_path)?;
    let mut broker = DbBroker::new(&config.db_path);
    if let Some(audit) = &config.audit_log {
        broker = broker.with_audit_log(audit);
    }
    broker.check_audit_log()?;
    let store = UserStore::new(broker, config.allocator()?);
    let registry = standard_registry(config)?;
    let dispatcher = Dispatcher::new(&registry, &store);

    tracing::info!(
        transport = "stdio",
        db = %config.db_path.display(),
        tools = registry.names().len(),
        "worker ready"
    );
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    dispatcher.serve(stdin.lock(), stdout.lock())?;
    Ok(())
}

/// Spawn this executable as a worker that sees the same config and db.
fn spawn_worker(cli: &Cli, config: &Config) -> Result<WorkerClient, error::RosterError> {
    let exe = std::env::current_exe()?;
    let mut args: Vec<std::ffi::OsString> = vec![];
    if let Some(path) = &cli.config {
        args.push("--config".into());
        args.push(path.clone().into_os_string());
    }
    args.push("--db".into());
    args.push(config.db_path.clone().into_os_string());
    args.push("serve".into());
    WorkerClient::spawn(exe.as_os_str(), args)
}

fn parse_params(raw: &str) -> Result<Map<String, Value>, error::RosterError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        _ => Err(error::RosterError::ValidationError(
            "--params must be a JSON object".to_string(),
        )),
    }
}

fn print_json(value: &Value) -> Result<(), error::RosterError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn run() -> Result<(), error::RosterError> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    logging::init(&config.log_filter);

    match cli.command.as_ref().unwrap_or(&Command::Serve) {
        Command::Serve => serve(&config)?,
        Command::Call { method, params } => {
            let params = parse_params(params)?;
            let mut worker = spawn_worker(&cli, &config)?;
            let response = worker.call(method, params)?;
            worker.shutdown()?;
            let detail = response.error().unwrap_or("ok").to_string();
            eprintln!("{}", output::status_line(!response.is_error(), method, &detail));
            print_json(&serde_json::to_value(&response)?)?;
        }
        Command::Tools => {
            let mut worker = spawn_worker(&cli, &config)?;
            let tools = worker.fetch_catalog()?;
            worker.shutdown()?;
            print_json(&serde_json::json!({ "tools": tools }))?;
        }
        Command::Recover { text } => {
            let text = match text {
                Some(t) => t.clone(),
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let mut worker = spawn_worker(&cli, &config)?;
            let tools = worker.fetch_catalog()?;
            worker.shutdown()?;
            let proposal = proposal::recover(&text).against(&tools);
            print_json(&proposal.report(&tools))?;
        }
        Command::Prompt { request } => {
            let mut worker = spawn_worker(&cli, &config)?;
            let tools = worker.fetch_catalog()?;
            worker.shutdown()?;
            let prompt = proposal::router_prompt(&tools, request)?;
            print_json(&serde_json::to_value(prompt)?)?;
        }
    }
    Ok(())
}
