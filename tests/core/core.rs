use roster::core::broker::DbBroker;
use roster::core::client::WorkerClient;
use roster::core::config::Config;
use roster::core::db;
use roster::core::dispatch::Dispatcher;
use roster::core::error::RosterError;
use roster::core::ids::ShortIdAllocator;
use roster::core::proposal::{self, Proposal};
use roster::core::rpc::Response;
use roster::core::store::UserStore;
use serde_json::{Map, Value, json};
use std::ffi::OsStr;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

fn spawn_worker(db_path: &Path) -> WorkerClient {
    WorkerClient::spawn(
        OsStr::new(env!("CARGO_BIN_EXE_roster")),
        [OsStr::new("--db"), db_path.as_os_str(), OsStr::new("serve")],
    )
    .unwrap()
}

#[test]
fn catalog_query_over_the_loop() {
    let tmp = tempdir().unwrap();
    let db_path = tmp.path().join("users.db");
    db::initialize_users_db(&db_path).unwrap();
    let store = UserStore::new(DbBroker::new(&db_path), ShortIdAllocator::default());
    let registry = roster::standard_registry(&Config::default()).unwrap();
    let dispatcher = Dispatcher::new(&registry, &store);

    let mut out = Vec::new();
    dispatcher
        .serve(Cursor::new("{\"id\": \"c1\", \"method\": \"list_tools\"}\n"), &mut out)
        .unwrap();
    let text = String::from_utf8(out).unwrap();
    let resp = Response::decode(text.lines().next().unwrap()).unwrap();
    assert_eq!(resp.id, Some(json!("c1")));

    let tools = resp.result().unwrap()["tools"].as_array().unwrap().clone();
    let add = tools.iter().find(|t| t["name"] == "add_user").unwrap();
    assert_eq!(add["required"], json!(["name", "email", "role"]));
    assert_eq!(add["params_schema"]["email"]["type"], "string");
    for tool in &tools {
        for field in tool["required"].as_array().unwrap() {
            let field = field.as_str().unwrap();
            assert!(
                tool["params_schema"].get(field).is_some(),
                "{} requires undeclared {field}",
                tool["name"]
            );
        }
    }
}

#[test]
fn broker_audit_log_records_each_transaction() {
    let tmp = tempdir().unwrap();
    let db_path = tmp.path().join("users.db");
    let audit = tmp.path().join("audit.jsonl");
    db::initialize_users_db(&db_path).unwrap();
    let broker = DbBroker::new(&db_path).with_audit_log(&audit);
    let store = UserStore::new(broker, ShortIdAllocator::default());
    let registry = roster::standard_registry(&Config::default()).unwrap();
    let dispatcher = Dispatcher::new(&registry, &store);

    let input = concat!(
        "{\"id\": 1, \"method\": \"add_user\", \"params\": {\"name\": \"Ann\", \"email\": \"a@x.com\", \"role\": \"admin\"}}\n",
        "{\"id\": 2, \"method\": \"list_users\"}\n",
    );
    dispatcher.serve(Cursor::new(input), Vec::new()).unwrap();

    let lines: Vec<Value> = fs::read_to_string(&audit)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let ops: Vec<&str> = lines.iter().map(|e| e["op"].as_str().unwrap()).collect();
    assert_eq!(ops, vec!["users.create", "users.list"]);
    assert!(lines.iter().all(|e| e["status"] == "success"));
}

#[test]
fn worker_round_trip_over_stdio() {
    let tmp = tempdir().unwrap();
    let db_path = tmp.path().join("data").join("users.db");
    let mut worker = spawn_worker(&db_path);

    let catalog = worker.fetch_catalog().unwrap();
    assert!(catalog.iter().any(|t| t.name == "update_user"));

    let resp = worker
        .call(
            "add_user",
            params(json!({"name": "Ann", "email": "ann@x.com", "role": "admin"})),
        )
        .unwrap();
    assert_eq!(resp.method.as_deref(), Some("add_user"));
    assert_eq!(resp.result().unwrap()["id"], "U001");

    let resp = worker.call("add_user", params(json!({"name": "Bob"}))).unwrap();
    assert!(resp.error().unwrap().starts_with("validation error:"));

    let resp = worker.call("frobnicate", Map::new()).unwrap();
    assert_eq!(resp.error(), Some("unknown method: frobnicate"));

    // The worker is still serving after errors.
    let resp = worker.call("list_users", Map::new()).unwrap();
    assert_eq!(resp.result().unwrap()["users"].as_array().unwrap().len(), 1);

    assert!(worker.shutdown().unwrap().success());
    assert!(db_path.exists());
}

#[test]
fn recovered_proposal_is_checked_against_live_catalog() {
    let tmp = tempdir().unwrap();
    let mut worker = spawn_worker(&tmp.path().join("users.db"));
    let catalog = worker.fetch_catalog().unwrap();
    worker.shutdown().unwrap();

    let p = proposal::recover("Sure: {\"tool\": \"delete_user\", \"params\": {}}").against(&catalog);
    assert!(p.is_recognized());
    assert_eq!(p.missing(&catalog), vec!["id"]);

    let p = proposal::recover("{\"tool\": \"rm_rf\", \"params\": {}}").against(&catalog);
    assert_eq!(p, Proposal::Unrecognized);
}

#[test]
fn dead_worker_is_a_channel_error() {
    let tmp = tempdir().unwrap();
    let missing_config = tmp.path().join("nope.toml");
    let mut worker = WorkerClient::spawn(
        OsStr::new(env!("CARGO_BIN_EXE_roster")),
        [
            OsStr::new("--config"),
            missing_config.as_os_str(),
            OsStr::new("serve"),
        ],
    )
    .unwrap();

    let err = worker.call("ping", Map::new()).unwrap_err();
    assert!(matches!(err, RosterError::ChannelError(_)), "got {err:?}");
    assert!(err.is_channel());
}

#[test]
fn cli_call_prints_the_response() {
    let tmp = tempdir().unwrap();
    let db_path = tmp.path().join("users.db");
    let out = Command::new(env!("CARGO_BIN_EXE_roster"))
        .arg("--db")
        .arg(&db_path)
        .args([
            "call",
            "add_user",
            "--params",
            r#"{"name":"Ann","email":"ann@x.com","role":"admin"}"#,
        ])
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let resp: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(resp["result"]["id"], "U001");
    assert!(resp.get("error").is_none());

    let out = Command::new(env!("CARGO_BIN_EXE_roster"))
        .arg("--db")
        .arg(&db_path)
        .args(["call", "get_user", "--params", r#"{"id":"U001"}"#])
        .output()
        .unwrap();
    let resp: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(resp["result"]["user"]["email"], "ann@x.com");
}

#[test]
fn cli_recover_reads_stdin() {
    use std::io::Write;
    use std::process::Stdio;

    let tmp = tempdir().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_roster"))
        .arg("--db")
        .arg(tmp.path().join("users.db"))
        .arg("recover")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"Here you go {\"tool\":\"add_user\",\"params\":{\"name\":\"Ann\"}}")
        .unwrap();
    let out = child.wait_with_output().unwrap();
    assert!(out.status.success());
    let report: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["status"], "recognized");
    assert_eq!(report["missing"], json!(["email", "role"]));
}

#[test]
fn cli_tools_prints_the_catalog() {
    let tmp = tempdir().unwrap();
    let out = Command::new(env!("CARGO_BIN_EXE_roster"))
        .arg("--db")
        .arg(tmp.path().join("users.db"))
        .arg("tools")
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let catalog: Value = serde_json::from_slice(&out.stdout).unwrap();
    let names: Vec<&str> = catalog["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec!["list_tools", "ping", "add_user", "list_users", "get_user", "update_user", "delete_user"]
    );
}

#[test]
fn cli_prompt_embeds_catalog_and_request() {
    let tmp = tempdir().unwrap();
    let out = Command::new(env!("CARGO_BIN_EXE_roster"))
        .arg("--db")
        .arg(tmp.path().join("users.db"))
        .args(["prompt", "add Ann as an admin"])
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let prompt: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(prompt["user"], "User request:\nadd Ann as an admin");
    let system = prompt["system"].as_str().unwrap();
    assert!(system.contains("\"name\":\"delete_user\""));
    assert!(system.contains("set tool to 'unknown'"));
}

#[test]
fn unwritable_audit_log_stops_the_worker_at_startup() {
    let tmp = tempdir().unwrap();
    let out = Command::new(env!("CARGO_BIN_EXE_roster"))
        .env("ROSTER_AUDIT_LOG", tmp.path().join("no_such_dir").join("a.jsonl"))
        .arg("--db")
        .arg(tmp.path().join("users.db"))
        .arg("serve")
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(out.stdout.is_empty());
}
