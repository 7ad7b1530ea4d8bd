use roster::core::broker::DbBroker;
use roster::core::config::Config;
use roster::core::db::initialize_users_db;
use roster::core::error::RosterError;
use roster::core::ids::ShortIdAllocator;
use roster::core::registry::{Registry, ToolContext};
use roster::core::store::{User, UserStore};
use roster::plugins::users::{add_user, delete_user, get_user, list_users, update_user};
use serde_json::{Map, Value, json};
use tempfile::{TempDir, tempdir};

struct Fixture {
    _tmp: TempDir,
    store: UserStore,
    registry: Registry,
}

impl Fixture {
    fn new() -> Self {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("users.db");
        initialize_users_db(&db_path).unwrap();
        Self {
            store: UserStore::new(DbBroker::new(&db_path), ShortIdAllocator::default()),
            registry: roster::standard_registry(&Config::default()).unwrap(),
            _tmp: tmp,
        }
    }

    fn ctx(&self) -> ToolContext<'_> {
        ToolContext {
            store: &self.store,
            registry: &self.registry,
        }
    }

    fn add(&self, name: &str, email: &str, role: &str) -> Value {
        add_user(
            &self.ctx(),
            &params(json!({"name": name, "email": email, "role": role})),
        )
        .unwrap()
    }
}

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

#[test]
fn test_user_lifecycle() {
    let fx = Fixture::new();

    // 1. Add
    let added = fx.add("Ann Lee", "Ann@Example.com", "admin");
    assert_eq!(added["id"], "U001");
    assert_eq!(added["email"], "ann@example.com");
    assert!(added["created_at"].as_str().unwrap().ends_with('Z'));

    // 2. Get returns exactly what add returned
    let got = get_user(&fx.ctx(), &params(json!({"id": "U001"}))).unwrap();
    assert_eq!(got["user"], added);

    // 3. Update one field
    let updated = update_user(&fx.ctx(), &params(json!({"id": "U001", "role": "viewer"}))).unwrap();
    assert_eq!(updated["message"], "user updated");
    assert_eq!(updated["user"]["role"], "viewer");
    assert_eq!(updated["user"]["name"], "Ann Lee");

    // 4. Delete, then the record is gone
    let deleted = delete_user(&fx.ctx(), &params(json!({"id": "U001"}))).unwrap();
    assert_eq!(deleted, json!({"message": "user deleted", "id": "U001"}));
    let got = get_user(&fx.ctx(), &params(json!({"id": "U001"}))).unwrap();
    assert_eq!(got, json!({}));
}

#[test]
fn test_ids_increase_with_each_add() {
    let fx = Fixture::new();
    let ids: Vec<String> = (0..3)
        .map(|i| {
            fx.add(&format!("User {i}"), &format!("u{i}@x.com"), "viewer")["id"]
                .as_str()
                .unwrap()
                .to_string()
        })
        .collect();
    assert_eq!(ids, vec!["U001", "U002", "U003"]);

    // Deleting the highest id frees it; deleting a lower one does not.
    delete_user(&fx.ctx(), &params(json!({"id": "U001"}))).unwrap();
    assert_eq!(fx.add("Dee", "dee@x.com", "viewer")["id"], "U004");
}

#[test]
fn test_duplicate_email_conflicts() {
    let fx = Fixture::new();
    fx.add("Ann", "ann@x.com", "admin");
    let err = add_user(
        &fx.ctx(),
        &params(json!({"name": "Other Ann", "email": "ANN@x.com", "role": "viewer"})),
    )
    .unwrap_err();
    assert!(matches!(err, RosterError::Conflict(_)), "got {err:?}");
    assert_eq!(fx.store.list().unwrap().len(), 1);
}

#[test]
fn test_update_conflict_leaves_record_unchanged() {
    let fx = Fixture::new();
    fx.add("Ann", "ann@x.com", "admin");
    fx.add("Bob", "bob@x.com", "viewer");

    let err = update_user(
        &fx.ctx(),
        &params(json!({"id": "U002", "email": "ann@x.com", "name": "Robert"})),
    )
    .unwrap_err();
    assert!(matches!(err, RosterError::Conflict(_)));
    assert!(err.to_string().contains("email already in use"));

    let bob = fx.store.get("U002").unwrap().unwrap();
    assert_eq!(bob.email, "bob@x.com");
    assert_eq!(bob.name, "Bob");
}

#[test]
fn test_update_requires_a_change() {
    let fx = Fixture::new();
    fx.add("Ann", "ann@x.com", "admin");
    let err = update_user(&fx.ctx(), &params(json!({"id": "U001", "name": "  "}))).unwrap_err();
    assert_eq!(
        err.to_string(),
        "validation error: nothing to update: provide at least one of name, email, role"
    );
}

#[test]
fn test_missing_records_differ_by_operation() {
    let fx = Fixture::new();
    assert_eq!(get_user(&fx.ctx(), &params(json!({"id": "U999"}))).unwrap(), json!({}));

    let err = update_user(&fx.ctx(), &params(json!({"id": "U999", "role": "x"}))).unwrap_err();
    assert!(matches!(err, RosterError::NotFound(_)));

    let err = delete_user(&fx.ctx(), &params(json!({"id": "U999"}))).unwrap_err();
    assert_eq!(err.to_string(), "not found: no user with id U999");
}

#[test]
fn test_add_reports_missing_fields() {
    let fx = Fixture::new();
    let err = add_user(&fx.ctx(), &params(json!({"name": "Ann", "role": ""}))).unwrap_err();
    assert_eq!(
        err.to_string(),
        "validation error: name, email and role are required (missing: email, role)"
    );
}

#[test]
fn test_list_orders_by_numeric_id() {
    let fx = Fixture::new();
    // Records written by another process, out of order.
    for (id, email) in [("U002", "b@x.com"), ("U010", "c@x.com"), ("U001", "a@x.com")] {
        fx.store
            .insert(&User {
                id: id.to_string(),
                name: id.to_lowercase(),
                email: email.to_string(),
                role: "viewer".to_string(),
                created_at: "2024-01-01T00:00:00.000000Z".to_string(),
            })
            .unwrap();
    }
    let listed = list_users(&fx.ctx(), &Map::new()).unwrap();
    let ids: Vec<&str> = listed["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["U001", "U002", "U010"]);

    // The next id continues after the highest one present.
    assert_eq!(fx.add("New", "new@x.com", "viewer")["id"], "U011");
}
