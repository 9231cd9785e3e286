use lumberjack_session::session::codec::{self, Attributes};
use lumberjack_session::session::{
    FileSessionHandler, MemorySessionHandler, SessionHandler, SessionStore, Store,
};
use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;

fn request(handler: &Arc<dyn SessionHandler>, id: &str) -> Store {
    let mut store = Store::new("lumberjack", Arc::clone(handler), id);
    store.start().unwrap();
    store
}

#[test]
fn test_counter_round_trip() {
    let handler: Arc<dyn SessionHandler> = Arc::new(MemorySessionHandler::new());

    let mut store = Store::new("s", Arc::clone(&handler), "abc");
    store.put("count", json!(1));
    store.save().unwrap();

    let payload = codec::decode(&handler.read("abc").unwrap()).unwrap();
    let mut expected = Attributes::new();
    expected.insert("count".into(), json!(1));
    assert_eq!(payload.attributes, expected);

    let mut next = Store::new("s", Arc::clone(&handler), "abc");
    next.start().unwrap();
    assert_eq!(next.get("count"), Some(&json!(1)));
}

#[test]
fn test_flash_ages_across_requests() {
    let handler: Arc<dyn SessionHandler> = Arc::new(MemorySessionHandler::new());

    // Request 1 sets the flash message
    let mut first = request(&handler, "abc");
    first.flash("status", json!("Profile updated"));
    first.put("user_id", json!(42));
    first.save().unwrap();

    // Request 2 can still read it
    let mut second = request(&handler, "abc");
    assert_eq!(second.get("status"), Some(&json!("Profile updated")));
    second.save().unwrap();

    // Request 3 no longer sees it, regular data survives
    let third = request(&handler, "abc");
    assert!(!third.has("status"));
    assert_eq!(third.get("user_id"), Some(&json!(42)));
}

#[test]
fn test_keep_across_requests() {
    let handler: Arc<dyn SessionHandler> = Arc::new(MemorySessionHandler::new());

    let mut first = request(&handler, "abc");
    first.flash("errors", json!(["name is required"]));
    first.flash("old_input", json!({"email": "a@example.com"}));
    first.save().unwrap();

    let mut second = request(&handler, "abc");
    second.keep(&["errors"]);
    second.save().unwrap();

    let mut third = request(&handler, "abc");
    assert_eq!(third.get("errors"), Some(&json!(["name is required"])));
    assert!(!third.has("old_input"));
    third.save().unwrap();

    let fourth = request(&handler, "abc");
    assert!(!fourth.has("errors"));
}

#[test]
fn test_sessions_are_isolated_by_id() {
    let handler: Arc<dyn SessionHandler> = Arc::new(MemorySessionHandler::new());

    let mut alice = request(&handler, "alice");
    alice.put("name", json!("alice"));
    alice.save().unwrap();

    let mut bob = request(&handler, "bob");
    assert!(!bob.has("name"));
    bob.put("name", json!("bob"));
    bob.save().unwrap();

    assert_eq!(request(&handler, "alice").get("name"), Some(&json!("alice")));
}

#[test]
fn test_file_backed_lifecycle() {
    let dir = tempdir().unwrap();
    let handler: Arc<dyn SessionHandler> = Arc::new(FileSessionHandler::new(dir.path()));

    let mut store = request(&handler, "abc");
    store.push("visited", json!("/"));
    store.push("visited", json!("/about"));
    store.save().unwrap();

    assert!(dir.path().join("abc").is_file());

    let mut again = request(&handler, "abc");
    assert_eq!(again.get("visited"), Some(&json!(["/", "/about"])));

    again.invalidate().unwrap();
    assert!(!dir.path().join("abc").exists());
    assert!(request(&handler, "abc").all().is_empty());
}

#[test]
fn test_corrupt_file_starts_empty() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("abc"), "{ not json").unwrap();
    let handler: Arc<dyn SessionHandler> = Arc::new(FileSessionHandler::new(dir.path()));

    let mut store = request(&handler, "abc");
    assert!(store.is_started());
    assert!(store.all().is_empty());

    // Saving repairs the file
    store.put("foo", json!("bar"));
    store.save().unwrap();
    assert_eq!(request(&handler, "abc").get("foo"), Some(&json!("bar")));
}

#[test]
fn test_storage_error_surfaces_from_start() {
    let dir = tempdir().unwrap();
    // A directory where the session file should be makes reads fail
    std::fs::create_dir(dir.path().join("abc")).unwrap();
    let handler: Arc<dyn SessionHandler> = Arc::new(FileSessionHandler::new(dir.path()));

    let mut store = Store::new("s", handler, "abc");
    let err = store.start().unwrap_err();
    assert!(err.to_string().contains("session storage error"));
    assert!(err.path().is_some());
}

#[test]
fn test_float_attributes_keep_session_across_requests() {
    let handler: Arc<dyn SessionHandler> = Arc::new(MemorySessionHandler::new());

    let mut first = request(&handler, "abc");
    first.put("keep", json!("important"));
    first.put("price", json!(0.010700000000000001));
    first.put("tiny", json!(1.0715660391465826e-75));
    first.save().unwrap();

    let second = request(&handler, "abc");
    assert_eq!(second.get("keep"), Some(&json!("important")));
    assert_eq!(second.get("price").and_then(|v| v.as_f64()), Some(0.010700000000000001));
    assert_eq!(second.get("tiny").and_then(|v| v.as_f64()), Some(1.0715660391465826e-75));
}

#[test]
fn test_forgotten_flash_key_reused_as_plain_value() {
    let handler: Arc<dyn SessionHandler> = Arc::new(MemorySessionHandler::new());

    let mut first = request(&handler, "abc");
    first.flash("notice", json!("saved"));
    first.save().unwrap();

    // The flashed value is consumed and the key is reused for regular data
    let mut second = request(&handler, "abc");
    assert_eq!(second.pull("notice"), Some(json!("saved")));
    second.put("notice", json!("sticky"));
    second.save().unwrap();

    let mut third = request(&handler, "abc");
    assert_eq!(third.get("notice"), Some(&json!("sticky")));
    third.save().unwrap();

    let fourth = request(&handler, "abc");
    assert_eq!(fourth.get("notice"), Some(&json!("sticky")));
}
