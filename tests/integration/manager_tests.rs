use lumberjack_session::config::Config;
use lumberjack_session::encrypter::{AesEncrypter, Encrypter};
use lumberjack_session::session::{
    lock, FileSessionHandler, MemorySessionHandler, SessionDriver, SessionManager, SessionStore,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

#[test]
fn test_file_driver_persists_between_managers() {
    let dir = tempdir().unwrap();
    let config = Config::defaults()
        .with("session.driver", "file")
        .with("session.files", dir.path());

    let first = SessionManager::new(config.clone()).with_session_id("abc");
    {
        let driver = first.driver(None).unwrap();
        let mut session = lock(&driver);
        session.start().unwrap();
        session.put("count", json!(1));
        session.save().unwrap();
    }

    let second = SessionManager::new(config).with_session_id("abc");
    let driver = second.driver(None).unwrap();
    let mut session = lock(&driver);
    session.start().unwrap();
    assert_eq!(session.get("count"), Some(&json!(1)));
    assert!(session
        .handler()
        .as_any()
        .is::<FileSessionHandler>());
}

#[test]
fn test_encrypted_driver_round_trip_with_app_key() {
    let dir = tempdir().unwrap();
    let config = Config::defaults()
        .with("session.files", dir.path())
        .with("session.encrypt", true)
        .with("app.key", "encryption-key");

    let writer = SessionManager::new(config.clone()).with_session_id("abc");
    {
        let driver = writer.driver(Some("file")).unwrap();
        let mut session = lock(&driver);
        assert!(matches!(*session, SessionDriver::Encrypted(_)));
        session.put("secret", json!("value"));
        session.save().unwrap();
    }
    let raw = std::fs::read_to_string(dir.path().join("abc")).unwrap();
    assert!(!raw.contains("value"));

    // An explicitly bound encrypter with the same key reads it back
    let encrypter: Arc<dyn Encrypter> = Arc::new(AesEncrypter::new("encryption-key").unwrap());
    let reader = SessionManager::new(config)
        .with_session_id("abc")
        .with_encrypter(encrypter);
    let driver = reader.driver(Some("file")).unwrap();
    let mut session = lock(&driver);
    session.start().unwrap();
    assert_eq!(session.get("secret"), Some(&json!("value")));
}

#[test]
fn test_extend_factory_is_called_once_per_name() {
    let calls = Arc::new(AtomicUsize::new(0));
    let manager = SessionManager::new(Config::defaults());

    let counter = Arc::clone(&calls);
    manager.extend("memory", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        MemorySessionHandler::new()
    });

    let a = manager.driver(Some("memory")).unwrap();
    let b = manager.driver(Some("memory")).unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(lock(&a).handler().as_any().is::<MemorySessionHandler>());
}

#[test]
fn test_concurrent_resolution_builds_one_instance() {
    let calls = Arc::new(AtomicUsize::new(0));
    let manager = Arc::new(SessionManager::new(Config::defaults()));

    let counter = Arc::clone(&calls);
    manager.extend("memory", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        MemorySessionHandler::new()
    });

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || manager.driver(Some("memory")).unwrap())
        })
        .collect();
    let drivers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for driver in &drivers[1..] {
        assert!(Arc::ptr_eq(&drivers[0], driver));
    }
}

#[test]
fn test_failed_driver_is_not_cached() {
    let manager = SessionManager::new(Config::defaults());
    assert!(manager.driver(Some("custom")).is_err());

    manager.extend("custom", MemorySessionHandler::new);
    assert!(manager.driver(Some("custom")).is_ok());
}
