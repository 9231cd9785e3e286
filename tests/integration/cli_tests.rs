use clap::Parser;
use filetime::{set_file_mtime, FileTime};
use lumberjack_session::cli::Cli;
use lumberjack_session::error::ExitCode;
use lumberjack_session::run_with_writer;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::tempdir;

fn write_config(dir: &Path, extra: &str) -> std::path::PathBuf {
    let sessions = dir.join("sessions");
    let path = dir.join("config.toml");
    let content = format!(
        "[session]\ndriver = \"file\"\nfiles = {:?}\nlifetime = 60\n{}",
        sessions.display().to_string(),
        extra
    );
    fs::write(&path, content).unwrap();
    path
}

fn run(args: &[&str]) -> (anyhow::Result<ExitCode>, String) {
    let cli = Cli::parse_from(std::iter::once("lumberjack-session").chain(args.iter().copied()));
    let mut out = Vec::new();
    let result = run_with_writer(cli, &mut out);
    (result, String::from_utf8(out).unwrap())
}

#[test]
fn test_gc_command_removes_expired() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");
    let sessions = dir.path().join("sessions");
    fs::create_dir_all(&sessions).unwrap();
    fs::write(sessions.join("old"), "x").unwrap();
    fs::write(sessions.join("new"), "x").unwrap();
    let two_hours_ago = SystemTime::now() - Duration::from_secs(7200);
    set_file_mtime(sessions.join("old"), FileTime::from_system_time(two_hours_ago)).unwrap();

    let (result, out) = run(&["-q", "--config", config.to_str().unwrap(), "gc"]);

    assert_eq!(result.unwrap(), ExitCode::Success);
    assert_eq!(out.trim(), "1");
    assert!(!sessions.join("old").exists());
    assert!(sessions.join("new").exists());
}

#[test]
fn test_show_missing_session() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");

    let (result, out) = run(&["-q", "--config", config.to_str().unwrap(), "show", "abc"]);

    assert_eq!(result.unwrap(), ExitCode::SessionNotFound);
    assert!(out.is_empty());
}

#[test]
fn test_show_and_destroy_encrypted_session() {
    use lumberjack_session::config::Config;
    use lumberjack_session::session::{lock, SessionManager, SessionStore};
    use serde_json::json;

    let dir = tempdir().unwrap();
    let config_path = write_config(
        dir.path(),
        "encrypt = true\n\n[app]\nkey = \"encryption-key\"\n",
    );

    {
        let manager =
            SessionManager::new(Config::load_from_path(&config_path)).with_session_id("abc");
        let driver = manager.driver(None).unwrap();
        let mut session = lock(&driver);
        session.put("user_id", json!(42));
        session.save().unwrap();
    }

    let config = config_path.to_str().unwrap();
    let (result, out) = run(&["-q", "--config", config, "show", "abc"]);
    assert_eq!(result.unwrap(), ExitCode::Success);
    let shown: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(shown, json!({"user_id": 42}));

    let (result, out) = run(&["-q", "--config", config, "destroy", "abc"]);
    assert_eq!(result.unwrap(), ExitCode::Success);
    assert_eq!(out.trim(), "abc");
    assert!(!dir.path().join("sessions").join("abc").exists());
}

#[test]
fn test_unknown_driver_is_a_configuration_error() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");

    let (result, _) = run(&[
        "-q",
        "--config",
        config.to_str().unwrap(),
        "gc",
        "--driver",
        "redis",
    ]);

    let err = result.unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::ConfigurationError);
    assert!(format!("{:#}", err).contains("redis"));
}

#[test]
fn test_invalid_id_is_a_general_error() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");

    let (result, _) = run(&["-q", "--config", config.to_str().unwrap(), "destroy", "../x"]);

    let err = result.unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
}
