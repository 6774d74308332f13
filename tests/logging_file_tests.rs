use std::path::{Path, PathBuf};

use dailylog::{Attributes, Category, Clock, ConsoleTarget, LogBuilder, LoggerRegistry, ManualClock};
use serde_json::{Map, Value};
use time::macros::datetime;

fn setup(dir: &Path) -> (LoggerRegistry, ManualClock, std::sync::Arc<std::sync::Mutex<Vec<u8>>>) {
    let (clock, manual) = Clock::manual(datetime!(2025-03-10 09:30 UTC));
    let (console, buffer) = ConsoleTarget::memory();
    let registry = LogBuilder::new()
        .with_log_dir(dir)
        .with_color(false)
        .with_console_level("INFO")
        .with_file_level("DEBUG")
        .with_clock(clock)
        .with_console_target(console)
        .build_registry()
        .expect("registry");
    (registry, manual, buffer)
}

fn read(path: PathBuf) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}

fn records(path: PathBuf) -> Vec<Map<String, Value>> {
    read(path)
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid JSON line"))
        .collect()
}

fn hist_files(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for sub in ["app", "error", "debug", "security"] {
        let Ok(entries) = std::fs::read_dir(dir.join(sub)) else {
            continue;
        };
        for entry in entries {
            let path = entry.unwrap().path();
            if path.to_string_lossy().ends_with(".hist.log") {
                found.push(path);
            }
        }
    }
    found.sort();
    found
}

#[test]
fn test_info_reaches_console_and_app_file() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, _, console) = setup(dir.path());

    registry
        .app_logger("svc")
        .unwrap()
        .info("started", Attributes::new().with("version", "1.0"));

    let console = String::from_utf8(console.lock().unwrap().clone()).unwrap();
    assert!(console.contains("INFO"));
    assert!(console.contains("started"));

    let app = records(dir.path().join("app/app.log"));
    assert_eq!(app.len(), 1);
    let keys: Vec<&str> = app[0].keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["timestamp", "level", "logger", "event", "version"]);
    assert_eq!(app[0]["version"], "1.0");
    assert_eq!(app[0]["timestamp"], "2025-03-10T09:30:00.000000+00:00");

    assert!(read(dir.path().join("error/error.log")).is_empty());
}

#[test]
fn test_error_goes_to_error_file_only() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, _, _) = setup(dir.path());

    registry
        .app_logger("svc")
        .unwrap()
        .error("boom", Attributes::new().with("code", 500));

    let errors = records(dir.path().join("error/error.log"));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["event"], "boom");
    assert_eq!(errors[0]["code"], 500);
    assert!(read(dir.path().join("app/app.log")).is_empty());
    assert_eq!(records(dir.path().join("debug/debug.log")).len(), 1);
}

#[test]
fn test_sublog_requested_twice_shares_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, _, _) = setup(dir.path());

    let first = registry.get_logger("svc", Category::Debug, Some("api")).unwrap();
    let second = registry.get_logger("svc", Category::Debug, Some("api")).unwrap();
    first.debug("request", Attributes::new().with("path", "/a"));
    second.debug("request", Attributes::new().with("path", "/b"));

    let debug_files: Vec<_> = std::fs::read_dir(dir.path().join("debug"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(debug_files.iter().filter(|f| *f == "api.log").count(), 1);
    assert_eq!(debug_files.len(), 2);

    let api = records(dir.path().join("debug/api.log"));
    assert_eq!(api.len(), 2);
    assert_eq!(api[0]["path"], "/a");
    assert_eq!(api[1]["path"], "/b");
}

#[test]
fn test_security_logger_writes_security_file() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, _, _) = setup(dir.path());

    registry
        .security_logger("auth.security")
        .unwrap()
        .warning("failed login", Attributes::new().with("user", "mallory"));
    registry
        .app_logger("auth.session")
        .unwrap()
        .info("login", Attributes::new());

    let security = records(dir.path().join("security/security.log"));
    assert_eq!(security.len(), 1);
    assert_eq!(security[0]["user"], "mallory");
    assert_eq!(records(dir.path().join("app/app.log")).len(), 2);
}

#[test]
fn test_rotation_across_simulated_dates() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, clock, _) = setup(dir.path());
    let logger = registry.app_logger("svc").unwrap();

    logger.info("day one", Attributes::new());
    clock.set_now(datetime!(2025-03-11 00:00:05 UTC));
    assert!(registry.force_rotation_check());

    assert!(read(dir.path().join("app/app.log")).is_empty());
    assert!(read(dir.path().join("debug/debug.log")).is_empty());
    assert_eq!(
        hist_files(dir.path()),
        vec![
            dir.path().join("app/app-2025-03-10.hist.log"),
            dir.path().join("debug/debug-2025-03-10.hist.log"),
        ]
    );

    logger.info("day two", Attributes::new());
    let live = read(dir.path().join("app/app.log"));
    assert_eq!(live.lines().count(), 1);
    assert!(live.contains("day two"));
    assert!(read(dir.path().join("app/app-2025-03-10.hist.log")).contains("day one"));

    assert!(!registry.force_rotation_check());
    registry.shutdown();
}

#[test]
fn test_forced_rotation_without_content_archives_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, clock, _) = setup(dir.path());

    clock.set_now(datetime!(2025-03-12 12:00 UTC));
    assert!(registry.force_rotation_check());
    assert!(hist_files(dir.path()).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_emitters_produce_whole_lines() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, _, _) = setup(dir.path());

    let mut tasks = Vec::new();
    for worker in 0..8 {
        let logger = registry.app_logger(&format!("worker-{}", worker)).unwrap();
        tasks.push(tokio::spawn(async move {
            for i in 0..50 {
                logger.info("tick", Attributes::new().with("worker", worker).with("i", i));
                tokio::task::yield_now().await;
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let app = records(dir.path().join("app/app.log"));
    assert_eq!(app.len(), 400);
    for worker in 0..8 {
        let mine: Vec<i64> = app
            .iter()
            .filter(|r| r["worker"] == worker)
            .map(|r| r["i"].as_i64().unwrap())
            .collect();
        assert_eq!(mine, (0..50).collect::<Vec<_>>());
    }
}
