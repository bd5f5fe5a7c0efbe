//! End-to-end behaviour of the transmitter and spool through the public API

use code_monitor_core::io::spool::DrainError;
use code_monitor_core::{
    DeliveryError, DeprecationDetail, Dispatch, EnqueueOutcome, ExceptionDetail, MonitorConfig,
    MonitorError, Transmitter, Transport,
};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Records every POST; fails the call numbered `fail_on` (1-based)
#[derive(Debug, Clone, Default)]
struct FakeEndpoint {
    posts: Arc<Mutex<Vec<(String, Value)>>>,
    fail_on: Option<usize>,
    calls: Arc<Mutex<usize>>,
}

impl FakeEndpoint {
    fn failing_on(call: usize) -> Self {
        Self {
            fail_on: Some(call),
            ..Default::default()
        }
    }

    fn posts(&self) -> Vec<(String, Value)> {
        self.posts.lock().unwrap().clone()
    }
}

impl Transport for FakeEndpoint {
    fn post_json(&self, url: &str, body: &Value) -> Result<(), DeliveryError> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        if self.fail_on == Some(*calls) {
            return Err(DeliveryError::Status {
                url: url.to_string(),
                status: 503,
                body: "maintenance".to_string(),
            });
        }
        self.posts
            .lock()
            .unwrap()
            .push((url.to_string(), body.clone()));
        Ok(())
    }
}

fn config(spool_dir: Option<&Path>) -> MonitorConfig {
    MonitorConfig {
        endpoint: "https://monitor.example.com".to_string(),
        project: "shop".to_string(),
        environment: "prod".to_string(),
        secret: "s3cr3t".to_string(),
        spool_dir: spool_dir.map(Path::to_path_buf),
        ..Default::default()
    }
}

fn spool_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    names
}

fn sending(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.sending", path.display()))
}

#[test]
fn test_identical_reports_spool_one_file() {
    let spool_dir = TempDir::new().unwrap();
    let transmitter =
        Transmitter::with_transport(&config(Some(spool_dir.path())), FakeEndpoint::default())
            .unwrap();
    let detail = ExceptionDetail::new("boom", "trace", false).at("/app/src/X", 42);

    let first = transmitter.report_exception(&detail).unwrap();
    let second = transmitter.report_exception(&detail).unwrap();

    assert!(matches!(first, Dispatch::Spooled(EnqueueOutcome::Written { .. })));
    assert!(matches!(
        second,
        Dispatch::Spooled(EnqueueOutcome::AlreadyPending { .. })
    ));
    let files = spool_files(spool_dir.path());
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("spool.exception-"));
}

#[test]
fn test_drain_empties_spool() {
    let spool_dir = TempDir::new().unwrap();
    let endpoint = FakeEndpoint::default();
    let transmitter =
        Transmitter::with_transport(&config(Some(spool_dir.path())), endpoint.clone()).unwrap();

    for i in 0..3 {
        transmitter
            .exception(&format!("boom {i}"), "trace", false)
            .unwrap();
    }
    transmitter
        .deprecation("/app/src/Legacy.php", 7, "use X", "stack")
        .unwrap();

    let report = transmitter.drain_spool().unwrap();

    assert_eq!(report.delivered, 4);
    assert!(spool_files(spool_dir.path()).is_empty());

    let posts = endpoint.posts();
    let exceptions = posts
        .iter()
        .filter(|(url, _)| url == "https://monitor.example.com/monitoring/exception")
        .count();
    let deprecations = posts
        .iter()
        .filter(|(url, _)| url == "https://monitor.example.com/monitoring/deprecation")
        .count();
    assert_eq!((exceptions, deprecations), (3, 1));
}

#[test]
fn test_failed_delivery_aborts_pass_and_keeps_work() {
    let spool_dir = TempDir::new().unwrap();
    let endpoint = FakeEndpoint::failing_on(2);
    let transmitter =
        Transmitter::with_transport(&config(Some(spool_dir.path())), endpoint.clone()).unwrap();

    let mut records: Vec<PathBuf> = ["a", "b", "c"]
        .iter()
        .map(|m| match transmitter.exception(m, "trace", false).unwrap() {
            Dispatch::Spooled(outcome) => outcome.path().to_path_buf(),
            Dispatch::Sent => panic!("spooling is enabled"),
        })
        .collect();
    records.sort();

    let err = transmitter.drain_spool().unwrap_err();

    match err {
        MonitorError::Drain(DrainError::Delivery {
            claimed, delivered, ..
        }) => {
            assert_eq!(delivered, 1);
            assert_eq!(claimed, sending(&records[1]));
        }
        other => panic!("expected drain abort, got {other:?}"),
    }
    assert!(!records[0].exists() && !sending(&records[0]).exists());
    assert!(sending(&records[1]).exists());
    assert!(records[2].exists());
    assert_eq!(endpoint.posts().len(), 1);

    // The next pass picks up the untouched record but leaves the orphan alone.
    let report = transmitter.drain_spool().unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(report.skipped_claimed, 1);
    assert!(sending(&records[1]).exists());
}

#[test]
fn test_foreign_file_untouched() {
    let spool_dir = TempDir::new().unwrap();
    let foreign = spool_dir.path().join("not-a-spool-file.txt");
    fs::write(&foreign, "keep me").unwrap();
    let transmitter =
        Transmitter::with_transport(&config(Some(spool_dir.path())), FakeEndpoint::default())
            .unwrap();

    let report = transmitter.drain_spool().unwrap();

    assert_eq!(report.skipped_foreign, 1);
    assert_eq!(fs::read_to_string(&foreign).unwrap(), "keep me");
}

#[test]
fn test_round_trip_fidelity() {
    let spool_dir = TempDir::new().unwrap();
    let endpoint = FakeEndpoint::default();
    let mut config = config(Some(spool_dir.path()));
    config.stamp_seen = false;
    let transmitter = Transmitter::with_transport(&config, endpoint.clone()).unwrap();

    transmitter
        .report_exception(&ExceptionDetail::new("boom", "...trace...", true).at("/app/src/X", 42))
        .unwrap();
    transmitter.drain_spool().unwrap();

    let posts = endpoint.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(
        posts[0].1,
        json!({
            "file": "/app/src/X",
            "line": 42,
            "message": "boom",
            "contents": "...trace...",
            "caught": true,
            "project": "shop",
            "environment": "prod",
            "secret": "s3cr3t",
        })
    );
}

#[test]
fn test_seen_stamp_added_on_drain() {
    let spool_dir = TempDir::new().unwrap();
    let endpoint = FakeEndpoint::default();
    let transmitter =
        Transmitter::with_transport(&config(Some(spool_dir.path())), endpoint.clone()).unwrap();

    transmitter
        .report_deprecation(&DeprecationDetail::new("/app/src/Legacy.php", 7, "old", "stack"))
        .unwrap();
    transmitter.drain_spool().unwrap();

    let body = &endpoint.posts()[0].1;
    let seen = body["_seen"].as_str().expect("_seen stamped");
    assert!(chrono::DateTime::parse_from_rfc3339(seen).is_ok());
    assert_eq!(body["line"], 7);
}

#[test]
fn test_disabled_spool_posts_immediately() {
    let work_dir = TempDir::new().unwrap();
    let endpoint = FakeEndpoint::default();
    let transmitter = Transmitter::with_transport(&config(None), endpoint.clone()).unwrap();

    let dispatch = transmitter.exception("boom", "trace", false).unwrap();

    assert_eq!(dispatch, Dispatch::Sent);
    assert_eq!(endpoint.posts().len(), 1);
    assert!(spool_files(work_dir.path()).is_empty());
    assert!(transmitter.spool().is_none());
}

#[test]
fn test_unwritable_spool_surfaces_error() {
    let spool_dir = TempDir::new().unwrap();
    let transmitter =
        Transmitter::with_transport(&config(Some(spool_dir.path())), FakeEndpoint::default())
            .unwrap();
    drop(spool_dir);

    let result = transmitter.exception("boom", "trace", false);
    assert!(matches!(result, Err(MonitorError::Spool(_))));
}
