//! End-to-end preview lifecycle against a real Docker daemon: build a
//! python-service preview, land a commit, and observe exactly one reload
//! event on the Watcher's broadcast channel.
//!
//! Requires Docker; run with `cargo test -- --ignored`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use forge_common::config::PreviewConfig;
use forge_preview::{PreviewManager, PreviewStatus, Watcher};

fn python_service_files(handler: &str) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    files.insert("requirements.txt".to_string(), "flask==3.0\n".to_string());
    files.insert(
        "main.py".to_string(),
        format!("from flask import Flask\napp = Flask(__name__)\n\n@app.route('/')\ndef index():\n    return '{handler}'\n"),
    );
    files
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn create_edit_reload_cycle() {
    let config = PreviewConfig {
        poll_interval: Duration::from_millis(200),
        ..PreviewConfig::default()
    };
    let manager = Arc::new(PreviewManager::new(config));

    let initial_files = python_service_files("hello");
    let environment = manager
        .create_preview("proj-preview", &initial_files)
        .await
        .expect("docker daemon reachable in this environment");
    assert_eq!(environment.status, PreviewStatus::Running);
    assert!(environment.url.is_some());
    assert!(environment.port.is_some());

    let commits = Arc::new(std::sync::Mutex::new(vec!["commit-1".to_string()]));
    let poll_commits = commits.clone();
    let (watcher, mut reload_rx) = Watcher::new(
        "proj-preview",
        environment.preview_id.clone(),
        manager.clone(),
        Duration::from_millis(200),
        Some("commit-1".to_string()),
    );
    tokio::spawn(watcher.clone().run(move || poll_commits.lock().unwrap().last().cloned()));

    // No commit change yet: nothing should arrive within a couple of polls.
    let immediate = tokio::time::timeout(Duration::from_millis(450), reload_rx.recv()).await;
    assert!(immediate.is_err(), "watcher fired before any new commit landed");

    let updated_files = python_service_files("goodbye");
    forge_preview::watcher::rebuild(&manager, &environment.preview_id, &updated_files).await;
    commits.lock().unwrap().push("commit-2".to_string());

    let event = tokio::time::timeout(Duration::from_secs(30), reload_rx.recv())
        .await
        .expect("watcher did not observe the new commit in time")
        .expect("reload channel closed unexpectedly");
    assert_eq!(event.commit_id, "commit-2");
    assert_eq!(event.preview_id, environment.preview_id);

    // The rebuild doesn't just fire an event — the served response must
    // actually reflect the new handler body once the restarted container
    // is healthy again.
    let url = environment.url.clone().expect("preview has a url");
    let body = reqwest::get(&url)
        .await
        .expect("preview should be reachable after rebuild")
        .text()
        .await
        .expect("preview response should be readable");
    assert_eq!(body, "goodbye");

    // Exactly one reload for the one new commit — the next poll sees the
    // same commit id again and must not re-fire.
    let second = tokio::time::timeout(Duration::from_millis(450), reload_rx.recv()).await;
    assert!(second.is_err(), "watcher re-fired for a commit it already reported");

    manager.stop_preview(&environment.preview_id).await.unwrap();
}
