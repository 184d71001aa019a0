//! End-to-end analyzer tests over fixture projects.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use super::test_helpers::*;
use crate::config::ProbeMode;
use crate::events::{self, AnalysisEvent};
use crate::result::TargetKind;
use crate::test_utils::{TestRuntime, create_test_project, install_fake_package};
use crate::{AnalyzeError, Analyzer};
use tempfile::TempDir;

fn versions(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_directory_without_manifest_uses_wildcards() {
    let temp = TempDir::new().unwrap();
    let root = create_test_project(temp.path(), &[("test.js", "var vows = require('vows');")]);

    let report = static_analyzer().target(&root).analyze().await.unwrap();

    assert_eq!(report.kind, TargetKind::Directory);
    assert_eq!(report.versions(), versions(&[("vows", "*")]));
}

#[tokio::test]
async fn test_declared_range_preserved_and_installed_version_inferred() {
    let temp = TempDir::new().unwrap();
    let root = create_test_project(
        temp.path(),
        &[
            (
                "package.json",
                r#"{ "name": "app", "main": "index.js", "dependencies": { "a": "1.2.3" } }"#,
            ),
            ("index.js", "require('a'); require('b');"),
        ],
    );
    install_fake_package(&root, "a", "1.2.3", &[]);
    install_fake_package(&root, "b", "2.0.0", &[]);

    let report = static_analyzer().target(&root).analyze().await.unwrap();

    assert_eq!(report.kind, TargetKind::Package);
    assert_eq!(report.versions(), versions(&[("a", "1.2.3"), ("b", "2.0.x")]));
    assert_eq!(report.installed_root.as_deref(), Some(canonical(&root).as_path()));
}

#[tokio::test]
async fn test_relative_and_subpath_specifiers_collapse() {
    let temp = TempDir::new().unwrap();
    let root = create_test_project(
        temp.path(),
        &[
            (
                "main.js",
                "require('./lib/helper'); require('socket.io/lib/utils');",
            ),
            ("lib/helper.js", "module.exports = {};"),
        ],
    );

    let report = static_analyzer()
        .target(root.join("main.js"))
        .analyze()
        .await
        .unwrap();

    assert_eq!(report.kind, TargetKind::File);
    let names: Vec<&str> = report.discovered.iter().map(String::as_str).collect();
    assert_eq!(names, vec!["socket.io"]);
}

#[tokio::test]
async fn test_reduction_through_analyzer() {
    let temp = TempDir::new().unwrap();
    let root = create_test_project(
        temp.path(),
        &[("index.js", "require('express'); require('debug');")],
    );
    install_fake_package(&root, "express", "4.17.1", &[("debug", "2.6.9")]);
    install_fake_package(&root, "debug", "2.6.9", &[]);

    let report = static_analyzer()
        .target(root.join("index.js"))
        .analyze()
        .await
        .unwrap();

    assert_eq!(report.versions(), versions(&[("express", "4.17.x")]));
    assert_eq!(report.manifest.suspect["debug"].subsumed_by, "express");

    let unreduced = static_analyzer()
        .reduce(false)
        .target(root.join("index.js"))
        .analyze()
        .await
        .unwrap();
    assert_eq!(unreduced.manifest.kept.len(), 2);
    assert!(!unreduced.has_suspects());
}

#[tokio::test]
async fn test_directory_failures_are_aggregated() {
    let temp = TempDir::new().unwrap();
    let root = create_test_project(
        temp.path(),
        &[
            ("good.js", "require('express');"),
            ("bad-one.js", "var = ;"),
            ("nested/bad-two.js", "function ("),
        ],
    );

    let err = static_analyzer().target(&root).analyze().await.unwrap_err();

    match &err {
        AnalyzeError::Aggregate { failures } => {
            assert_eq!(failures.len(), 2);
            assert!(failures.iter().all(|f| f.kind() == "ModuleParseError"));
        }
        other => panic!("expected aggregate error, got {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains("bad-one.js"));
    assert!(message.contains("bad-two.js"));
}

#[tokio::test]
async fn test_shared_broken_module_is_reported_once() {
    let temp = TempDir::new().unwrap();
    let root = create_test_project(
        &canonical(temp.path()),
        &[
            ("a.js", "require('./lib/shared');"),
            ("b.js", "require('./lib/shared');"),
            ("lib/shared.js", "var = ;"),
            ("other.js", "function ("),
        ],
    );

    let err = static_analyzer().target(&root).analyze().await.unwrap_err();

    match &err {
        AnalyzeError::Aggregate { failures } => {
            assert_eq!(failures.len(), 2, "{err}");
            let shared = failures
                .iter()
                .filter(|f| f.to_string().contains("shared.js"))
                .count();
            assert_eq!(shared, 1);
        }
        other => panic!("expected aggregate error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_directory_discovery_is_independent_of_scheduling() {
    let temp = TempDir::new().unwrap();
    let mut files = Vec::new();
    for i in 0..12 {
        files.push((format!("src/file{i}.js"), format!("require('pkg-{}');", i % 5)));
    }
    files.push(("node_modules/ignored/index.js".to_string(), "require('hidden');".to_string()));
    let fixture: Vec<(&str, &str)> = files.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
    let root = create_test_project(temp.path(), &fixture);

    let serial = static_analyzer()
        .concurrency(1)
        .target(&root)
        .analyze()
        .await
        .unwrap();
    let parallel = static_analyzer()
        .concurrency(8)
        .target(&root)
        .analyze()
        .await
        .unwrap();

    assert_eq!(serial.discovered, parallel.discovered);
    assert_eq!(serial.discovered.len(), 5);
    assert!(!serial.discovered.contains("hidden"));
}

#[tokio::test]
async fn test_file_filter_limits_directory_scan() {
    let temp = TempDir::new().unwrap();
    let root = create_test_project(
        temp.path(),
        &[("app.js", "require('express');"), ("test/app.test.js", "require('mocha');")],
    );

    let report = static_analyzer()
        .file_filter(|path| !path.components().any(|c| c.as_os_str() == "test"))
        .target(&root)
        .analyze()
        .await
        .unwrap();

    assert!(report.discovered.contains("express"));
    assert!(!report.discovered.contains("mocha"));
}

#[tokio::test]
async fn test_package_scripts_self_name_and_dev_dependencies() {
    let temp = TempDir::new().unwrap();
    let root = create_test_project(
        temp.path(),
        &[
            (
                "package.json",
                r#"{
                    "name": "my-app",
                    "scripts": { "test": "node test/run.js --reporter spec", "start": "node other.js" },
                    "devDependencies": { "vows": "0.5.x" }
                }"#,
            ),
            ("app.js", "require('my-app/lib/plugin'); require('express');"),
            ("test/run.js", "require('vows'); require('should');"),
            ("other.js", "require('never-analyzed');"),
        ],
    );

    let report = static_analyzer().target(&root).analyze().await.unwrap();

    let names: Vec<&str> = report.discovered.iter().map(String::as_str).collect();
    assert_eq!(names, vec!["express", "should"]);
}

#[tokio::test]
async fn test_package_without_entry_point() {
    let temp = TempDir::new().unwrap();
    let root = create_test_project(
        temp.path(),
        &[("package.json", r#"{ "name": "empty" }"#), ("lib/thing.js", "")],
    );

    let err = static_analyzer().target(&root).analyze().await.unwrap_err();
    assert_eq!(err.kind(), "MissingEntryPoint");
}

#[tokio::test]
async fn test_malformed_manifest_with_and_without_fallback() {
    let temp = TempDir::new().unwrap();
    let root = create_test_project(temp.path(), &[("package.json", "{ broken")]);

    let err = static_analyzer()
        .npm(false)
        .target(&root)
        .analyze()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "ManifestParseError");

    create_test_project(&root, &[("server.js", "require('express');")]);
    let report = static_analyzer()
        .npm(false)
        .target(&root)
        .analyze()
        .await
        .unwrap();
    assert!(report.discovered.contains("express"));
}

#[tokio::test]
async fn test_unreadable_installed_tree_degrades_unless_required() {
    let temp = TempDir::new().unwrap();
    let root = create_test_project(
        temp.path(),
        &[("package.json", "{ broken"), ("src/index.js", "require('express');")],
    );
    let target = root.join("src/index.js");

    let report = static_analyzer().target(&target).analyze().await.unwrap();
    assert_eq!(report.versions(), versions(&[("express", "*")]));

    let err = static_analyzer()
        .require_installed(true)
        .target(&target)
        .analyze()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "InstalledTreeUnreadable");
}

#[tokio::test]
async fn test_npm_disabled_skips_installed_tree() {
    let temp = TempDir::new().unwrap();
    let root = create_test_project(temp.path(), &[("index.js", "require('a');")]);
    install_fake_package(&root, "a", "3.1.4", &[]);

    let report = static_analyzer()
        .npm(false)
        .target(root.join("index.js"))
        .analyze()
        .await
        .unwrap();

    assert!(report.installed_root.is_none());
    assert_eq!(report.versions(), versions(&[("a", "*")]));
}

#[tokio::test]
async fn test_raw_mode_keeps_everything() {
    let temp = TempDir::new().unwrap();
    let root = create_test_project(
        temp.path(),
        &[("index.js", "require('fs'); require('./missing'); require('a/b/c');")],
    );

    let report = static_analyzer()
        .raw(true)
        .npm(false)
        .target(root.join("index.js"))
        .analyze()
        .await
        .unwrap();

    for name in ["fs", "./missing", "a/b/c"] {
        assert!(report.discovered.contains(name), "missing {name}");
    }
}

#[tokio::test]
async fn test_missing_target() {
    let temp = TempDir::new().unwrap();
    let err = static_analyzer()
        .target(temp.path().join("nope"))
        .analyze()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "TargetNotFoundOrUnreadable");
    assert!(err.to_string().contains("nope"));
}

#[tokio::test]
async fn test_events_are_sent_in_order() {
    let temp = TempDir::new().unwrap();
    let root = create_test_project(
        temp.path(),
        &[("index.js", "require('express'); require('debug');")],
    );
    install_fake_package(&root, "express", "4.17.1", &[("debug", "*")]);
    install_fake_package(&root, "debug", "2.6.9", &[]);

    let (tx, mut rx) = events::channel();
    static_analyzer()
        .events(tx)
        .target(root.join("index.js"))
        .analyze()
        .await
        .unwrap();

    match rx.recv().await {
        Some(AnalysisEvent::Dependencies(found)) => assert_eq!(found.len(), 2),
        other => panic!("expected dependencies event, got {other:?}"),
    }
    match rx.recv().await {
        Some(AnalysisEvent::Search(kept)) => assert_eq!(kept.len(), 2),
        other => panic!("expected search event, got {other:?}"),
    }
    match rx.recv().await {
        Some(AnalysisEvent::Reduce { kept, suspect }) => {
            assert!(kept.contains_key("express"));
            assert!(suspect.contains_key("debug"));
        }
        other => panic!("expected reduce event, got {other:?}"),
    }
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_probe_failure_is_fatal_for_file_analysis() {
    if !require_node("test_probe_failure_is_fatal_for_file_analysis") {
        return;
    }
    let temp = TempDir::new().unwrap();
    let root = create_test_project(
        temp.path(),
        &[("index.js", "var name = 'ex' + 'press';\nthrow 'config missing';\nrequire(name);")],
    );

    let err = Analyzer::new()
        .runtime(Arc::new(TestRuntime::new()))
        .timeout(Duration::from_secs(10))
        .target(root.join("index.js"))
        .analyze()
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "WorkerThrownError");
    assert!(err.to_string().contains("index.js"));
}

#[tokio::test]
async fn test_dynamic_requests_join_static_discovery() {
    if !require_node("test_dynamic_requests_join_static_discovery") {
        return;
    }
    let temp = TempDir::new().unwrap();
    let root = create_test_project(
        temp.path(),
        &[(
            "index.js",
            "require('static-dep');\nvar name = 'dyn' + 'amic-dep';\nrequire(name);\nrequire('co' + 'lors');",
        )],
    );
    install_fake_package(&root, "static-dep", "1.0.0", &[]);

    let report = Analyzer::new()
        .runtime(Arc::new(TestRuntime::new()))
        .timeout(Duration::from_secs(10))
        .target(root.join("index.js"))
        .analyze()
        .await
        .unwrap();

    assert!(report.discovered.contains("static-dep"));
    assert!(report.discovered.contains("dynamic-dep"));
    assert_eq!(report.versions()["dynamic-dep"], "*");
    assert_eq!(report.versions()["colors"], "*");
}

#[tokio::test]
async fn test_probe_mode_always_executes_static_entry() {
    if !require_node("test_probe_mode_always_executes_static_entry") {
        return;
    }
    let temp = TempDir::new().unwrap();
    let root = create_test_project(
        temp.path(),
        &[("index.js", "module.exports = 1;\nprocess.exit(3);")],
    );

    let err = Analyzer::new()
        .runtime(Arc::new(TestRuntime::new()))
        .probe_mode(ProbeMode::Always)
        .target(root.join("index.js"))
        .analyze()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "WorkerThrownError");

    let report = static_analyzer()
        .target(root.join("index.js"))
        .analyze()
        .await
        .unwrap();
    assert!(report.discovered.is_empty());
}
