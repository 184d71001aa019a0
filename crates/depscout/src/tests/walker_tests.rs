//! Static walk tests: traversal, recording rules, error collection.

use super::test_helpers::*;
use crate::test_utils::{create_test_project, install_fake_package};
use tempfile::TempDir;

#[tokio::test]
async fn test_cycle_visits_each_module_once() {
    let temp = TempDir::new().unwrap();
    let root = create_test_project(
        temp.path(),
        &[
            ("a.js", "require('./b'); require('left-pad');"),
            ("b.js", "require('./a'); require('./b.js');"),
        ],
    );

    let output = walker().walk(&root.join("a.js")).await.unwrap();

    assert_eq!(output.visited.len(), 2);
    assert!(output.visited.contains(&canonical(root.join("a.js"))));
    assert!(output.visited.contains(&canonical(root.join("b.js"))));
    assert!(output.specifiers.contains("left-pad"));
}

#[tokio::test]
async fn test_records_packages_natives_and_unresolved_but_not_local_files() {
    let temp = TempDir::new().unwrap();
    let root = create_test_project(
        temp.path(),
        &[
            (
                "index.js",
                r#"
                var fs = require('fs');
                var helper = require('./lib/helper');
                var vows = require('vows');
                var missing = require('not-installed/sub');
                "#,
            ),
            ("lib/helper.js", "module.exports = require('../config.json');"),
            ("config.json", "{}"),
        ],
    );
    install_fake_package(&root, "vows", "0.5.0", &[]);

    let output = walker().walk(&root.join("index.js")).await.unwrap();

    let specifiers: Vec<&str> = output.specifiers.iter().map(String::as_str).collect();
    assert_eq!(specifiers, vec!["fs", "not-installed/sub", "vows"]);
    assert_eq!(output.visited.len(), 3);
    assert!(output.probes.is_empty());
}

#[tokio::test]
async fn test_does_not_traverse_into_installed_packages() {
    let temp = TempDir::new().unwrap();
    let root = create_test_project(temp.path(), &[("index.js", "require('outer');")]);
    install_fake_package(&root, "outer", "1.0.0", &[("inner", "*")]);
    create_test_project(
        &root,
        &[("node_modules/outer/index.js", "module.exports = require('inner');")],
    );

    let output = walker().walk(&root.join("index.js")).await.unwrap();

    assert!(output.specifiers.contains("outer"));
    assert!(!output.specifiers.contains("inner"));
    assert_eq!(output.visited.len(), 1);
}

#[tokio::test]
async fn test_one_probe_per_dynamic_module() {
    let temp = TempDir::new().unwrap();
    let root = create_test_project(
        temp.path(),
        &[
            (
                "index.js",
                "var a = 'x'; require(a); require('./plugins/' + a); require('./static');",
            ),
            ("static.js", "module.exports = 1;"),
        ],
    );

    let output = walker().walk(&root.join("index.js")).await.unwrap();

    assert_eq!(output.probes.len(), 1);
    assert_eq!(output.probes[0].module, canonical(root.join("index.js")));
    assert_eq!(output.probes[0].dynamic_expressions, 2);
}

#[tokio::test]
async fn test_parse_error_is_reported_with_its_path() {
    let temp = TempDir::new().unwrap();
    let root = create_test_project(
        temp.path(),
        &[
            ("index.js", "require('./broken'); require('./fine');"),
            ("broken.js", "var = ;"),
            ("fine.js", "require('express');"),
        ],
    );

    let err = walker().walk(&root.join("index.js")).await.unwrap_err();

    assert_eq!(err.kind(), "ModuleParseError");
    assert!(err.to_string().contains("broken.js"), "got: {err}");
}

#[tokio::test]
async fn test_unreadable_entry() {
    let temp = TempDir::new().unwrap();
    let err = walker()
        .walk(&temp.path().join("missing.js"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "ModuleParseError");
}

#[tokio::test]
async fn test_strict_resolution_rejects_missing_relative_files() {
    let temp = TempDir::new().unwrap();
    let root = create_test_project(
        temp.path(),
        &[("index.js", "require('./gone'); require('not-installed');")],
    );

    let lenient = walker().walk(&root.join("index.js")).await.unwrap();
    assert!(lenient.specifiers.contains("./gone"));

    let err = walker()
        .strict_resolution(true)
        .walk(&root.join("index.js"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "ResolutionFailure");
    assert!(err.to_string().contains("./gone"));
}

#[tokio::test]
async fn test_each_walk_starts_fresh() {
    let temp = TempDir::new().unwrap();
    let root = create_test_project(
        temp.path(),
        &[("a.js", "require('./shared');"), ("shared.js", "require('dep');")],
    );
    let walker = walker();

    let first = walker.walk(&root.join("a.js")).await.unwrap();
    let second = walker.walk(&root.join("a.js")).await.unwrap();

    assert_eq!(first.visited, second.visited);
    assert!(second.specifiers.contains("dep"));
}
