//! Conformance tests that run the YAML fixtures against deepmatch
//!
//! Run with: cargo test -p deepmatch-test --test conformance --features deepmatch-test/fixtures

#![cfg(feature = "fixtures")]

use deepmatch_test::fixture::Fixture;
use std::fs;
use std::path::{Path, PathBuf};

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Load and run every fixture document in one file
fn run_fixture_file(name: &str) {
    let path = fixtures_dir().join(name);
    let yaml = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()));

    let fixtures = Fixture::from_yaml_multi(&yaml).unwrap_or_else(|e| {
        panic!("Failed to parse {}: {e}", path.display());
    });
    assert!(!fixtures.is_empty(), "{} holds no fixtures", path.display());

    for fixture in fixtures {
        println!("  Running: {}", fixture.name);
        fixture.run_and_assert();
    }
}

#[test]
fn test_literals() {
    run_fixture_file("01_literals.yaml");
}

#[test]
fn test_containers() {
    run_fixture_file("02_containers.yaml");
}

#[test]
fn test_operators() {
    run_fixture_file("03_operators.yaml");
}

#[test]
fn test_reporting() {
    run_fixture_file("04_reporting.yaml");
}

#[test]
fn test_every_fixture_file_is_covered() {
    let mut names: Vec<String> = fs::read_dir(fixtures_dir())
        .expect("read dir")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".yaml"))
        .collect();
    names.sort();
    assert_eq!(
        names,
        ["01_literals.yaml", "02_containers.yaml", "03_operators.yaml", "04_reporting.yaml"]
    );
}
