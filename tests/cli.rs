//! End-to-end tests of the `mandel` binary.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn renders_a_small_png() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("tiny.png");
    Command::cargo_bin("mandel")
        .unwrap()
        .args(&[
            "--output",
            out.to_str().unwrap(),
            "--size",
            "16x16",
            "--iterations",
            "200",
        ])
        .assert()
        .success();
    let written = std::fs::metadata(&out).unwrap();
    assert!(written.len() > 0);
}

#[test]
fn histogram_mode_renders_too() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("hist.png");
    Command::cargo_bin("mandel")
        .unwrap()
        .args(&[
            "--output",
            out.to_str().unwrap(),
            "--size",
            "12x8",
            "--iterations",
            "150",
            "--histogram",
        ])
        .assert()
        .success();
    assert!(out.exists());
}

#[test]
fn rejects_a_malformed_size() {
    Command::cargo_bin("mandel")
        .unwrap()
        .args(&["--output", "ignored.png", "--size", "banana"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not parse image size"));
}

#[test]
fn rejects_an_out_of_range_iteration_count() {
    Command::cargo_bin("mandel")
        .unwrap()
        .args(&["--output", "ignored.png", "--iterations", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Iteration count"));
}

#[test]
fn output_is_required() {
    Command::cargo_bin("mandel")
        .unwrap()
        .args(&["--size", "8x8"])
        .assert()
        .failure();
}
