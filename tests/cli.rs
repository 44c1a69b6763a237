mod common;

use std::fs;

use predicates::prelude::*;
use tempfile::tempdir;

use common::{files_in, flea};

#[test]
fn init_creates_meta_dir() {
    let dir = tempdir().unwrap();
    flea(dir.path())
        .unwrap()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized empty flea repository"));

    assert!(dir.path().join(".flea").is_dir());
    assert!(dir.path().join(".flea/index").is_file());
}

#[test]
fn add_commit_status_roundtrip() {
    let dir = tempdir().unwrap();
    flea(dir.path()).unwrap().arg("init").assert().success();

    fs::write(dir.path().join("hello.txt"), b"hello world\n").unwrap();

    flea(dir.path())
        .unwrap()
        .args(["add", "hello.txt"])
        .assert()
        .success();

    // Staged, not yet committed.
    flea(dir.path())
        .unwrap()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("new file:   /hello.txt"));

    flea(dir.path())
        .unwrap()
        .args(["commit", "-m", "first commit"])
        .assert()
        .success();

    // Nothing left to report once committed.
    flea(dir.path())
        .unwrap()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to commit"));

    flea(dir.path())
        .unwrap()
        .arg("log")
        .assert()
        .success()
        .stdout(predicate::str::contains("first commit"));

    flea(dir.path())
        .unwrap()
        .arg("ls-files")
        .assert()
        .success()
        .stdout(predicate::str::contains("hello.txt"));

    flea(dir.path())
        .unwrap()
        .arg("branch")
        .assert()
        .success()
        .stdout(predicate::str::contains("master"));
}

#[test]
fn second_empty_commit_is_rejected() {
    let dir = tempdir().unwrap();
    flea(dir.path()).unwrap().arg("init").assert().success();

    fs::write(dir.path().join("a.txt"), b"a\n").unwrap();
    flea(dir.path()).unwrap().args(["add", "a.txt"]).assert().success();
    flea(dir.path())
        .unwrap()
        .args(["commit", "-m", "add a"])
        .assert()
        .success();

    // No staged changes since: commit should fail.
    flea(dir.path())
        .unwrap()
        .args(["commit", "-m", "nothing changed"])
        .assert()
        .failure();
}

#[test]
fn checkout_restores_working_tree() {
    let dir = tempdir().unwrap();
    flea(dir.path()).unwrap().arg("init").assert().success();

    fs::write(dir.path().join("a.txt"), b"first\n").unwrap();
    flea(dir.path()).unwrap().args(["add", "a.txt"]).assert().success();
    flea(dir.path())
        .unwrap()
        .args(["commit", "-m", "add a"])
        .assert()
        .success();

    let first_commit = fs::read_to_string(dir.path().join(".flea/refs/heads/master")).unwrap();

    fs::write(dir.path().join("a.txt"), b"changed\n").unwrap();
    flea(dir.path()).unwrap().args(["add", "a.txt"]).assert().success();
    flea(dir.path())
        .unwrap()
        .args(["commit", "-m", "change a"])
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(dir.path().join("a.txt")).unwrap(),
        "changed\n"
    );

    flea(dir.path())
        .unwrap()
        .args(["checkout", first_commit.trim()])
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(dir.path().join("a.txt")).unwrap(),
        "first\n"
    );
}

#[test]
fn rm_removes_a_whole_directory_from_the_working_tree() {
    let dir = tempdir().unwrap();
    flea(dir.path()).unwrap().arg("init").assert().success();

    fs::create_dir_all(dir.path().join("docs")).unwrap();
    fs::write(dir.path().join("docs/a.txt"), b"a\n").unwrap();
    fs::write(dir.path().join("docs/b.txt"), b"b\n").unwrap();

    flea(dir.path()).unwrap().args(["add", "docs"]).assert().success();
    assert_eq!(files_in(dir.path()).filter(|p| !p.starts_with(dir.path().join(".flea"))).count(), 2);

    flea(dir.path())
        .unwrap()
        .args(["rm", "docs"])
        .assert()
        .success();

    assert!(!dir.path().join("docs").exists());
    assert_eq!(
        files_in(dir.path())
            .filter(|p| !p.starts_with(dir.path().join(".flea")))
            .count(),
        0
    );
}

#[test]
fn hash_object_and_cat_file_round_trip() {
    let dir = tempdir().unwrap();
    flea(dir.path()).unwrap().arg("init").assert().success();

    let output = flea(dir.path())
        .unwrap()
        .arg("hash-object")
        .write_stdin("payload\n")
        .output()
        .unwrap();
    assert!(output.status.success());
    let digest = String::from_utf8(output.stdout).unwrap().trim().to_string();

    flea(dir.path())
        .unwrap()
        .args(["cat-file", &digest])
        .assert()
        .success()
        .stdout(predicate::eq("payload\n"));
}
