#![allow(dead_code)]

use std::path::{Path, PathBuf};

use anyhow::Result;
use assert_cmd::Command;
use walkdir::WalkDir;

/// A `flea` invocation rooted at `dir` via `-C`, logging at max verbosity
/// so test failures come with something to read.
pub fn flea(dir: &Path) -> Result<Command> {
    let mut cmd = Command::cargo_bin("flea")?;
    cmd.arg("-C").arg(dir).arg("-vvv");
    Ok(cmd)
}

/// Every plain file under `p`, recursively - used to assert a `checkout`
/// or `rm` left the working tree with exactly the files it should have.
pub fn files_in(p: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(p)
        .into_iter()
        .map(|e| e.expect("couldn't walk dir"))
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
}
