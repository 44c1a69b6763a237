//! `flea rm [--cached] <path>`: unstage a path, optionally also deleting it
//! from the working tree.
//!
//! Grounded on `original_source/builtin/rm.go`.

use std::fs;

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;

use crate::repo::Repository;

#[derive(Debug, Parser)]
pub struct Args {
    /// Remove the path from the index only; leave the working tree alone
    #[clap(long)]
    cached: bool,

    path: Utf8PathBuf,
}

pub fn run(repo: &Repository, cwd: &Utf8Path, args: Args) -> Result<()> {
    let tree_path = repo.resolve_arg_path(cwd, &args.path)?;
    let index = repo.open_index()?;
    index.delete(&tree_path)?;

    if !args.cached {
        let fs_path = repo.fs_path_of(&tree_path);
        let result = match fs::metadata(&fs_path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&fs_path),
            Ok(_) => fs::remove_file(&fs_path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            return Err(e.into());
        }
    }
    Ok(())
}
