//! `flea ls-files`: pre-order list of files in the current commit's tree,
//! printed relative to the caller's working directory.
//!
//! Grounded on `original_source/builtin/ls_files.go`.

use anyhow::Result;
use camino::Utf8Path;
use clap::Parser;

use crate::commit;
use crate::repo::Repository;
use crate::tree::{TreePath, VisitControl, traverse};

#[derive(Debug, Parser)]
pub struct Args;

pub fn run(repo: &Repository, cwd: &Utf8Path, _args: Args) -> Result<()> {
    let Some(commit) = commit::current_commit(repo)? else {
        return Ok(());
    };
    let tree = commit.tree(repo.cas.clone());

    traverse(&tree, &TreePath::root(), &mut |path, node| {
        if !node.is_dir() {
            println!("{}", repo.tree_path_to_cwd_relative(cwd, path));
        }
        Ok(VisitControl::Continue)
    })?;
    Ok(())
}
