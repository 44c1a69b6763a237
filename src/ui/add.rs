//! `flea add`: stage a file or every non-hidden file under a directory.
//!
//! Grounded on `original_source/builtin/add.go`: compute each file's blob,
//! store it, then `mkfile_all` it into the index. Hidden directories are
//! skipped entirely; hidden files are simply not staged. A directory with
//! nothing left to stage once hidden entries are excluded is an error
//! (`add.go`'s `ErrEmptyDir`), not a silent no-op.

use anyhow::{Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;

use crate::repo::Repository;
use crate::tree::{Node, Tree, TreePath, VisitControl, traverse};

/// Stage a file, or every non-hidden file under a directory
#[derive(Debug, Parser)]
pub struct Args {
    path: Utf8PathBuf,
}

pub fn run(repo: &Repository, cwd: &Utf8Path, args: Args) -> Result<()> {
    let tree_path = repo.resolve_arg_path(cwd, &args.path)?;
    let fs_tree = repo.fs_tree();
    let index = repo.open_index()?;

    let node = fs_tree.get(&tree_path)?;
    if !node.is_dir() {
        return stage_file(repo, &fs_tree, &index, &tree_path);
    }

    let mut files = Vec::new();
    traverse(&fs_tree, &tree_path, &mut |path, node| {
        if is_hidden(path) {
            return Ok(if node.is_dir() {
                VisitControl::SkipDir
            } else {
                VisitControl::Continue
            });
        }
        if !node.is_dir() {
            files.push(path.clone());
        }
        Ok(VisitControl::Continue)
    })?;

    if files.is_empty() {
        bail!("{tree_path} has nothing to stage (empty, or only hidden entries)");
    }

    for path in files {
        stage_file(repo, &fs_tree, &index, &path)?;
    }
    Ok(())
}

fn is_hidden(path: &TreePath) -> bool {
    path.name().is_some_and(|name| name.starts_with('.'))
}

fn stage_file(
    repo: &Repository,
    fs_tree: &crate::fs_tree::FsTree,
    index: &crate::index_tree::IndexTree,
    path: &TreePath,
) -> Result<()> {
    let node = fs_tree.get(path)?;
    let data = node.data()?;
    let hash = repo.cas.store_blob(&data)?;
    index.mkfile_all(path, hash)
}
