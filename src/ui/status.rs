//! `flea status`: staged, unstaged, and untracked sets.
//!
//! Grounded on `original_source/builtin/status.go`'s `CompareTrees(idxTree,
//! fsTree)`, extended per the spec to also diff the current commit against
//! the index for the staged set (the original only surfaced two of the
//! three categories).

use std::collections::BTreeMap;

use anyhow::{Result, bail, ensure};
use clap::Parser;

use crate::commit;
use crate::diff::diff;
use crate::hashing::ObjectId;
use crate::repo::Repository;
use crate::tree::{Node, Tree, TreePath, empty_dir_hash};

#[derive(Debug, Parser)]
pub struct Args;

struct EmptyTree;

impl Tree for EmptyTree {
    fn get(&self, path: &TreePath) -> Result<Box<dyn Node>> {
        ensure!(path.is_root(), "{path} doesn't exist");
        Ok(Box::new(EmptyNode))
    }
}

struct EmptyNode;

impl Node for EmptyNode {
    fn hash(&self) -> ObjectId {
        empty_dir_hash()
    }

    fn is_dir(&self) -> bool {
        true
    }

    fn children(&self) -> Result<BTreeMap<String, Box<dyn Node>>> {
        Ok(BTreeMap::new())
    }

    fn data(&self) -> Result<Vec<u8>> {
        bail!("the empty tree has no files")
    }
}

pub fn run(repo: &Repository, _args: Args) -> Result<()> {
    let index = repo.open_index()?;
    let fs_tree = repo.fs_tree();

    let staged = match commit::current_commit(repo)? {
        Some(c) => diff(&c.tree(repo.cas.clone()), &index)?,
        None => diff(&EmptyTree, &index)?,
    };
    let unstaged = diff(&index, &fs_tree)?;

    let mut printed = false;
    if !staged.missing_in_a.is_empty() || !staged.missing_in_b.is_empty() || !staged.modified.is_empty() {
        println!("Changes staged for commit:\n");
        for path in &staged.missing_in_a {
            println!("\tnew file:   {path}");
        }
        for path in &staged.missing_in_b {
            println!("\tdeleted:    {path}");
        }
        for path in &staged.modified {
            println!("\tmodified:   {path}");
        }
        println!();
        printed = true;
    }

    if !unstaged.missing_in_b.is_empty() || !unstaged.modified.is_empty() {
        println!("Changes not staged for commit:\n");
        for path in &unstaged.missing_in_b {
            println!("\tdeleted:    {path}");
        }
        for path in &unstaged.modified {
            println!("\tmodified:   {path}");
        }
        println!();
        printed = true;
    }

    if !unstaged.missing_in_a.is_empty() {
        println!("Untracked files:\n");
        for path in &unstaged.missing_in_a {
            println!("\t{path}");
        }
        println!();
        printed = true;
    }

    if !printed {
        println!("nothing to commit, working tree clean");
    }
    Ok(())
}
