//! `flea branch`: print the current branch, or note a detached HEAD.
//!
//! Grounded on `original_source/builtin/branch.go`.

use anyhow::Result;
use clap::Parser;

use crate::commit::{self, BranchStatus};
use crate::repo::Repository;

#[derive(Debug, Parser)]
pub struct Args;

pub fn run(repo: &Repository, _args: Args) -> Result<()> {
    match commit::current_branch(repo)? {
        BranchStatus::On(name) => println!("{name}"),
        BranchStatus::Detached => println!("<not on a branch (detached HEAD)>"),
        BranchStatus::NoHead => println!("<no commits yet>"),
    }
    Ok(())
}
