//! `flea log`: walk the current commit's `prev` chain, printing each.
//!
//! Grounded on `original_source/builtin/log.go`.

use anyhow::Result;
use clap::Parser;

use crate::commit;
use crate::repo::Repository;

#[derive(Debug, Parser)]
pub struct Args;

pub fn run(repo: &Repository, _args: Args) -> Result<()> {
    let mut current = commit::current_commit(repo)?;
    while let Some(c) = current {
        println!("commit {}", c.hash());
        println!("Author: {}", c.author());
        println!("\n\t{}\n", c.comment());
        current = c.prev(&repo.cas)?;
    }
    Ok(())
}
