//! `flea commit [-m msg]`: run the commit pipeline (§4.9).
//!
//! Grounded on `original_source/builtin/commit.go`.

use anyhow::Result;
use clap::Parser;

use crate::commit;
use crate::repo::Repository;

#[derive(Debug, Parser)]
pub struct Args {
    /// Commit message
    #[clap(short, long, default_value = "")]
    message: String,
}

pub fn run(repo: &Repository, author: String, args: Args) -> Result<()> {
    let digest = commit::commit(repo, author, args.message)?;
    println!("{digest}");
    Ok(())
}
