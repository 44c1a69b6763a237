//! `flea checkout <branch|hash-prefix>`.
//!
//! Grounded on `original_source/builtin/checkout.go`: try the argument as a
//! branch name first, otherwise treat it as a commit hash prefix.

use anyhow::Result;
use clap::Parser;

use crate::repo::Repository;
use crate::restore::{self, CheckoutTarget};

#[derive(Debug, Parser)]
pub struct Args {
    target: String,
}

pub fn run(repo: &Repository, args: Args) -> Result<()> {
    let target = if repo.branch_path(&args.target).is_file() {
        CheckoutTarget::Branch(&args.target)
    } else {
        CheckoutTarget::HashPrefix(&args.target)
    };
    restore::checkout(repo, target)?;
    println!("Switched to {}", args.target);
    Ok(())
}
