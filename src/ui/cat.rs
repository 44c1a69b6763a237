use std::io::{self, Write};

use anyhow::Result;
use clap::Parser;

use crate::repo::Repository;

/// Print an object's type or raw payload, resolved by hash prefix
#[derive(Debug, Parser)]
pub struct Args {
    /// Print the object's type instead of its payload
    #[clap(short = 't')]
    print_type: bool,

    /// A hash, or an unambiguous prefix of one
    hash_prefix: String,
}

pub fn run(repo: &Repository, args: Args) -> Result<()> {
    let id = repo.cas.resolve_prefix(&args.hash_prefix)?;
    let (kind, payload) = repo.cas.get(&id)?;
    if args.print_type {
        println!("{kind}");
    } else {
        io::stdout().write_all(&payload)?;
    }
    Ok(())
}
