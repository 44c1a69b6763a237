//! `flea hash-object`: read stdin, store it as a blob, print its digest.
//!
//! Grounded on `original_source/builtin/hash_object.go`.

use std::io::{self, Read};

use anyhow::{Context, Result};
use clap::Parser;

use crate::repo::Repository;

#[derive(Debug, Parser)]
pub struct Args;

pub fn run(repo: &Repository, _args: Args) -> Result<()> {
    let mut data = Vec::new();
    io::stdin()
        .read_to_end(&mut data)
        .context("Couldn't read stdin")?;
    let id = repo.cas.store_blob(&data)?;
    println!("{id}");
    Ok(())
}
