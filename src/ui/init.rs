use anyhow::Result;
use camino::Utf8Path;

use crate::repo;

pub fn run(cwd: &Utf8Path, meta_dir: &str) -> Result<()> {
    repo::init(cwd, meta_dir)?;
    println!("Initialized empty flea repository in {}", cwd.join(meta_dir));
    Ok(())
}
