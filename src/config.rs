use std::{env, fs, io};

use anyhow::{Context, Result, anyhow};
use camino::Utf8PathBuf;
use serde_derive::Deserialize;

#[inline]
fn default_meta_dir() -> String {
    ".flea".to_string()
}

fn default_author() -> String {
    env::var("FLEA_AUTHOR").unwrap_or_else(|_| whoami::realname())
}

#[derive(Debug, Deserialize)]
pub struct Configuration {
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default = "default_meta_dir")]
    pub meta_dir: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            author: default_author(),
            meta_dir: default_meta_dir(),
        }
    }
}

pub fn load() -> Result<Configuration> {
    let mut confpath: Utf8PathBuf = home::home_dir()
        .ok_or_else(|| anyhow!("Can't find home directory"))?
        .try_into()
        .context("Home directory isn't UTF-8")?;
    confpath.extend([".config", "flea.toml"]);
    let s = match fs::read_to_string(&confpath) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Configuration::default()),
        found => found,
    }
    .with_context(|| format!("Couldn't open {confpath}"))?;
    let conf = toml::from_str(&s).with_context(|| format!("Couldn't parse {confpath}"))?;
    Ok(conf)
}
