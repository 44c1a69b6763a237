//! The content-addressable store (CAS): a flat directory of files named by
//! the 40-hex digest of their framed contents.
//!
//! Grounded on `original_source/core/ca_store.go` (`CAStore`): dedup-on-write,
//! a linear-scan prefix lookup, and read-only permissions once a file lands.

use std::fs;
use std::io::ErrorKind;

use anyhow::{Context, Result, bail, ensure};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::trace;

use crate::error::FleaErrorKind;
use crate::hashing::{ObjectId, ObjectType, unwrap, wrap};

/// A flat directory of framed objects, named by their digest.
pub struct Cas {
    dir: Utf8PathBuf,
}

impl Cas {
    pub fn new(dir: Utf8PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    fn path_of(&self, id: &ObjectId) -> Utf8PathBuf {
        self.dir.join(id.to_string())
    }

    fn store(&self, kind: ObjectType, payload: &[u8]) -> Result<ObjectId> {
        let (id, framed) = wrap(kind, payload);
        let path = self.path_of(&id);
        if path.exists() {
            trace!("{id} already in store, skipping write");
            return Ok(id);
        }
        fs::write(&path, &framed).with_context(|| format!("Couldn't write object {id}"))?;
        let mut perms = fs::metadata(&path)?.permissions();
        perms.set_readonly(true);
        fs::set_permissions(&path, perms)
            .with_context(|| format!("Couldn't mark object {id} read-only"))?;
        trace!("stored {kind} object {id}");
        Ok(id)
    }

    pub fn store_blob(&self, payload: &[u8]) -> Result<ObjectId> {
        self.store(ObjectType::Blob, payload)
    }

    pub fn store_tree(&self, payload: &[u8]) -> Result<ObjectId> {
        self.store(ObjectType::Tree, payload)
    }

    pub fn store_commit(&self, payload: &[u8]) -> Result<ObjectId> {
        self.store(ObjectType::Commit, payload)
    }

    pub fn exists(&self, id: &ObjectId) -> bool {
        self.path_of(id).exists()
    }

    /// Reads and validates the framed object named by `id`.
    pub fn get(&self, id: &ObjectId) -> Result<(ObjectType, Vec<u8>)> {
        let framed = match fs::read(self.path_of(id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => bail!("No object matches {id}"),
            Err(e) => return Err(e).with_context(|| format!("Couldn't read object {id}")),
        };
        unwrap(&framed).with_context(|| format!("Object {id} is corrupted"))
    }

    /// Enumerates the store and returns every digest whose hex rendering
    /// starts with `prefix`. A linear scan; acceptable at the sizes this
    /// system targets (see spec rationale for `match_prefix`).
    pub fn match_prefix(&self, prefix: &str) -> Result<Vec<ObjectId>> {
        ensure!(
            prefix.len() <= ObjectId::LEN * 2,
            "Hash prefix {prefix} is longer than a full digest"
        );
        ensure!(
            prefix.chars().all(|c| c.is_ascii_hexdigit()),
            "{prefix} isn't a valid hex prefix"
        );

        let mut matches = Vec::new();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(matches),
            Err(e) => return Err(e).context("Couldn't list object store"),
        };
        for entry in entries {
            let entry = entry.context("Couldn't read object store entry")?;
            let name = entry.file_name();
            let name = name.to_str().unwrap_or_default();
            if name.starts_with(prefix) {
                matches.push(name.parse()?);
            }
        }
        Ok(matches)
    }

    /// Resolves a hash prefix to exactly one digest, per the `cat-file` /
    /// `checkout` contract: zero matches is `NoMatch`, more than one is
    /// `AmbiguousPrefix`.
    pub fn resolve_prefix(&self, prefix: &str) -> Result<ObjectId> {
        let mut matches = self.match_prefix(prefix)?;
        match matches.len() {
            0 => bail!(FleaErrorKind::NoMatch(prefix.to_string())),
            1 => Ok(matches.pop().unwrap()),
            n => bail!(FleaErrorKind::AmbiguousPrefix(n, prefix.to_string())),
        }
    }
}
