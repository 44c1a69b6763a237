//! Object framing and the [`ObjectId`] digest everything else is keyed by.
//!
//! An object is framed as `<type> <decimal-length>\0<payload>`, and its ID
//! is the SHA-1 of that entire framed stream — header included. This is the
//! one primitive every other layer (the store, the three tree backings, and
//! commits) builds on.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail, ensure};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// The fixed-width digest used to identify every object in the store.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Default)]
pub struct ObjectId([u8; 20]);

impl ObjectId {
    pub const LEN: usize = 20;

    /// Hashes a framed (or otherwise already-prepared) byte stream.
    pub fn of(bytes: &[u8]) -> Self {
        let digest = Sha1::digest(bytes);
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest);
        ObjectId(out)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Does `self`'s hex rendering start with `prefix` (itself hex)?
    pub fn starts_with_hex(&self, prefix: &str) -> bool {
        self.to_string().starts_with(prefix)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({self})")
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for ObjectId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        ensure!(
            s.len() == 40,
            "Expected a 40-character hex digest, got {}",
            s.len()
        );
        let bytes = hex::decode(s).with_context(|| format!("{s} isn't valid hex"))?;
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(ObjectId(out))
    }
}

impl Serialize for ObjectId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> Result<ObjectId, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ObjectId::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// The three kinds of object the store understands.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ObjectType {
    Blob,
    Tree,
    Commit,
}

impl ObjectType {
    fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Blob => "blob",
            ObjectType::Tree => "tree",
            ObjectType::Commit => "commit",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "blob" => Ok(ObjectType::Blob),
            "tree" => Ok(ObjectType::Tree),
            "commit" => Ok(ObjectType::Commit),
            other => bail!("Invalid object type: {other}"),
        }
    }
}

/// Wraps `payload` in its type header and hashes the whole framed stream.
///
/// Pure function, no I/O — storing the result is the store's job.
pub fn wrap(kind: ObjectType, payload: &[u8]) -> (ObjectId, Vec<u8>) {
    let mut framed = Vec::with_capacity(payload.len() + 16);
    framed.extend_from_slice(kind.as_str().as_bytes());
    framed.push(b' ');
    framed.extend_from_slice(payload.len().to_string().as_bytes());
    framed.push(0);
    framed.extend_from_slice(payload);
    let id = ObjectId::of(&framed);
    (id, framed)
}

/// Reverses [`wrap`]: splits a framed stream back into its type and payload,
/// verifying the declared length matches.
pub fn unwrap(framed: &[u8]) -> Result<(ObjectType, Vec<u8>)> {
    let nul = framed
        .iter()
        .position(|&b| b == 0)
        .context("Object has no header terminator")?;
    let header = std::str::from_utf8(&framed[..nul]).context("Object header isn't UTF-8")?;
    let mut parts = header.splitn(2, ' ');
    let kind: ObjectType = parts
        .next()
        .context("Object header missing type")?
        .parse()?;
    let len: usize = parts
        .next()
        .context("Object header missing length")?
        .parse()
        .context("Object header length isn't a number")?;
    let payload = &framed[nul + 1..];
    ensure!(
        payload.len() == len,
        "Object's declared length ({len}) doesn't match its actual length ({})",
        payload.len()
    );
    Ok((kind, payload.to_vec()))
}
