//! The shared `Tree`/`Node` abstraction and the structural algorithms built
//! on top of it (traversal, directory-payload framing).
//!
//! Grounded on `original_source/core/tree.go`: `Tree`/`Node` interfaces,
//! `VisitFn`, `SkipDirNode`, and `GetDirString`'s sorted-children encoding.
//! Three backings ([`crate::fs_tree`], [`crate::index_tree`],
//! [`crate::ca_tree`]) implement [`Tree`]/[`Node`]; this module owns the one
//! traversal algorithm all three share.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{Context, Result, bail, ensure};

use crate::hashing::{ObjectId, ObjectType, wrap};

/// A Unix-style absolute tree path (`/`, `/src`, `/src/main.rs`, ...),
/// independent of the host filesystem's separator.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TreePath(String);

impl TreePath {
    pub fn root() -> Self {
        TreePath("/".to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits into named components, root excluded.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    pub fn name(&self) -> Option<&str> {
        self.components().next_back()
    }

    pub fn join(&self, child: &str) -> Self {
        ensure_valid_name(child).expect("invalid tree path component");
        if self.is_root() {
            TreePath(format!("/{child}"))
        } else {
            TreePath(format!("{}/{child}", self.0))
        }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let mut comps: Vec<&str> = self.components().collect();
        comps.pop();
        if comps.is_empty() {
            Some(TreePath::root())
        } else {
            Some(TreePath(format!("/{}", comps.join("/"))))
        }
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn ensure_valid_name(name: &str) -> Result<()> {
    ensure!(
        !name.is_empty() && !name.contains('/') && !name.contains('\0'),
        "Invalid path component: {name:?}"
    );
    Ok(())
}

impl std::str::FromStr for TreePath {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        ensure!(s.starts_with('/'), "Tree path {s:?} must be absolute");
        for comp in s.split('/').filter(|s| !s.is_empty()) {
            ensure_valid_name(comp)?;
        }
        if s == "/" {
            Ok(TreePath::root())
        } else {
            let trimmed = s.trim_end_matches('/');
            Ok(TreePath(trimmed.to_string()))
        }
    }
}

/// A node in a [`Tree`]: either a file (with content) or a directory (with
/// children). Shared by `FsTree`, `IndexTree`, and `CaTree`.
pub trait Node {
    /// SHA-1 of the framed blob (files) or framed sorted-children payload
    /// (directories).
    fn hash(&self) -> ObjectId;

    fn is_dir(&self) -> bool;

    /// One level of children, keyed by name. Empty for files.
    fn children(&self) -> Result<BTreeMap<String, Box<dyn Node>>>;

    /// File content. Fails for directories.
    fn data(&self) -> Result<Vec<u8>>;
}

/// Common shape implemented by `FsTree`, `IndexTree`, `CaTree`.
pub trait Tree {
    fn get(&self, path: &TreePath) -> Result<Box<dyn Node>>;

    fn root_hash(&self) -> Result<ObjectId> {
        Ok(self.get(&TreePath::root())?.hash())
    }
}

/// Returned from a traversal visitor. `SkipDir` is a sentinel, not an error:
/// it tells [`traverse`] not to descend into the directory just visited.
pub enum VisitControl {
    Continue,
    SkipDir,
}

/// Pre-order DFS starting at `root`. `visit` runs on `root` first, then each
/// child recursively. Child ordering is unspecified; callers must not rely
/// on it (the structural hash is what downstream code should compare).
pub fn traverse(
    tree: &dyn Tree,
    root: &TreePath,
    visit: &mut dyn FnMut(&TreePath, &dyn Node) -> Result<VisitControl>,
) -> Result<()> {
    let node = tree.get(root)?;
    traverse_node(root, node.as_ref(), visit)
}

fn traverse_node(
    path: &TreePath,
    node: &dyn Node,
    visit: &mut dyn FnMut(&TreePath, &dyn Node) -> Result<VisitControl>,
) -> Result<()> {
    if let VisitControl::SkipDir = visit(path, node)? {
        return Ok(());
    }
    if node.is_dir() {
        for (name, child) in node.children()? {
            let child_path = path.join(&name);
            traverse_node(&child_path, child.as_ref(), visit)?;
        }
    }
    Ok(())
}

/// The empty-directory digest, `SHA1("tree 0\0")`. Computed once; see
/// [`crate::store`] for where directory payloads actually land.
pub fn empty_dir_hash() -> ObjectId {
    wrap(ObjectType::Tree, b"").0
}

/// Serializes a directory's children into the canonical tree payload:
/// `<child-type> <40-hex> <name>\n` lines sorted ascending by name.
///
/// Grounded on `GetDirString` in `original_source/core/tree.go`.
pub fn encode_dir_payload(children: &BTreeMap<String, (bool, ObjectId)>) -> String {
    let mut out = String::new();
    for (name, (is_dir, hash)) in children {
        let kind = if *is_dir { "tree" } else { "blob" };
        out.push_str(kind);
        out.push(' ');
        out.push_str(&hash.to_string());
        out.push(' ');
        out.push_str(name);
        out.push('\n');
    }
    out
}

/// Parses a directory payload (as produced by [`encode_dir_payload`]) back
/// into `(is_dir, hash)` pairs keyed by name. A malformed row is an
/// invariant violation: store corruption, not a user error.
pub fn parse_dir_payload(payload: &[u8]) -> Result<BTreeMap<String, (bool, ObjectId)>> {
    let text = std::str::from_utf8(payload).context("Tree payload isn't UTF-8")?;
    let mut children = BTreeMap::new();
    for line in text.lines() {
        let mut parts = line.splitn(3, ' ');
        let kind = parts.next().context("Malformed tree payload row")?;
        let hex = parts.next().context("Malformed tree payload row")?;
        let name = parts.next().context("Malformed tree payload row")?;
        let is_dir = match kind {
            "tree" => true,
            "blob" => false,
            other => bail!("Malformed tree payload row: unknown type {other}"),
        };
        let hash: ObjectId = hex.parse().context("Malformed tree payload row")?;
        children.insert(name.to_string(), (is_dir, hash));
    }
    Ok(children)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_dir_hash_matches_spec_constant() {
        assert_eq!(
            empty_dir_hash().to_string(),
            "4b825dc642cb6eb9a060e54bf8d69288fbee4904"
        );
    }

    #[test]
    /// P3: order of insertion into the BTreeMap doesn't matter, only the
    /// (name, hash, type) triples do - the map itself already sorts by name.
    fn dir_payload_sorted_by_name() {
        let mut children = BTreeMap::new();
        children.insert("b".to_string(), (false, ObjectId::of(b"b")));
        children.insert("a".to_string(), (true, ObjectId::of(b"a")));
        let payload = encode_dir_payload(&children);
        let lines: Vec<&str> = payload.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" a"));
        assert!(lines[1].ends_with(" b"));
    }

    #[test]
    fn dir_payload_round_trips() -> Result<()> {
        let mut children = BTreeMap::new();
        children.insert("file".to_string(), (false, ObjectId::of(b"file")));
        children.insert("dir".to_string(), (true, ObjectId::of(b"dir")));
        let payload = encode_dir_payload(&children);
        let parsed = parse_dir_payload(payload.as_bytes())?;
        assert_eq!(parsed, children);
        Ok(())
    }

    #[test]
    fn tree_path_join_and_parent() {
        let root = TreePath::root();
        let child = root.join("src");
        assert_eq!(child.as_str(), "/src");
        let grandchild = child.join("main.rs");
        assert_eq!(grandchild.as_str(), "/src/main.rs");
        assert_eq!(grandchild.parent().unwrap().as_str(), "/src");
        assert_eq!(child.parent().unwrap().as_str(), "/");
        assert!(root.parent().is_none());
    }

    #[test]
    fn tree_path_rejects_relative() {
        assert!("src/main.rs".parse::<TreePath>().is_err());
    }
}
