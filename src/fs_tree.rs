//! `FsTree`: a read-only [`Tree`] view over the working directory.
//!
//! Grounded on `original_source/core/fs_tree.go` (`FsTree`/`FsTreeNode`):
//! a path-keyed cache on the tree itself (so repeated `get()` calls on the
//! same path reuse prior work) plus per-node memoized hash/children.

use std::collections::BTreeMap;
use std::fs;
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use std::cell::RefCell;

use crate::hashing::{ObjectId, ObjectType, wrap};
use crate::tree::{Node, Tree, TreePath, encode_dir_payload};

struct Shared {
    repo_root: Utf8PathBuf,
    meta_dir: String,
    cache: RefCell<BTreeMap<TreePath, Rc<NodeState>>>,
}

struct NodeState {
    fs_path: Utf8PathBuf,
    is_dir: bool,
    hash: RefCell<Option<ObjectId>>,
    child_names: RefCell<Option<Vec<String>>>,
}

/// A read-only view of `repo_root`, rooted at it, skipping the repository
/// metadata directory. Hidden (dotfile) entries are NOT excluded here -
/// that's the `add` pipeline's job (spec: FsTree itself is unopinionated).
pub struct FsTree {
    shared: Rc<Shared>,
}

impl FsTree {
    pub fn new(repo_root: Utf8PathBuf, meta_dir: String) -> Self {
        Self {
            shared: Rc::new(Shared {
                repo_root,
                meta_dir,
                cache: RefCell::new(BTreeMap::new()),
            }),
        }
    }

    fn fs_path_for(&self, path: &TreePath) -> Utf8PathBuf {
        let mut fs_path = self.shared.repo_root.clone();
        for comp in path.components() {
            fs_path.push(comp);
        }
        fs_path
    }
}

impl Tree for FsTree {
    fn get(&self, path: &TreePath) -> Result<Box<dyn Node>> {
        if let Some(state) = self.shared.cache.borrow().get(path) {
            return Ok(Box::new(FsNode {
                shared: self.shared.clone(),
                state: state.clone(),
            }));
        }

        let fs_path = self.fs_path_for(path);
        let meta = fs::symlink_metadata(&fs_path)
            .with_context(|| format!("Path {path} doesn't exist in the working tree"))?;
        let state = Rc::new(NodeState {
            fs_path,
            is_dir: meta.is_dir(),
            hash: RefCell::new(None),
            child_names: RefCell::new(None),
        });
        self.shared
            .cache
            .borrow_mut()
            .insert(path.clone(), state.clone());
        Ok(Box::new(FsNode {
            shared: self.shared.clone(),
            state,
        }))
    }
}

struct FsNode {
    shared: Rc<Shared>,
    state: Rc<NodeState>,
}

impl FsNode {
    fn child_names(&self) -> Result<Vec<String>> {
        if let Some(names) = self.state.child_names.borrow().as_ref() {
            return Ok(names.clone());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.state.fs_path)
            .with_context(|| format!("Couldn't list {}", self.state.fs_path))?
        {
            let entry = entry?;
            let name = entry.file_name();
            let name = name
                .to_str()
                .with_context(|| format!("Non-UTF-8 entry under {}", self.state.fs_path))?
                .to_string();
            if name == self.shared.meta_dir {
                continue;
            }
            names.push(name);
        }
        names.sort();
        *self.state.child_names.borrow_mut() = Some(names.clone());
        Ok(names)
    }
}

impl Node for FsNode {
    fn hash(&self) -> ObjectId {
        if let Some(h) = *self.state.hash.borrow() {
            return h;
        }
        let h = if self.state.is_dir {
            let children = self
                .children()
                .expect("Failed to list directory while hashing it");
            let mut rows = BTreeMap::new();
            for (name, child) in &children {
                rows.insert(name.clone(), (child.is_dir(), child.hash()));
            }
            wrap(ObjectType::Tree, encode_dir_payload(&rows).as_bytes()).0
        } else {
            let data = fs::read(&self.state.fs_path)
                .unwrap_or_else(|e| panic!("Couldn't read {}: {e}", self.state.fs_path));
            wrap(ObjectType::Blob, &data).0
        };
        *self.state.hash.borrow_mut() = Some(h);
        h
    }

    fn is_dir(&self) -> bool {
        self.state.is_dir
    }

    fn children(&self) -> Result<BTreeMap<String, Box<dyn Node>>> {
        if !self.state.is_dir {
            return Ok(BTreeMap::new());
        }
        let mut out = BTreeMap::new();
        for name in self.child_names()? {
            // Reconstruct this node's tree path by diffing against the repo root.
            let rel = self
                .state
                .fs_path
                .strip_prefix(&self.shared.repo_root)
                .unwrap_or_else(|_| Utf8Path::new(""));
            let mut path = TreePath::root();
            for comp in rel.components() {
                path = path.join(comp.as_str());
            }
            let child_path = path.join(&name);
            let tree = FsTree {
                shared: self.shared.clone(),
            };
            out.insert(name, tree.get(&child_path)?);
        }
        Ok(out)
    }

    fn data(&self) -> Result<Vec<u8>> {
        if self.state.is_dir {
            bail!("{} is a directory, not a file", self.state.fs_path);
        }
        fs::read(&self.state.fs_path)
            .with_context(|| format!("Couldn't read {}", self.state.fs_path))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tree::traverse;
    use crate::tree::VisitControl;
    use tempfile::tempdir;

    #[test]
    fn hashes_match_git_like_blob_framing() -> Result<()> {
        let dir = tempdir()?;
        let root = Utf8PathBuf::try_from(dir.path().to_owned())?;
        fs::write(root.join("greeting"), "what is up, doc?")?;
        let tree = FsTree::new(root, ".flea".to_string());
        let node = tree.get(&TreePath::root().join("greeting"))?;
        assert_eq!(
            node.hash().to_string(),
            "bd9dbf5aae1a3862dd1526723246b20206e5fc37"
        );
        Ok(())
    }

    #[test]
    fn skips_metadata_directory() -> Result<()> {
        let dir = tempdir()?;
        let root = Utf8PathBuf::try_from(dir.path().to_owned())?;
        fs::create_dir(root.join(".flea"))?;
        fs::write(root.join(".flea").join("HEAD"), "ref:master")?;
        fs::write(root.join("real"), "content")?;
        let tree = FsTree::new(root, ".flea".to_string());

        let mut seen = Vec::new();
        traverse(&tree, &TreePath::root(), &mut |path, _node| {
            seen.push(path.as_str().to_string());
            Ok(VisitControl::Continue)
        })?;
        assert!(seen.iter().any(|p| p == "/real"));
        assert!(!seen.iter().any(|p| p.contains(".flea")));
        Ok(())
    }

    #[test]
    fn empty_repo_hashes_to_empty_dir_constant() -> Result<()> {
        let dir = tempdir()?;
        let root = Utf8PathBuf::try_from(dir.path().to_owned())?;
        let tree = FsTree::new(root, ".flea".to_string());
        let node = tree.get(&TreePath::root())?;
        assert_eq!(
            node.hash().to_string(),
            "4b825dc642cb6eb9a060e54bf8d69288fbee4904"
        );
        Ok(())
    }
}
