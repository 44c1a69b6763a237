//! `IndexTree`: the staging area. A mutable in-memory tree, write-through
//! persisted to the `index` file inside the repository metadata directory.
//!
//! Grounded on `original_source/core/index_tree.go` (flush-on-every-mutation
//! `IndexTree` wrapping a `MemTree`) and `core/mem_tree.go` (`MkDir`,
//! `MkFile`, `Delete`, `apply`/`recursive`, `Serialize`/`Deserialize`).

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::rc::Rc;

use anyhow::{Context, Result, bail, ensure};
use camino::Utf8PathBuf;
use serde_derive::{Deserialize, Serialize};

use crate::error::FleaErrorKind;
use crate::hashing::{ObjectId, ObjectType, wrap};
use crate::tree::{Node, Tree, TreePath, empty_dir_hash, encode_dir_payload};

struct IndexNodeData {
    is_dir: bool,
    hash: ObjectId,
    children: BTreeMap<String, Rc<RefCell<IndexNodeData>>>,
}

impl IndexNodeData {
    fn new_dir() -> Self {
        IndexNodeData {
            is_dir: true,
            hash: empty_dir_hash(),
            children: BTreeMap::new(),
        }
    }

    fn new_file(hash: ObjectId) -> Self {
        IndexNodeData {
            is_dir: false,
            hash,
            children: BTreeMap::new(),
        }
    }

    /// Recomputes this directory's hash from its (already up to date)
    /// children. No-op for files: leaf hashes are set at insertion and
    /// never recomputed.
    fn recompute_hash(&mut self) {
        if !self.is_dir {
            return;
        }
        let mut rows = BTreeMap::new();
        for (name, child) in &self.children {
            let child = child.borrow();
            rows.insert(name.clone(), (child.is_dir, child.hash));
        }
        self.hash = wrap(ObjectType::Tree, encode_dir_payload(&rows).as_bytes()).0;
    }
}

#[derive(Serialize, Deserialize)]
struct IndexRecord {
    path: String,
    hash: Option<String>,
}

/// The staging area: a mutable tree persisted to `<meta-dir>/index`.
pub struct IndexTree {
    root: Rc<RefCell<IndexNodeData>>,
    index_path: Utf8PathBuf,
}

impl IndexTree {
    /// Opens the index file at `index_path`, creating an empty one if it
    /// doesn't exist yet.
    pub fn open(index_path: Utf8PathBuf) -> Result<Self> {
        match fs::read(&index_path) {
            Ok(bytes) => {
                let mut tree = Self::empty(index_path);
                tree.restore(&bytes)?;
                Ok(tree)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let tree = Self::empty(index_path);
                tree.flush()?;
                Ok(tree)
            }
            Err(e) => Err(e).with_context(|| format!("Couldn't read index file {index_path}")),
        }
    }

    fn empty(index_path: Utf8PathBuf) -> Self {
        IndexTree {
            root: Rc::new(RefCell::new(IndexNodeData::new_dir())),
            index_path,
        }
    }

    fn restore(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let records: Vec<IndexRecord> =
            serde_json::from_slice(bytes).context("Index file is corrupted")?;
        for record in records {
            let path: TreePath = record
                .path
                .parse()
                .with_context(|| format!("Index file contains invalid path {}", record.path))?;
            match record.hash {
                Some(hex) => {
                    let hash: ObjectId = hex.parse().context("Index file has invalid hash")?;
                    self.mkfile_all_no_flush(&path, hash)?;
                }
                None => self.mkdir_all_no_flush(&path)?,
            }
        }
        Ok(())
    }

    fn get_state(&self, path: &TreePath) -> Result<Rc<RefCell<IndexNodeData>>> {
        if path.is_root() {
            return Ok(self.root.clone());
        }
        let mut cur = self.root.clone();
        for comp in path.components() {
            let next = {
                let b = cur.borrow();
                ensure!(b.is_dir, "{path} passes through a file");
                b.children
                    .get(comp)
                    .cloned()
                    .with_context(|| format!("{path} doesn't exist in the index"))?
            };
            cur = next;
        }
        Ok(cur)
    }

    /// Walks down to (and returns) the chain of directories from root to
    /// `path`'s parent, plus `path`'s own name. Used so mutations can
    /// recompute every ancestor's hash bottom-up afterwards.
    fn navigate_parent_chain(
        &self,
        path: &TreePath,
    ) -> Result<(Vec<Rc<RefCell<IndexNodeData>>>, String)> {
        ensure!(!path.is_root(), FleaErrorKind::ReadOnlyRoot);
        let name = path.name().unwrap().to_string();
        let parent = path.parent().unwrap();
        let mut chain = vec![self.root.clone()];
        let mut cur = self.root.clone();
        for comp in parent.components() {
            let next = {
                let b = cur.borrow();
                ensure!(b.is_dir, "{path} passes through a file");
                b.children
                    .get(comp)
                    .cloned()
                    .with_context(|| format!("{path} doesn't exist in the index"))?
            };
            chain.push(next.clone());
            cur = next;
        }
        Ok((chain, name))
    }

    fn recompute_chain(&self, chain: &[Rc<RefCell<IndexNodeData>>]) {
        for node in chain.iter().rev() {
            node.borrow_mut().recompute_hash();
        }
    }

    pub fn mkdir(&self, path: &TreePath) -> Result<()> {
        self.mkdir_no_flush(path)?;
        self.flush()
    }

    fn mkdir_no_flush(&self, path: &TreePath) -> Result<()> {
        let (chain, name) = self.navigate_parent_chain(path)?;
        {
            let mut parent = chain.last().unwrap().borrow_mut();
            ensure!(parent.is_dir, "{path} passes through a file");
            ensure!(
                !parent.children.contains_key(&name),
                "{path} already exists"
            );
            parent
                .children
                .insert(name, Rc::new(RefCell::new(IndexNodeData::new_dir())));
        }
        self.recompute_chain(&chain);
        Ok(())
    }

    pub fn mkdir_all(&self, path: &TreePath) -> Result<()> {
        self.mkdir_all_no_flush(path)?;
        self.flush()
    }

    fn mkdir_all_no_flush(&self, path: &TreePath) -> Result<()> {
        if path.is_root() {
            return Ok(());
        }
        if let Ok(state) = self.get_state(path) {
            ensure!(state.borrow().is_dir, "{path} exists and isn't a directory");
            return Ok(());
        }
        self.mkdir_all_no_flush(&path.parent().unwrap())?;
        self.mkdir_no_flush(path)
    }

    pub fn mkfile(&self, path: &TreePath, hash: ObjectId) -> Result<()> {
        self.mkfile_no_flush(path, hash)?;
        self.flush()
    }

    fn mkfile_no_flush(&self, path: &TreePath, hash: ObjectId) -> Result<()> {
        let (chain, name) = self.navigate_parent_chain(path)?;
        {
            let mut parent = chain.last().unwrap().borrow_mut();
            ensure!(parent.is_dir, "{path} passes through a file");
            // Overwrites any existing entry at this path - files included.
            parent
                .children
                .insert(name, Rc::new(RefCell::new(IndexNodeData::new_file(hash))));
        }
        self.recompute_chain(&chain);
        Ok(())
    }

    pub fn mkfile_all(&self, path: &TreePath, hash: ObjectId) -> Result<()> {
        self.mkfile_all_no_flush(path, hash)?;
        self.flush()
    }

    fn mkfile_all_no_flush(&self, path: &TreePath, hash: ObjectId) -> Result<()> {
        if let Some(parent) = path.parent() {
            self.mkdir_all_no_flush(&parent)?;
        }
        self.mkfile_no_flush(path, hash)
    }

    pub fn delete(&self, path: &TreePath) -> Result<()> {
        let (chain, name) = self.navigate_parent_chain(path)?;
        {
            let mut parent = chain.last().unwrap().borrow_mut();
            ensure!(
                parent.children.remove(&name).is_some(),
                "{path} doesn't exist in the index"
            );
        }
        self.recompute_chain(&chain);
        self.flush()
    }

    pub fn clear(&self) -> Result<()> {
        *self.root.borrow_mut() = IndexNodeData::new_dir();
        self.flush()
    }

    fn serialize(&self) -> Vec<u8> {
        let mut records = Vec::new();
        fn walk(path: TreePath, node: &Rc<RefCell<IndexNodeData>>, out: &mut Vec<IndexRecord>) {
            let node = node.borrow();
            if node.is_dir {
                for (name, child) in &node.children {
                    let child_path = path.join(name);
                    let is_dir = child.borrow().is_dir;
                    out.push(IndexRecord {
                        path: child_path.as_str().to_string(),
                        hash: if is_dir {
                            None
                        } else {
                            Some(child.borrow().hash.to_string())
                        },
                    });
                    walk(child_path, child, out);
                }
            }
        }
        walk(TreePath::root(), &self.root, &mut records);
        serde_json::to_vec(&records).expect("IndexRecord serialization can't fail")
    }

    /// Write-through persistence: every successful mutation ends with this.
    fn flush(&self) -> Result<()> {
        let data = self.serialize();
        fs::write(&self.index_path, data)
            .with_context(|| format!("Couldn't write index file {}", self.index_path))
    }
}

impl Tree for IndexTree {
    fn get(&self, path: &TreePath) -> Result<Box<dyn Node>> {
        Ok(Box::new(IndexNode(self.get_state(path)?)))
    }
}

struct IndexNode(Rc<RefCell<IndexNodeData>>);

impl Node for IndexNode {
    fn hash(&self) -> ObjectId {
        self.0.borrow().hash
    }

    fn is_dir(&self) -> bool {
        self.0.borrow().is_dir
    }

    fn children(&self) -> Result<BTreeMap<String, Box<dyn Node>>> {
        Ok(self
            .0
            .borrow()
            .children
            .iter()
            .map(|(name, child)| (name.clone(), Box::new(IndexNode(child.clone())) as Box<dyn Node>))
            .collect())
    }

    fn data(&self) -> Result<Vec<u8>> {
        bail!("IndexTree nodes carry only a hash; fetch file content from the object store")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::tempdir;

    fn index() -> (tempfile::TempDir, IndexTree) {
        let dir = tempdir().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("index")).unwrap();
        (dir, IndexTree::open(path).unwrap())
    }

    #[test]
    fn fresh_index_is_empty_dir() -> Result<()> {
        let (_dir, idx) = index();
        assert_eq!(
            idx.root_hash()?.to_string(),
            "4b825dc642cb6eb9a060e54bf8d69288fbee4904"
        );
        Ok(())
    }

    #[test]
    /// S3: insertion order doesn't affect the root hash.
    fn insertion_order_independence() -> Result<()> {
        let (_dir_a, a) = index();
        let (_dir_b, b) = index();

        let ha = ObjectId::of(b"a");
        let hb = ObjectId::of(b"b");
        let hx = ObjectId::of(b"x");
        let hy = ObjectId::of(b"y");

        a.mkfile_all(&"/b".parse()?, hb)?;
        a.mkfile_all(&"/a".parse()?, ha)?;
        a.mkfile_all(&"/c/x".parse()?, hx)?;
        a.mkfile_all(&"/c/y".parse()?, hy)?;

        b.mkfile_all(&"/c/y".parse()?, hy)?;
        b.mkfile_all(&"/a".parse()?, ha)?;
        b.mkfile_all(&"/c/x".parse()?, hx)?;
        b.mkfile_all(&"/b".parse()?, hb)?;

        assert_eq!(a.root_hash()?, b.root_hash()?);
        Ok(())
    }

    #[test]
    fn mkdir_rejects_duplicate() -> Result<()> {
        let (_dir, idx) = index();
        idx.mkdir(&"/src".parse()?)?;
        assert!(idx.mkdir(&"/src".parse()?).is_err());
        Ok(())
    }

    #[test]
    fn root_is_read_only() -> Result<()> {
        let (_dir, idx) = index();
        assert!(idx.mkdir(&TreePath::root()).is_err());
        assert!(idx.delete(&TreePath::root()).is_err());
        Ok(())
    }

    #[test]
    /// P8: serialize -> restore round trip preserves the root hash.
    fn persistence_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let path = Utf8PathBuf::try_from(dir.path().join("index"))?;
        let idx = IndexTree::open(path.clone())?;
        idx.mkfile_all(&"/a".parse()?, ObjectId::of(b"a"))?;
        idx.mkfile_all(&"/dir/b".parse()?, ObjectId::of(b"b"))?;
        let before = idx.root_hash()?;
        drop(idx);

        let reopened = IndexTree::open(path)?;
        assert_eq!(reopened.root_hash()?, before);
        Ok(())
    }

    #[test]
    fn mkfile_overwrites_existing() -> Result<()> {
        let (_dir, idx) = index();
        idx.mkfile_all(&"/a".parse()?, ObjectId::of(b"first"))?;
        idx.mkfile_all(&"/a".parse()?, ObjectId::of(b"second"))?;
        let node = idx.get(&"/a".parse()?)?;
        assert_eq!(node.hash(), ObjectId::of(b"second"));
        Ok(())
    }
}
