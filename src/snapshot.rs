//! Builds a stored, content-addressed tree from the staging area.
//!
//! Grounded on `original_source/core/commit.go`'s `BuildCATreeFromIndexFile`:
//! one pre-order pass over the index that stores every directory payload and
//! spot-checks every file is already in the object store, refusing to store
//! an empty tree.

use anyhow::{Result, bail, ensure};

use crate::error::FleaErrorKind;
use crate::index_tree::IndexTree;
use crate::hashing::ObjectId;
use crate::store::Cas;
use crate::tree::{Tree, TreePath, VisitControl, empty_dir_hash, encode_dir_payload, traverse};

/// Stores every directory in `index` to `cas`, verifying every file it
/// references is already present, and returns the resulting root hash.
///
/// Fails if the index is empty (nothing staged) or references a blob the
/// object store doesn't have. A stored directory's hash disagreeing with
/// what the index computed is an invariant violation, not a user error.
pub fn build_ca_tree_from_index(index: &IndexTree, cas: &Cas) -> Result<ObjectId> {
    let root_hash = index.root_hash()?;
    ensure!(root_hash != empty_dir_hash(), FleaErrorKind::EmptyTree);

    traverse(index, &TreePath::root(), &mut |path, node| {
        if node.is_dir() {
            let mut rows = std::collections::BTreeMap::new();
            for (name, child) in node.children()? {
                rows.insert(name, (child.is_dir(), child.hash()));
            }
            let payload = encode_dir_payload(&rows);
            let stored = cas.store_tree(payload.as_bytes())?;
            assert_eq!(
                stored,
                node.hash(),
                "CAS-computed hash for {path} doesn't match the index's cached hash"
            );
        } else if !cas.exists(&node.hash()) {
            bail!("{path} references blob {} which isn't in the object store", node.hash());
        }
        Ok(VisitControl::Continue)
    })?;

    Ok(root_hash)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ca_tree::CaTree;
    use crate::tree::Tree;
    use camino::Utf8PathBuf;
    use std::rc::Rc;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, IndexTree, Cas) {
        let dir = tempdir().unwrap();
        let index_path = Utf8PathBuf::try_from(dir.path().join("index")).unwrap();
        let cas_dir = Utf8PathBuf::try_from(dir.path().join("objects")).unwrap();
        std::fs::create_dir_all(&cas_dir).unwrap();
        (dir, IndexTree::open(index_path).unwrap(), Cas::new(cas_dir))
    }

    #[test]
    fn empty_index_is_rejected() -> Result<()> {
        let (_dir, index, cas) = setup();
        assert!(build_ca_tree_from_index(&index, &cas).is_err());
        Ok(())
    }

    #[test]
    fn missing_blob_is_rejected() -> Result<()> {
        let (_dir, index, cas) = setup();
        index.mkfile_all(&"/f".parse()?, ObjectId::of(b"never stored"))?;
        assert!(build_ca_tree_from_index(&index, &cas).is_err());
        Ok(())
    }

    #[test]
    fn builds_a_resolvable_tree() -> Result<()> {
        let (_dir, index, cas) = setup();
        let blob_id = cas.store_blob(b"hello")?;
        index.mkfile_all(&"/dir/f".parse()?, blob_id)?;

        let root = build_ca_tree_from_index(&index, &cas)?;
        assert_eq!(root, index.root_hash()?);

        let cas = Rc::new(cas);
        let ca_tree = CaTree::new(cas, root);
        let node = ca_tree.get(&"/dir/f".parse()?)?;
        assert_eq!(node.data()?, b"hello");
        Ok(())
    }
}
