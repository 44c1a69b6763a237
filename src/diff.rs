//! Structural diff between two trees.
//!
//! Grounded on `original_source/builtin/status.go` and `core/tree.go`'s
//! traversal helpers: two independent passes (A against B, then B against A)
//! that must agree on which paths changed - disagreement means the trees
//! themselves are inconsistent, not a user-facing diff result. `SkipDir`
//! short-circuits a subtree the moment both sides' hashes match, which is
//! what keeps diffing an unchanged tree cheap regardless of its size.

use anyhow::{Result, ensure};

use crate::tree::{Tree, TreePath, VisitControl, traverse};

#[derive(Debug, Default, Eq, PartialEq)]
pub struct DiffResult {
    /// Present in A, absent from B.
    pub missing_in_b: Vec<TreePath>,
    /// Present in B, absent from A.
    pub missing_in_a: Vec<TreePath>,
    /// Present in both, but with different hashes (or one's a file where
    /// the other's a directory).
    pub modified: Vec<TreePath>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.missing_in_b.is_empty() && self.missing_in_a.is_empty() && self.modified.is_empty()
    }
}

/// Compares `a` against `b`. Both must have a root.
pub fn diff(a: &dyn Tree, b: &dyn Tree) -> Result<DiffResult> {
    let missing_in_b = one_way_missing(a, b)?;
    let missing_in_a = one_way_missing(b, a)?;

    let mut modified_from_a = one_way_modified(a, b)?;
    let mut modified_from_b = one_way_modified(b, a)?;
    modified_from_a.sort();
    modified_from_b.sort();
    ensure!(
        modified_from_a == modified_from_b,
        "The two diff passes disagree on which paths changed; the trees are inconsistent"
    );

    Ok(DiffResult {
        missing_in_b,
        missing_in_a,
        modified: modified_from_a,
    })
}

fn one_way_missing(from: &dyn Tree, to: &dyn Tree) -> Result<Vec<TreePath>> {
    let mut missing = Vec::new();
    traverse(from, &TreePath::root(), &mut |path, from_node| {
        match to.get(path) {
            Ok(to_node) => {
                if from_node.hash() == to_node.hash() {
                    return Ok(VisitControl::SkipDir);
                }
                if from_node.is_dir() != to_node.is_dir() {
                    return Ok(VisitControl::SkipDir);
                }
                Ok(VisitControl::Continue)
            }
            Err(_) => {
                missing.push(path.clone());
                Ok(VisitControl::SkipDir)
            }
        }
    })?;
    Ok(missing)
}

fn one_way_modified(from: &dyn Tree, to: &dyn Tree) -> Result<Vec<TreePath>> {
    let mut modified = Vec::new();
    traverse(from, &TreePath::root(), &mut |path, from_node| {
        let to_node = match to.get(path) {
            Ok(node) => node,
            Err(_) => return Ok(VisitControl::SkipDir),
        };
        if from_node.hash() == to_node.hash() {
            return Ok(VisitControl::SkipDir);
        }
        if from_node.is_dir() != to_node.is_dir() || !from_node.is_dir() {
            modified.push(path.clone());
            return Ok(VisitControl::SkipDir);
        }
        Ok(VisitControl::Continue)
    })?;
    Ok(modified)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::index_tree::IndexTree;
    use camino::Utf8PathBuf;
    use tempfile::tempdir;

    fn index_tree() -> (tempfile::TempDir, IndexTree) {
        let dir = tempdir().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("index")).unwrap();
        (dir, IndexTree::open(path).unwrap())
    }

    #[test]
    fn identical_trees_diff_to_nothing() -> Result<()> {
        let (_da, a) = index_tree();
        let (_db, b) = index_tree();
        a.mkfile_all(&"/x".parse()?, crate::hashing::ObjectId::of(b"x"))?;
        b.mkfile_all(&"/x".parse()?, crate::hashing::ObjectId::of(b"x"))?;
        let result = diff(&a, &b)?;
        assert!(result.is_empty());
        Ok(())
    }

    #[test]
    fn detects_additions_and_removals() -> Result<()> {
        let (_da, a) = index_tree();
        let (_db, b) = index_tree();
        a.mkfile_all(&"/only_a".parse()?, crate::hashing::ObjectId::of(b"a"))?;
        b.mkfile_all(&"/only_b".parse()?, crate::hashing::ObjectId::of(b"b"))?;

        let result = diff(&a, &b)?;
        assert_eq!(result.missing_in_b, vec!["/only_a".parse()?]);
        assert_eq!(result.missing_in_a, vec!["/only_b".parse()?]);
        assert!(result.modified.is_empty());
        Ok(())
    }

    #[test]
    fn detects_modified_file() -> Result<()> {
        let (_da, a) = index_tree();
        let (_db, b) = index_tree();
        a.mkfile_all(&"/f".parse()?, crate::hashing::ObjectId::of(b"one"))?;
        b.mkfile_all(&"/f".parse()?, crate::hashing::ObjectId::of(b"two"))?;

        let result = diff(&a, &b)?;
        assert_eq!(result.modified, vec!["/f".parse()?]);
        Ok(())
    }

    #[test]
    /// Unchanged subtrees must not be descended into: mutate an untouched
    /// sibling directory deep down and confirm the diff still only reports
    /// the one path that actually changed.
    fn skips_unchanged_subtrees() -> Result<()> {
        let (_da, a) = index_tree();
        let (_db, b) = index_tree();
        for tree in [&a, &b] {
            tree.mkfile_all(
                &"/unchanged/deep/file".parse()?,
                crate::hashing::ObjectId::of(b"same"),
            )?;
        }
        a.mkfile_all(&"/changed".parse()?, crate::hashing::ObjectId::of(b"x"))?;
        b.mkfile_all(&"/changed".parse()?, crate::hashing::ObjectId::of(b"y"))?;

        let result = diff(&a, &b)?;
        assert_eq!(result.modified, vec!["/changed".parse()?]);
        Ok(())
    }

    #[test]
    /// A directory replaced by a file at the same path must be reported as
    /// one `modified` path, not descended into (which would otherwise
    /// misreport every ex-child as missing).
    fn dir_replaced_by_file_is_modified_not_descended() -> Result<()> {
        let (_da, a) = index_tree();
        let (_db, b) = index_tree();
        a.mkfile_all(
            &"/node/child".parse()?,
            crate::hashing::ObjectId::of(b"child"),
        )?;
        b.mkfile_all(&"/node".parse()?, crate::hashing::ObjectId::of(b"now a file"))?;

        let result = diff(&a, &b)?;
        assert_eq!(result.modified, vec!["/node".parse()?]);
        assert!(result.missing_in_b.is_empty());
        assert!(result.missing_in_a.is_empty());
        Ok(())
    }
}
