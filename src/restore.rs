//! `checkout`: restores the working directory to a branch or commit.
//!
//! Grounded on `original_source/builtin/checkout.go`: delete the current
//! commit's paths in reverse lexicographic order (children before parents),
//! then materialize the target tree pre-order, warning rather than failing
//! on individual restore errors.

use std::fs;

use anyhow::{Context, Result, bail};
use tracing::warn;

use crate::commit::{self, is_valid_branch, write_head_branch, write_head_detached};
use crate::hashing::ObjectType;
use crate::repo::Repository;
use crate::tree::{TreePath, VisitControl, traverse};

pub enum CheckoutTarget<'a> {
    Branch(&'a str),
    HashPrefix(&'a str),
}

/// Resolves and checks out `target`, per §4.10.
pub fn checkout(repo: &Repository, target: CheckoutTarget) -> Result<()> {
    let (digest, branch_name) = match target {
        CheckoutTarget::Branch(name) if is_valid_branch(repo, name) => {
            (crate::repo::read_branch_digest(repo, name)?, Some(name))
        }
        CheckoutTarget::Branch(name) => bail!("{name} isn't a known branch"),
        CheckoutTarget::HashPrefix(prefix) => (repo.cas.resolve_prefix(prefix)?, None),
    };

    let (kind, _) = repo.cas.get(&digest)?;
    if kind != ObjectType::Commit {
        bail!("{digest} doesn't name a commit");
    }

    delete_current_tree(repo)?;
    let target_commit = commit::commit_of(&repo.cas, &digest)?;
    restore_tree(repo, &target_commit)?;

    match branch_name {
        Some(name) => write_head_branch(repo, name)?,
        None => write_head_detached(repo, digest)?,
    }
    Ok(())
}

fn delete_current_tree(repo: &Repository) -> Result<()> {
    let current = commit::current_commit(repo)?;
    let Some(current) = current else {
        return Ok(());
    };
    let tree = current.tree(repo.cas.clone());

    let mut paths = Vec::new();
    traverse(&tree, &TreePath::root(), &mut |path, _node| {
        paths.push(path.clone());
        Ok(VisitControl::Continue)
    })?;
    paths.sort();
    paths.reverse();

    for path in paths {
        if path.is_root() {
            continue;
        }
        let fs_path = repo.fs_path_of(&path);
        match fs::remove_file(&fs_path) {
            Ok(()) => {}
            Err(_) => {
                let _ = fs::remove_dir(&fs_path);
            }
        }
    }
    Ok(())
}

fn restore_tree(repo: &Repository, commit: &crate::commit::Commit) -> Result<()> {
    let tree = commit.tree(repo.cas.clone());
    traverse(&tree, &TreePath::root(), &mut |path, node| {
        let fs_path = repo.fs_path_of(path);
        let result = if node.is_dir() {
            fs::create_dir_all(&fs_path).with_context(|| format!("Couldn't create {fs_path}"))
        } else {
            node.data()
                .and_then(|data| {
                    fs::write(&fs_path, &data).with_context(|| format!("Couldn't write {fs_path}"))
                })
        };
        if let Err(e) = result {
            warn!("restoring {path}: {e:#}");
        }
        Ok(VisitControl::Continue)
    })?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::commit::commit as make_commit;
    use camino::Utf8PathBuf;
    use tempfile::tempdir;

    fn repo_with_commit(content: &[u8]) -> (tempfile::TempDir, Repository) {
        let dir = tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_owned()).unwrap();
        let repo = crate::repo::init(&root, ".flea").unwrap();
        let blob = repo.cas.store_blob(content).unwrap();
        let index = repo.open_index().unwrap();
        index.mkfile_all(&"/f".parse().unwrap(), blob).unwrap();
        make_commit(&repo, "tester".to_string(), "c1".to_string()).unwrap();
        (dir, repo)
    }

    #[test]
    fn checkout_branch_materializes_files() -> Result<()> {
        let (_dir, repo) = repo_with_commit(b"hello");
        checkout(&repo, CheckoutTarget::Branch("master"))?;
        let content = fs::read_to_string(repo.fs_path_of(&"/f".parse()?))?;
        assert_eq!(content, "hello");
        Ok(())
    }

    #[test]
    fn checkout_replaces_existing_files() -> Result<()> {
        let (_dir, repo) = repo_with_commit(b"v1");
        let blob2 = repo.cas.store_blob(b"v2")?;
        let index = repo.open_index()?;
        index.mkfile_all(&"/f".parse()?, blob2)?;
        let second = make_commit(&repo, "tester".to_string(), "c2".to_string())?;
        fs::write(repo.fs_path_of(&"/f".parse()?), "stale working copy")?;

        checkout(&repo, CheckoutTarget::HashPrefix(&second.to_string()))?;
        let content = fs::read_to_string(repo.fs_path_of(&"/f".parse()?))?;
        assert_eq!(content, "v2");
        Ok(())
    }

    #[test]
    fn unknown_branch_fails() -> Result<()> {
        let (_dir, repo) = repo_with_commit(b"x");
        assert!(checkout(&repo, CheckoutTarget::Branch("nope")).is_err());
        Ok(())
    }
}
