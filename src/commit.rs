//! Commits, branches, and HEAD.
//!
//! Grounded directly on the spec's own contract (§4.9): the retrieved
//! `original_source/core/commit.go` revision predates the Commit/branch/HEAD
//! machinery `builtin/commit.go` and `builtin/checkout.go` call into, so
//! those Go files are used here only for CLI-flow flavor, not literal
//! translation.

use std::fs;

use anyhow::{Context, Result, bail, ensure};
use serde_derive::{Deserialize, Serialize};

use crate::hashing::{ObjectId, ObjectType, wrap};
use crate::repo::{self, Repository};
use crate::snapshot::build_ca_tree_from_index;
use crate::store::Cas;
use crate::ca_tree::CaTree;

#[derive(Debug, Serialize, Deserialize)]
struct CommitPayload {
    tree: ObjectId,
    prev: Option<ObjectId>,
    author: String,
    comment: String,
}

/// A decoded commit object. Independent of any particular `Repository`
/// beyond the store it was read from.
pub struct Commit {
    tree: ObjectId,
    prev: Option<ObjectId>,
    author: String,
    comment: String,
}

impl Commit {
    pub fn tree_digest(&self) -> ObjectId {
        self.tree
    }

    pub fn prev_digest(&self) -> Option<ObjectId> {
        self.prev
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn tree(&self, cas: std::rc::Rc<Cas>) -> CaTree {
        CaTree::new(cas, self.tree)
    }

    pub fn prev(&self, cas: &Cas) -> Result<Option<Commit>> {
        match self.prev {
            Some(id) => Ok(Some(commit_of(cas, &id)?)),
            None => Ok(None),
        }
    }

    fn encode(&self) -> Vec<u8> {
        let payload = CommitPayload {
            tree: self.tree,
            prev: self.prev,
            author: self.author.clone(),
            comment: self.comment.clone(),
        };
        serde_json::to_vec(&payload).expect("commit payload serialization can't fail")
    }

    /// Re-encodes and hashes; idempotent since commit payloads are immutable
    /// once built.
    pub fn hash(&self) -> ObjectId {
        wrap(ObjectType::Commit, &self.encode()).0
    }
}

pub fn create_commit(
    cas: &Cas,
    tree: ObjectId,
    prev: Option<ObjectId>,
    author: String,
    comment: String,
) -> Result<ObjectId> {
    ensure!(cas.exists(&tree), "Tree {tree} doesn't exist in the object store");
    if let Some(prev_id) = prev {
        let (kind, _) = cas.get(&prev_id)?;
        ensure!(kind == ObjectType::Commit, "{prev_id} isn't a commit object");
    }
    let payload = CommitPayload {
        tree,
        prev,
        author,
        comment,
    };
    let bytes = serde_json::to_vec(&payload).expect("commit payload serialization can't fail");
    cas.store_commit(&bytes)
}

pub fn commit_of(cas: &Cas, id: &ObjectId) -> Result<Commit> {
    let (kind, payload) = cas.get(id)?;
    ensure!(kind == ObjectType::Commit, "{id} isn't a commit object");
    let decoded: CommitPayload =
        serde_json::from_slice(&payload).with_context(|| format!("Commit {id} is corrupted"))?;
    Ok(Commit {
        tree: decoded.tree,
        prev: decoded.prev,
        author: decoded.author,
        comment: decoded.comment,
    })
}

pub fn update_branch_head(repo: &Repository, name: &str, digest: ObjectId) -> Result<()> {
    repo::validate_branch_name(name)?;
    ensure!(repo.cas.exists(&digest), "Commit {digest} doesn't exist");
    let path = repo.branch_path(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, digest.to_string())
        .with_context(|| format!("Couldn't update branch {name}"))?;
    Ok(())
}

pub fn is_valid_branch(repo: &Repository, name: &str) -> bool {
    match repo::read_branch_digest(repo, name) {
        Ok(id) => repo.cas.exists(&id),
        Err(_) => false,
    }
}

/// What HEAD currently points at.
pub enum Head {
    Branch(String),
    Detached(ObjectId),
}

pub fn read_head(repo: &Repository) -> Result<Head> {
    let content = fs::read_to_string(repo.head_path()).context("No HEAD file")?;
    let content = content.trim();
    match content.strip_prefix("ref:") {
        Some(branch) => Ok(Head::Branch(branch.to_string())),
        None => Ok(Head::Detached(content.parse()?)),
    }
}

pub fn write_head_branch(repo: &Repository, name: &str) -> Result<()> {
    fs::write(repo.head_path(), format!("ref:{name}")).context("Couldn't update HEAD")
}

pub fn write_head_detached(repo: &Repository, id: ObjectId) -> Result<()> {
    fs::write(repo.head_path(), id.to_string()).context("Couldn't update HEAD")
}

/// `(name, ok) | NotBranch | NoHeadFile`, collapsed into an enum.
pub enum BranchStatus {
    On(String),
    Detached,
    NoHead,
}

pub fn current_branch(repo: &Repository) -> Result<BranchStatus> {
    match read_head(repo) {
        Ok(Head::Branch(name)) => Ok(BranchStatus::On(name)),
        Ok(Head::Detached(_)) => Ok(BranchStatus::Detached),
        Err(_) => Ok(BranchStatus::NoHead),
    }
}

/// `None` when the repository has no HEAD file yet (nothing committed).
pub fn current_commit(repo: &Repository) -> Result<Option<Commit>> {
    match read_head(repo) {
        Ok(Head::Branch(name)) => {
            let id = repo::read_branch_digest(repo, &name)?;
            Ok(Some(commit_of(&repo.cas, &id)?))
        }
        Ok(Head::Detached(id)) => Ok(Some(commit_of(&repo.cas, &id)?)),
        Err(_) => Ok(None),
    }
}

/// The full `commit` pipeline: §4.9.
pub fn commit(repo: &Repository, author: String, comment: String) -> Result<ObjectId> {
    let index = repo.open_index()?;
    let tree = build_ca_tree_from_index(&index, &repo.cas)?;

    let current = current_commit(repo)?;
    if let Some(cur) = &current {
        ensure!(
            cur.tree_digest() != tree,
            "Nothing to commit: the working tree matches HEAD"
        );
    }

    let branch = match current_branch(repo)? {
        BranchStatus::On(name) => Some(name),
        BranchStatus::Detached => bail!("Can't commit in detached HEAD state; checkout a branch first"),
        BranchStatus::NoHead => None,
    };

    let prev = current.as_ref().map(|c| c.hash());
    let digest = create_commit(&repo.cas, tree, prev, author, comment)?;

    match branch {
        Some(name) => update_branch_head(repo, &name, digest)?,
        None => {
            update_branch_head(repo, "master", digest)?;
            write_head_branch(repo, "master")?;
        }
    }
    Ok(digest)
}
