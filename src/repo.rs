//! Repository discovery and the `Repository` context value.
//!
//! The original implementation kept the working directory, metadata
//! directory, object-store directory and cwd-relative path prefix as
//! package-level globals (`core.initPaths`), asserting they'd been set up
//! before use. Here they're just fields on a value threaded through by the
//! caller - no singleton, no assert-then-use.
//!
//! Grounded on `original_source/core/env.go` (`InitNew`/`InitFromExisting`/
//! `initPaths`) and `original_source/builtin/util.go` (the tree-path /
//! relative-fs-path conversions).

use std::fs;
use std::rc::Rc;

use anyhow::{Context, Result, bail, ensure};
use camino::{Utf8Path, Utf8PathBuf};

use crate::error::FleaErrorKind;
use crate::hashing::ObjectId;
use crate::index_tree::IndexTree;
use crate::fs_tree::FsTree;
use crate::store::Cas;
use crate::tree::TreePath;

pub struct Repository {
    /// The directory that contains `meta_dir`. Tree paths are rooted here.
    root: Utf8PathBuf,
    meta_dir: String,
    /// The cwd's tree path at the time this repository was opened, used to
    /// resolve CLI path arguments given relative to the caller's cwd.
    path_prefix: TreePath,
    pub cas: Rc<Cas>,
}

impl Repository {
    fn meta_path(&self) -> Utf8PathBuf {
        self.root.join(&self.meta_dir)
    }

    pub fn objects_dir(&self) -> Utf8PathBuf {
        self.meta_path().join("objects")
    }

    pub fn index_path(&self) -> Utf8PathBuf {
        self.meta_path().join("index")
    }

    pub fn head_path(&self) -> Utf8PathBuf {
        self.meta_path().join("HEAD")
    }

    pub fn branch_path(&self, name: &str) -> Utf8PathBuf {
        self.meta_path().join("refs").join("heads").join(name)
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn meta_dir_name(&self) -> &str {
        &self.meta_dir
    }

    pub fn path_prefix(&self) -> &TreePath {
        &self.path_prefix
    }

    pub fn open_index(&self) -> Result<IndexTree> {
        IndexTree::open(self.index_path())
    }

    pub fn fs_tree(&self) -> FsTree {
        FsTree::new(self.root.clone(), self.meta_dir.clone())
    }

    /// Translates an absolute tree path to its corresponding filesystem path
    /// under the repository root.
    pub fn fs_path_of(&self, path: &TreePath) -> Utf8PathBuf {
        let mut fs_path = self.root.clone();
        for comp in path.components() {
            fs_path.push(comp);
        }
        fs_path
    }

    /// Converts a path given relative to `cwd` into an absolute tree path.
    pub fn resolve_arg_path(&self, cwd: &Utf8Path, relative: &Utf8Path) -> Result<TreePath> {
        let fs_path = cwd.join(relative);
        let rel_to_root = fs_path
            .strip_prefix(&self.root)
            .with_context(|| format!("{fs_path} is outside the repository"))?;
        let mut path = TreePath::root();
        for comp in rel_to_root.components() {
            path = path.join(comp.as_str());
        }
        Ok(path)
    }

    /// Converts an absolute tree path into a path relative to `cwd`.
    pub fn tree_path_to_cwd_relative(&self, cwd: &Utf8Path, path: &TreePath) -> Utf8PathBuf {
        let mut fs_path = self.root.clone();
        for comp in path.components() {
            fs_path.push(comp);
        }
        fs_path
            .strip_prefix(cwd)
            .map(|p| p.to_owned())
            .unwrap_or(fs_path)
    }
}

/// Creates a new repository rooted at `cwd`. Fails if one already exists.
pub fn init(cwd: &Utf8Path, meta_dir: &str) -> Result<Repository> {
    let meta_path = cwd.join(meta_dir);
    if meta_path.exists() {
        bail!(FleaErrorKind::AlreadyInitialized(cwd.to_string()));
    }
    fs::create_dir_all(meta_path.join("objects"))
        .with_context(|| format!("Couldn't create {meta_path}"))?;
    fs::create_dir_all(meta_path.join("refs").join("heads"))?;
    fs::create_dir_all(meta_path.join("infos"))?;

    let repo = Repository {
        root: cwd.to_owned(),
        meta_dir: meta_dir.to_string(),
        path_prefix: TreePath::root(),
        cas: Rc::new(Cas::new(meta_path.join("objects"))),
    };
    // Creates an empty index file so `open_index` doesn't have to special-case it.
    repo.open_index()?;
    Ok(repo)
}

/// Walks up from `cwd` looking for a `meta_dir` directory, the way the
/// original climbed parents in `InitFromExisting`.
pub fn discover(cwd: &Utf8Path, meta_dir: &str) -> Result<Repository> {
    let mut dir = cwd.to_owned();
    loop {
        if dir.join(meta_dir).is_dir() {
            let path_prefix = {
                let rel = cwd.strip_prefix(&dir).unwrap_or(Utf8Path::new(""));
                let mut path = TreePath::root();
                for comp in rel.components() {
                    path = path.join(comp.as_str());
                }
                path
            };
            return Ok(Repository {
                cas: Rc::new(Cas::new(dir.join(meta_dir).join("objects"))),
                root: dir,
                meta_dir: meta_dir.to_string(),
                path_prefix,
            });
        }
        match dir.parent() {
            Some(parent) => dir = parent.to_owned(),
            None => bail!(FleaErrorKind::NoRepository),
        }
    }
}

/// Validates a branch name per the spec: non-empty, no `/`.
pub fn validate_branch_name(name: &str) -> Result<()> {
    ensure!(!name.is_empty(), "Branch name can't be empty");
    ensure!(
        !name.contains('/'),
        FleaErrorKind::InvalidBranch(name.to_string())
    );
    Ok(())
}

pub fn read_branch_digest(repo: &Repository, name: &str) -> Result<ObjectId> {
    let content = fs::read_to_string(repo.branch_path(name))
        .with_context(|| format!("Branch {name} doesn't exist"))?;
    content.trim().parse()
}
