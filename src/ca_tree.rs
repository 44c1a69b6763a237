//! `CaTree`: an immutable [`Tree`] lazily materialized from the object
//! store. The backing a commit's `tree` field ultimately resolves through.
//!
//! Grounded on `original_source/core/ca_tree.go` (`CATree`/`CATreeNode`):
//! children are dereferenced from the store on demand and memoized per node.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::{Context, Result, bail};

use crate::hashing::{ObjectId, ObjectType};
use crate::store::Cas;
use crate::tree::{Node, Tree, TreePath, parse_dir_payload};

/// A read-only view into a single stored tree, rooted at `root`.
pub struct CaTree {
    cas: Rc<Cas>,
    root: ObjectId,
}

impl CaTree {
    pub fn new(cas: Rc<Cas>, root: ObjectId) -> Self {
        CaTree { cas, root }
    }
}

impl Tree for CaTree {
    fn get(&self, path: &TreePath) -> Result<Box<dyn Node>> {
        let mut id = self.root;
        for comp in path.components() {
            let node = CaNode::load(self.cas.clone(), id)?;
            let children = node.child_hashes()?;
            id = children
                .get(comp)
                .with_context(|| format!("{path} doesn't exist in tree {}", self.root))?
                .1;
        }
        Ok(Box::new(CaNode::load(self.cas.clone(), id)?))
    }
}

struct CaNode {
    cas: Rc<Cas>,
    id: ObjectId,
    is_dir: bool,
    children: RefCell<Option<BTreeMap<String, (bool, ObjectId)>>>,
}

impl CaNode {
    fn load(cas: Rc<Cas>, id: ObjectId) -> Result<Self> {
        let (kind, _) = cas.get(&id)?;
        let is_dir = match kind {
            ObjectType::Tree => true,
            ObjectType::Blob => false,
            ObjectType::Commit => bail!("{id} is a commit object, not a tree node"),
        };
        Ok(CaNode {
            cas,
            id,
            is_dir,
            children: RefCell::new(None),
        })
    }

    fn child_hashes(&self) -> Result<BTreeMap<String, (bool, ObjectId)>> {
        if let Some(children) = self.children.borrow().as_ref() {
            return Ok(children.clone());
        }
        let (_, payload) = self.cas.get(&self.id)?;
        let children = parse_dir_payload(&payload)
            .with_context(|| format!("Tree object {} is corrupted", self.id))?;
        *self.children.borrow_mut() = Some(children.clone());
        Ok(children)
    }
}

impl Node for CaNode {
    fn hash(&self) -> ObjectId {
        self.id
    }

    fn is_dir(&self) -> bool {
        self.is_dir
    }

    fn children(&self) -> Result<BTreeMap<String, Box<dyn Node>>> {
        if !self.is_dir {
            return Ok(BTreeMap::new());
        }
        let mut out = BTreeMap::new();
        for (name, (_, hash)) in self.child_hashes()? {
            out.insert(name, Box::new(CaNode::load(self.cas.clone(), hash)?) as Box<dyn Node>);
        }
        Ok(out)
    }

    fn data(&self) -> Result<Vec<u8>> {
        if self.is_dir {
            bail!("{} is a directory, not a file", self.id);
        }
        let (_, payload) = self.cas.get(&self.id)?;
        Ok(payload)
    }
}
