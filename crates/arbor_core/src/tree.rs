//! Host tree storage
//!
//! Hosts live in a slot-map arena keyed by [`HostId`]. Each node stores its
//! parent as an id and owns the ordered list of its children's ids, so the
//! tree stays acyclic without weak references. Removed ids are never reused
//! for another live node, which makes stale ids (for example in the update
//! queue) detectably dead.

use std::fmt::Write as _;

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use crate::backend::RenderingBackend;
use crate::element::TypeIdentity;
use crate::error::{ReconcileError, Result};
use crate::host::Host;
use crate::modifier::ModifierSet;

new_key_type! {
    /// Unique identifier for a mounted host
    pub struct HostId;
}

/// Rendering context inherited from ancestors
#[derive(Clone, Debug)]
pub struct RenderContext<H> {
    /// Nearest ancestor platform content new content attaches under
    pub parent: Option<H>,
    /// Modifiers inherited from ancestors
    pub modifiers: ModifierSet,
}

impl<H> Default for RenderContext<H> {
    fn default() -> Self {
        Self {
            parent: None,
            modifiers: ModifierSet::new(),
        }
    }
}

/// One node of the host tree
pub struct HostNode<B: RenderingBackend> {
    pub(crate) host: Host<B>,
    pub(crate) parent: Option<HostId>,
    pub(crate) children: SmallVec<[HostId; 4]>,
    /// Context received from the parent
    pub(crate) inherited: RenderContext<B::Handle>,
    /// Context handed to children after the latest render
    pub(crate) outgoing: RenderContext<B::Handle>,
    pub(crate) depth: usize,
    pub(crate) updates: u64,
}

impl<B: RenderingBackend> HostNode<B> {
    pub(crate) fn new(
        host: Host<B>,
        parent: Option<HostId>,
        inherited: RenderContext<B::Handle>,
        depth: usize,
    ) -> Self {
        Self {
            host,
            parent,
            children: SmallVec::new(),
            outgoing: inherited.clone(),
            inherited,
            depth,
            updates: 0,
        }
    }

    pub fn host(&self) -> &Host<B> {
        &self.host
    }

    pub fn parent(&self) -> Option<HostId> {
        self.parent
    }

    pub fn children(&self) -> &[HostId] {
        &self.children
    }

    pub fn inherited(&self) -> &RenderContext<B::Handle> {
        &self.inherited
    }

    pub fn outgoing(&self) -> &RenderContext<B::Handle> {
        &self.outgoing
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of in-place updates since mount
    pub fn update_count(&self) -> u64 {
        self.updates
    }

    pub fn identity(&self) -> TypeIdentity {
        self.host.identity()
    }
}

/// Arena of host nodes plus the ordered list of roots
pub struct HostTree<B: RenderingBackend> {
    nodes: SlotMap<HostId, HostNode<B>>,
    roots: SmallVec<[HostId; 4]>,
}

impl<B: RenderingBackend> HostTree<B> {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            roots: SmallVec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: HostId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: HostId) -> Option<&HostNode<B>> {
        self.nodes.get(id)
    }

    pub(crate) fn node_mut(&mut self, id: HostId) -> Result<&mut HostNode<B>> {
        self.nodes
            .get_mut(id)
            .ok_or(ReconcileError::UnknownHost(id))
    }

    pub fn roots(&self) -> &[HostId] {
        &self.roots
    }

    /// Children of `parent`, or the roots when `parent` is `None`
    pub fn children_of(&self, parent: Option<HostId>) -> &[HostId] {
        match parent {
            Some(id) => self.nodes.get(id).map(|node| &node.children[..]).unwrap_or(&[]),
            None => &self.roots,
        }
    }

    pub(crate) fn children_mut(
        &mut self,
        parent: Option<HostId>,
    ) -> Result<&mut SmallVec<[HostId; 4]>> {
        match parent {
            Some(id) => Ok(&mut self.node_mut(id)?.children),
            None => Ok(&mut self.roots),
        }
    }

    pub(crate) fn insert_with_key(
        &mut self,
        f: impl FnOnce(HostId) -> HostNode<B>,
    ) -> HostId {
        self.nodes.insert_with_key(f)
    }

    pub(crate) fn remove(&mut self, id: HostId) -> Option<HostNode<B>> {
        self.nodes.remove(id)
    }

    /// Last platform handle rendered within the subtree at `id`
    pub fn last_handle(&self, id: HostId) -> Option<B::Handle> {
        let node = self.nodes.get(id)?;
        if let Some(handle) = node.host.handle() {
            return Some(handle.clone());
        }
        node.children
            .iter()
            .rev()
            .find_map(|&child| self.last_handle(child))
    }

    /// Platform content that the content of `id` goes after.
    ///
    /// Looks at the siblings before `id` from the right, then walks up through
    /// ancestors without platform content of their own, considering only the
    /// siblings before them. Stops with `None` at the first ancestor that owns
    /// platform content: `id` renders first within it.
    pub fn preceding_handle(&self, id: HostId) -> Option<B::Handle> {
        let mut current = id;
        let mut parent = self.nodes.get(id)?.parent;

        loop {
            let siblings = self.children_of(parent);
            let end = siblings.iter().position(|&child| child == current)?;
            if let Some(handle) = siblings[..end]
                .iter()
                .rev()
                .find_map(|&sibling| self.last_handle(sibling))
            {
                return Some(handle);
            }

            let ancestor = parent?;
            let node = self.nodes.get(ancestor)?;
            if node.host.handle().is_some() {
                return None;
            }
            current = ancestor;
            parent = node.parent;
        }
    }

    /// Ids of the subtree at `id` in depth-first pre-order
    pub fn descendants(&self, id: HostId) -> Vec<HostId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get(next) {
                out.push(next);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Indented textual rendering of the tree
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for &root in &self.roots {
            for id in self.descendants(root) {
                let Some(node) = self.nodes.get(id) else {
                    continue;
                };
                let _ = write!(
                    out,
                    "{:indent$}{} {}",
                    "",
                    node.host.kind().name(),
                    node.identity(),
                    indent = node.depth * 2
                );
                if let Some(handle) = node.host.handle() {
                    let _ = write!(out, " -> {:?}", handle);
                }
                out.push('\n');
            }
        }
        out
    }
}

impl<B: RenderingBackend> Default for HostTree<B> {
    fn default() -> Self {
        Self::new()
    }
}
