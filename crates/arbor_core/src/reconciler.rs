//! Tree reconciler
//!
//! Turns an element tree into a tree of live hosts and keeps the two in sync.
//!
//! - **Mount** creates a host, renders it and mounts one child per element in
//!   its output.
//! - **Update** re-renders a host in place and reconciles its children.
//! - **Dismantle** releases a host, then its children, then frees its slot.
//!
//! Children are matched by position. A new element whose type identity equals
//! the old host's updates that host and keeps its state; anything else mounts
//! a fresh node in that position and dismantles the old one.
//!
//! State changes never render synchronously. They enqueue the owning host with
//! the [`UpdateScheduler`], which asks the platform hook to run one flush on
//! the next main-loop turn.

use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::backend::RenderingBackend;
use crate::config::ReconcilerConfig;
use crate::element::Element;
use crate::error::{fatal, ReconcileError, Result};
use crate::host::{Host, HostContext};
use crate::scheduler::UpdateScheduler;
use crate::tree::{HostId, HostNode, HostTree, RenderContext};

/// Lifetime counters of a reconciler
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Hosts mounted
    pub mounted: u64,
    /// In-place host updates
    pub updated: u64,
    /// Hosts dismantled
    pub dismantled: u64,
    /// Flushes that processed at least one queued host
    pub flushes: u64,
    /// Hosts currently in the tree
    pub live_nodes: usize,
}

/// Outcome of one flush
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Queued hosts that were updated
    pub processed: usize,
    /// Queued hosts that had been dismantled in the meantime
    pub skipped: usize,
}

impl FlushReport {
    pub fn is_empty(&self) -> bool {
        self.processed == 0 && self.skipped == 0
    }
}

// =============================================================================
// CORE
// =============================================================================

struct ReconcilerCore<B: RenderingBackend> {
    tree: HostTree<B>,
    backend: B,
    config: ReconcilerConfig,
    /// Context handed to root hosts
    root_context: RenderContext<B::Handle>,
    stats: ReconcileStats,
    scheduler: Rc<UpdateScheduler>,
}

impl<B: RenderingBackend> ReconcilerCore<B> {
    /// Mount `element` as child `index` of `parent`
    fn mount(
        &mut self,
        parent: Option<HostId>,
        index: usize,
        element: Element,
        inherited: RenderContext<B::Handle>,
    ) -> Result<HostId> {
        let depth = match parent {
            Some(parent) => self.tree.get(parent).map_or(0, |node| node.depth + 1),
            None => 0,
        };
        let scheduler = &self.scheduler;
        let id = self.tree.insert_with_key(|id| {
            HostNode::new(
                Host::new(element, scheduler.change_callback(id)),
                parent,
                inherited,
                depth,
            )
        });
        let siblings = self.tree.children_mut(parent)?;
        let index = index.min(siblings.len());
        siblings.insert(index, id);

        let preceding = self.tree.preceding_handle(id);
        let node = self.tree.node_mut(id)?;
        let output = node.host.render(HostContext {
            backend: &mut self.backend,
            inherited: &node.inherited,
            preceding: preceding.as_ref(),
            config: &self.config,
        })?;

        let outgoing = RenderContext {
            parent: output.handle.or_else(|| node.inherited.parent.clone()),
            modifiers: output.modifiers,
        };
        node.outgoing = outgoing.clone();
        self.stats.mounted += 1;
        tracing::trace!(
            "mounted {} {} as {:?}",
            node.host.kind().name(),
            node.identity(),
            id
        );

        for (index, child) in output.children.into_iter().enumerate() {
            self.mount(Some(id), index, child, outgoing.clone())?;
        }
        Ok(id)
    }

    /// Re-render `id` in place with its current element and context
    fn update(&mut self, id: HostId) -> Result<()> {
        let node = self.tree.node_mut(id)?;
        let output = node.host.update(HostContext {
            backend: &mut self.backend,
            inherited: &node.inherited,
            preceding: None,
            config: &self.config,
        })?;

        let outgoing = RenderContext {
            parent: output.handle.or_else(|| node.inherited.parent.clone()),
            modifiers: output.modifiers,
        };
        node.outgoing = outgoing.clone();
        node.updates += 1;
        self.stats.updated += 1;
        tracing::trace!("updated {} {:?}", node.identity(), id);

        self.reconcile_children(id, &outgoing, output.children)
    }

    /// Positional walk of the old children of `parent` against `elements`
    fn reconcile_children(
        &mut self,
        parent: HostId,
        outgoing: &RenderContext<B::Handle>,
        elements: Vec<Element>,
    ) -> Result<()> {
        let old: SmallVec<[HostId; 4]> = self.tree.children_of(Some(parent)).into();
        if old.is_empty() && elements.is_empty() {
            return Ok(());
        }

        let mut elements = elements.into_iter();
        let mut index = 0;
        for old_id in old {
            let Some(element) = elements.next() else {
                self.dismantle(old_id)?;
                continue;
            };
            self.reconcile_child(Some(parent), index, old_id, element, outgoing)?;
            index += 1;
        }
        for element in elements {
            self.mount(Some(parent), index, element, outgoing.clone())?;
            index += 1;
        }
        Ok(())
    }

    /// Update `old` in place when `element` has its identity, replace it otherwise
    fn reconcile_child(
        &mut self,
        parent: Option<HostId>,
        index: usize,
        old: HostId,
        element: Element,
        inherited: &RenderContext<B::Handle>,
    ) -> Result<HostId> {
        let node = self.tree.node_mut(old)?;
        if node.host.kind() == element.kind() && node.identity() == element.identity() {
            node.host.replace_element(element)?;
            node.inherited = inherited.clone();
            self.update(old)?;
            Ok(old)
        } else {
            tracing::trace!(
                "replacing {} with {} at {}",
                node.identity(),
                element.identity(),
                index
            );
            let id = self.mount(parent, index, element, inherited.clone())?;
            self.dismantle(old)?;
            Ok(id)
        }
    }

    /// Dismantle the subtree at `id` and detach it from its parent
    fn dismantle(&mut self, id: HostId) -> Result<()> {
        let parent = self.tree.get(id).ok_or(ReconcileError::UnknownHost(id))?.parent;
        self.dismantle_subtree(id)?;
        self.tree.children_mut(parent)?.retain(|child| *child != id);
        Ok(())
    }

    fn dismantle_subtree(&mut self, id: HostId) -> Result<()> {
        let node = self.tree.node_mut(id)?;
        node.host.dismantle(&mut self.backend, &node.inherited);
        let children = mem::take(&mut node.children);

        for child in children {
            self.dismantle_subtree(child)?;
        }

        self.tree.remove(id);
        self.stats.dismantled += 1;
        tracing::trace!("dismantled {:?}", id);
        Ok(())
    }

    /// Reconcile the root slot against `element`
    fn reconcile_root(&mut self, element: Element) -> Result<HostId> {
        let context = self.root_context.clone();
        let roots: SmallVec<[HostId; 4]> = self.tree.roots().into();
        let mut roots = roots.into_iter();

        let id = match roots.next() {
            Some(old) => self.reconcile_child(None, 0, old, element, &context)?,
            None => self.mount(None, 0, element, context)?,
        };
        for extra in roots {
            self.dismantle(extra)?;
        }
        Ok(id)
    }

    fn unmount_all(&mut self) -> Result<()> {
        let roots: SmallVec<[HostId; 4]> = self.tree.roots().into();
        for root in roots {
            self.dismantle(root)?;
        }
        Ok(())
    }

    fn stats(&self) -> ReconcileStats {
        ReconcileStats {
            live_nodes: self.tree.len(),
            ..self.stats
        }
    }
}

// =============================================================================
// SHARED
// =============================================================================

struct Shared<B: RenderingBackend> {
    core: RefCell<ReconcilerCore<B>>,
    scheduler: Rc<UpdateScheduler>,
    flush_callbacks: RefCell<Vec<Box<dyn FnMut()>>>,
}

impl<B: RenderingBackend> Shared<B> {
    fn core(&self) -> Result<std::cell::RefMut<'_, ReconcilerCore<B>>> {
        self.core
            .try_borrow_mut()
            .map_err(|_| ReconcileError::Reentrant)
    }

    fn core_ref(&self) -> Result<std::cell::Ref<'_, ReconcilerCore<B>>> {
        self.core.try_borrow().map_err(|_| ReconcileError::Reentrant)
    }

    fn flush(&self) -> Result<FlushReport> {
        let mut core = self.core()?;
        let batch = self.scheduler.take_pending();
        if batch.is_empty() {
            return Ok(FlushReport::default());
        }

        let mut report = FlushReport::default();
        for id in batch {
            if !core.tree.contains(id) {
                tracing::trace!("skipping dismantled host {:?}", id);
                report.skipped += 1;
                continue;
            }
            core.update(id)?;
            report.processed += 1;
        }

        core.stats.flushes += 1;
        tracing::debug!(
            "flush #{}: {} updated, {} skipped, {} live",
            core.stats.flushes,
            report.processed,
            report.skipped,
            core.tree.len()
        );
        if core.config.log_tree_after_flush {
            tracing::debug!("host tree after flush:\n{}", core.tree.dump());
        }
        drop(core);

        self.run_flush_callbacks();
        Ok(report)
    }

    fn run_flush_callbacks(&self) {
        // Callbacks may register further callbacks while running
        let mut callbacks = mem::take(&mut *self.flush_callbacks.borrow_mut());
        for callback in callbacks.iter_mut() {
            callback();
        }
        let mut registered = self.flush_callbacks.borrow_mut();
        callbacks.append(&mut registered);
        *registered = callbacks;
    }
}

// =============================================================================
// RECONCILER
// =============================================================================

/// Owner of the host tree, the rendering backend and the update queue.
///
/// # Example
///
/// ```ignore
/// let reconciler = Reconciler::new(backend, main_loop.hook());
/// reconciler.mount(Element::composite(App::default()), None)?;
///
/// // State writes inside event handlers enqueue updates...
/// main_loop.run_until_idle();
/// // ...and the hook ran one flush for all of them
/// ```
pub struct Reconciler<B: RenderingBackend + 'static> {
    shared: Rc<Shared<B>>,
}

impl<B: RenderingBackend + 'static> Reconciler<B> {
    /// Create a reconciler with the default configuration.
    ///
    /// `hook` must run the closure it receives later on the UI execution
    /// context, typically on the next main-loop turn.
    pub fn new(backend: B, hook: impl Fn(Box<dyn FnOnce()>) + 'static) -> Self {
        Self::with_config(backend, ReconcilerConfig::default(), hook)
    }

    pub fn with_config(
        backend: B,
        config: ReconcilerConfig,
        hook: impl Fn(Box<dyn FnOnce()>) + 'static,
    ) -> Self {
        let scheduler = Rc::new(UpdateScheduler::new(hook, config.coalesce_updates));
        let shared = Rc::new(Shared {
            core: RefCell::new(ReconcilerCore {
                tree: HostTree::new(),
                backend,
                config,
                root_context: RenderContext::default(),
                stats: ReconcileStats::default(),
                scheduler: scheduler.clone(),
            }),
            scheduler: scheduler.clone(),
            flush_callbacks: RefCell::new(Vec::new()),
        });

        let weak = Rc::downgrade(&shared);
        scheduler.install_flush(Rc::new(move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            if let Err(err) = shared.flush() {
                fatal(&err);
            }
        }));

        Self { shared }
    }

    /// Mount `element` as the root, attached under `container`.
    ///
    /// Any previously mounted root is dismantled first.
    pub fn mount(&self, element: Element, container: Option<B::Handle>) -> Result<HostId> {
        let mut core = self.shared.core()?;
        core.unmount_all()?;
        core.root_context = RenderContext {
            parent: container,
            modifiers: Default::default(),
        };
        let context = core.root_context.clone();
        let id = core.mount(None, 0, element, context)?;
        tracing::debug!("mounted root {:?} ({} hosts)", id, core.tree.len());
        Ok(id)
    }

    /// Reconcile the root against a new root element.
    ///
    /// A root with the same identity is updated in place; otherwise it is
    /// replaced.
    pub fn render(&self, element: Element) -> Result<HostId> {
        let mut core = self.shared.core()?;
        let id = core.reconcile_root(element)?;
        tracing::debug!("rendered root {:?} ({} hosts)", id, core.tree.len());
        Ok(id)
    }

    /// Dismantle the whole tree
    pub fn unmount(&self) -> Result<()> {
        let mut core = self.shared.core()?;
        core.unmount_all()?;
        tracing::debug!("unmounted");
        Ok(())
    }

    /// Synchronously update one host and its subtree
    pub fn update(&self, id: HostId) -> Result<()> {
        self.shared.core()?.update(id)
    }

    /// Queue `id` for the next flush, as a state change would
    pub fn schedule(&self, id: HostId) {
        self.shared.scheduler.enqueue(id);
    }

    /// Update every queued host now
    pub fn flush(&self) -> Result<FlushReport> {
        self.shared.flush()
    }

    /// Register a callback fired after every flush that updated something
    pub fn on_flush(&self, callback: impl FnMut() + 'static) {
        self.shared
            .flush_callbacks
            .borrow_mut()
            .push(Box::new(callback));
    }

    /// Number of hosts waiting for the next flush
    pub fn pending_updates(&self) -> usize {
        self.shared.scheduler.pending_len()
    }

    /// Number of flushes handed to the scheduling hook so far
    pub fn scheduled_flushes(&self) -> u64 {
        self.shared.scheduler.scheduled_flushes()
    }

    // Read access fails with `Reentrant` while a pass holds the tree, e.g.
    // when called from a component body or a backend callback.

    pub fn stats(&self) -> Result<ReconcileStats> {
        Ok(self.shared.core_ref()?.stats())
    }

    pub fn config(&self) -> Result<ReconcilerConfig> {
        Ok(self.shared.core_ref()?.config.clone())
    }

    /// Current root host
    pub fn root(&self) -> Result<Option<HostId>> {
        Ok(self.shared.core_ref()?.tree.roots().first().copied())
    }

    pub fn with_backend<R>(&self, f: impl FnOnce(&B) -> R) -> Result<R> {
        Ok(f(&self.shared.core_ref()?.backend))
    }

    pub fn with_backend_mut<R>(&self, f: impl FnOnce(&mut B) -> R) -> Result<R> {
        Ok(f(&mut self.shared.core()?.backend))
    }

    pub fn with_tree<R>(&self, f: impl FnOnce(&HostTree<B>) -> R) -> Result<R> {
        Ok(f(&self.shared.core_ref()?.tree))
    }

    /// Indented textual rendering of the host tree
    pub fn dump(&self) -> Result<String> {
        Ok(self.shared.core_ref()?.tree.dump())
    }
}

impl<B: RenderingBackend + 'static> fmt::Debug for Reconciler<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shared.core.try_borrow() {
            Ok(core) => f
                .debug_struct("Reconciler")
                .field("stats", &core.stats())
                .field("scheduler", &self.shared.scheduler)
                .finish(),
            Err(_) => f.write_str("Reconciler { <in pass> }"),
        }
    }
}
