//! Update scheduling
//!
//! State changes never render synchronously. They enqueue the owning host;
//! the first enqueue into an empty queue hands one flush closure to the
//! platform scheduling hook ("run on the next main-loop turn"). Every change
//! arriving before that closure runs joins the same batch, so N mutations in
//! one turn cost one reconciliation pass.
//!
//! The flush drains a snapshot of the queue. Hosts enqueued while it runs wait
//! for the next scheduled flush.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::property::ChangeCallback;
use crate::tree::HostId;

/// Platform hook that runs a closure later on the UI execution context
pub type SchedulerHook = Box<dyn Fn(Box<dyn FnOnce()>)>;

/// FIFO queue of hosts waiting for an update
pub struct UpdateScheduler {
    pending: RefCell<VecDeque<HostId>>,
    /// Hosts currently in `pending`; only maintained when coalescing
    queued: RefCell<FxHashSet<HostId>>,
    coalesce: bool,
    hook: SchedulerHook,
    flush: RefCell<Option<Rc<dyn Fn()>>>,
    scheduled: Cell<u64>,
}

impl UpdateScheduler {
    pub fn new(hook: impl Fn(Box<dyn FnOnce()>) + 'static, coalesce: bool) -> Self {
        Self {
            pending: RefCell::new(VecDeque::new()),
            queued: RefCell::new(FxHashSet::default()),
            coalesce,
            hook: Box::new(hook),
            flush: RefCell::new(None),
            scheduled: Cell::new(0),
        }
    }

    /// Install the closure handed to the hook when a batch opens
    pub(crate) fn install_flush(&self, flush: Rc<dyn Fn()>) {
        *self.flush.borrow_mut() = Some(flush);
    }

    /// Request an update of `id`, scheduling a flush if the queue was empty
    pub fn enqueue(&self, id: HostId) {
        let was_empty = {
            let mut pending = self.pending.borrow_mut();
            if self.coalesce && !self.queued.borrow_mut().insert(id) {
                tracing::trace!("host {:?} already queued", id);
                return;
            }
            let was_empty = pending.is_empty();
            pending.push_back(id);
            was_empty
        };

        if was_empty {
            self.schedule_flush();
        }
    }

    fn schedule_flush(&self) {
        let Some(flush) = self.flush.borrow().clone() else {
            tracing::warn!("update enqueued before a flush was installed");
            return;
        };
        self.scheduled.set(self.scheduled.get() + 1);
        tracing::trace!("scheduling flush #{}", self.scheduled.get());
        (self.hook)(Box::new(move || flush()));
    }

    /// Take every queued host, leaving the queue empty
    pub fn take_pending(&self) -> Vec<HostId> {
        let batch: Vec<HostId> = self.pending.borrow_mut().drain(..).collect();
        self.queued.borrow_mut().clear();
        batch
    }

    pub fn pending_len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    /// Number of flush closures handed to the hook so far
    pub fn scheduled_flushes(&self) -> u64 {
        self.scheduled.get()
    }

    /// Change callback that enqueues `id`.
    ///
    /// Holds the scheduler weakly so state outliving the reconciler stays
    /// harmless.
    pub fn change_callback(self: &Rc<Self>, id: HostId) -> ChangeCallback {
        let scheduler = Rc::downgrade(self);
        Rc::new(move || {
            if let Some(scheduler) = scheduler.upgrade() {
                scheduler.enqueue(id);
            }
        })
    }
}

impl fmt::Debug for UpdateScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateScheduler")
            .field("pending", &self.pending.borrow())
            .field("coalesce", &self.coalesce)
            .field("scheduled", &self.scheduled.get())
            .finish()
    }
}
