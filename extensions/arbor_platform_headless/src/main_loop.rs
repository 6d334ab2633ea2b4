//! Cooperative main loop
//!
//! A FIFO of deferred tasks standing in for a platform run loop. The
//! reconciler's scheduling hook posts its flush here; the embedder decides
//! when a turn runs.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

type Task = Box<dyn FnOnce()>;

#[derive(Default)]
struct Queue {
    tasks: RefCell<VecDeque<Task>>,
    executed: Cell<u64>,
}

/// Single-threaded task queue
#[derive(Clone, Default)]
pub struct MainLoop {
    queue: Rc<Queue>,
}

impl MainLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scheduling hook posting tasks to this loop
    pub fn hook(&self) -> impl Fn(Box<dyn FnOnce()>) + 'static {
        let queue = Rc::downgrade(&self.queue);
        move |task| match queue.upgrade() {
            Some(queue) => queue.tasks.borrow_mut().push_back(task),
            None => tracing::warn!("task posted to a dropped main loop"),
        }
    }

    /// Post a task for a later turn
    pub fn post(&self, task: impl FnOnce() + 'static) {
        self.queue.tasks.borrow_mut().push_back(Box::new(task));
    }

    /// Tasks waiting to run
    pub fn pending(&self) -> usize {
        self.queue.tasks.borrow().len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.tasks.borrow().is_empty()
    }

    /// Tasks run since creation
    pub fn executed(&self) -> u64 {
        self.queue.executed.get()
    }

    /// Run the oldest task, returning whether one ran
    pub fn turn(&self) -> bool {
        // Release the queue before running: tasks may post further tasks
        let task = self.queue.tasks.borrow_mut().pop_front();
        match task {
            Some(task) => {
                task();
                self.queue.executed.set(self.queue.executed.get() + 1);
                true
            }
            None => false,
        }
    }

    /// Run turns until no task is left, returning how many ran
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.turn() {
            ran += 1;
        }
        tracing::trace!("main loop idle after {} tasks", ran);
        ran
    }

    /// Run at most `limit` turns, returning how many ran
    pub fn run_turns(&self, limit: usize) -> usize {
        (0..limit).take_while(|_| self.turn()).count()
    }
}

impl fmt::Debug for MainLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainLoop")
            .field("pending", &self.pending())
            .field("executed", &self.executed())
            .finish()
    }
}
