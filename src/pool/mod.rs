//! Worker pool: a fixed set of threads draining a global queue plus their
//! own local queues, dispatched by one of two disciplines (see
//! [`stealing`] and [`balancing`]).

pub mod balancing;
pub mod stealing;

use std::sync::atomic::{AtomicBool, AtomicIsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::deque::Deque;
use crate::planner::{Task, TaskFuture};

/// Default size above which a worker's local queue is considered "rich"
/// enough to be worth stealing/balancing from. Doubles as the stealing
/// discipline's batch size.
pub const STEAL_THRESHOLD: isize = 1000;
pub const BALANCE_THRESHOLD: isize = 1000;

/// A background redistribution discipline run by every worker once per loop
/// iteration, after it has tried (and possibly failed) to run a task of its
/// own. Implementations only ever move tasks between queues via
/// `pop_top`/`push_bottom`; they never run one directly — a moved task
/// simply waits for the next loop iteration's `pop_call_task` on whichever
/// queue it landed in.
pub trait Dispatch: Send + Sync + 'static {
    /// `me` is an index into `workers`. `ran_task` reports whether this
    /// worker's own `pop_call_task` call this iteration actually ran a
    /// task, so a discipline that only acts on idle iterations (stealing)
    /// can gate on it.
    fn redistribute(
        &self,
        me: usize,
        workers: &[Arc<Deque<Box<dyn Task>>>],
        global: &Deque<Box<dyn Task>>,
        ran_task: bool,
    );
}

struct Shared {
    global: Deque<Box<dyn Task>>,
    workers: Vec<Arc<Deque<Box<dyn Task>>>>,
    shutdown: AtomicBool,
    pending: AtomicIsize,
}

/// A running pool of worker threads. Submitted tasks land on the global
/// queue; idle workers drain their own queue first, then the global queue,
/// then fall back to the pool's [`Dispatch`] discipline.
pub struct Pool {
    shared: Arc<Shared>,
    dispatch: Arc<dyn Dispatch>,
    handles: Vec<JoinHandle<()>>,
}

impl Pool {
    pub fn new(worker_count: usize, dispatch: Arc<dyn Dispatch>) -> Self {
        let workers = (0..worker_count)
            .map(|_| Arc::new(Deque::new()))
            .collect::<Vec<_>>();
        let shared = Arc::new(Shared {
            global: Deque::new(),
            workers,
            shutdown: AtomicBool::new(false),
            pending: AtomicIsize::new(0),
        });

        let mut handles = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let shared = shared.clone();
            let dispatch = dispatch.clone();
            handles.push(
                std::thread::Builder::new()
                    .name(format!("planner-worker-{id}"))
                    .spawn(move || worker_loop(id, shared, dispatch))
                    .expect("failed to spawn worker thread"),
            );
        }

        log::info!("pool started with {worker_count} workers");
        Pool {
            shared,
            dispatch,
            handles,
        }
    }

    /// Submits `task` to the global queue and returns a future tracking the
    /// tree's progress. Panics if called after `shutdown` (submit-after-shutdown
    /// is a programming bug, per the pool's contract, not a recoverable
    /// condition).
    pub fn submit(&self, task: Box<dyn Task>) -> TaskFuture {
        debug_assert!(
            !self.shared.shutdown.load(Ordering::Acquire),
            "submit called after shutdown"
        );
        let future = task.future();
        self.shared.pending.fetch_add(1, Ordering::AcqRel);
        self.shared.global.push_bottom(task);
        future
    }

    /// Blocks until every pending task has run, then signals shutdown and
    /// waits for every worker thread to notice and exit. Workers only check
    /// the shutdown flag once they find no work at all, and by the time it's
    /// set every submitted task is already guaranteed to have run, so no
    /// worker can observe it mid-task.
    pub fn shutdown(mut self) {
        while self.shared.pending.load(Ordering::Acquire) > 0 {
            std::thread::yield_now();
        }
        self.shared.shutdown.store(true, Ordering::Release);
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
        log::info!("pool shut down");
    }

    pub fn pending(&self) -> isize {
        self.shared.pending.load(Ordering::Acquire)
    }
}

/// Tries this worker's own queue first. If it's empty and the global queue
/// has work, grabs a batch sized `max(globalSize / workerCount, workerCount)`
/// from the global queue via `pop_top` (safe for every worker to call
/// concurrently) into the local queue via `push_bottom`, running nothing
/// this iteration. Returns whether a task was actually run.
fn pop_call_task(me: usize, shared: &Shared) -> bool {
    if let Some(task) = shared.workers[me].pop_bottom() {
        task.run();
        return true;
    }

    let global_size = shared.global.len();
    if global_size > 0 {
        let worker_count = shared.workers.len() as isize;
        let grab = (global_size / worker_count).max(worker_count);
        for _ in 0..grab {
            match shared.global.pop_top() {
                Some(task) => shared.workers[me].push_bottom(task),
                None => break,
            }
        }
    }
    false
}

fn worker_loop(id: usize, shared: Arc<Shared>, dispatch: Arc<dyn Dispatch>) {
    log::debug!("worker {id} entering loop");
    loop {
        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }
        let ran = pop_call_task(id, &shared);
        if ran {
            shared.pending.fetch_sub(1, Ordering::AcqRel);
        }
        dispatch.redistribute(id, &shared.workers, &shared.global, ran);
        if !ran {
            std::thread::yield_now();
        }
    }
    log::debug!("worker {id} exiting loop");
}
