//! Work-stealing dispatch: an idle worker samples one uniform-random peer
//! and steals a batch from it if, and only if, that one peer happens to be
//! over threshold. It never scans the whole worker set looking for the
//! richest one.

use std::sync::Arc;

use rand::Rng;

use crate::deque::Deque;
use crate::planner::Task;

use super::{Dispatch, STEAL_THRESHOLD};

pub struct StealingDispatch;

impl StealingDispatch {
    pub fn new() -> Self {
        StealingDispatch
    }
}

impl Default for StealingDispatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatch for StealingDispatch {
    fn redistribute(
        &self,
        me: usize,
        workers: &[Arc<Deque<Box<dyn Task>>>],
        _global: &Deque<Box<dyn Task>>,
        ran_task: bool,
    ) {
        // Only idle workers go looking for more work; a worker that just ran
        // something from its own queue leaves redistribution to whoever's
        // actually empty.
        if ran_task || workers.len() <= 1 {
            return;
        }

        let victim_idx = loop {
            let idx = rand::thread_rng().gen_range(0..workers.len());
            if idx != me {
                break idx;
            }
        };
        let victim = &workers[victim_idx];
        if victim.len() <= STEAL_THRESHOLD {
            return;
        }

        let mine = &workers[me];
        for _ in 0..STEAL_THRESHOLD {
            match victim.pop_top() {
                Some(task) => mine.push_bottom(task),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::TaskFuture;
    use crate::tree::{Point, Tree};

    struct NoOp(Arc<Tree>);
    impl Task for NoOp {
        fn run(&self) {}
        fn future(&self) -> TaskFuture {
            TaskFuture::new(self.0.clone())
        }
    }

    fn dummy_tree() -> Arc<Tree> {
        Arc::new(Tree::new(Point::new(0.0, 0.0), Point::new(1.0, 1.0), 1.0, 1.0))
    }

    #[test]
    fn moves_nothing_when_the_worker_just_ran_a_task() {
        let tree = dummy_tree();
        let mine: Arc<Deque<Box<dyn Task>>> = Arc::new(Deque::new());
        let rich: Arc<Deque<Box<dyn Task>>> = Arc::new(Deque::new());
        for _ in 0..(STEAL_THRESHOLD + 10) {
            rich.push_bottom(Box::new(NoOp(tree.clone())) as Box<dyn Task>);
        }
        let workers = vec![mine.clone(), rich.clone()];
        let global: Deque<Box<dyn Task>> = Deque::new();
        let dispatch = StealingDispatch::new();
        dispatch.redistribute(0, &workers, &global, true);
        assert_eq!(rich.len(), STEAL_THRESHOLD + 10);
        assert!(mine.is_empty());
    }

    #[test]
    fn steals_a_batch_only_when_the_sampled_peer_is_over_threshold() {
        let tree = dummy_tree();
        let mine: Arc<Deque<Box<dyn Task>>> = Arc::new(Deque::new());
        let rich: Arc<Deque<Box<dyn Task>>> = Arc::new(Deque::new());
        for _ in 0..(STEAL_THRESHOLD + 10) {
            rich.push_bottom(Box::new(NoOp(tree.clone())) as Box<dyn Task>);
        }
        let workers = vec![mine.clone(), rich.clone()];
        let global: Deque<Box<dyn Task>> = Deque::new();
        let dispatch = StealingDispatch::new();
        dispatch.redistribute(0, &workers, &global, false);
        assert!(!mine.is_empty());
        assert!(rich.len() < STEAL_THRESHOLD + 10);
    }

    #[test]
    fn a_single_worker_has_no_peer_to_steal_from() {
        let mine: Arc<Deque<Box<dyn Task>>> = Arc::new(Deque::new());
        let workers = vec![mine.clone()];
        let global: Deque<Box<dyn Task>> = Deque::new();
        let dispatch = StealingDispatch::new();
        dispatch.redistribute(0, &workers, &global, false);
        assert!(mine.is_empty());
    }
}
