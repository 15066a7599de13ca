//! Work-balancing dispatch: every worker probabilistically samples one peer
//! (itself included) and, only when the global queue is currently empty,
//! moves tasks from whichever side of that pairing is larger into the
//! smaller one. Unlike stealing, this runs whether or not the worker itself
//! just ran a task — the point is background load leveling, not idle-only
//! foraging.

use std::sync::Arc;

use rand::Rng;

use crate::deque::Deque;
use crate::planner::Task;

use super::{Dispatch, BALANCE_THRESHOLD};

pub struct BalancingDispatch;

impl BalancingDispatch {
    pub fn new() -> Self {
        BalancingDispatch
    }
}

impl Default for BalancingDispatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Moves `BALANCE_THRESHOLD / 2` tasks from whichever of `a`/`b` holds more
/// into the other, via `pop_top`→`push_bottom`. A no-op when `a` and `b` are
/// the same queue (self-selection), since the sizes are then always equal.
fn balance(a: &Deque<Box<dyn Task>>, b: &Deque<Box<dyn Task>>) {
    let amount = (BALANCE_THRESHOLD / 2).max(1);
    let (from, to) = if a.len() > b.len() {
        (a, b)
    } else if b.len() > a.len() {
        (b, a)
    } else {
        return;
    };
    for _ in 0..amount {
        match from.pop_top() {
            Some(task) => to.push_bottom(task),
            None => break,
        }
    }
}

impl Dispatch for BalancingDispatch {
    fn redistribute(
        &self,
        me: usize,
        workers: &[Arc<Deque<Box<dyn Task>>>],
        global: &Deque<Box<dyn Task>>,
        _ran_task: bool,
    ) {
        if !global.is_empty() {
            return;
        }

        let mine = &workers[me];
        let size = mine.len().max(0) as usize;
        let mut rng = rand::thread_rng();
        if rng.gen_range(0..=size) != size {
            return;
        }

        let peer_idx = rng.gen_range(0..workers.len());
        let peer = &workers[peer_idx];
        if (peer.len() - mine.len()).abs() < BALANCE_THRESHOLD {
            return;
        }

        balance(mine, peer);
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
    fn balance_moves_from_the_larger_side_into_the_smaller() {
        let tree = dummy_tree();
        let small: Arc<Deque<Box<dyn Task>>> = Arc::new(Deque::new());
        let large: Arc<Deque<Box<dyn Task>>> = Arc::new(Deque::new());
        for _ in 0..(BALANCE_THRESHOLD + 10) {
            large.push_bottom(Box::new(NoOp(tree.clone())) as Box<dyn Task>);
        }
        balance(&small, &large);
        assert!(!small.is_empty());
        assert!(large.len() < BALANCE_THRESHOLD + 10);

        // Direction-aware: now reversed, a surplus on the other side moves
        // back the other way.
        for _ in 0..(3 * BALANCE_THRESHOLD) {
            small.push_bottom(Box::new(NoOp(tree.clone())) as Box<dyn Task>);
        }
        let before_large = large.len();
        balance(&small, &large);
        assert!(large.len() > before_large);
    }

    #[test]
    fn balance_between_a_queue_and_itself_is_a_no_op() {
        let tree = dummy_tree();
        let q: Arc<Deque<Box<dyn Task>>> = Arc::new(Deque::new());
        for _ in 0..5 {
            q.push_bottom(Box::new(NoOp(tree.clone())) as Box<dyn Task>);
        }
        balance(&q, &q);
        assert_eq!(q.len(), 5);
    }

    #[test]
    fn does_nothing_while_the_global_queue_still_has_work() {
        let tree = dummy_tree();
        let mine: Arc<Deque<Box<dyn Task>>> = Arc::new(Deque::new());
        let peer: Arc<Deque<Box<dyn Task>>> = Arc::new(Deque::new());
        for _ in 0..(BALANCE_THRESHOLD + 10) {
            peer.push_bottom(Box::new(NoOp(tree.clone())) as Box<dyn Task>);
        }
        let workers = vec![mine.clone(), peer.clone()];
        let global: Deque<Box<dyn Task>> = Deque::new();
        global.push_bottom(Box::new(NoOp(tree.clone())) as Box<dyn Task>);

        let dispatch = BalancingDispatch::new();
        dispatch.redistribute(0, &workers, &global, false);
        assert!(mine.is_empty());
    }
}
