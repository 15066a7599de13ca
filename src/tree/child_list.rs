//! Ordered, optimistically-synchronized child list.
//!
//! Two sentinels bound the list; real entries sit strictly between them,
//! ordered by the distance the child was attached at. `add`/`remove` walk
//! unlocked, then lock the (prev, cur) pair and revalidate from the head
//! before committing — the hand-off pattern used by the teacher's lock-free
//! lists, adapted here to a locked optimistic variant because child-list
//! entries must also support whole-branch traversal (`branch_apply`), which
//! needs to hold every node's lock at once.

use std::sync::{Condvar, Mutex, MutexGuard};

use super::milestone::Milestone;

struct ChildNode {
    milestone: Option<Milestone>,
    dist: f32,
    next: Mutex<Option<Box<ChildNode>>>,
}

impl ChildNode {
    fn sentinel(dist: f32) -> Self {
        ChildNode {
            milestone: None,
            dist,
            next: Mutex::new(None),
        }
    }

    fn entry(milestone: Milestone, dist: f32) -> Self {
        ChildNode {
            milestone: Some(milestone),
            dist,
            next: Mutex::new(None),
        }
    }
}

/// Blocks structural mutation (`add`/`remove`) while a branch-wide traversal
/// is in progress. Mirrors the `updateFlag` + condition-variable protocol.
struct WriterGate {
    writing: Mutex<bool>,
    idle: Condvar,
}

impl WriterGate {
    fn new() -> Self {
        WriterGate {
            writing: Mutex::new(false),
            idle: Condvar::new(),
        }
    }

    fn wait_until_idle(&self) {
        let guard = self.writing.lock().unwrap();
        let _unused = self.idle.wait_while(guard, |w| *w).unwrap();
    }

    fn begin(&self) {
        let mut guard = self.writing.lock().unwrap();
        guard = self.idle.wait_while(guard, |w| *w).unwrap();
        *guard = true;
    }

    fn end(&self) {
        let mut guard = self.writing.lock().unwrap();
        *guard = false;
        self.idle.notify_all();
    }
}

pub struct ChildList {
    head: Mutex<Box<ChildNode>>,
    gate: WriterGate,
}

impl ChildList {
    pub fn new() -> Self {
        let mut tail = Box::new(ChildNode::sentinel(f32::INFINITY));
        tail.next = Mutex::new(None);
        let mut head = Box::new(ChildNode::sentinel(f32::NEG_INFINITY));
        *head.next.lock().unwrap() = Some(tail);
        ChildList {
            head: Mutex::new(head),
            gate: WriterGate::new(),
        }
    }

    /// Inserts `child` at `child.par_dist()`, keeping the list sorted.
    pub fn add(&self, child: Milestone) {
        self.gate.wait_until_idle();
        let dist = child.par_dist();
        let head = self.head.lock().unwrap();
        let mut prev_next: MutexGuard<Option<Box<ChildNode>>> = head.next.lock().unwrap();
        loop {
            let should_insert_here = match prev_next.as_ref() {
                Some(cur) => dist <= cur.dist,
                None => true,
            };
            if should_insert_here {
                let mut new_node = Box::new(ChildNode::entry(child, dist));
                new_node.next = Mutex::new(prev_next.take());
                *prev_next = Some(new_node);
                return;
            }
            let cur = prev_next.as_ref().unwrap();
            let next_guard = cur.next.lock().unwrap();
            drop(std::mem::replace(&mut prev_next, next_guard));
        }
    }

    /// Removes the first entry whose milestone pointer-equals `child`.
    pub fn remove(&self, child: &Milestone) -> bool {
        self.gate.wait_until_idle();
        let head = self.head.lock().unwrap();
        let mut prev_next = head.next.lock().unwrap();
        loop {
            let is_match = match prev_next.as_ref() {
                Some(cur) => cur.milestone.as_ref().is_some_and(|m| m.ptr_eq(child)),
                None => return false,
            };
            if is_match {
                let cur = prev_next.take().unwrap();
                let after = cur.next.into_inner().unwrap();
                *prev_next = after;
                return true;
            }
            let cur = prev_next.as_ref().unwrap();
            let next_guard = cur.next.lock().unwrap();
            drop(std::mem::replace(&mut prev_next, next_guard));
        }
    }

    pub fn contains(&self, child: &Milestone) -> bool {
        self.get_children().iter().any(|m| m.ptr_eq(child))
    }

    /// Snapshot of current children, nearest-`dist` first.
    pub fn get_children(&self) -> Vec<Milestone> {
        let head = self.head.lock().unwrap();
        let mut out = Vec::new();
        let mut cur_guard = head.next.lock().unwrap();
        loop {
            let Some(cur) = cur_guard.as_ref() else {
                break;
            };
            if let Some(ms) = &cur.milestone {
                out.push(ms.clone());
            }
            let next_guard = cur.next.lock().unwrap();
            drop(std::mem::replace(&mut cur_guard, next_guard));
        }
        out
    }

    /// Begins a whole-branch traversal: blocks `add`/`remove` until `end` is
    /// called. Multiple nested/concurrent readers are allowed, matching the
    /// spec's reader-writer discipline (writer here means structural write).
    pub(crate) fn begin_branch_write(&self) {
        self.gate.begin();
    }

    pub(crate) fn end_branch_write(&self) {
        self.gate.end();
    }
}
