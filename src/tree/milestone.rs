//! Milestone: a node of the concurrently-mutated RRT* tree.
//!
//! A milestone owns its children (through its [`ChildList`]) and holds a
//! non-owning back-reference to its parent, per the tree's design notes:
//! parent and child are the same logical edge represented twice, so one
//! direction must be a [`Weak`] reference to avoid a reference cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use super::child_list::ChildList;
use super::point::Point;

struct ParentLink {
    parent: Option<Weak<MilestoneInner>>,
    par_dist: f32,
}

struct MilestoneInner {
    point: Mutex<Point>,
    parent: Mutex<ParentLink>,
    children: ChildList,
    cost: Mutex<f32>,
    occupied: AtomicBool,
}

/// A node of the RRT* tree. Cheap to clone (an `Arc` handle); all mutation
/// goes through interior mutability on the shared [`MilestoneInner`].
#[derive(Clone)]
pub struct Milestone(Arc<MilestoneInner>);

impl Milestone {
    /// Creates a new, unparented milestone at `point`. Assumes `point` is
    /// feasible; the caller checks that before constructing a `Milestone`.
    pub fn new(point: Point) -> Self {
        Milestone(Arc::new(MilestoneInner {
            point: Mutex::new(point),
            parent: Mutex::new(ParentLink {
                parent: None,
                par_dist: 0.0,
            }),
            children: ChildList::new(),
            cost: Mutex::new(0.0),
            occupied: AtomicBool::new(false),
        }))
    }

    pub fn point(&self) -> Point {
        *self.0.point.lock().unwrap()
    }

    pub fn cost(&self) -> f32 {
        *self.0.cost.lock().unwrap()
    }

    pub fn par_dist(&self) -> f32 {
        self.0.parent.lock().unwrap().par_dist
    }

    pub fn parent(&self) -> Option<Milestone> {
        self.0
            .parent
            .lock()
            .unwrap()
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(Milestone)
    }

    pub(crate) fn children_list(&self) -> &ChildList {
        &self.0.children
    }

    /// `true` while some worker holds logical exclusive use of this node.
    pub fn is_occupied(&self) -> bool {
        self.0.occupied.load(Ordering::Acquire)
    }

    /// Reserves this node (0 -> 1). Returns whether the reservation succeeded.
    pub(crate) fn try_occupy(&self) -> bool {
        self.0
            .occupied
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    /// Releases a reservation (1 -> 0). Idempotent: releasing an already-free
    /// node is a silent no-op, matching the spec's "idempotent unreserve" law.
    pub(crate) fn release_occupy(&self) {
        let _ = self
            .0
            .occupied
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Relaxed);
    }

    /// Adds `child` to this node's child list, at the cost it carries right
    /// now. The child's cost is frozen at insertion time and is not revised
    /// if the child's cost changes later (the list is an insertion-time
    /// ordered snapshot, not a live-sorted structure).
    pub fn set_child(&self, child: &Milestone) {
        self.0.children.add(child.clone());
    }

    /// Removes `child` from this node's child list, if present.
    pub fn remove_child(&self, child: &Milestone) -> bool {
        self.0.children.remove(child)
    }

    /// Sets this milestone's parent, unlinking it from any previous parent's
    /// child list first so a rewire never leaves it double-owned.
    pub fn set_parent(&self, parent: &Milestone, dist: f32) {
        let old_parent = {
            let mut link = self.0.parent.lock().unwrap();
            let old = link.parent.as_ref().and_then(Weak::upgrade).map(Milestone);
            link.parent = Some(Arc::downgrade(&parent.0));
            link.par_dist = dist;
            old
        };
        if let Some(old_parent) = old_parent {
            old_parent.remove_child(self);
        }
    }

    pub fn set_cost(&self, cost: f32) {
        *self.0.cost.lock().unwrap() = cost;
    }

    /// Adds `delta` to this node's cost, then propagates the same delta to
    /// every descendant via a whole-subtree `branch_apply`. `delta` may be
    /// negative: rewiring can shorten a subtree's accumulated cost.
    pub fn update_cost(&self, delta: f32) {
        self.set_cost(self.cost() + delta);
        for child in self.0.children.get_children() {
            super::branch_apply(&child, &mut |node: &Milestone| {
                node.set_cost(node.cost() + delta);
            });
        }
    }

    /// Replaces this milestone's point with a point `min(delta, |p -
    /// nearest|)` away from `nearest`, along the ray from `nearest` toward
    /// the current point.
    pub fn shorten_path_to_nearest(&self, nearest: &Milestone, delta: f32) {
        let nearest_point = nearest.point();
        let mut point = self.0.point.lock().unwrap();
        let length = point.distance(&nearest_point);
        if length == 0.0 {
            return;
        }
        let delta = delta.min(length);
        point.x = nearest_point.x + (point.x - nearest_point.x) * delta / length;
        point.y = nearest_point.y + (point.y - nearest_point.y) * delta / length;
    }

    pub(crate) fn ptr_eq(&self, other: &Milestone) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Milestone {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}
