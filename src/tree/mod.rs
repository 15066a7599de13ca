//! The concurrently-mutated RRT* tree (the planner's "path plan").

pub mod child_list;
pub mod milestone;
pub mod point;

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Mutex;

pub use milestone::Milestone;
pub use point::Point;

/// Applies `f` to `node`, then to every node in its subtree, in pre-order.
/// Holds each visited child list's writer gate for the duration of the
/// traversal so no concurrent `add`/`remove` can observe a half-applied
/// update or outrun the walk.
pub fn branch_apply(node: &Milestone, f: &mut impl FnMut(&Milestone)) {
    f(node);
    node.children_list().begin_branch_write();
    let children = node.children_list().get_children();
    for child in &children {
        branch_apply(child, f);
    }
    node.children_list().end_branch_write();
}

struct NeighborItem {
    milestone: Milestone,
    dist: f32,
}

impl PartialEq for NeighborItem {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist
    }
}
impl Eq for NeighborItem {}

impl PartialOrd for NeighborItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NeighborItem {
    // Reversed so `BinaryHeap` (a max-heap) behaves as a min-heap on `dist`.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .dist
            .partial_cmp(&self.dist)
            .unwrap_or(Ordering::Equal)
    }
}

/// Min-heap of tree nodes ordered by distance to a query point, collected by
/// a `getNN` branch traversal.
struct NeighborHeap {
    heap: BinaryHeap<NeighborItem>,
}

impl NeighborHeap {
    fn new() -> Self {
        NeighborHeap {
            heap: BinaryHeap::new(),
        }
    }

    fn push(&mut self, milestone: Milestone, dist: f32) {
        self.heap.push(NeighborItem { milestone, dist });
    }

    fn pop_nearest(&mut self) -> Option<(Milestone, f32)> {
        self.heap.pop().map(|item| (item.milestone, item.dist))
    }
}

/// The RRT* tree itself: a root milestone, a goal milestone, and the
/// planner's radius/delta geometry parameters. The goal starts off the
/// tree proper (cost zero, no parent) and is attached as a child of
/// whichever milestone first comes within `radius` of it; from that point
/// on it's just another tree node, reachable via `branch_apply` from
/// `root` and eligible for rewiring like any other.
pub struct Tree {
    root: Milestone,
    goal: Milestone,
    radius: f32,
    delta: f32,
    nn_lock: Mutex<()>,
}

impl Tree {
    pub fn new(root_point: Point, goal_point: Point, radius: f32, delta: f32) -> Self {
        Tree {
            root: Milestone::new(root_point),
            goal: Milestone::new(goal_point),
            radius,
            delta,
            nn_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Milestone {
        &self.root
    }

    pub fn goal(&self) -> &Milestone {
        &self.goal
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// The best known distance from the tree to the goal: zero until the
    /// goal has been attached (I-T3), the goal's own accumulated path cost
    /// afterward.
    pub fn dist_to_goal(&self) -> f32 {
        self.goal.cost()
    }

    /// Finds the milestone nearest to `point` within `radius`, and every
    /// other milestone within `radius` of `point` (for rewiring candidates).
    /// Collects via a whole-tree `branch_apply`, serialized across
    /// concurrent callers so two `getNN` calls can't interleave their
    /// branch-lock acquisition and deadlock against each other.
    pub fn get_nn(&self, point: Point) -> (Option<Milestone>, Vec<Milestone>) {
        let _serialize = self.nn_lock.lock().unwrap();
        let mut heap = NeighborHeap::new();
        let mut within_radius = Vec::new();
        branch_apply(&self.root, &mut |node: &Milestone| {
            let dist = node.point().distance(&point);
            if dist <= self.radius {
                within_radius.push(node.clone());
            }
            heap.push(node.clone(), dist);
        });
        (heap.pop_nearest().map(|(m, _)| m), within_radius)
    }

    /// Reserves `node` for exclusive use by the current RRT* step.
    pub fn set_nn_occupied(&self, node: &Milestone) -> bool {
        node.try_occupy()
    }

    pub fn set_nn_unoccupied(&self, node: &Milestone) {
        node.release_occupy();
    }
}
