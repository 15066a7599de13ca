//! One RRT* step: sample, find neighbors, attach, rewire.

use crate::config::ConfigSpace;
use crate::tree::{Milestone, Point, Tree};

/// Reserves every candidate milestone a step is about to touch, in the
/// order they were discovered. If any reservation fails (another worker's
/// step already holds it), every reservation taken so far is released and
/// the step is abandoned — this sample is simply dropped, not retried; it
/// is not a programming-level failure.
struct Reservation<'a> {
    held: Vec<&'a Milestone>,
}

impl<'a> Reservation<'a> {
    fn acquire(tree: &Tree, candidates: &'a [Milestone]) -> Option<Self> {
        let mut held = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if tree.set_nn_occupied(candidate) {
                held.push(candidate);
            } else {
                for taken in &held {
                    tree.set_nn_unoccupied(taken);
                }
                return None;
            }
        }
        Some(Reservation { held })
    }

    fn release(self, tree: &Tree) {
        for node in self.held {
            tree.set_nn_unoccupied(node);
        }
    }
}

/// Runs a single RRT* extension step toward `sample`, if `sample` is
/// feasible. Returns `true` if a new milestone was attached to the tree.
pub fn step(tree: &Tree, config: &ConfigSpace, sample: Point) -> bool {
    if !config.feasible(sample) {
        return false;
    }

    let (nearest, mut neighbors) = tree.get_nn(sample);
    let Some(nearest) = nearest else {
        return false;
    };
    if !neighbors.iter().any(|n| n.ptr_eq(&nearest)) {
        neighbors.push(nearest.clone());
    }

    let Some(reservation) = Reservation::acquire(tree, &neighbors) else {
        return false;
    };

    let new_node = Milestone::new(sample);
    new_node.shorten_path_to_nearest(&nearest, tree.delta());
    if !config.feasible(new_node.point()) {
        reservation.release(tree);
        return false;
    }

    let best_parent = neighbors
        .iter()
        .min_by(|a, b| {
            let cost_a = a.cost() + a.point().distance(&new_node.point());
            let cost_b = b.cost() + b.point().distance(&new_node.point());
            cost_a.partial_cmp(&cost_b).unwrap()
        })
        .expect("neighbors is non-empty: nearest was pushed in if absent");

    let dist_to_parent = best_parent.point().distance(&new_node.point());
    new_node.set_parent(best_parent, dist_to_parent);
    best_parent.set_child(&new_node);
    new_node.set_cost(best_parent.cost() + dist_to_parent);

    // Connecting to the goal takes priority over rewiring this step: if the
    // goal isn't committed yet (I-T3: cost 0 iff no parent) and the new node
    // reaches it, attach the goal here and skip rewiring entirely.
    let mut goal_attached = false;
    if tree.set_nn_occupied(tree.goal()) {
        if tree.goal().cost() == 0.0 {
            let dist_to_goal = new_node.point().distance(&tree.goal().point());
            if dist_to_goal <= tree.radius() {
                tree.goal().set_parent(&new_node, dist_to_goal);
                new_node.set_child(tree.goal());
                tree.goal().set_cost(new_node.cost() + dist_to_goal);
                goal_attached = true;
            }
        }
        tree.set_nn_unoccupied(tree.goal());
    }

    if !goal_attached {
        for neighbor in &neighbors {
            let dist = neighbor.point().distance(&new_node.point());
            let candidate_cost = new_node.cost() + dist;
            if candidate_cost < neighbor.cost() {
                let delta = candidate_cost - neighbor.cost();
                neighbor.set_parent(&new_node, dist);
                new_node.set_child(neighbor);
                neighbor.update_cost(delta);
            }
        }
    }

    reservation.release(tree);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigSpace;

    fn empty_config(width: f32, height: f32) -> ConfigSpace {
        ConfigSpace::parse(&format!("window,{height},{width}\n"))
    }

    #[test]
    fn step_attaches_a_feasible_sample() {
        let config = empty_config(100.0, 100.0);
        let tree = Tree::new(Point::new(0.0, 0.0), Point::new(50.0, 50.0), 10.0, 2.0);
        assert!(step(&tree, &config, Point::new(1.0, 0.0)));
        assert_eq!(tree.root().children_list().get_children().len(), 1);
    }

    #[test]
    fn step_drops_an_infeasible_sample() {
        let config = empty_config(100.0, 100.0);
        let tree = Tree::new(Point::new(0.0, 0.0), Point::new(50.0, 50.0), 10.0, 2.0);
        assert!(!step(&tree, &config, Point::new(-1.0, -1.0)));
        assert_eq!(tree.root().children_list().get_children().len(), 0);
    }

    #[test]
    fn rewiring_lowers_a_neighbor_cost_when_the_new_node_is_cheaper() {
        let config = empty_config(100.0, 100.0);
        let tree = Tree::new(Point::new(0.0, 0.0), Point::new(50.0, 50.0), 50.0, 50.0);
        // A far, expensive first branch.
        assert!(step(&tree, &config, Point::new(10.0, 0.0)));
        let first = tree.root().children_list().get_children().remove(0);
        first.set_cost(100.0);

        // A new sample that gives `first` a cheaper path through it.
        assert!(step(&tree, &config, Point::new(1.0, 0.0)));
        assert!(first.cost() < 100.0);
    }

    #[test]
    fn a_sample_within_radius_of_the_goal_attaches_it_instead_of_rewiring() {
        let config = empty_config(100.0, 100.0);
        let tree = Tree::new(Point::new(0.0, 0.0), Point::new(5.0, 0.0), 10.0, 10.0);
        assert_eq!(tree.dist_to_goal(), 0.0);

        assert!(step(&tree, &config, Point::new(1.0, 0.0)));
        assert!(tree.goal().parent().is_some());
        assert!(tree.dist_to_goal() > 0.0);
    }

    #[test]
    fn the_goal_is_left_uncommitted_until_something_reaches_it() {
        let config = empty_config(100.0, 100.0);
        let tree = Tree::new(Point::new(0.0, 0.0), Point::new(90.0, 90.0), 5.0, 5.0);
        assert!(step(&tree, &config, Point::new(1.0, 0.0)));
        assert!(tree.goal().parent().is_none());
        assert_eq!(tree.dist_to_goal(), 0.0);
    }
}
