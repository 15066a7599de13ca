//! RRT* work: the concrete `Task` the pool dispatches, and the planning
//! step it drives.

pub mod rrtstar;
pub mod sampler;

use std::sync::Arc;

use rand::rngs::ThreadRng;

use crate::config::ConfigSpace;
use crate::tree::Tree;

/// Opaque unit of work the pool can run. No result channel; a completed
/// task simply returns, but the pool still hands the submitter a
/// [`TaskFuture`] built from it at submission time.
pub trait Task: Send {
    fn run(&self);

    /// Builds the handle `Pool::submit` returns for this task.
    fn future(&self) -> TaskFuture;
}

/// Shared, read-mostly context every `UpdateTask` samples and mutates
/// against: the obstacle/window description and the tree being grown.
pub struct PlannerContext {
    pub config: Arc<ConfigSpace>,
    pub tree: Arc<Tree>,
}

/// One RRT* iteration: sample a point, and if it's feasible, attempt to
/// extend the tree toward it. Infeasible samples are a dropped sample, not
/// a task failure — `run` has nothing to report either way.
pub struct UpdateTask {
    context: Arc<PlannerContext>,
}

impl UpdateTask {
    pub fn new(context: Arc<PlannerContext>) -> Self {
        UpdateTask { context }
    }
}

impl Task for UpdateTask {
    fn run(&self) {
        let mut rng = ThreadRng::default();
        let point = sampler::sample_point(
            self.context.config.width,
            self.context.config.height,
            &mut rng,
        );
        rrtstar::step(&self.context.tree, &self.context.config, point);
    }

    fn future(&self) -> TaskFuture {
        TaskFuture::new(self.context.tree.clone())
    }
}

/// A thin, non-blocking handle to a submitted task's effect on the shared
/// tree. `get()` reads the tree's current best distance to the goal; it is
/// advisory only, since many other tasks may update that value concurrently.
pub struct TaskFuture {
    tree: Arc<Tree>,
}

impl TaskFuture {
    pub fn new(tree: Arc<Tree>) -> Self {
        TaskFuture { tree }
    }

    pub fn get(&self) -> f32 {
        self.tree.dist_to_goal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Point;

    #[test]
    fn update_task_run_does_not_panic_on_a_closed_window() {
        let config = Arc::new(ConfigSpace::parse("window,10,10\n"));
        let tree = Arc::new(Tree::new(Point::new(0.0, 0.0), Point::new(5.0, 5.0), 3.0, 1.0));
        let task = UpdateTask::new(Arc::new(PlannerContext {
            config,
            tree: tree.clone(),
        }));
        task.run();
    }

    #[test]
    fn task_future_reflects_tree_state() {
        let tree = Arc::new(Tree::new(Point::new(0.0, 0.0), Point::new(3.0, 4.0), 1.0, 1.0));
        let future = TaskFuture::new(tree.clone());
        assert_eq!(future.get(), 0.0);
        tree.goal().set_parent(tree.root(), 5.0);
        tree.root().set_child(tree.goal());
        tree.goal().set_cost(5.0);
        assert_eq!(future.get(), 5.0);
    }
}
