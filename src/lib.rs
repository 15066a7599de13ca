//! Concurrent execution core for a parallel sampling-based RRT* motion
//! planner: a lock-free double-ended work queue, a two-discipline worker
//! pool, and a concurrently-mutated RRT* tree.

pub mod config;
pub mod deque;
pub mod error;
pub mod planner;
pub mod pool;
pub mod tree;

pub use config::ConfigSpace;
pub use deque::Deque;
pub use error::PlannerError;
pub use pool::Pool;
pub use tree::{Milestone, Point, Tree};
