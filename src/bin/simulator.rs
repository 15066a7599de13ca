//! `simulator <mode> <sample_size> <input_file> [<wb|ws> <threads>]`
//!
//! `mode=b` benchmarks elapsed wall-clock seconds; `mode=d` reports the
//! best distance to the goal found. Omitting the strategy/thread count
//! runs the sequential path (equivalent to one thread).

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;

use rrtstar_concurrent::config::ConfigSpace;
use rrtstar_concurrent::planner::{PlannerContext, Task, TaskFuture, UpdateTask};
use rrtstar_concurrent::pool::balancing::BalancingDispatch;
use rrtstar_concurrent::pool::stealing::StealingDispatch;
use rrtstar_concurrent::pool::{Dispatch, Pool};
use rrtstar_concurrent::tree::Tree;

#[derive(Parser)]
#[command(name = "simulator")]
struct Args {
    /// "b" for a benchmark timing report, "d" for a distance-to-goal report.
    mode: String,
    sample_size: usize,
    input_file: String,
    /// "ws" for work-stealing, "wb" for work-balancing.
    strategy: Option<String>,
    threads: Option<usize>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let config = match ConfigSpace::from_file(&args.input_file) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    let tree = Tree::new(config.start, config.goal, config.radius, config.delta);
    let context = Arc::new(PlannerContext {
        config: Arc::new(config),
        tree: Arc::new(tree),
    });

    let start = Instant::now();
    let last_future = match (&args.strategy, args.threads) {
        (Some(strategy), Some(threads)) if threads > 1 => {
            run_parallel(&context, args.sample_size, strategy, threads)
        }
        _ => run_sequential(&context, args.sample_size),
    };
    let elapsed = start.elapsed();

    match args.mode.as_str() {
        "b" => println!("{:.2}", elapsed.as_secs_f64()),
        "d" => {
            let dist = last_future
                .map(|f| f.get())
                .unwrap_or_else(|| context.tree.dist_to_goal());
            if dist != 0.0 {
                println!("{dist:.4}\nGoal!");
            } else {
                println!("{dist:.4}\nNo Goal!");
            }
        }
        other => {
            eprintln!("unknown mode {other:?}, expected \"b\" or \"d\"");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

fn run_sequential(context: &Arc<PlannerContext>, sample_size: usize) -> Option<TaskFuture> {
    let mut last = None;
    for _ in 0..sample_size {
        let task = UpdateTask::new(context.clone());
        task.run();
        last = Some(task.future());
    }
    last
}

fn run_parallel(
    context: &Arc<PlannerContext>,
    sample_size: usize,
    strategy: &str,
    threads: usize,
) -> Option<TaskFuture> {
    let dispatch: Arc<dyn Dispatch> = match strategy {
        "wb" => Arc::new(BalancingDispatch::new()),
        _ => Arc::new(StealingDispatch::new()),
    };
    let pool = Pool::new(threads, dispatch);
    let mut last = None;
    for _ in 0..sample_size {
        last = Some(pool.submit(Box::new(UpdateTask::new(context.clone()))));
    }
    pool.shutdown();
    last
}
