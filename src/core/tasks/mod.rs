pub mod orchestrator;
pub mod supervisor;

pub use orchestrator::{run, RunOptions, RunSummary, TaskKind};
pub use supervisor::{TaskHandle, TaskOutcome, WorkerPool, DEFAULT_POOL_SIZE};
