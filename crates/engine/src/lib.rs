pub mod engine;
pub mod executor;

pub use engine::{AllocationEngine, CycleReport, PoolRanking};
pub use executor::PaperExecutor;
