//! CPU task fan-out.

mod pool;

pub use pool::WorkerPool;
