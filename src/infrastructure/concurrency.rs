//! Worker pool for batch runs.
//! Apps are independent, so the pool size is the only knob.

use anyhow::{Context, Result};
use tracing::info;

/// Default worker count: half the cores, at least one.
pub fn default_workers() -> usize {
    std::cmp::max(1, num_cpus::get() / 2)
}

/// Build a dedicated rayon pool. A local pool keeps tests and embedding
/// callers independent of the global one.
pub fn build_pool(threads: Option<usize>) -> Result<rayon::ThreadPool> {
    let workers = threads.filter(|&n| n > 0).unwrap_or_else(default_workers);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("uhg-worker-{i}"))
        .build()
        .context("failed to build worker pool")?;
    info!(workers, cores = num_cpus::get(), "worker pool ready");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_thread_count() {
        let pool = build_pool(Some(2)).unwrap();
        assert_eq!(pool.current_num_threads(), 2);
    }

    #[test]
    fn test_zero_falls_back_to_default() {
        let pool = build_pool(Some(0)).unwrap();
        assert_eq!(pool.current_num_threads(), default_workers());
    }
}
