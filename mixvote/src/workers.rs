use crate::Error;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

/// Run `job(0..count)` on a dedicated pool of `nr_parallel` threads, returning results in index order.
///
/// With `nr_parallel == 0` the jobs run on the calling thread.
pub(crate) fn parallel_map<T, F>(nr_parallel: usize, count: usize, job: F) -> Result<Vec<T>, Error>
where
    T: Send,
    F: Fn(usize) -> T + Send + Sync,
{
    if nr_parallel == 0 {
        return Ok((0..count).map(job).collect());
    }

    let pool = ThreadPoolBuilder::new()
        .num_threads(nr_parallel)
        .build()
        .map_err(|e| Error::WorkerPool(e.to_string()))?;

    Ok(pool.install(|| (0..count).into_par_iter().map(job).collect()))
}
