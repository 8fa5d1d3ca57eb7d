//! Bounded parallel work distribution
//!
//! Runs an index range `0..n` on a fixed pool of scoped worker threads. Workers
//! pull the next index from a shared atomic counter, so items with uneven cost
//! balance out on their own. There is no ordering between completions, no
//! cancellation and no timeout; every call waits for all items.
//!
//! Results come back in index order. A unit that wants to fail without taking
//! its siblings down should return a `Result` and let the caller aggregate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// Number of workers used for `n` items: available parallelism, capped at `n`.
pub fn worker_count(n: usize) -> usize {
    let available = thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(1);
    available.min(n)
}

/// Call `f` for every index in `0..n` and collect the results in index order.
pub fn map<T, F>(n: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync,
{
    map_with_jobs(worker_count(n), n, f)
}

/// Same as [`map`], with an explicit worker count. A count of 0 or 1 runs
/// everything on the calling thread.
pub fn map_with_jobs<T, F>(jobs: usize, n: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync,
{
    let jobs = jobs.min(n);
    if jobs <= 1 {
        return (0..n).map(f).collect();
    }

    let counter = AtomicUsize::new(0);
    let mut slots: Vec<Option<T>> = (0..n).map(|_| None).collect();

    thread::scope(|scope| {
        let counter = &counter;
        let f = &f;
        let workers: Vec<_> = (0..jobs)
            .map(|_| {
                scope.spawn(move || {
                    let mut done = Vec::new();
                    loop {
                        let index = counter.fetch_add(1, Ordering::Relaxed);
                        if index >= n {
                            break;
                        }
                        done.push((index, f(index)));
                    }
                    done
                })
            })
            .collect();

        for worker in workers {
            match worker.join() {
                Ok(done) => {
                    for (index, value) in done {
                        slots[index] = Some(value);
                    }
                }
                Err(payload) => std::panic::resume_unwind(payload),
            }
        }
    });

    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    #[test]
    fn test_map_preserves_order() {
        let out = map_with_jobs(4, 1000, |i| i * 2);
        assert_eq!(out.len(), 1000);
        for (i, v) in out.iter().enumerate() {
            assert_eq!(*v, i * 2);
        }
    }

    #[test]
    fn test_every_index_runs_once() {
        let hits: Vec<AtomicU64> = (0..257).map(|_| AtomicU64::new(0)).collect();
        map_with_jobs(8, hits.len(), |i| {
            hits[i].fetch_add(1, Ordering::Relaxed);
        });
        assert!(hits.iter().all(|h| h.load(Ordering::Relaxed) == 1));
    }

    #[test]
    fn test_empty_range() {
        let out: Vec<u32> = map(0, |_| 1);
        assert!(out.is_empty());
    }

    #[test]
    fn test_single_worker_runs_inline() {
        let caller = thread::current().id();
        let ids = map_with_jobs(1, 4, |_| thread::current().id());
        assert!(ids.iter().all(|id| *id == caller));
    }

    #[test]
    fn test_failures_do_not_stop_siblings() {
        let results = map_with_jobs(4, 20, |i| if i % 5 == 0 { Err(i) } else { Ok(i) });
        assert_eq!(results.len(), 20);
        let failed: Vec<usize> = results.iter().filter_map(|r| r.as_ref().err().copied()).collect();
        assert_eq!(failed, vec![0, 5, 10, 15]);
    }
}
