//! Fan-out of independent per-region work over scoped worker threads.

use std::num::NonZeroUsize;

/// Number of workers to use when the caller does not care.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Runs `work` on every item across at most `max_workers` threads and returns
/// the results in completion order.
///
/// Items are queued on a channel that the workers drain; results come back on
/// a second channel and are only assembled by the caller's thread, so the
/// workers share nothing mutable. `on_done(completed, total)` is called on the
/// caller's thread as each result arrives.
pub fn fan_out<T, R, F>(
    items: Vec<T>,
    max_workers: usize,
    work: F,
    mut on_done: impl FnMut(usize, usize),
) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    let total = items.len();
    if total == 0 {
        return Vec::new();
    }
    let workers = max_workers.clamp(1, total);

    let (task_tx, task_rx) = crossbeam_channel::bounded::<T>(total);
    let (result_tx, result_rx) = crossbeam_channel::bounded::<R>(total);
    for item in items {
        // Capacity equals the item count and the receiver is alive.
        let _ = task_tx.send(item);
    }
    drop(task_tx);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            let work = &work;
            scope.spawn(move || {
                for item in task_rx.iter() {
                    if result_tx.send(work(item)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        let mut results = Vec::with_capacity(total);
        for result in result_rx.iter() {
            results.push(result);
            on_done(results.len(), total);
        }
        results
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::single_worker(1)]
    #[case::fewer_workers_than_items(3)]
    #[case::more_workers_than_items(64)]
    fn test_every_item_is_processed_once(#[case] workers: usize) {
        let items: Vec<u32> = (0..20).collect();
        let mut results = fan_out(items, workers, |n| n * 2, |_, _| {});
        results.sort_unstable();
        assert_eq!(results, (0..20).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_progress_counts_up_to_total() {
        let mut seen = Vec::new();
        fan_out(vec![1, 2, 3], 2, |n: i32| n, |done, total| seen.push((done, total)));
        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_empty_input() {
        let results: Vec<i32> = fan_out(Vec::<i32>::new(), 4, |n| n, |_, _| panic!("no items"));
        assert!(results.is_empty());
    }

    #[test]
    fn test_default_workers_is_positive() {
        assert!(default_workers() >= 1);
    }
}
