//! Bounded batch dispatch
//!
//! Runs an action against every item of a work list while keeping at most
//! `K` units of work in flight. The list is drained from the front in waves
//! of `min(K, remaining)` items; every item of a wave runs on its own worker
//! and the coordinating thread waits for the whole wave before forming the
//! next one.
//!
//! Failures are per item: an `Err` from the action is recorded in the
//! [`DispatchReport`] and neither its siblings nor later waves are affected.

use log::debug;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use crate::error::Result;

/// Runs work in waves on a fixed-size worker pool
pub struct BatchDispatcher {
    concurrency: NonZeroUsize,
    pool: rayon::ThreadPool,
}

impl BatchDispatcher {
    /// Create a dispatcher with a concurrency ceiling of `concurrency`
    ///
    /// The backing pool holds exactly `concurrency` worker threads.
    pub fn new(concurrency: NonZeroUsize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(concurrency.get())
            .thread_name(|index| format!("googlemail-dispatch-{}", index))
            .build()?;

        Ok(Self { concurrency, pool })
    }

    /// The concurrency ceiling
    pub fn concurrency(&self) -> NonZeroUsize {
        self.concurrency
    }

    /// Run `action` once for every item
    ///
    /// Returns once the queue is empty. Outcomes are in completion order,
    /// which within a wave is unspecified.
    pub fn dispatch<T, V, E, F>(&self, items: Vec<T>, action: F) -> DispatchReport<T, V, E>
    where
        T: Send,
        V: Send,
        E: Send,
        F: Fn(&T) -> std::result::Result<V, E> + Sync,
    {
        let mut queue: VecDeque<T> = items.into();
        let mut report = DispatchReport::with_capacity(queue.len());
        let action = &action;

        while !queue.is_empty() {
            let wave_size = self.concurrency.get().min(queue.len());
            let wave: Vec<T> = queue.drain(..wave_size).collect();
            debug!(
                "Dispatching wave {} ({} items, {} queued)",
                report.wave_sizes.len() + 1,
                wave_size,
                queue.len()
            );

            let completed = Mutex::new(Vec::with_capacity(wave_size));
            let completed_ref = &completed;

            // `scope` returns only after every spawned unit has finished.
            self.pool.scope(move |scope| {
                for item in wave {
                    scope.spawn(move |_| {
                        let outcome = action(&item);
                        completed_ref
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push((item, outcome));
                    });
                }
            });

            let completed = completed
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner);
            report.outcomes.extend(completed);
            report.wave_sizes.push(wave_size);
        }

        debug!(
            "Dispatch finished: {} items in {} waves ({} failed)",
            report.len(),
            report.wave_sizes.len(),
            report.failure_count()
        );
        report
    }
}

/// Per-item outcomes of one dispatch
#[derive(Debug)]
pub struct DispatchReport<T, V, E> {
    outcomes: Vec<(T, std::result::Result<V, E>)>,
    wave_sizes: Vec<usize>,
}

impl<T, V, E> DispatchReport<T, V, E> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            outcomes: Vec::with_capacity(capacity),
            wave_sizes: Vec::new(),
        }
    }

    /// Number of processed items
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Size of each wave, in dispatch order
    pub fn wave_sizes(&self) -> &[usize] {
        &self.wave_sizes
    }

    /// All outcomes, in completion order
    pub fn outcomes(&self) -> &[(T, std::result::Result<V, E>)] {
        &self.outcomes
    }

    /// Items whose action succeeded, with their values
    pub fn successes(&self) -> impl Iterator<Item = (&T, &V)> {
        self.outcomes
            .iter()
            .filter_map(|(item, outcome)| outcome.as_ref().ok().map(|v| (item, v)))
    }

    /// Items whose action failed, with their errors
    pub fn failures(&self) -> impl Iterator<Item = (&T, &E)> {
        self.outcomes
            .iter()
            .filter_map(|(item, outcome)| outcome.as_ref().err().map(|e| (item, e)))
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_err()).count()
    }

    pub fn into_outcomes(self) -> Vec<(T, std::result::Result<V, E>)> {
        self.outcomes
    }

    /// Split into successful values and failed items
    pub fn partition(self) -> (Vec<(T, V)>, Vec<(T, E)>) {
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for (item, outcome) in self.outcomes {
            match outcome {
                Ok(value) => succeeded.push((item, value)),
                Err(err) => failed.push((item, err)),
            }
        }
        (succeeded, failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn dispatcher(k: usize) -> BatchDispatcher {
        BatchDispatcher::new(NonZeroUsize::new(k).unwrap()).unwrap()
    }

    #[test]
    fn test_five_items_ceiling_two() {
        let items = vec!["a", "b", "c", "d", "e"];
        let calls = AtomicUsize::new(0);

        let report = dispatcher(2).dispatch(items, |item| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(item.to_uppercase())
        });

        assert_eq!(report.wave_sizes(), &[2, 2, 1]);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(report.len(), 5);

        let values: HashSet<String> = report.successes().map(|(_, v)| v.clone()).collect();
        let expected: HashSet<String> = ["A", "B", "C", "D", "E"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn test_single_item_large_ceiling() {
        let report = dispatcher(10).dispatch(vec!["x"], |_| Ok::<_, ()>(()));
        assert_eq!(report.wave_sizes(), &[1]);
        assert_eq!(report.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        let calls = AtomicUsize::new(0);
        let report = dispatcher(3).dispatch(Vec::<u32>::new(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(())
        });

        assert!(report.is_empty());
        assert!(report.wave_sizes().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failures_do_not_stop_batch() {
        let items: Vec<u32> = (0..7).collect();

        let report = dispatcher(3).dispatch(items, |n| {
            if n % 3 == 1 {
                Err(format!("item {} failed", n))
            } else {
                Ok(n * 10)
            }
        });

        assert_eq!(report.len(), 7);
        assert_eq!(report.failure_count(), 2);

        let (succeeded, failed) = report.partition();
        let mut failed_items: Vec<u32> = failed.into_iter().map(|(n, _)| n).collect();
        failed_items.sort();
        assert_eq!(failed_items, vec![1, 4]);
        assert_eq!(succeeded.len(), 5);
    }

    #[test]
    fn test_ceiling_one_is_sequential() {
        let in_flight = AtomicUsize::new(0);
        let max_in_flight = AtomicUsize::new(0);
        let order = Mutex::new(Vec::new());

        let report = dispatcher(1).dispatch((0..5).collect::<Vec<u32>>(), |n| {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max_in_flight.fetch_max(now, Ordering::SeqCst);
            order.lock().unwrap().push(*n);
            thread::sleep(Duration::from_millis(2));
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok::<_, ()>(())
        });

        assert_eq!(report.wave_sizes(), &[1, 1, 1, 1, 1]);
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_concurrency_never_exceeds_ceiling() {
        let in_flight = AtomicUsize::new(0);
        let max_in_flight = AtomicUsize::new(0);

        dispatcher(4).dispatch((0..23).collect::<Vec<u32>>(), |_| {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max_in_flight.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(3));
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok::<_, ()>(())
        });

        let observed = max_in_flight.load(Ordering::SeqCst);
        assert!(observed >= 1 && observed <= 4, "observed {}", observed);
    }

    #[test]
    fn test_wave_barrier() {
        // Each unit records how many units had finished when it started.
        // Items of wave w (0-based, K = 3) must all see at least 3 * w.
        let finished = AtomicUsize::new(0);
        let started_after = Mutex::new(Vec::new());

        dispatcher(3).dispatch((0..10).collect::<Vec<usize>>(), |index| {
            let seen = finished.load(Ordering::SeqCst);
            started_after.lock().unwrap().push((*index, seen));
            thread::sleep(Duration::from_millis(2));
            finished.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(())
        });

        for (index, seen) in started_after.into_inner().unwrap() {
            let wave = index / 3;
            assert!(
                seen >= wave * 3,
                "item {} started after only {} completions",
                index,
                seen
            );
        }
    }
}
