//! Parallel runner (`spec.md` component H / § 5): data-parallel propagation
//! with no shared mutable state.

use rayon::prelude::*;

/// Partitions `n` particles across `workers` with `n_i` in
/// `{ceil(n/workers), floor(n/workers)}`, per `spec.md` 4.H.
pub fn partition_sizes(n: usize, workers: usize) -> Vec<usize> {
    let workers = workers.max(1);
    let base = n / workers;
    let rem = n % workers;
    (0..workers).map(|i| if i < rem { base + 1 } else { base }).collect()
}

/// Runs `propagate_one` over every item in `items`, scattered into
/// contiguous blocks across `workers` workers (a worker with `n_i = 0`
/// simply has no work, per `spec.md` 4.H). Within a block, items are
/// propagated sequentially in order; results are gathered back in the
/// original item order regardless of worker count, matching `spec.md` § 5's
/// ordering guarantee. `propagate_one` must not mutate any state shared
/// across items (each item owns any atmosphere/history/terrain state it
/// touches, or borrows read-only shared data).
pub fn run_ensemble<T, I, F>(items: &[I], workers: usize, propagate_one: F) -> Vec<T>
where
    T: Send,
    I: Sync,
    F: Fn(&I) -> T + Sync,
{
    if items.is_empty() {
        return Vec::new();
    }

    let sizes = partition_sizes(items.len(), workers);
    let mut offsets = Vec::with_capacity(sizes.len());
    let mut acc = 0usize;
    for &size in &sizes {
        offsets.push(acc);
        acc += size;
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .expect("failed to build ensemble thread pool");

    pool.install(|| {
        offsets
            .into_par_iter()
            .zip(sizes.into_par_iter())
            .flat_map_iter(|(offset, size)| {
                items[offset..offset + size].iter().map(&propagate_one)
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_sizes_sum_to_total() {
        let sizes = partition_sizes(17, 4);
        assert_eq!(sizes.iter().sum::<usize>(), 17);
        assert_eq!(sizes.len(), 4);
        assert!(sizes.iter().all(|&s| s == 4 || s == 5));
    }

    #[test]
    fn zero_particles_on_a_worker_is_allowed() {
        let sizes = partition_sizes(2, 5);
        assert_eq!(sizes.iter().sum::<usize>(), 2);
        assert!(sizes.iter().filter(|&&s| s == 0).count() >= 1);
    }

    #[test]
    fn order_is_preserved_regardless_of_worker_count() {
        let items: Vec<i32> = (0..50).collect();
        for workers in [1, 3, 7, 16] {
            let out = run_ensemble(&items, workers, |&x| x * 2);
            let expected: Vec<i32> = items.iter().map(|&x| x * 2).collect();
            assert_eq!(out, expected, "mismatch at workers={}", workers);
        }
    }
}
