//! Barrier-synchronized parallel-for over a fixed cell partition.
//!
//! Cell `id` always lands in partition `id % threads`, for every phase. A
//! phase hands each partition to the pool and returns only after all of
//! them finished, so the return of a phase call is the barrier the next
//! phase relies on. The pool threads are created once and reused.

use crate::cell::Cell;
use crate::error::Result;
use rayon::prelude::*;

pub struct WorkerPool {
    pool: rayon::ThreadPool,
    threads: usize,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Result<Self> {
        let threads = threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("superboids-worker-{i}"))
            .build()?;
        Ok(Self { pool, threads })
    }

    #[must_use]
    pub fn threads(&self) -> usize {
        self.threads
    }

    #[must_use]
    pub fn partition_of(&self, id: superboids_data::CellId) -> usize {
        id as usize % self.threads
    }

    fn partitions<'a>(&self, cells: &'a mut [Cell]) -> Vec<Vec<&'a mut Cell>> {
        let mut partitions: Vec<Vec<&'a mut Cell>> = (0..self.threads).map(|_| Vec::new()).collect();
        for cell in cells.iter_mut().filter(|c| c.is_active()) {
            let slot = self.partition_of(cell.id);
            partitions[slot].push(cell);
        }
        partitions
    }

    /// Runs `f` on every active cell and waits for all partitions.
    pub fn for_each_active<F>(&self, cells: &mut [Cell], f: F)
    where
        F: Fn(&mut Cell) + Sync,
    {
        let partitions = self.partitions(cells);
        let f = &f;
        self.pool.install(|| {
            partitions.into_par_iter().for_each(|part| {
                for cell in part {
                    f(cell);
                }
            });
        });
    }

    /// Like [`for_each_active`](Self::for_each_active), collecting one
    /// result per cell in partition order.
    pub fn map_active<R, F>(&self, cells: &mut [Cell], f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(&mut Cell) -> R + Sync,
    {
        let partitions = self.partitions(cells);
        let f = &f;
        let per_partition: Vec<Vec<R>> = self.pool.install(|| {
            partitions
                .into_par_iter()
                .map(|part| part.into_iter().map(f).collect())
                .collect()
        });
        per_partition.into_iter().flatten().collect()
    }

    /// Runs a read-only closure inside the pool.
    pub fn install<R, OP>(&self, op: OP) -> R
    where
        R: Send,
        OP: FnOnce() -> R + Send,
    {
        self.pool.install(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn population(count: u32) -> Vec<Cell> {
        (0..count)
            .map(|id| {
                let mut cell = Cell::new(id, 4, 1.0, 0);
                if id % 5 != 0 {
                    cell.activate(0);
                }
                cell
            })
            .collect()
    }

    #[test]
    fn test_visits_each_active_cell_once() {
        let pool = WorkerPool::new(3).unwrap();
        let mut cells = population(20);
        let visits = AtomicUsize::new(0);
        pool.for_each_active(&mut cells, |cell| {
            cell.gamma = Some(f64::from(cell.id));
            visits.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(visits.load(Ordering::Relaxed), 16);
        for cell in &cells {
            assert_eq!(cell.gamma.is_some(), cell.is_active());
        }
    }

    #[test]
    fn test_map_groups_by_partition() {
        let pool = WorkerPool::new(4).unwrap();
        let mut cells = population(12);
        let ids = pool.map_active(&mut cells, |cell| cell.id);
        let partitions: Vec<usize> = ids.iter().map(|&id| pool.partition_of(id)).collect();
        let mut sorted = partitions.clone();
        sorted.sort_unstable();
        assert_eq!(partitions, sorted);
        assert_eq!(ids.len(), 9);
    }

    #[test]
    fn test_zero_threads_becomes_one() {
        let pool = WorkerPool::new(0).unwrap();
        assert_eq!(pool.threads(), 1);
    }
}
