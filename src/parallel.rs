use std::{num::NonZeroUsize, thread};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum WorkerCount {
    /// One worker per logical CPU
    #[default]
    Auto,
    Manual(NonZeroUsize),
}

impl WorkerCount {
    pub fn get(&self) -> usize {
        match self {
            WorkerCount::Auto => num_cpus::get(),
            WorkerCount::Manual(count) => count.get(),
        }
    }
}

/// Maps items to results on scoped worker threads, each worker taking a contiguous chunk.
/// Output order matches the input order.
/// A panic in any of the workers is propagated to the caller.
pub fn parallel_map<T, R, F>(items: &[T], worker_count: WorkerCount, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let worker_count = worker_count.get().min(items.len()).max(1);
    if worker_count == 1 {
        return items.iter().map(f).collect();
    }

    let chunk_size = items.len().div_ceil(worker_count);
    let f = &f;

    thread::scope(|scope| {
        let handles: Vec<_> = items
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || chunk.iter().map(f).collect::<Vec<_>>()))
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
            })
            .collect()
    })
}
