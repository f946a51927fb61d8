//! Bounded parallel execution for per-task pipeline work

use futures::{stream::FuturesUnordered, Future, StreamExt};
use tokio::sync::Semaphore;

/// Context provided to each item of a batch
#[derive(Debug, Clone, Copy)]
pub struct TaskContext {
    /// Position of the item in the input (0-indexed)
    pub index: usize,
    /// Total number of items in this batch
    pub total_tasks: usize,
}

/// Execute items concurrently with at most `pool_size` running at once
///
/// Unlike a fail-fast batch, every item produces a value: per-task work in the
/// pipeline recovers locally instead of aborting its siblings.
///
/// # Returns
/// Results in input order, regardless of completion order
///
/// # Example
/// ```rust,ignore
/// let titles = execute_ordered(tasks, 4, |task, ctx| async move {
///     generate_title(ctx.index, task).await
/// })
/// .await;
/// ```
pub async fn execute_ordered<T, F, Fut, R>(items: Vec<T>, pool_size: usize, task_executor: F) -> Vec<R>
where
    F: Fn(T, TaskContext) -> Fut,
    Fut: Future<Output = R>,
{
    let total = items.len();
    let sem = Semaphore::new(pool_size.max(1));
    let sem = &sem;
    let executor = &task_executor;
    let mut tasks = FuturesUnordered::new();

    for (index, item) in items.into_iter().enumerate() {
        let ctx = TaskContext {
            index,
            total_tasks: total,
        };

        tasks.push(async move {
            // Acquire permit (waits while pool_size items are running).
            // The semaphore is local and never closed.
            let _permit = sem.acquire().await.ok();

            (index, executor(item, ctx).await)
        });
    }

    let mut results = Vec::with_capacity(total);
    while let Some(done) = tasks.next().await {
        results.push(done);
    }

    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, result)| result).collect()
}
