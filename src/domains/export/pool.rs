use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

use crate::types::EntityKind;

use super::types::{ItemError, PoolReport};

/// Fixed-size set of workers draining one entity type's queue.
///
/// The queue holds at most twice the worker count. `run` returns once every
/// worker has exited; dropping the `run` future aborts the workers.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self { workers: workers.max(1) }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Log every item for small types, every hundredth for the bulk ones
    fn progress_interval(kind: EntityKind) -> usize {
        match kind {
            EntityKind::Scene | EntityKind::Image | EntityKind::Gallery => 100,
            _ => 1,
        }
    }

    pub async fn run<T, F, Fut>(&self, kind: EntityKind, items: Vec<T>, handler: F) -> PoolReport
    where
        T: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ItemError>> + Send + 'static,
    {
        let total = items.len();
        let start = Instant::now();
        log::info!("[{}] exporting", kind);

        let (tx, rx) = mpsc::channel::<T>(self.workers * 2);
        let rx = Arc::new(Mutex::new(rx));
        let handler = Arc::new(handler);
        let written = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));

        let mut set = JoinSet::new();
        for _ in 0..self.workers {
            let rx = rx.clone();
            let handler = handler.clone();
            let written = written.clone();
            let failed = failed.clone();

            set.spawn(async move {
                loop {
                    // hold the lock only while waiting for the next item
                    let next = rx.lock().await.recv().await;
                    let Some(item) = next else { break };

                    match (*handler)(item).await {
                        Ok(()) => {
                            written.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            log::error!("[{}] {}", kind, e);
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            });
        }

        let interval = Self::progress_interval(kind);
        for (i, item) in items.into_iter().enumerate() {
            if i % interval == 0 {
                log::info!("[{}] {} of {}", kind, i + 1, total);
            }
            if tx.send(item).await.is_err() {
                log::error!("[{}] all workers exited before the queue was drained", kind);
                break;
            }
        }
        drop(tx);

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                log::error!("[{}] worker stopped abnormally: {}", kind, e);
            }
        }

        let elapsed = start.elapsed();
        log::info!(
            "[{}] export complete in {:?}. {} workers used.",
            kind,
            elapsed,
            self.workers
        );

        PoolReport {
            kind,
            resolved: total,
            written: written.load(Ordering::Relaxed),
            failed: failed.load(Ordering::Relaxed),
            workers: self.workers,
            elapsed,
        }
    }
}
