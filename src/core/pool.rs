//! Bounded worker pool for background exports
//!
//! A fixed set of tokio tasks pulls work from a bounded backlog. Callers
//! reserve a backlog slot first and only then commit work to it, so a full
//! backlog is reported before any side effect happens.

use crate::config::WorkerConfig;
use crate::domain::{QuarryError, Result};
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, error::TrySendError, OwnedPermit};
use tokio::task::JoinHandle;

type Task = BoxFuture<'static, ()>;

/// Fixed-size pool of export workers
pub struct WorkerPool {
    sender: Mutex<Option<mpsc::Sender<Task>>>,
    workers: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
    pool_size: usize,
    queue_capacity: usize,
}

/// A reserved backlog slot
///
/// Dropping the slot without submitting gives the capacity back.
pub struct PoolSlot {
    permit: OwnedPermit<Task>,
}

impl PoolSlot {
    /// Hands work to the pool
    pub fn submit<F>(self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.permit.send(Box::pin(task));
    }
}

impl WorkerPool {
    /// Starts `pool_size` workers behind a backlog of `queue_capacity`
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(pool_size: usize, queue_capacity: usize) -> Self {
        let pool_size = pool_size.max(1);
        let queue_capacity = queue_capacity.max(1);
        let (sender, receiver) = mpsc::channel::<Task>(queue_capacity);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let workers = (0..pool_size)
            .map(|worker| {
                let receiver = Arc::clone(&receiver);
                tokio::spawn(async move {
                    loop {
                        let task = receiver.lock().await.recv().await;
                        let Some(task) = task else { break };

                        // Run on its own task so a panic surfaces as a JoinError.
                        if let Err(e) = tokio::spawn(task).await {
                            tracing::error!(worker, error = %e, "Export task aborted");
                        }
                    }
                    tracing::debug!(worker, "Export worker stopped");
                })
            })
            .collect();

        tracing::debug!(pool_size, queue_capacity, "Worker pool started");

        Self {
            sender: Mutex::new(Some(sender)),
            workers: tokio::sync::Mutex::new(workers),
            pool_size,
            queue_capacity,
        }
    }

    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(config.pool_size, config.queue_capacity)
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Claims a backlog slot without waiting
    ///
    /// # Errors
    ///
    /// [`QuarryError::Backpressure`] when the backlog is full,
    /// [`QuarryError::PoolClosed`] after shutdown.
    pub fn reserve(&self) -> Result<PoolSlot> {
        let sender = self
            .sender
            .lock()
            .map_err(|_| QuarryError::Other("worker pool lock poisoned".to_string()))?
            .clone()
            .ok_or(QuarryError::PoolClosed)?;

        match sender.try_reserve_owned() {
            Ok(permit) => Ok(PoolSlot { permit }),
            Err(TrySendError::Full(_)) => Err(QuarryError::Backpressure {
                capacity: self.queue_capacity,
            }),
            Err(TrySendError::Closed(_)) => Err(QuarryError::PoolClosed),
        }
    }

    /// Stops accepting work and waits for queued and running tasks to finish
    pub async fn shutdown(&self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
        let workers: Vec<JoinHandle<()>> = self.workers.lock().await.drain(..).collect();
        for worker in workers {
            if let Err(e) = worker.await {
                tracing::warn!(error = %e, "Worker ended abnormally");
            }
        }
        tracing::debug!("Worker pool drained");
    }
}
