//! The [`ComputePool`]: a fixed set of compute tasks fed round-robin.
//!
//! Each task listens on its own bounded channel, so one payload's blocks
//! spread across the pool without contention or locking. Results come back
//! tagged with their payload index and are re-ordered before the reply, so
//! the lock-step count/order contract holds no matter how tasks interleave.

use crate::pool::request::ComputeRequest;
use crate::pool::worker::worker_loop;
use core::time::Duration;
use gridcast_core::grid::Block;
use gridcast_core::kernel::Kernel;
use gridcast_core::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// A cooperative pool of compute tasks processing [`ComputeRequest`]s.
pub struct ComputePool {
    workers: Vec<mpsc::Sender<ComputeRequest>>,
    next_worker: AtomicUsize,
    shutdown_token: CancellationToken,
}

impl ComputePool {
    /// Spawns `threads` compute tasks sharing one kernel.
    pub fn new(threads: usize, kernel: Arc<dyn Kernel>) -> Self {
        let threads = threads.max(1);
        let mut workers = Vec::with_capacity(threads);
        for worker_id in 0..threads {
            let (tx, rx) = mpsc::channel(1);
            tokio::spawn(worker_loop(worker_id, rx, Arc::clone(&kernel)));
            workers.push(tx);
        }
        Self {
            workers,
            next_worker: AtomicUsize::new(0),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Index of the next task to receive work (round-robin).
    fn next_worker_index(&self) -> usize {
        self.next_worker.fetch_add(1, Ordering::Relaxed) % self.workers.len()
    }

    /// Computes one payload, returning results in payload order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Channel`] if the pool is shut down, a task's channel
    /// is closed, or a result never arrives (a task died mid-payload).
    pub async fn run_payload(&self, blocks: Vec<Block>) -> Result<Vec<Block>> {
        if blocks.is_empty() {
            return Ok(Vec::new());
        }
        if self.shutdown_token.is_cancelled() {
            return Err(Error::Channel {
                context: "compute pool is shut down".to_string(),
            });
        }

        let count = blocks.len();
        let (result_tx, mut result_rx) = mpsc::channel(count);

        for (index, block) in blocks.into_iter().enumerate() {
            let worker_idx = self.next_worker_index();
            let request = ComputeRequest::Block {
                index,
                block,
                result_tx: result_tx.clone(),
            };
            self.workers[worker_idx].send(request).await.map_err(|_| {
                Error::Channel {
                    context: format!("compute task {worker_idx} channel closed"),
                }
            })?;
        }
        // Receivers detect completion by sender count reaching zero.
        drop(result_tx);

        let mut results: Vec<Option<Block>> = (0..count).map(|_| None).collect();
        let mut received = 0;
        while received < count {
            let Some((index, block)) = result_rx.recv().await else {
                return Err(Error::Channel {
                    context: format!("payload lost {} of {count} results", count - received),
                });
            };
            results[index] = Some(block);
            received += 1;
        }

        // Every slot is filled: `count` results arrived and indices are
        // unique by construction.
        Ok(results.into_iter().flatten().collect())
    }

    /// Gracefully shuts the pool down.
    ///
    /// Cancels the token so no new payloads start, then sends each task a
    /// shutdown request and waits up to 3 seconds per task for its
    /// acknowledgement.
    pub async fn shutdown(&self) {
        self.shutdown_token.cancel();

        let mut shutdown_handles = Vec::with_capacity(self.workers.len());
        for (i, worker) in self.workers.iter().enumerate() {
            let (tx, rx) = oneshot::channel();
            if let Err(e) = worker.send(ComputeRequest::Shutdown { response: tx }).await {
                tracing::error!("failed to send shutdown to compute task {i}: {e}");
            } else {
                shutdown_handles.push((i, rx));
            }
        }

        let timeout_futures = shutdown_handles.into_iter().map(|(i, rx)| async move {
            match timeout(Duration::from_secs(3), rx).await {
                Ok(Ok(())) => {
                    tracing::trace!("compute task {i} shutdown acknowledged");
                }
                Ok(Err(e)) => {
                    tracing::error!("compute task {i} dropped its acknowledgement: {e}");
                }
                Err(_) => {
                    tracing::warn!("compute task {i} shutdown timed out");
                }
            }
        });
        futures::future::join_all(timeout_futures).await;

        tracing::info!("compute pool shutdown complete");
    }
}
