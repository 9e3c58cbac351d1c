use crate::pool::request::ComputeRequest;
use gridcast_core::kernel::Kernel;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Per-task compute loop.
///
/// Applies the kernel to each received block and sends the result back
/// tagged with the block's payload index. Runs until its channel closes or a
/// [`ComputeRequest::Shutdown`] arrives.
///
/// The kernel is CPU work with no await points, so each application runs on
/// a blocking thread instead of stalling the runtime.
pub async fn worker_loop(
    worker_id: usize,
    mut rx: mpsc::Receiver<ComputeRequest>,
    kernel: Arc<dyn Kernel>,
) {
    tracing::trace!("compute task {worker_id} started");

    while let Some(request) = rx.recv().await {
        match request {
            ComputeRequest::Block {
                index,
                block,
                result_tx,
            } => {
                let kernel = Arc::clone(&kernel);
                let result =
                    tokio::task::spawn_blocking(move || (index, kernel.apply(&block))).await;
                match result {
                    Ok(tagged) => {
                        // A closed result channel means the request was
                        // abandoned; nothing to do with the block.
                        if result_tx.send(tagged).await.is_err() {
                            tracing::debug!("compute task {worker_id} result dropped");
                        }
                    }
                    Err(e) => {
                        tracing::error!("compute task {worker_id} kernel panicked: {e}");
                    }
                }
            }
            ComputeRequest::Shutdown { response } => {
                tracing::debug!("compute task {worker_id} received shutdown signal");
                if response.send(()).is_err() {
                    tracing::error!("compute task {worker_id} failed to acknowledge shutdown");
                }
                break;
            }
        }
    }

    tracing::trace!("compute task {worker_id} stopped");
}
