use gridcast_core::grid::Block;
use tokio::sync::{mpsc, oneshot};

/// A message a compute task accepts over its bounded channel.
#[derive(Debug)]
pub enum ComputeRequest {
    /// One block of the current payload. `index` is the block's position in
    /// the payload; the result is sent back tagged with it so the reply can
    /// be re-ordered to mirror the request.
    Block {
        index: usize,
        block: Block,
        result_tx: mpsc::Sender<(usize, Block)>,
    },
    /// Stop the task and acknowledge over the oneshot.
    Shutdown { response: oneshot::Sender<()> },
}
