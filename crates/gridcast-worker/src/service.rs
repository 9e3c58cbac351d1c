//! The reply endpoint: accept, compute, reply.
//!
//! The worker serves one broker at a time in strict lock-step: read one
//! request frame, compute it over the pool, write exactly one reply. It
//! never sends unsolicited frames. The loop ends on the exit sentinel, on
//! the idle timeout (counted while waiting for a connection as well as
//! between requests), or when the protocol is violated. A disconnecting
//! broker is not fatal; the worker goes back to accepting until the idle
//! timeout says otherwise.

use crate::config::WorkerConfig;
use crate::pool::manager::ComputePool;
use gridcast_core::kernel::Kernel;
use gridcast_core::{Error, Result, wire};
use std::io;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{Instant, timeout};

/// Why a connection's serve loop ended.
enum LoopExit {
    /// No request within the idle timeout.
    Idle,
    /// The exit sentinel arrived.
    Exit,
    /// The peer closed the connection.
    Disconnected,
}

/// One worker process: a listener plus its compute pool.
pub struct WorkerService {
    config: WorkerConfig,
    pool: ComputePool,
}

impl WorkerService {
    pub fn new(config: WorkerConfig, kernel: Arc<dyn Kernel>) -> Self {
        let pool = ComputePool::new(config.threads, kernel);
        Self { config, pool }
    }

    /// Binds the reply endpoint and serves until termination.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(("0.0.0.0", self.config.port)).await?;
        tracing::info!(
            port = self.config.port,
            threads = self.config.threads,
            "ready to work"
        );
        self.serve(listener).await
    }

    /// Serves an already-bound listener until termination.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        loop {
            let accepted = timeout(self.config.idle_timeout, listener.accept()).await;
            let (stream, peer) = match accepted {
                Ok(Ok(accepted)) => accepted,
                Ok(Err(e)) => return Err(Error::Transport(e)),
                Err(_) => {
                    tracing::info!("idle timeout with no connection, terminating");
                    return Ok(());
                }
            };
            stream.set_nodelay(true)?;
            tracing::debug!(%peer, "broker connected");

            match self.serve_conn(stream).await? {
                LoopExit::Idle => {
                    tracing::info!("idle timeout, terminating");
                    return Ok(());
                }
                LoopExit::Exit => {
                    tracing::info!("exit sentinel received, terminating");
                    return Ok(());
                }
                LoopExit::Disconnected => {
                    tracing::debug!(%peer, "broker disconnected");
                }
            }
        }
    }

    /// Lock-step request/reply loop over one connection.
    async fn serve_conn(&self, mut stream: TcpStream) -> Result<LoopExit> {
        loop {
            let body = match timeout(self.config.idle_timeout, wire::read_frame(&mut stream)).await
            {
                Ok(Ok(body)) => body,
                Ok(Err(Error::Transport(e))) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Ok(LoopExit::Disconnected);
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => return Ok(LoopExit::Idle),
            };
            if wire::is_exit(&body) {
                return Ok(LoopExit::Exit);
            }

            let blocks = wire::decode_payload(&body)?;
            let started = Instant::now();
            let results = self.pool.run_payload(blocks).await?;
            tracing::info!(
                blocks = results.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "payload computed"
            );
            wire::write_frame(&mut stream, &wire::encode_payload(&results)).await?;
        }
    }

    /// Shuts the compute pool down, waiting for task acknowledgements.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}
