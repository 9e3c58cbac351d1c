//! A single broker-side worker link.
//!
//! A [`WorkerConnection`] binds one remote worker's endpoint, its declared
//! thread capacity, and its message socket. The underlying protocol is
//! strict lock-step request/reply: the connection tracks whose turn it is
//! and turns any out-of-cadence send or receive into a
//! [`Error::Protocol`] instead of silently corrupting the round.

use crate::broker::BrokerOptions;
use gridcast_core::grid::Block;
use gridcast_core::{Error, Result, wire};
use std::io;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

/// Whose turn it is on a lock-step request/reply link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LinkState {
    /// Nothing outstanding; the next legal operation is a send.
    ReadyToSend,
    /// One request outstanding; the next legal operation is a receive.
    AwaitingReply,
}

/// One connected worker link, exclusively owned by the broker.
///
/// Invariant: the socket is connected before any send or receive is
/// attempted - enforced by construction, since the only way to obtain a
/// `WorkerConnection` is [`WorkerConnection::connect`].
#[derive(Debug)]
pub struct WorkerConnection {
    host: String,
    port: u16,
    threads: usize,
    stream: TcpStream,
    state: LinkState,
    /// Number of blocks sent in the outstanding request, if any.
    pending: usize,
}

impl WorkerConnection {
    /// Connects to a worker's reply endpoint, retrying while the remote
    /// process boots.
    pub async fn connect(
        host: &str,
        port: u16,
        threads: usize,
        opts: &BrokerOptions,
    ) -> Result<Self> {
        let addr = format!("{host}:{port}");
        let mut attempt = 0;
        let stream = loop {
            attempt += 1;
            let result = timeout(opts.connect_timeout, TcpStream::connect(&addr)).await;
            match result {
                Ok(Ok(stream)) => break stream,
                Ok(Err(e)) if attempt <= opts.connect_retries => {
                    tracing::debug!(%addr, attempt, error = %e, "connect failed, retrying");
                    sleep(opts.connect_retry_delay).await;
                }
                Ok(Err(e)) => return Err(Error::Transport(e)),
                Err(_) if attempt <= opts.connect_retries => {
                    tracing::debug!(%addr, attempt, "connect timed out, retrying");
                }
                Err(_) => {
                    return Err(Error::Transport(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("connecting to {addr} timed out"),
                    )));
                }
            }
        };
        stream.set_nodelay(true)?;
        tracing::debug!(%addr, threads, "worker connected");

        Ok(Self {
            host: host.to_string(),
            port,
            threads,
            stream,
            state: LinkState::ReadyToSend,
            pending: 0,
        })
    }

    /// Declared thread capacity: the run length this worker receives per
    /// round.
    pub const fn threads(&self) -> usize {
        self.threads
    }

    /// `host:port` label used in logs and error contexts.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `true` when a request is outstanding and a reply is owed.
    pub const fn awaiting_reply(&self) -> bool {
        matches!(self.state, LinkState::AwaitingReply)
    }

    /// Sends one round's payload for this worker.
    ///
    /// The payload may be shorter than the declared capacity, or empty, when
    /// fleet capacity exceeds the round's block count.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if a reply is still outstanding, or
    /// [`Error::Transport`] if the send fails. Transport failures are
    /// surfaced synchronously; there is no fire-and-forget path.
    pub async fn send_payload(&mut self, blocks: &[Block]) -> Result<()> {
        if self.state != LinkState::ReadyToSend {
            return Err(Error::Protocol {
                context: format!(
                    "send to {} while a reply is still outstanding",
                    self.endpoint()
                ),
            });
        }
        let body = wire::encode_payload(blocks);
        wire::write_frame(&mut self.stream, &body).await?;
        self.state = LinkState::AwaitingReply;
        self.pending = blocks.len();
        Ok(())
    }

    /// Receives one round's result blocks, bounded by `reply_timeout`.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if no request is outstanding or the reply's block
    /// count does not mirror the request; [`Error::Transport`] on socket
    /// failure or when the bounded wait elapses (the original design could
    /// block a round forever on a dead worker here).
    pub async fn recv_results(&mut self, opts: &BrokerOptions) -> Result<Vec<Block>> {
        if self.state != LinkState::AwaitingReply {
            return Err(Error::Protocol {
                context: format!("receive from {} with no request outstanding", self.endpoint()),
            });
        }

        let body = timeout(opts.reply_timeout, wire::read_frame(&mut self.stream))
            .await
            .map_err(|_| {
                Error::Transport(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!(
                        "no reply from {} within {:?}",
                        self.endpoint(),
                        opts.reply_timeout
                    ),
                ))
            })??;

        let results = wire::decode_payload(&body)?;
        self.state = LinkState::ReadyToSend;
        if results.len() != self.pending {
            return Err(Error::Protocol {
                context: format!(
                    "{} replied with {} blocks to a request of {}",
                    self.endpoint(),
                    results.len(),
                    self.pending
                ),
            });
        }
        self.pending = 0;
        Ok(results)
    }

    /// Sends the exit sentinel. Best-effort and deliberately exempt from the
    /// alternation guard: teardown must work even on a link stuck
    /// mid-round.
    pub async fn send_exit(&mut self) -> Result<()> {
        wire::write_frame(&mut self.stream, &wire::EXIT_SENTINEL).await
    }

    /// Closes the socket, consuming the connection.
    pub async fn shutdown(mut self) {
        use tokio::io::AsyncWriteExt;
        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!(endpoint = %self.endpoint(), error = %e, "socket shutdown failed");
        }
    }
}

#[cfg(test)]
mod tests;
