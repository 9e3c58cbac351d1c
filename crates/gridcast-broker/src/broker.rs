//! Fleet coordination: open, dispatch, collect, close.
//!
//! The broker is a single control task performing round-synchronous
//! dispatch/collect across all worker connections. Within a round, all
//! sends happen, then all receives happen, then the grid is mutated - the
//! fleet computes in parallel but advances in lock step, so per-round
//! latency is bounded by the slowest worker.

use crate::connection::WorkerConnection;
use crate::launch::{CredentialProvider, RemoteLauncher};
use crate::roster::Roster;
use gridcast_core::decompose::{Tiling, decompose, reassemble};
use gridcast_core::grid::{Block, Grid};
use gridcast_core::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

/// Timing knobs for connection setup and bounded reply waits.
#[derive(Clone, Debug)]
pub struct BrokerOptions {
    /// Per-attempt TCP connect timeout.
    pub connect_timeout: Duration,
    /// Retries while the remote worker process boots.
    pub connect_retries: u32,
    /// Delay between connect attempts.
    pub connect_retry_delay: Duration,
    /// Bounded wait for each reply during collect. A worker that exceeds it
    /// fails the round instead of wedging the fleet.
    pub reply_timeout: Duration,
}

impl Default for BrokerOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            connect_retries: 20,
            connect_retry_delay: Duration::from_millis(250),
            reply_timeout: Duration::from_secs(120),
        }
    }
}

/// Owns the roster of worker connections and the remote-execution sessions
/// behind them.
///
/// Lifecycle is bracketed: [`Broker::open`] launches and connects the whole
/// fleet (tearing down anything partial on failure), and [`Broker::close`]
/// releases everything, including after mid-run errors.
#[derive(Debug)]
pub struct Broker {
    connections: Vec<WorkerConnection>,
    launcher: Option<RemoteLauncher>,
    total_threads: usize,
    opts: BrokerOptions,
}

impl Broker {
    /// Launches one remote worker per roster entry and connects a message
    /// socket to each.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the roster's total thread capacity is not
    /// positive (nothing is launched in that case). Launch or connect
    /// failures abort startup; the partially started fleet is torn down
    /// best-effort before the error is returned.
    pub async fn open(roster: &Roster, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        Self::open_with_options(roster, credentials, BrokerOptions::default()).await
    }

    pub async fn open_with_options(
        roster: &Roster,
        credentials: Arc<dyn CredentialProvider>,
        opts: BrokerOptions,
    ) -> Result<Self> {
        let total_threads = roster.total_threads();
        if total_threads == 0 {
            return Err(Error::Config {
                reason: "roster declares no worker threads".to_string(),
            });
        }

        let mut launcher = RemoteLauncher::new(credentials);
        let mut connections = Vec::with_capacity(roster.entries().len());

        for entry in roster.entries() {
            let connected = match launcher.launch(entry).await {
                Ok(()) => {
                    WorkerConnection::connect(&entry.host, entry.port, entry.threads, &opts).await
                }
                Err(e) => Err(e),
            };
            match connected {
                Ok(conn) => connections.push(conn),
                Err(e) => {
                    tracing::error!(endpoint = %entry.endpoint(), error = %e, "startup failed");
                    Self::teardown(connections, Some(launcher)).await;
                    return Err(e);
                }
            }
        }

        tracing::info!(
            workers = connections.len(),
            total_threads,
            "fleet launched and connected"
        );
        Ok(Self {
            connections,
            launcher: Some(launcher),
            total_threads,
            opts,
        })
    }

    /// Builds a broker over already-connected workers, e.g. a fleet started
    /// by hand or by tests. No remote-execution sessions are held.
    pub fn from_connections(connections: Vec<WorkerConnection>, opts: BrokerOptions) -> Result<Self> {
        let total_threads = connections.iter().map(WorkerConnection::threads).sum();
        if total_threads == 0 {
            return Err(Error::Config {
                reason: "connections declare no worker threads".to_string(),
            });
        }
        Ok(Self {
            connections,
            launcher: None,
            total_threads,
            opts,
        })
    }

    /// Total declared thread capacity across the fleet; also the number of
    /// tiles produced per round by [`Broker::step`].
    pub const fn total_threads(&self) -> usize {
        self.total_threads
    }

    /// Sends one round's blocks to the fleet.
    ///
    /// Blocks are partitioned into contiguous runs in roster order, one run
    /// per connection, each run as long as that worker's declared thread
    /// capacity. Trailing capacity that the round does not fill receives a
    /// shorter (possibly empty) payload, keeping the request/reply cadence
    /// uniform across the fleet. An empty round is a no-op.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if `blocks` exceeds fleet capacity or a
    /// connection is still awaiting a reply; [`Error::Transport`] if a send
    /// fails - surfaced here, synchronously, not deferred to collect.
    pub async fn dispatch(&mut self, blocks: &[Block]) -> Result<()> {
        if blocks.is_empty() {
            return Ok(());
        }
        if blocks.len() > self.total_threads {
            return Err(Error::Protocol {
                context: format!(
                    "dispatch of {} blocks exceeds fleet capacity of {}",
                    blocks.len(),
                    self.total_threads
                ),
            });
        }

        let mut cursor = 0;
        for conn in &mut self.connections {
            let take = conn.threads().min(blocks.len() - cursor);
            let run = &blocks[cursor..cursor + take];
            cursor += take;
            conn.send_payload(run).await?;
        }
        Ok(())
    }

    /// Collects one round's results, in roster order.
    ///
    /// Returns the concatenation of every worker's result blocks; its length
    /// and positional order mirror the sequence passed to the preceding
    /// [`Broker::dispatch`] exactly. Connections with no outstanding request
    /// (or an empty fleet) contribute nothing.
    pub async fn collect(&mut self) -> Result<Vec<Block>> {
        let mut results = Vec::new();
        for conn in &mut self.connections {
            if !conn.awaiting_reply() {
                continue;
            }
            results.extend(conn.recv_results(&self.opts).await?);
        }
        Ok(results)
    }

    /// Runs one full round: decompose, dispatch, collect, reassemble.
    ///
    /// The grid is only mutated after every worker has replied, so a caller
    /// that stops iterating (e.g. on an interrupt between rounds) always
    /// holds a fully reassembled grid.
    pub async fn step(&mut self, grid: &mut Grid) -> Result<()> {
        let tiling = Tiling::for_slots(self.total_threads);
        let blocks = decompose(grid, tiling);
        self.dispatch(&blocks).await?;
        let results = self.collect().await?;
        reassemble(grid, &results, tiling)
    }

    /// Tears the fleet down: exit sentinel to every worker, sockets closed,
    /// remote-execution sessions closed. Every step is best-effort, so a
    /// fleet with already-failed connections still gets released.
    pub async fn close(mut self) {
        let connections = std::mem::take(&mut self.connections);
        let launcher = self.launcher.take();
        Self::teardown(connections, launcher).await;
    }

    async fn teardown(connections: Vec<WorkerConnection>, launcher: Option<RemoteLauncher>) {
        for mut conn in connections {
            if let Err(e) = conn.send_exit().await {
                tracing::debug!(endpoint = %conn.endpoint(), error = %e, "exit sentinel not delivered");
            }
            conn.shutdown().await;
        }
        if let Some(mut launcher) = launcher {
            launcher.close().await;
        }
        tracing::info!("fleet torn down");
    }
}
