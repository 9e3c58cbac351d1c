//! Roster file parsing.
//!
//! A roster is the static list of remote worker endpoints and launch
//! parameters for a run: one entry per non-comment line, whitespace
//! separated:
//!
//! ```text
//! host:port threads username interpreter script_path log_path [extra...]
//! ```
//!
//! Lines starting with `#` and blank lines are ignored. `host:port` is
//! lowercased before use. Anything after the log path is carried verbatim as
//! extra arguments for the worker command line. A line with fewer than the
//! required fields is a fatal parse error.

use gridcast_core::{Error, Result};
use std::path::Path;

/// One parsed roster line. Immutable after startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterEntry {
    /// Remote host name or address, lowercased.
    pub host: String,
    /// TCP port the worker's reply endpoint will listen on.
    pub port: u16,
    /// Declared thread capacity: how many blocks this worker receives per
    /// round.
    pub threads: usize,
    /// Login name for the remote execution session. Secret material is never
    /// part of the roster; see
    /// [`CredentialProvider`](crate::launch::CredentialProvider).
    pub username: String,
    /// Program that runs the worker (an interpreter, a wrapper, or the
    /// worker binary itself).
    pub interpreter: String,
    /// Path of the worker program on the remote host.
    pub script_path: String,
    /// Remote path receiving the worker's stdout and stderr.
    pub log_path: String,
    /// Extra arguments appended to the worker command line.
    pub extra_args: Vec<String>,
}

impl RosterEntry {
    /// `host:port` label used in logs and error contexts.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The full parsed roster plus its total declared thread capacity.
#[derive(Clone, Debug, Default)]
pub struct Roster {
    entries: Vec<RosterEntry>,
    total_threads: usize,
}

impl Roster {
    /// Reads and parses a roster file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::parse(&text)
    }

    /// Parses roster text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on a short line, an unparseable port or
    /// thread count, or a non-positive per-entry thread count.
    pub fn parse(text: &str) -> Result<Self> {
        let mut entries = Vec::new();
        let mut total_threads = 0;

        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            entries.push(Self::parse_entry(line, lineno + 1)?);
            total_threads += entries[entries.len() - 1].threads;
        }

        Ok(Self {
            entries,
            total_threads,
        })
    }

    fn parse_entry(line: &str, lineno: usize) -> Result<RosterEntry> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let bad = |reason: String| Error::Config {
            reason: format!("roster line {lineno}: {reason}"),
        };

        let [endpoint, threads, username, interpreter, script_path, log_path, extra @ ..] =
            fields.as_slice()
        else {
            return Err(bad(format!(
                "expected at least 6 fields (host:port threads username interpreter \
                 script_path log_path), got {}",
                fields.len()
            )));
        };

        let endpoint = endpoint.to_lowercase();
        let (host, port) = endpoint
            .split_once(':')
            .ok_or_else(|| bad(format!("endpoint '{endpoint}' is not host:port")))?;
        let port: u16 = port
            .parse()
            .map_err(|_| bad(format!("port '{port}' is not a valid TCP port")))?;
        let threads: usize = threads
            .parse()
            .map_err(|_| bad(format!("thread count '{threads}' is not an integer")))?;
        if threads == 0 {
            return Err(bad("thread count must be positive".to_string()));
        }

        Ok(RosterEntry {
            host: host.to_string(),
            port,
            threads,
            username: (*username).to_string(),
            interpreter: (*interpreter).to_string(),
            script_path: (*script_path).to_string(),
            log_path: (*log_path).to_string(),
            extra_args: extra.iter().map(|s| (*s).to_string()).collect(),
        })
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    /// Sum of every entry's declared thread capacity. The broker refuses to
    /// start when this is zero.
    pub const fn total_threads(&self) -> usize {
        self.total_threads
    }
}
