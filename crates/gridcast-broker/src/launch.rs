//! Remote worker process launch.
//!
//! [`RemoteLauncher`] opens one SSH session per roster host and starts the
//! worker program with the agreed port and thread arguments, redirecting its
//! output to the entry's log path. The launched process is detached from the
//! broker's lifetime: the broker never waits on it, and only keeps the
//! session open so teardown can close it cleanly.
//!
//! The command line is built as a structured argument list - every
//! user-supplied field is passed as an escaped argument, never spliced into
//! a shell string. Only the redirection operators themselves are raw shell
//! syntax.
//!
//! Secret material never appears in the roster. Authentication is delegated
//! to an injected [`CredentialProvider`], which either points at an identity
//! file or defers to the SSH agent and default keys.

use crate::roster::RosterEntry;
use gridcast_core::{Error, Result};
use openssh::{KnownHosts, Session, SessionBuilder};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Supplies per-host authentication material for remote sessions.
pub trait CredentialProvider: Send + Sync {
    /// Identity file to authenticate to `host` with, or `None` to defer to
    /// the SSH agent and default keys.
    fn keyfile(&self, host: &str) -> Option<PathBuf>;
}

/// Authenticate every host via the SSH agent and default keys.
#[derive(Clone, Copy, Debug, Default)]
pub struct AgentAuth;

impl CredentialProvider for AgentAuth {
    fn keyfile(&self, _host: &str) -> Option<PathBuf> {
        None
    }
}

/// Authenticate every host with the same identity file.
#[derive(Clone, Debug)]
pub struct KeyfileAuth {
    path: PathBuf,
}

impl KeyfileAuth {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialProvider for KeyfileAuth {
    fn keyfile(&self, _host: &str) -> Option<PathBuf> {
        Some(self.path.clone())
    }
}

/// Opens remote execution sessions and starts worker processes.
///
/// Carries no state once a command is issued beyond the open sessions
/// needed at teardown time.
pub struct RemoteLauncher {
    credentials: Arc<dyn CredentialProvider>,
    sessions: Vec<Session>,
}

impl fmt::Debug for RemoteLauncher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteLauncher")
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

impl RemoteLauncher {
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            credentials,
            sessions: Vec::new(),
        }
    }

    /// Authenticates to the entry's host and starts its worker process,
    /// detached.
    ///
    /// The issued command is:
    ///
    /// ```text
    /// <interpreter> <script_path> -p <port> -t <threads> <extra...> > <log_path> 2>&1
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::Launch`] if authentication, connection, or the spawn
    /// itself fails. Launch failures are fatal for startup; the caller tears
    /// down whatever was already started.
    pub async fn launch(&mut self, entry: &RosterEntry) -> Result<()> {
        let mut builder = SessionBuilder::default();
        builder
            .user(entry.username.clone())
            .known_hosts_check(KnownHosts::Add);
        if let Some(keyfile) = self.credentials.keyfile(&entry.host) {
            builder.keyfile(keyfile);
        }

        let session = builder.connect(&entry.host).await.map_err(|e| Error::Launch {
            context: format!("ssh session to {}@{}: {e}", entry.username, entry.host),
        })?;

        let mut command = session.command(&entry.interpreter);
        command
            .arg(&entry.script_path)
            .arg("-p")
            .arg(entry.port.to_string())
            .arg("-t")
            .arg(entry.threads.to_string());
        for extra in &entry.extra_args {
            command.arg(extra);
        }
        command.raw_arg(">").arg(&entry.log_path).raw_arg("2>&1");

        let child = command.spawn().await.map_err(|e| Error::Launch {
            context: format!("spawning worker on {}: {e}", entry.host),
        })?;
        // Detach: the worker outlives this handle; the broker never waits on
        // it.
        child.disconnect().await.map_err(|e| Error::Launch {
            context: format!("detaching worker on {}: {e}", entry.host),
        })?;

        tracing::info!(
            host = %entry.host,
            port = entry.port,
            threads = entry.threads,
            log = %entry.log_path,
            "remote worker launched"
        );
        self.sessions.push(session);
        Ok(())
    }

    /// Closes every open session, best-effort.
    pub async fn close(&mut self) {
        for session in self.sessions.drain(..) {
            if let Err(e) = session.close().await {
                tracing::debug!(error = %e, "ssh session close failed");
            }
        }
    }
}
