#![doc = include_str!("../README.md")]

pub mod broker;
pub mod connection;
pub mod launch;
pub mod roster;

pub use broker::{Broker, BrokerOptions};
pub use connection::WorkerConnection;
pub use launch::{AgentAuth, CredentialProvider, KeyfileAuth, RemoteLauncher};
pub use roster::{Roster, RosterEntry};
