#![doc = include_str!("../README.md")]

pub mod config;
pub mod pool;
pub mod service;

pub use config::{CliArgs, WorkerConfig};
pub use pool::manager::ComputePool;
pub use service::WorkerService;
