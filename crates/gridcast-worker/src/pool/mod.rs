//! Fixed-size local compute pool.
//!
//! ## Submodules
//!
//! - [`request`]: messages a compute task accepts.
//! - [`worker`]: the per-task compute loop.
//! - [`manager`]: the [`manager::ComputePool`] distributing one request's
//!   blocks across tasks and gathering results in payload order.

pub mod manager;
pub mod request;
pub mod worker;
