#![doc = include_str!("../README.md")]

mod common;
pub use common::*;

pub mod decompose;
pub mod grid;
pub mod kernel;
pub mod wire;
