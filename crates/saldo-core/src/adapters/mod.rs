//! Data-source adapter implementations.

pub mod rest;

pub use rest::{RestConfig, RestSource};
