//! CLI command implementations.

pub mod transfer;
