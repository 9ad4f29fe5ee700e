//! # MongoTransfer Testkit
//!
//! Test utilities for MongoTransfer.
//!
//! This crate provides:
//! - Fixtures: seeded in-memory stores, documents, temporary audit
//!   directories
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use mongotransfer_testkit::prelude::*;
//!
//! let source = store_with_ids("source", [1, 2, 3]);
//! assert_eq!(source.len(), 3);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
