//! # MongoTransfer Store
//!
//! Document store trait, data model and backends for MongoTransfer.
//!
//! This crate is the lowest layer of the workspace. It knows how to read
//! documents out of a collection and how to apply an ordered batch of
//! write operations to one. It knows nothing about batching policy,
//! mirror modes or audit files.
//!
//! ## Design Principles
//!
//! - Stores are driven through `&self` and are `Send + Sync`
//! - Every call blocks until the store has answered; one call in flight
//! - A bulk write succeeds or fails as a whole
//! - Documents are opaque `bson::Document`s identified by `_id`
//!
//! ## Available Backends
//!
//! - [`InMemoryStore`] - For testing, with call recording and fault injection
//! - [`MongoStore`] - MongoDB collection (feature `mongo`, enabled by default)
//!
//! ## Example
//!
//! ```rust
//! use bson::doc;
//! use mongotransfer_store::{DocumentStore, InMemoryStore, UpsertOperation, WriteOp};
//!
//! let store = InMemoryStore::new();
//! let op = UpsertOperation::from_document(doc! { "_id": 1, "name": "a" }).unwrap();
//! store.bulk_write(&[WriteOp::Upsert(op)]).unwrap();
//! assert_eq!(store.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod identifier;
mod memory;
#[cfg(feature = "mongo")]
mod mongo;
mod operation;
mod store;

pub use error::{StoreError, StoreResult};
pub use identifier::{Identifier, IdentifierSet, ID_FIELD};
pub use memory::{InMemoryStore, WriteCall, WriteKind};
#[cfg(feature = "mongo")]
pub use mongo::MongoStore;
pub use operation::{BulkWriteSummary, DeleteOperation, UpsertOperation, WriteOp};
pub use store::{DocumentStore, DocumentStream, IdentifierStream};

pub use bson::{doc, oid, Bson, Document};
