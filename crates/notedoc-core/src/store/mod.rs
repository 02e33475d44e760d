//! Document store
//!
//! Defines the collection contract the repository layer talks to and the
//! Automerge engine that implements it.
//!
//! ## Architecture
//!
//! - **Collection**: find / find_one / insert_one / update_one / delete_one
//!   over schema-flexible JSON documents
//! - **Cursor**: lazy stream of query results, released on close or drop
//! - **AutomergeStore**: all collections in one Automerge document,
//!   optionally persisted to a file after every write

pub mod automerge_store;
pub mod collection;
pub mod cursor;
pub mod error;
pub mod persistence;
pub mod query;

pub use automerge_store::{AutomergeCollection, AutomergeStore, DEFAULT_BATCH_SIZE, ID_FIELD};
pub use collection::Collection;
pub use cursor::{Cursor, CursorLease, CursorRegistry};
pub use error::{StoreError, StoreResult};
pub use persistence::StoreFile;
pub use query::{
    DeleteResult, Document, Filter, FindOptions, InsertOneResult, UpdateResult, UpdateSpec,
};
