//! Collection contract
//!
//! The narrow interface the repository layer depends on. Any store that can
//! find, insert, update and delete documents in a named collection can sit
//! behind it.

use async_trait::async_trait;

use super::cursor::Cursor;
use super::error::StoreResult;
use super::query::{
    DeleteResult, Document, Filter, FindOptions, InsertOneResult, UpdateResult, UpdateSpec,
};

/// A named group of documents
#[async_trait]
pub trait Collection: Send + Sync {
    /// Collection name
    fn name(&self) -> &str;

    /// Open a lazy cursor over documents matching `filter`
    async fn find(&self, filter: Filter, options: FindOptions) -> StoreResult<Cursor>;

    /// First document matching `filter`, `None` when nothing matches
    async fn find_one(&self, filter: Filter) -> StoreResult<Option<Document>>;

    /// Append a document
    async fn insert_one(&self, document: Document) -> StoreResult<InsertOneResult>;

    /// Apply `update` to the first document matching `filter`
    async fn update_one(&self, filter: Filter, update: UpdateSpec) -> StoreResult<UpdateResult>;

    /// Remove the first document matching `filter`
    async fn delete_one(&self, filter: Filter) -> StoreResult<DeleteResult>;
}
