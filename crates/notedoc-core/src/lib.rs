//! notedoc Core Library
//!
//! This crate provides a note repository over a document store: create,
//! read (single and paginated list), update and delete, each under a
//! bounded deadline and with store failures mapped to a small error
//! vocabulary.
//!
//! # Architecture
//!
//! - **Automerge**: storage engine; every collection lives in one document
//! - **Collection**: the narrow store contract the repository depends on
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let db = Database::open(&config)?;
//! let notes = NoteRepository::from_database(&db, &config);
//!
//! let id = notes.create(NoteDraft::new("Title", "Body")).await?;
//! let note = notes.get_by_id(&id).await?;
//! let page = notes.get_all(Some(1), Some(20)).await?;
//! ```
//!
//! # Modules
//!
//! - `repository`: `NoteRepository` (main entry point)
//! - `models`: `Note` and `NoteDraft`
//! - `object_id`: generated document identifiers
//! - `store`: collection contract and the Automerge engine
//! - `pagination`: page/limit to skip/limit conversion
//! - `database`: opening the configured store
//! - `config`: application configuration

pub mod config;
pub mod database;
pub mod models;
pub mod object_id;
pub mod pagination;
pub mod repository;
pub mod store;

pub use config::Config;
pub use database::Database;
pub use models::{Note, NoteDraft};
pub use object_id::{ObjectId, ObjectIdError};
pub use pagination::pagination_options;
pub use repository::{
    DecodeError, NotePage, NoteRepository, OperationDeadline, RepoError, RepoResult,
    SkippedDocument, NOTES_COLLECTION,
};
pub use store::{
    AutomergeStore, Collection, Cursor, DeleteResult, Document, Filter, FindOptions,
    InsertOneResult, StoreError, StoreResult, UpdateResult, UpdateSpec,
};
