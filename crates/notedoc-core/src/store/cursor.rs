//! Lazy result cursors
//!
//! A `Cursor` is an async stream of documents produced by `find`. Whatever
//! resources a collection attaches to it (snapshots, leases) are released
//! when the cursor is closed or dropped, whichever comes first.

use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::stream::{self, BoxStream, Stream};

use super::error::StoreResult;
use super::query::Document;

/// Async stream of documents matching a query
pub struct Cursor {
    inner: BoxStream<'static, StoreResult<Document>>,
}

impl Cursor {
    /// Wrap a stream of documents
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = StoreResult<Document>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// Cursor over an already materialized result set
    pub fn from_results(results: Vec<StoreResult<Document>>) -> Self {
        Self::new(stream::iter(results))
    }

    /// Release the cursor
    pub fn close(self) {
        drop(self);
    }
}

impl Stream for Cursor {
    type Item = StoreResult<Document>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor").finish_non_exhaustive()
    }
}

/// Tracks cursors that are still open against a store
#[derive(Debug, Clone, Default)]
pub struct CursorRegistry {
    open: Arc<AtomicUsize>,
}

impl CursorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new open cursor
    pub fn acquire(&self) -> CursorLease {
        self.open.fetch_add(1, Ordering::SeqCst);
        CursorLease {
            open: Arc::clone(&self.open),
        }
    }

    /// Number of cursors not yet released
    pub fn open_count(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

/// Held by a cursor while it is open; releases on drop
#[derive(Debug)]
pub struct CursorLease {
    open: Arc<AtomicUsize>,
}

impl Drop for CursorLease {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}
