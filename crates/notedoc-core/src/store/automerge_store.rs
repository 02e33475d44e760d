//! Automerge-backed document store
//!
//! A single Automerge document holds every collection:
//!
//! ```text
//! ROOT
//! ├── schema_version: 1
//! └── collections: Map
//!     └── <name>: List
//!         ├── 0: Map { id, ... }
//!         └── 1: Map { id, ... }
//! ```
//!
//! List order is the natural (insertion) order of a collection. Cursors read
//! from the document heads captured when `find` ran, so a listing is a stable
//! snapshot even while other callers write to the collection.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use automerge::{
    transaction::Transactable, AutoCommit, ChangeHash, ObjId, ObjType, Prop, ReadDoc,
    ScalarValue, Value as AmValue, ROOT,
};
use futures_util::stream;
use serde_json::{Map, Number, Value};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task;
use tracing::debug;

use super::collection::Collection;
use super::cursor::{Cursor, CursorLease, CursorRegistry};
use super::error::{StoreError, StoreResult};
use super::persistence::StoreFile;
use super::query::{
    DeleteResult, Document, Filter, FindOptions, InsertOneResult, UpdateResult, UpdateSpec,
};
use crate::object_id::ObjectId;

/// Keys used in the Automerge document structure
mod keys {
    pub const SCHEMA_VERSION: &str = "schema_version";
    pub const COLLECTIONS: &str = "collections";
}

/// Field holding a document's identifier
pub const ID_FIELD: &str = "id";

/// Current schema version
pub const CURRENT_SCHEMA_VERSION: u64 = 1;

/// Default number of documents a cursor fetches per batch
pub const DEFAULT_BATCH_SIZE: usize = 64;

struct StoreState {
    doc: AutoCommit,
    file: Option<StoreFile>,
}

/// Document store backed by one Automerge document
#[derive(Clone)]
pub struct AutomergeStore {
    state: Arc<Mutex<StoreState>>,
    cursors: CursorRegistry,
    batch_size: usize,
}

impl AutomergeStore {
    /// Create an empty store that lives only in memory
    pub fn in_memory() -> Self {
        Self::from_state(StoreState {
            doc: new_document(),
            file: None,
        })
    }

    /// Open a file-backed store, creating the file if it doesn't exist
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let file = StoreFile::new(path.as_ref());

        let doc = match file.load()? {
            Some(doc) => {
                if doc.get(ROOT, keys::COLLECTIONS)?.is_none() {
                    return Err(StoreError::Corrupt {
                        path: file.path().to_path_buf(),
                        details: "missing collections map".to_string(),
                    });
                }
                debug!(path = ?file.path(), "Loaded document store");
                doc
            }
            None => {
                let mut doc = new_document();
                file.save(&mut doc)?;
                debug!(path = ?file.path(), "Created document store");
                doc
            }
        };

        Ok(Self::from_state(StoreState {
            doc,
            file: Some(file),
        }))
    }

    async fn lock_for_write(&self) -> OwnedMutexGuard<StoreState> {
        Arc::clone(&self.state).lock_owned().await
    }

    fn from_state(state: StoreState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            cursors: CursorRegistry::new(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set how many documents a cursor fetches per batch
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Get a handle to a collection (created on first insert)
    pub fn collection(&self, name: &str) -> AutomergeCollection {
        AutomergeCollection {
            name: name.to_string(),
            store: self.clone(),
        }
    }

    /// Number of cursors that have not been released yet
    pub fn open_cursors(&self) -> usize {
        self.cursors.open_count()
    }

    /// Names of collections that exist in the store
    pub async fn collection_names(&self) -> StoreResult<Vec<String>> {
        let state = self.state.lock().await;
        let collections = collections_map(&state.doc, None)?;
        Ok(state.doc.keys(&collections).collect())
    }

    /// Number of documents in a collection
    pub async fn count(&self, name: &str) -> StoreResult<usize> {
        let state = self.state.lock().await;
        Ok(match collection_list(&state.doc, name, None)? {
            Some(list) => state.doc.length(&list),
            None => 0,
        })
    }

    /// Size of the backing file in bytes (0 for in-memory stores)
    pub async fn file_size(&self) -> u64 {
        let state = self.state.lock().await;
        state.file.as_ref().map(StoreFile::size).unwrap_or(0)
    }
}

/// Make `staged` the current document
///
/// File-backed stores write `staged` to disk first, on the blocking pool.
/// The write and the swap finish together even if the caller stops waiting,
/// and a failed write leaves the current document untouched.
async fn install(
    mut state: OwnedMutexGuard<StoreState>,
    mut staged: AutoCommit,
) -> StoreResult<()> {
    let _ = staged.commit();

    let Some(file) = state.file.clone() else {
        state.doc = staged;
        return Ok(());
    };

    let bytes = staged.save();
    task::spawn_blocking(move || -> StoreResult<()> {
        file.write(&bytes)?;
        state.doc = staged;
        Ok(())
    })
    .await?
}

fn ensure_collection(doc: &mut AutoCommit, name: &str) -> StoreResult<ObjId> {
    if let Some(list) = collection_list(doc, name, None)? {
        return Ok(list);
    }
    let collections = collections_map(doc, None)?;
    Ok(doc.put_object(&collections, name, ObjType::List)?)
}

/// Index and content of the first document matching `filter`
fn find_first(
    doc: &AutoCommit,
    name: &str,
    filter: &Filter,
) -> StoreResult<Option<(usize, ObjId, Document)>> {
    let list = match collection_list(doc, name, None)? {
        Some(list) => list,
        None => return Ok(None),
    };

    for index in 0..doc.length(&list) {
        if let Some((_, obj)) = doc.get(&list, index)? {
            let current = read_map(doc, &obj, None)?;
            if filter.matches(&current) {
                return Ok(Some((index, obj, current)));
            }
        }
    }
    Ok(None)
}

/// Handle to one collection of an `AutomergeStore`
#[derive(Clone)]
pub struct AutomergeCollection {
    name: String,
    store: AutomergeStore,
}

impl AutomergeCollection {
    /// The store this collection belongs to
    pub fn store(&self) -> &AutomergeStore {
        &self.store
    }
}

#[async_trait]
impl Collection for AutomergeCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(&self, filter: Filter, options: FindOptions) -> StoreResult<Cursor> {
        let heads = {
            let mut state = self.store.state.lock().await;
            state.doc.get_heads()
        };

        debug!(
            collection = %self.name,
            skip = options.skip_count(),
            limit = ?options.row_cap(),
            "Opening cursor"
        );

        let cursor = SnapshotCursor {
            state: Arc::clone(&self.store.state),
            collection: self.name.clone(),
            heads,
            filter,
            position: 0,
            to_skip: options.skip_count(),
            remaining: options.row_cap(),
            batch_size: self.store.batch_size,
            buffer: VecDeque::new(),
            exhausted: false,
            _lease: self.store.cursors.acquire(),
        };

        Ok(Cursor::new(stream::unfold(cursor, |mut cursor| async move {
            cursor.next_document().await.map(|item| (item, cursor))
        })))
    }

    async fn find_one(&self, filter: Filter) -> StoreResult<Option<Document>> {
        let state = self.store.state.lock().await;
        Ok(find_first(&state.doc, &self.name, &filter)?.map(|(_, _, doc)| doc))
    }

    async fn insert_one(&self, mut document: Document) -> StoreResult<InsertOneResult> {
        let inserted_id = document
            .entry(ID_FIELD)
            .or_insert_with(|| Value::String(ObjectId::new().to_hex()))
            .clone();

        let state = self.store.lock_for_write().await;
        let mut staged = state.doc.clone();
        let list = ensure_collection(&mut staged, &self.name)?;
        let index = staged.length(&list);
        let obj = staged.insert_object(&list, index, ObjType::Map)?;
        write_map(&mut staged, &obj, &document)?;
        install(state, staged).await?;

        debug!(collection = %self.name, id = %inserted_id, "Inserted document");
        Ok(InsertOneResult { inserted_id })
    }

    async fn update_one(&self, filter: Filter, update: UpdateSpec) -> StoreResult<UpdateResult> {
        let state = self.store.lock_for_write().await;
        let (obj, current) = match find_first(&state.doc, &self.name, &filter)? {
            Some((_, obj, current)) => (obj, current),
            None => return Ok(UpdateResult::default()),
        };

        let changed: Vec<_> = update
            .fields()
            .iter()
            .filter(|(field, value)| current.get(field.as_str()) != Some(*value))
            .collect();
        let modified = !changed.is_empty();

        if modified {
            let mut staged = state.doc.clone();
            for (field, value) in changed {
                write_value(&mut staged, &obj, Slot::Key(field), value)?;
            }
            install(state, staged).await?;
        }

        debug!(collection = %self.name, modified, "Updated document");
        Ok(UpdateResult {
            matched_count: 1,
            modified_count: u64::from(modified),
        })
    }

    async fn delete_one(&self, filter: Filter) -> StoreResult<DeleteResult> {
        let state = self.store.lock_for_write().await;
        let index = match find_first(&state.doc, &self.name, &filter)? {
            Some((index, _, _)) => index,
            None => return Ok(DeleteResult::default()),
        };

        let mut staged = state.doc.clone();
        let list = collection_list(&staged, &self.name, None)?
            .ok_or_else(|| StoreError::MissingObject(format!("collection {}", self.name)))?;
        staged.delete(&list, index)?;
        install(state, staged).await?;

        debug!(collection = %self.name, index, "Deleted document");
        Ok(DeleteResult { deleted_count: 1 })
    }
}

/// Incremental reader over a fixed set of document heads
struct SnapshotCursor {
    state: Arc<Mutex<StoreState>>,
    collection: String,
    heads: Vec<ChangeHash>,
    filter: Filter,
    position: usize,
    to_skip: u64,
    remaining: Option<u64>,
    batch_size: usize,
    buffer: VecDeque<StoreResult<Document>>,
    exhausted: bool,
    _lease: CursorLease,
}

impl SnapshotCursor {
    async fn next_document(&mut self) -> Option<StoreResult<Document>> {
        if self.buffer.is_empty() && !self.exhausted {
            self.fetch_batch().await;
        }
        self.buffer.pop_front()
    }

    async fn fetch_batch(&mut self) {
        let state = self.state.lock().await;
        let heads = self.heads.as_slice();

        let list = match collection_list(&state.doc, &self.collection, Some(heads)) {
            Ok(Some(list)) => list,
            Ok(None) => {
                self.exhausted = true;
                return;
            }
            Err(e) => {
                self.exhausted = true;
                self.buffer.push_back(Err(e));
                return;
            }
        };

        let len = state.doc.length_at(&list, heads);
        while self.buffer.len() < self.batch_size {
            if self.position >= len || self.remaining == Some(0) {
                self.exhausted = true;
                break;
            }

            let index = self.position;
            self.position += 1;

            let doc = match state.doc.get_at(&list, index, heads) {
                Ok(Some((_, obj))) => match read_map(&state.doc, &obj, Some(heads)) {
                    Ok(doc) => doc,
                    Err(e) => {
                        self.exhausted = true;
                        self.buffer.push_back(Err(e));
                        break;
                    }
                },
                Ok(None) => continue,
                Err(e) => {
                    self.exhausted = true;
                    self.buffer.push_back(Err(e.into()));
                    break;
                }
            };

            if !self.filter.matches(&doc) {
                continue;
            }
            if self.to_skip > 0 {
                self.to_skip -= 1;
                continue;
            }
            if let Some(remaining) = self.remaining.as_mut() {
                *remaining -= 1;
            }
            self.buffer.push_back(Ok(doc));
        }
    }
}

fn new_document() -> AutoCommit {
    let mut doc = AutoCommit::new();
    // Writes to a fresh document's root cannot fail.
    let _ = doc.put(ROOT, keys::SCHEMA_VERSION, CURRENT_SCHEMA_VERSION);
    let _ = doc.put_object(ROOT, keys::COLLECTIONS, ObjType::Map);
    let _ = doc.commit();
    doc
}

fn get_prop<'a>(
    doc: &'a AutoCommit,
    obj: &ObjId,
    prop: impl Into<Prop>,
    heads: Option<&[ChangeHash]>,
) -> StoreResult<Option<(AmValue<'a>, ObjId)>> {
    Ok(match heads {
        Some(heads) => doc.get_at(obj, prop, heads)?,
        None => doc.get(obj, prop)?,
    })
}

fn collections_map(doc: &AutoCommit, heads: Option<&[ChangeHash]>) -> StoreResult<ObjId> {
    get_prop(doc, &ROOT, keys::COLLECTIONS, heads)?
        .map(|(_, id)| id)
        .ok_or_else(|| StoreError::MissingObject(keys::COLLECTIONS.to_string()))
}

fn collection_list(
    doc: &AutoCommit,
    name: &str,
    heads: Option<&[ChangeHash]>,
) -> StoreResult<Option<ObjId>> {
    let collections = collections_map(doc, heads)?;
    Ok(get_prop(doc, &collections, name, heads)?.map(|(_, id)| id))
}

// ==================== Reading ====================

fn read_map(doc: &AutoCommit, obj: &ObjId, heads: Option<&[ChangeHash]>) -> StoreResult<Document> {
    let keys: Vec<String> = match heads {
        Some(heads) => doc.keys_at(obj, heads).collect(),
        None => doc.keys(obj).collect(),
    };

    let mut map = Map::new();
    for key in keys {
        if let Some((value, child)) = get_prop(doc, obj, key.as_str(), heads)? {
            map.insert(key, read_value(doc, value, &child, heads)?);
        }
    }
    Ok(map)
}

fn read_value(
    doc: &AutoCommit,
    value: AmValue<'_>,
    obj: &ObjId,
    heads: Option<&[ChangeHash]>,
) -> StoreResult<Value> {
    match value {
        AmValue::Object(ObjType::Map) | AmValue::Object(ObjType::Table) => {
            Ok(Value::Object(read_map(doc, obj, heads)?))
        }
        AmValue::Object(ObjType::List) => {
            let len = match heads {
                Some(heads) => doc.length_at(obj, heads),
                None => doc.length(obj),
            };
            let mut items = Vec::with_capacity(len);
            for index in 0..len {
                if let Some((item, child)) = get_prop(doc, obj, index, heads)? {
                    items.push(read_value(doc, item, &child, heads)?);
                }
            }
            Ok(Value::Array(items))
        }
        AmValue::Object(ObjType::Text) => {
            let text = match heads {
                Some(heads) => doc.text_at(obj, heads)?,
                None => doc.text(obj)?,
            };
            Ok(Value::String(text))
        }
        AmValue::Scalar(scalar) => scalar_to_json(scalar.as_ref()),
    }
}

fn scalar_to_json(scalar: &ScalarValue) -> StoreResult<Value> {
    Ok(match scalar {
        ScalarValue::Null => Value::Null,
        ScalarValue::Boolean(b) => Value::Bool(*b),
        ScalarValue::Str(s) => Value::String(s.to_string()),
        ScalarValue::Int(i) => Value::from(*i),
        ScalarValue::Uint(u) => Value::from(*u),
        ScalarValue::F64(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        ScalarValue::Timestamp(millis) => Value::from(*millis),
        ScalarValue::Bytes(bytes) => Value::String(hex::encode(bytes)),
        other => other
            .to_i64()
            .map(Value::from)
            .ok_or_else(|| StoreError::Unsupported(format!("scalar {:?}", other)))?,
    })
}

// ==================== Writing ====================

/// Position a value is written to
#[derive(Clone, Copy)]
enum Slot<'a> {
    Key(&'a str),
    Index(usize),
}

fn write_map(doc: &mut AutoCommit, obj: &ObjId, map: &Document) -> StoreResult<()> {
    for (key, value) in map {
        write_value(doc, obj, Slot::Key(key), value)?;
    }
    Ok(())
}

fn write_value(
    doc: &mut AutoCommit,
    obj: &ObjId,
    slot: Slot<'_>,
    value: &Value,
) -> StoreResult<()> {
    match value {
        Value::Array(items) => {
            let list = put_object(doc, obj, slot, ObjType::List)?;
            for (index, item) in items.iter().enumerate() {
                write_value(doc, &list, Slot::Index(index), item)?;
            }
        }
        Value::Object(map) => {
            let child = put_object(doc, obj, slot, ObjType::Map)?;
            write_map(doc, &child, map)?;
        }
        scalar => put_scalar(doc, obj, slot, json_to_scalar(scalar)?)?,
    }
    Ok(())
}

fn json_to_scalar(value: &Value) -> StoreResult<ScalarValue> {
    Ok(match value {
        Value::Null => ScalarValue::Null,
        Value::Bool(b) => ScalarValue::Boolean(*b),
        Value::String(s) => ScalarValue::Str(s.as_str().into()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                ScalarValue::Int(i)
            } else if let Some(u) = n.as_u64() {
                ScalarValue::Uint(u)
            } else if let Some(f) = n.as_f64() {
                ScalarValue::F64(f)
            } else {
                return Err(StoreError::Unsupported(format!("number {}", n)));
            }
        }
        other => return Err(StoreError::Unsupported(format!("non-scalar {}", other))),
    })
}

fn put_scalar(
    doc: &mut AutoCommit,
    obj: &ObjId,
    slot: Slot<'_>,
    value: ScalarValue,
) -> StoreResult<()> {
    match slot {
        Slot::Key(key) => doc.put(obj, key, value)?,
        Slot::Index(index) => doc.insert(obj, index, value)?,
    }
    Ok(())
}

fn put_object(
    doc: &mut AutoCommit,
    obj: &ObjId,
    slot: Slot<'_>,
    kind: ObjType,
) -> StoreResult<ObjId> {
    Ok(match slot {
        Slot::Key(key) => doc.put_object(obj, key, kind)?,
        Slot::Index(index) => doc.insert_object(obj, index, kind)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use serde_json::json;
    use tempfile::TempDir;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    async fn collect(cursor: Cursor) -> Vec<Document> {
        cursor.map(|item| item.unwrap()).collect().await
    }

    async fn seed(collection: &AutomergeCollection, count: usize) {
        for n in 0..count {
            collection
                .insert_one(doc(json!({"id": format!("doc-{}", n), "n": n})))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_one() {
        let store = AutomergeStore::in_memory();
        let notes = store.collection("notes");

        let result = notes
            .insert_one(doc(json!({"id": "a", "title": "First", "tags": ["x", "y"]})))
            .await
            .unwrap();
        assert_eq!(result.inserted_id, json!("a"));

        let found = notes.find_one(Filter::eq("id", "a")).await.unwrap().unwrap();
        assert_eq!(found["title"], "First");
        assert_eq!(found["tags"], json!(["x", "y"]));

        assert!(notes.find_one(Filter::eq("id", "b")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_generates_missing_id() {
        let store = AutomergeStore::in_memory();
        let notes = store.collection("notes");

        let result = notes.insert_one(doc(json!({"title": "x"}))).await.unwrap();
        let id = result.inserted_id.as_str().unwrap();
        assert!(ObjectId::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn test_values_roundtrip() {
        let store = AutomergeStore::in_memory();
        let things = store.collection("things");
        let original = doc(json!({
            "id": "v",
            "null": null,
            "flag": true,
            "int": -7,
            "big": u64::MAX,
            "float": 1.5,
            "nested": {"inner": [1, {"deep": "yes"}]}
        }));

        things.insert_one(original.clone()).await.unwrap();
        let found = things.find_one(Filter::eq("id", "v")).await.unwrap().unwrap();
        assert_eq!(found, original);
    }

    #[tokio::test]
    async fn test_find_preserves_insertion_order_and_pages() {
        let store = AutomergeStore::in_memory().with_batch_size(2);
        let items = store.collection("items");
        seed(&items, 5).await;

        let all = collect(items.find(Filter::all(), FindOptions::default()).await.unwrap()).await;
        let ns: Vec<_> = all.iter().map(|d| d["n"].as_u64().unwrap()).collect();
        assert_eq!(ns, vec![0, 1, 2, 3, 4]);

        let options = FindOptions {
            skip: Some(2),
            limit: Some(2),
        };
        let page = collect(items.find(Filter::all(), options).await.unwrap()).await;
        let ns: Vec<_> = page.iter().map(|d| d["n"].as_u64().unwrap()).collect();
        assert_eq!(ns, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_find_on_missing_collection_is_empty() {
        let store = AutomergeStore::in_memory();
        let cursor = store
            .collection("nothing")
            .find(Filter::all(), FindOptions::default())
            .await
            .unwrap();
        assert!(collect(cursor).await.is_empty());
    }

    #[tokio::test]
    async fn test_cursor_reads_snapshot() {
        let store = AutomergeStore::in_memory().with_batch_size(1);
        let items = store.collection("items");
        seed(&items, 3).await;

        let mut cursor = items.find(Filter::all(), FindOptions::default()).await.unwrap();
        let first = cursor.next().await.unwrap().unwrap();
        assert_eq!(first["n"], 0);

        // Changes after `find` are not visible to the open cursor
        items.delete_one(Filter::eq("id", "doc-1")).await.unwrap();
        seed(&items, 1).await;

        let rest: Vec<_> = cursor.map(|d| d.unwrap()["n"].clone()).collect().await;
        assert_eq!(rest, vec![json!(1), json!(2)]);
    }

    #[tokio::test]
    async fn test_cursor_lease_released() {
        let store = AutomergeStore::in_memory();
        let items = store.collection("items");
        seed(&items, 3).await;

        let mut cursor = items.find(Filter::all(), FindOptions::default()).await.unwrap();
        assert_eq!(store.open_cursors(), 1);
        cursor.next().await.unwrap().unwrap();
        cursor.close();
        assert_eq!(store.open_cursors(), 0);

        let cursor = items.find(Filter::all(), FindOptions::default()).await.unwrap();
        collect(cursor).await;
        assert_eq!(store.open_cursors(), 0);
    }

    #[tokio::test]
    async fn test_update_one_counts() {
        let store = AutomergeStore::in_memory();
        let notes = store.collection("notes");
        notes
            .insert_one(doc(json!({"id": "a", "title": "t", "body": "b"})))
            .await
            .unwrap();

        let update = UpdateSpec::set(doc(json!({"title": "new"})));
        let result = notes.update_one(Filter::eq("id", "a"), update.clone()).await.unwrap();
        assert_eq!(result.matched_count, 1);
        assert_eq!(result.modified_count, 1);

        // Same values again: matched but not modified
        let result = notes.update_one(Filter::eq("id", "a"), update.clone()).await.unwrap();
        assert_eq!(result.matched_count, 1);
        assert_eq!(result.modified_count, 0);

        let result = notes.update_one(Filter::eq("id", "zzz"), update).await.unwrap();
        assert_eq!(result, UpdateResult::default());

        let found = notes.find_one(Filter::eq("id", "a")).await.unwrap().unwrap();
        assert_eq!(found["title"], "new");
        assert_eq!(found["body"], "b");
    }

    #[tokio::test]
    async fn test_delete_one_removes_first_match_only() {
        let store = AutomergeStore::in_memory();
        let items = store.collection("items");
        for n in 0..3 {
            items
                .insert_one(doc(json!({"id": format!("{}", n), "group": "g"})))
                .await
                .unwrap();
        }

        let result = items.delete_one(Filter::eq("group", "g")).await.unwrap();
        assert_eq!(result.deleted_count, 1);
        assert_eq!(store.count("items").await.unwrap(), 2);
        assert!(items.find_one(Filter::eq("id", "0")).await.unwrap().is_none());

        let result = items.delete_one(Filter::eq("id", "missing")).await.unwrap();
        assert_eq!(result.deleted_count, 0);
    }

    #[tokio::test]
    async fn test_file_backed_store_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.automerge");

        {
            let store = AutomergeStore::open(&path).unwrap();
            let notes = store.collection("notes");
            notes.insert_one(doc(json!({"id": "a", "title": "kept"}))).await.unwrap();
            notes.insert_one(doc(json!({"id": "b", "title": "gone"}))).await.unwrap();
            notes.delete_one(Filter::eq("id", "b")).await.unwrap();
            assert!(store.file_size().await > 0);
        }

        let reopened = AutomergeStore::open(&path).unwrap();
        assert_eq!(reopened.collection_names().await.unwrap(), vec!["notes"]);
        assert_eq!(reopened.count("notes").await.unwrap(), 1);
        let found = reopened
            .collection("notes")
            .find_one(Filter::eq("id", "a"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found["title"], "kept");
    }

    /// Replace the store's directory with a plain file so every save fails
    fn break_store_dir(dir: &std::path::Path) {
        std::fs::remove_dir_all(dir).unwrap();
        std::fs::write(dir, b"").unwrap();
    }

    #[tokio::test]
    async fn test_failed_save_leaves_memory_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let store_dir = temp_dir.path().join("sub");
        let store = AutomergeStore::open(store_dir.join("notes.automerge")).unwrap();
        let notes = store.collection("notes");
        notes
            .insert_one(doc(json!({"id": "kept", "title": "t"})))
            .await
            .unwrap();

        break_store_dir(&store_dir);

        let err = notes
            .insert_one(doc(json!({"id": "ghost"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        let ghost = notes.find_one(Filter::eq("id", "ghost")).await.unwrap();
        assert!(ghost.is_none());

        let update = UpdateSpec::set(doc(json!({"title": "changed"})));
        let updated = notes.update_one(Filter::eq("id", "kept"), update).await;
        assert!(updated.is_err());

        let deleted = notes.delete_one(Filter::eq("id", "kept")).await;
        assert!(deleted.is_err());

        let kept = notes
            .find_one(Filter::eq("id", "kept"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kept["title"], "t");
        assert_eq!(store.count("notes").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_write_keeps_memory_and_disk_in_step() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.automerge");
        let store = AutomergeStore::open(&path).unwrap();
        let notes = store.collection("notes");

        // Stop waiting as soon as the write has started
        let write = notes.insert_one(doc(json!({"id": "a"})));
        let _ = tokio::time::timeout(std::time::Duration::ZERO, write).await;

        // Reads wait for the store lock, which the write holds until it is done
        let in_memory = store.count("notes").await.unwrap();
        let reopened = AutomergeStore::open(&path).unwrap();
        assert_eq!(reopened.count("notes").await.unwrap(), in_memory);
    }

    #[tokio::test]
    async fn test_open_rejects_foreign_document() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("other.automerge");
        let mut foreign = AutoCommit::new();
        foreign.put(ROOT, "something", "else").unwrap();
        StoreFile::new(&path).save(&mut foreign).unwrap();

        assert!(matches!(
            AutomergeStore::open(&path),
            Err(StoreError::Corrupt { .. })
        ));
    }
}
