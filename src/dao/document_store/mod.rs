//! Abstraction over the external document store.
//!
//! The backend owns all persistent state; this layer only exposes point
//! reads/writes, atomic batches, and change subscriptions over named
//! collections of schemaless JSON documents. Subscriptions are plain streams:
//! dropping the stream cancels the subscription, which ties its lifetime to
//! whatever connection or task consumes it.

pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::{future::BoxFuture, stream::BoxStream};
use serde_json::{Map, Value};

use crate::dao::storage::StorageResult;

/// Collection names used by the application.
pub mod collections {
    /// Teams, keyed by a generated id.
    pub const USERS: &str = "users";
    /// Quest definitions, keyed by a generated id.
    pub const QUESTS: &str = "quests";
    /// Singleton general settings (first document wins).
    pub const GENERAL: &str = "general";
    /// Singleton game clock document.
    pub const GAME_STATE: &str = "gameState";
    /// Per-team notifications, keyed by team id.
    pub const TEAM_NOTIFICATIONS: &str = "teamNotifications";
}

/// Fixed id of the game clock singleton inside [`collections::GAME_STATE`].
pub const GAME_STATE_DOC_ID: &str = "current";

/// Schemaless field payload of a document.
pub type Fields = Map<String, Value>;

/// A stored document together with its identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Identifier of the document inside its collection.
    pub id: String,
    /// Field payload.
    pub fields: Fields,
}

impl Document {
    /// Bundle an id and a field payload.
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Read a single field, if present.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Item yielded by a single-document subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentEvent {
    /// Latest snapshot of the document (initial read or remote change).
    Current(Document),
    /// The document does not exist yet (initial read of an absent document).
    Absent,
    /// The document existed and its deletion was observed. Distinct from
    /// [`DocumentEvent::Absent`] so consumers can tear down sessions bound
    /// to a deleted document instead of treating it as "not created yet".
    Deleted,
}

/// One write inside an atomic batch.
#[derive(Debug, Clone)]
pub enum BatchOp {
    /// Full overwrite of a document, creating it when absent.
    Set {
        /// Target collection.
        collection: String,
        /// Target document id.
        id: String,
        /// Replacement payload.
        fields: Fields,
    },
    /// Merge update of an existing document.
    Update {
        /// Target collection.
        collection: String,
        /// Target document id.
        id: String,
        /// Fields to merge into the existing payload.
        fields: Fields,
    },
}

/// Builder for an atomic multi-document write.
///
/// All operations apply together or not at all when committed through
/// [`DocumentStore::commit`].
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Start an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a full overwrite.
    pub fn set(&mut self, collection: &str, id: &str, fields: Fields) -> &mut Self {
        self.ops.push(BatchOp::Set {
            collection: collection.to_owned(),
            id: id.to_owned(),
            fields,
        });
        self
    }

    /// Queue a merge update.
    pub fn update(&mut self, collection: &str, id: &str, fields: Fields) -> &mut Self {
        self.ops.push(BatchOp::Update {
            collection: collection.to_owned(),
            id: id.to_owned(),
            fields,
        });
        self
    }

    /// Whether the batch holds no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Consume the batch, yielding its operations in queue order.
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// Abstraction over the persistence layer for quest-hunt documents.
///
/// `update` merges fields into an existing document and fails with
/// [`crate::dao::storage::StorageError::MissingDocument`] when the target is
/// absent; `set` always replaces the whole payload, creating the document as
/// needed. Subscription streams deliver an initial snapshot followed by one
/// item per remote change until dropped; backend errors inside a collection
/// stream degrade to an empty snapshot rather than going silent.
pub trait DocumentStore: Send + Sync {
    /// Point read. Absent documents are `Ok(None)`, not an error.
    fn get(&self, collection: &str, id: &str)
    -> BoxFuture<'static, StorageResult<Option<Document>>>;
    /// List every document in a collection.
    fn list(&self, collection: &str) -> BoxFuture<'static, StorageResult<Vec<Document>>>;
    /// Create a document with a generated id, returning the id.
    fn create(&self, collection: &str, fields: Fields) -> BoxFuture<'static, StorageResult<String>>;
    /// Full overwrite, creating the document when absent.
    fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Merge fields into an existing document.
    fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Delete a document; deleting an absent document is a no-op.
    fn delete(&self, collection: &str, id: &str) -> BoxFuture<'static, StorageResult<()>>;
    /// Apply a batch atomically: every operation succeeds or none apply.
    fn commit(&self, batch: WriteBatch) -> BoxFuture<'static, StorageResult<()>>;
    /// Subscribe to one document. Emits the current state first, then one
    /// event per remote change.
    fn watch_document(&self, collection: &str, id: &str) -> BoxStream<'static, DocumentEvent>;
    /// Subscribe to a whole collection. Emits the current contents first,
    /// then a fresh snapshot after every change.
    fn watch_collection(&self, collection: &str) -> BoxStream<'static, Vec<Document>>;
    /// Cheap liveness probe against the backend.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Attempt to re-establish a lost backend connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
