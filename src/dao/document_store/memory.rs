//! In-process document store backend.
//!
//! Keeps every collection in memory and fans change notifications out over
//! broadcast channels, which makes it both the fallback backend when no
//! database is configured and the test double for everything built on
//! [`DocumentStore`].

use std::{collections::HashMap, sync::Arc};

use async_stream::stream;
use dashmap::DashMap;
use futures::{future::BoxFuture, stream::BoxStream};
use tokio::sync::{Mutex, broadcast, broadcast::error::RecvError};
use uuid::Uuid;

use crate::dao::{
    document_store::{BatchOp, Document, DocumentEvent, DocumentStore, Fields, WriteBatch},
    storage::{StorageError, StorageResult},
};

const CHANNEL_CAPACITY: usize = 64;

/// Memory-backed [`DocumentStore`] implementation.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    collections: DashMap<String, HashMap<String, Fields>>,
    channels: DashMap<String, broadcast::Sender<Change>>,
    // Serializes writes and gates reads so a committed batch is never
    // observed half-applied.
    write_gate: Mutex<()>,
}

#[derive(Debug, Clone)]
enum Change {
    Upsert(Document),
    Delete(String),
}

impl MemoryInner {
    fn channel(&self, collection: &str) -> broadcast::Sender<Change> {
        self.channels
            .entry(collection.to_owned())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    fn notify(&self, collection: &str, change: Change) {
        // Delivery errors just mean nobody is subscribed.
        let _ = self.channel(collection).send(change);
    }

    fn read(&self, collection: &str, id: &str) -> Option<Fields> {
        self.collections
            .get(collection)
            .and_then(|documents| documents.get(id).cloned())
    }

    fn snapshot(&self, collection: &str) -> Vec<Document> {
        self.collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    // The apply helpers return the resulting change instead of broadcasting
    // it themselves; `commit` applies a whole batch before any notification
    // goes out.
    fn write(&self, collection: &str, id: &str, fields: Fields) -> Change {
        self.collections
            .entry(collection.to_owned())
            .or_default()
            .insert(id.to_owned(), fields.clone());
        Change::Upsert(Document::new(id, fields))
    }

    fn merge(&self, collection: &str, id: &str, fields: Fields) -> StorageResult<Change> {
        let mut documents = self
            .collections
            .entry(collection.to_owned())
            .or_default();
        let Some(existing) = documents.get_mut(id) else {
            return Err(StorageError::missing(collection, id));
        };
        existing.extend(fields);
        let merged = existing.clone();
        drop(documents);

        Ok(Change::Upsert(Document::new(id, merged)))
    }

    fn remove(&self, collection: &str, id: &str) -> Option<Change> {
        let existed = self
            .collections
            .get_mut(collection)
            .is_some_and(|mut documents| documents.remove(id).is_some());
        existed.then(|| Change::Delete(id.to_owned()))
    }
}

impl MemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<Document>>> {
        let inner = self.inner.clone();
        let collection = collection.to_owned();
        let id = id.to_owned();
        Box::pin(async move {
            let _gate = inner.write_gate.lock().await;
            Ok(inner
                .read(&collection, &id)
                .map(|fields| Document::new(id, fields)))
        })
    }

    fn list(&self, collection: &str) -> BoxFuture<'static, StorageResult<Vec<Document>>> {
        let inner = self.inner.clone();
        let collection = collection.to_owned();
        Box::pin(async move {
            let _gate = inner.write_gate.lock().await;
            Ok(inner.snapshot(&collection))
        })
    }

    fn create(&self, collection: &str, fields: Fields) -> BoxFuture<'static, StorageResult<String>> {
        let inner = self.inner.clone();
        let collection = collection.to_owned();
        Box::pin(async move {
            let _gate = inner.write_gate.lock().await;
            let id = Uuid::new_v4().simple().to_string();
            let change = inner.write(&collection, &id, fields);
            inner.notify(&collection, change);
            Ok(id)
        })
    }

    fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        let collection = collection.to_owned();
        let id = id.to_owned();
        Box::pin(async move {
            let _gate = inner.write_gate.lock().await;
            let change = inner.write(&collection, &id, fields);
            inner.notify(&collection, change);
            Ok(())
        })
    }

    fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        let collection = collection.to_owned();
        let id = id.to_owned();
        Box::pin(async move {
            let _gate = inner.write_gate.lock().await;
            let change = inner.merge(&collection, &id, fields)?;
            inner.notify(&collection, change);
            Ok(())
        })
    }

    fn delete(&self, collection: &str, id: &str) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        let collection = collection.to_owned();
        let id = id.to_owned();
        Box::pin(async move {
            let _gate = inner.write_gate.lock().await;
            if let Some(change) = inner.remove(&collection, &id) {
                inner.notify(&collection, change);
            }
            Ok(())
        })
    }

    fn commit(&self, batch: WriteBatch) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let _gate = inner.write_gate.lock().await;

            let ops = batch.into_ops();
            // Validate every merge target up front so the batch is
            // all-or-nothing: nothing is written once any target is missing.
            for op in &ops {
                if let BatchOp::Update { collection, id, .. } = op
                    && inner.read(collection, id).is_none()
                {
                    return Err(StorageError::missing(collection.clone(), id.clone()));
                }
            }

            // Apply everything first; notifications go out only once the
            // whole batch is in place.
            let mut changes = Vec::with_capacity(ops.len());
            for op in ops {
                match op {
                    BatchOp::Set {
                        collection,
                        id,
                        fields,
                    } => {
                        let change = inner.write(&collection, &id, fields);
                        changes.push((collection, change));
                    }
                    BatchOp::Update {
                        collection,
                        id,
                        fields,
                    } => {
                        let change = inner.merge(&collection, &id, fields)?;
                        changes.push((collection, change));
                    }
                }
            }

            for (collection, change) in changes {
                inner.notify(&collection, change);
            }
            Ok(())
        })
    }

    fn watch_document(&self, collection: &str, id: &str) -> BoxStream<'static, DocumentEvent> {
        let inner = self.inner.clone();
        let collection = collection.to_owned();
        let id = id.to_owned();
        Box::pin(stream! {
            let mut receiver = inner.channel(&collection).subscribe();

            let current = {
                let _gate = inner.write_gate.lock().await;
                inner.read(&collection, &id)
            };
            match current {
                Some(fields) => yield DocumentEvent::Current(Document::new(id.clone(), fields)),
                None => yield DocumentEvent::Absent,
            }

            loop {
                match receiver.recv().await {
                    Ok(Change::Upsert(document)) if document.id == id => {
                        yield DocumentEvent::Current(document);
                    }
                    Ok(Change::Delete(deleted)) if deleted == id => {
                        yield DocumentEvent::Deleted;
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(_)) => {
                        // Missed intermediate changes; resync from the map.
                        let current = {
                            let _gate = inner.write_gate.lock().await;
                            inner.read(&collection, &id)
                        };
                        match current {
                            Some(fields) => {
                                yield DocumentEvent::Current(Document::new(id.clone(), fields));
                            }
                            None => yield DocumentEvent::Absent,
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn watch_collection(&self, collection: &str) -> BoxStream<'static, Vec<Document>> {
        let inner = self.inner.clone();
        let collection = collection.to_owned();
        Box::pin(stream! {
            let mut receiver = inner.channel(&collection).subscribe();

            let initial = {
                let _gate = inner.write_gate.lock().await;
                inner.snapshot(&collection)
            };
            yield initial;

            loop {
                match receiver.recv().await {
                    Ok(_) | Err(RecvError::Lagged(_)) => {
                        let snapshot = {
                            let _gate = inner.write_gate.lock().await;
                            inner.snapshot(&collection)
                        };
                        yield snapshot;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use serde_json::json;

    use super::*;

    fn fields(pairs: &[(&str, serde_json::Value)]) -> Fields {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[tokio::test]
    async fn update_merges_without_clobbering_other_fields() {
        let store = MemoryDocumentStore::new();
        store
            .set(
                "users",
                "t1",
                fields(&[("name", json!("alpha")), ("currentQuestIndex", json!(0))]),
            )
            .await
            .unwrap();

        store
            .update("users", "t1", fields(&[("currentQuestIndex", json!(2))]))
            .await
            .unwrap();

        let document = store.get("users", "t1").await.unwrap().unwrap();
        assert_eq!(document.field("name"), Some(&json!("alpha")));
        assert_eq!(document.field("currentQuestIndex"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn set_replaces_the_whole_payload() {
        let store = MemoryDocumentStore::new();
        store
            .set(
                "teamNotifications",
                "t1",
                fields(&[("message", json!("old")), ("response", json!("stale"))]),
            )
            .await
            .unwrap();

        store
            .set(
                "teamNotifications",
                "t1",
                fields(&[("message", json!("new"))]),
            )
            .await
            .unwrap();

        let document = store.get("teamNotifications", "t1").await.unwrap().unwrap();
        assert_eq!(document.field("message"), Some(&json!("new")));
        assert_eq!(document.field("response"), None);
    }

    #[tokio::test]
    async fn update_of_a_missing_document_fails() {
        let store = MemoryDocumentStore::new();
        let err = store
            .update("users", "ghost", fields(&[("name", json!("x"))]))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::MissingDocument { .. }));
    }

    #[tokio::test]
    async fn watch_distinguishes_absent_from_deleted() {
        let store = MemoryDocumentStore::new();

        let mut missing = store.watch_document("users", "nobody");
        assert_eq!(missing.next().await, Some(DocumentEvent::Absent));

        store
            .set("users", "t1", fields(&[("name", json!("alpha"))]))
            .await
            .unwrap();
        let mut watch = store.watch_document("users", "t1");
        assert!(matches!(
            watch.next().await,
            Some(DocumentEvent::Current(_))
        ));

        store.delete("users", "t1").await.unwrap();
        assert_eq!(watch.next().await, Some(DocumentEvent::Deleted));
    }

    #[tokio::test]
    async fn watch_collection_emits_fresh_snapshots() {
        let store = MemoryDocumentStore::new();
        let mut watch = store.watch_collection("quests");

        assert_eq!(watch.next().await, Some(Vec::new()));

        store
            .create("quests", fields(&[("title", json!("q1"))]))
            .await
            .unwrap();
        let snapshot = watch.next().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].field("title"), Some(&json!("q1")));
    }

    #[tokio::test]
    async fn batch_is_all_or_nothing() {
        let store = MemoryDocumentStore::new();
        store
            .set("users", "t1", fields(&[("order", json!(["a"]))]))
            .await
            .unwrap();

        let mut batch = WriteBatch::new();
        batch.update("users", "t1", fields(&[("order", json!(["b"]))]));
        batch.update("users", "ghost", fields(&[("order", json!(["c"]))]));

        let err = store.commit(batch).await.unwrap_err();
        assert!(matches!(err, StorageError::MissingDocument { .. }));

        // The first update must not have applied.
        let document = store.get("users", "t1").await.unwrap().unwrap();
        assert_eq!(document.field("order"), Some(&json!(["a"])));
    }

    #[tokio::test]
    async fn batch_notifies_only_after_every_op_has_applied() {
        let store = MemoryDocumentStore::new();
        store
            .set("users", "t1", fields(&[("order", json!(["a"]))]))
            .await
            .unwrap();

        let mut watch = store.watch_document("users", "t1");
        assert!(matches!(
            watch.next().await,
            Some(DocumentEvent::Current(_))
        ));

        let mut batch = WriteBatch::new();
        batch.update("users", "t1", fields(&[("order", json!(["b"]))]));
        batch.set("users", "t2", fields(&[("order", json!(["c"]))]));
        store.commit(batch).await.unwrap();

        // The event for the first op is broadcast once the whole batch is in
        // place, so the second op's document must already be readable.
        let event = watch.next().await.unwrap();
        match event {
            DocumentEvent::Current(document) => {
                assert_eq!(document.field("order"), Some(&json!(["b"])));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        let t2 = store.get("users", "t2").await.unwrap().unwrap();
        assert_eq!(t2.field("order"), Some(&json!(["c"])));
    }

    #[tokio::test]
    async fn batch_applies_every_op_on_success() {
        let store = MemoryDocumentStore::new();
        store
            .set("users", "t1", fields(&[("order", json!([]))]))
            .await
            .unwrap();
        store
            .set("users", "t2", fields(&[("order", json!([]))]))
            .await
            .unwrap();

        let mut batch = WriteBatch::new();
        batch.update("users", "t1", fields(&[("order", json!(["a", "b"]))]));
        batch.update("users", "t2", fields(&[("order", json!(["b", "a"]))]));
        store.commit(batch).await.unwrap();

        let t1 = store.get("users", "t1").await.unwrap().unwrap();
        let t2 = store.get("users", "t2").await.unwrap().unwrap();
        assert_eq!(t1.field("order"), Some(&json!(["a", "b"])));
        assert_eq!(t2.field("order"), Some(&json!(["b", "a"])));
    }
}
