use std::{sync::Arc, time::Duration};

use async_stream::stream;
use futures::{StreamExt, TryStreamExt, future::BoxFuture, stream::BoxStream};
use mongodb::{
    Client, ClientSession, Collection, Database,
    bson::{Document as BsonDocument, doc},
    change_stream::event::OperationType,
    options::FullDocumentType,
};
use tokio::{sync::RwLock, time::sleep};
use tracing::warn;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    convert::{document_from_bson, fields_to_bson},
    error::{MongoDaoError, MongoResult},
};
use crate::dao::{
    document_store::{BatchOp, Document, DocumentEvent, DocumentStore, Fields, WriteBatch},
    storage::StorageResult,
};

const CONNECT_PING_ATTEMPTS: u32 = 10;
const CONNECT_BACKOFF_START: Duration = Duration::from_millis(250);
const CONNECT_BACKOFF_CEILING: Duration = Duration::from_secs(5);

/// Build a client and ping the deployment until it answers.
///
/// The driver connects lazily, so a freshly started database container would
/// otherwise surface its first error deep inside a request handler. Pinging
/// up front keeps connect failures on the connect path.
async fn open_database(config: &MongoConfig) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(config.options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(&config.database_name);

    let mut attempt = 0;
    let mut backoff = CONNECT_BACKOFF_START;
    while let Err(err) = database.run_command(doc! { "ping": 1 }).await {
        attempt += 1;
        if attempt >= CONNECT_PING_ATTEMPTS {
            return Err(MongoDaoError::InitialPing {
                attempts: attempt,
                source: err,
            });
        }
        warn!(attempt, error = %err, "MongoDB is not answering pings yet; retrying");
        sleep(backoff).await;
        backoff = (backoff * 2).min(CONNECT_BACKOFF_CEILING);
    }

    Ok((client, database))
}

/// MongoDB-backed [`DocumentStore`].
///
/// Documents are stored as schemaless BSON with a string `_id`; change
/// streams back the subscription surface and multi-document transactions
/// back the atomic batch commit.
#[derive(Clone)]
pub struct MongoDocumentStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) = open_database(&self.config).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoDocumentStore {
    /// Establish a connection to MongoDB, retrying the initial ping with
    /// backoff before giving up.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) = open_database(&config).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        Ok(Self { inner })
    }

    async fn client(&self) -> Client {
        let guard = self.inner.state.read().await;
        guard.client.clone()
    }

    async fn collection(&self, name: &str) -> Collection<BsonDocument> {
        let guard = self.inner.state.read().await;
        guard.database.collection::<BsonDocument>(name)
    }

    async fn get_inner(&self, collection: &str, id: &str) -> MongoResult<Option<Document>> {
        let coll = self.collection(collection).await;
        let raw = coll
            .find_one(doc! { "_id": id })
            .await
            .map_err(|source| MongoDaoError::Read {
                collection: collection.to_owned(),
                source,
            })?;
        Ok(raw.map(document_from_bson))
    }

    async fn list_inner(&self, collection: &str) -> MongoResult<Vec<Document>> {
        let coll = self.collection(collection).await;
        let raw: Vec<BsonDocument> = coll
            .find(doc! {})
            .await
            .map_err(|source| MongoDaoError::Read {
                collection: collection.to_owned(),
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Read {
                collection: collection.to_owned(),
                source,
            })?;
        Ok(raw.into_iter().map(document_from_bson).collect())
    }

    async fn create_inner(&self, collection: &str, fields: Fields) -> MongoResult<String> {
        let id = Uuid::new_v4().simple().to_string();
        let mut document = fields_to_bson(&fields);
        document.insert("_id", id.clone());

        let coll = self.collection(collection).await;
        coll.insert_one(document)
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: collection.to_owned(),
                source,
            })?;
        Ok(id)
    }

    async fn set_inner(&self, collection: &str, id: &str, fields: Fields) -> MongoResult<()> {
        let coll = self.collection(collection).await;
        coll.replace_one(doc! { "_id": id }, fields_to_bson(&fields))
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: collection.to_owned(),
                source,
            })?;
        Ok(())
    }

    async fn update_inner(&self, collection: &str, id: &str, fields: Fields) -> MongoResult<()> {
        if fields.is_empty() {
            return Ok(());
        }

        let coll = self.collection(collection).await;
        let outcome = coll
            .update_one(doc! { "_id": id }, doc! { "$set": fields_to_bson(&fields) })
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: collection.to_owned(),
                source,
            })?;

        if outcome.matched_count == 0 {
            return Err(MongoDaoError::MissingDocument {
                collection: collection.to_owned(),
                id: id.to_owned(),
            });
        }
        Ok(())
    }

    async fn delete_inner(&self, collection: &str, id: &str) -> MongoResult<()> {
        let coll = self.collection(collection).await;
        coll.delete_one(doc! { "_id": id })
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: collection.to_owned(),
                source,
            })?;
        Ok(())
    }

    async fn commit_inner(&self, batch: WriteBatch) -> MongoResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let client = self.client().await;
        let mut session = client
            .start_session()
            .await
            .map_err(|source| MongoDaoError::Session { source })?;
        session
            .start_transaction()
            .await
            .map_err(|source| MongoDaoError::Transaction { source })?;

        match self.apply_batch(&mut session, batch).await {
            Ok(()) => session
                .commit_transaction()
                .await
                .map_err(|source| MongoDaoError::Transaction { source }),
            Err(err) => {
                let _ = session.abort_transaction().await;
                Err(err)
            }
        }
    }

    async fn apply_batch(&self, session: &mut ClientSession, batch: WriteBatch) -> MongoResult<()> {
        for op in batch.into_ops() {
            match op {
                BatchOp::Set {
                    collection,
                    id,
                    fields,
                } => {
                    let coll = self.collection(&collection).await;
                    coll.replace_one(doc! { "_id": &id }, fields_to_bson(&fields))
                        .upsert(true)
                        .session(&mut *session)
                        .await
                        .map_err(|source| MongoDaoError::Write { collection, source })?;
                }
                BatchOp::Update {
                    collection,
                    id,
                    fields,
                } => {
                    if fields.is_empty() {
                        continue;
                    }
                    let coll = self.collection(&collection).await;
                    let outcome = coll
                        .update_one(doc! { "_id": &id }, doc! { "$set": fields_to_bson(&fields) })
                        .session(&mut *session)
                        .await
                        .map_err(|source| MongoDaoError::Write {
                            collection: collection.clone(),
                            source,
                        })?;
                    if outcome.matched_count == 0 {
                        return Err(MongoDaoError::MissingDocument { collection, id });
                    }
                }
            }
        }
        Ok(())
    }
}

impl DocumentStore for MongoDocumentStore {
    fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<Document>>> {
        let store = self.clone();
        let collection = collection.to_owned();
        let id = id.to_owned();
        Box::pin(async move { store.get_inner(&collection, &id).await.map_err(Into::into) })
    }

    fn list(&self, collection: &str) -> BoxFuture<'static, StorageResult<Vec<Document>>> {
        let store = self.clone();
        let collection = collection.to_owned();
        Box::pin(async move { store.list_inner(&collection).await.map_err(Into::into) })
    }

    fn create(&self, collection: &str, fields: Fields) -> BoxFuture<'static, StorageResult<String>> {
        let store = self.clone();
        let collection = collection.to_owned();
        Box::pin(async move {
            store
                .create_inner(&collection, fields)
                .await
                .map_err(Into::into)
        })
    }

    fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let collection = collection.to_owned();
        let id = id.to_owned();
        Box::pin(async move {
            store
                .set_inner(&collection, &id, fields)
                .await
                .map_err(Into::into)
        })
    }

    fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let collection = collection.to_owned();
        let id = id.to_owned();
        Box::pin(async move {
            store
                .update_inner(&collection, &id, fields)
                .await
                .map_err(Into::into)
        })
    }

    fn delete(&self, collection: &str, id: &str) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let collection = collection.to_owned();
        let id = id.to_owned();
        Box::pin(async move {
            store
                .delete_inner(&collection, &id)
                .await
                .map_err(Into::into)
        })
    }

    fn commit(&self, batch: WriteBatch) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.commit_inner(batch).await.map_err(Into::into) })
    }

    fn watch_document(&self, collection: &str, id: &str) -> BoxStream<'static, DocumentEvent> {
        let store = self.clone();
        let collection = collection.to_owned();
        let id = id.to_owned();
        Box::pin(stream! {
            // Open the change stream before the initial read so changes
            // landing in between are not lost.
            let coll = store.collection(&collection).await;
            let changes = coll
                .watch()
                .full_document(FullDocumentType::UpdateLookup)
                .await;
            let mut changes = match changes {
                Ok(changes) => changes,
                Err(err) => {
                    warn!(collection = %collection, error = %err, "failed to open change stream");
                    yield DocumentEvent::Absent;
                    return;
                }
            };

            match store.get_inner(&collection, &id).await {
                Ok(Some(document)) => yield DocumentEvent::Current(document),
                Ok(None) => yield DocumentEvent::Absent,
                Err(err) => {
                    warn!(collection = %collection, id = %id, error = %err, "initial document read failed");
                    yield DocumentEvent::Absent;
                }
            }

            while let Some(event) = changes.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        warn!(collection = %collection, error = %err, "change stream failed");
                        break;
                    }
                };

                let matches = event
                    .document_key
                    .as_ref()
                    .and_then(|key| key.get_str("_id").ok())
                    .is_some_and(|key| key == id);

                match event.operation_type {
                    OperationType::Insert | OperationType::Update | OperationType::Replace
                        if matches =>
                    {
                        if let Some(full) = event.full_document {
                            yield DocumentEvent::Current(document_from_bson(full));
                        }
                    }
                    OperationType::Delete if matches => yield DocumentEvent::Deleted,
                    OperationType::Invalidate => break,
                    _ => {}
                }
            }
        })
    }

    fn watch_collection(&self, collection: &str) -> BoxStream<'static, Vec<Document>> {
        let store = self.clone();
        let collection = collection.to_owned();
        Box::pin(stream! {
            let coll = store.collection(&collection).await;
            let changes = coll.watch().await;
            let mut changes = match changes {
                Ok(changes) => changes,
                Err(err) => {
                    warn!(collection = %collection, error = %err, "failed to open change stream");
                    yield Vec::new();
                    return;
                }
            };

            match store.list_inner(&collection).await {
                Ok(documents) => yield documents,
                Err(err) => {
                    warn!(collection = %collection, error = %err, "initial collection read failed");
                    yield Vec::new();
                }
            }

            while let Some(event) = changes.next().await {
                match event {
                    Ok(event) if event.operation_type == OperationType::Invalidate => break,
                    Ok(_) => match store.list_inner(&collection).await {
                        Ok(documents) => yield documents,
                        Err(err) => {
                            warn!(collection = %collection, error = %err, "collection resync failed");
                            yield Vec::new();
                        }
                    },
                    Err(err) => {
                        warn!(collection = %collection, error = %err, "change stream failed");
                        break;
                    }
                }
            }
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.reconnect().await.map_err(Into::into) })
    }
}
