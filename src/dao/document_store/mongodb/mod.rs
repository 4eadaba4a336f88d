//! MongoDB-backed document store.

mod config;
mod convert;
mod error;
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoDocumentStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::MissingDocument { collection, id } => {
                StorageError::missing(collection, id)
            }
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
