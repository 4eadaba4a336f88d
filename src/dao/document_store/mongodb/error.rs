//! Error types shared by the MongoDB storage implementation.

use mongodb::error::Error as MongoError;
use thiserror::Error;

/// Convenient result alias returning [`MongoDaoError`] failures.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failures that can occur while interacting with MongoDB.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// Required environment variable is missing.
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar {
        /// Name of the missing variable.
        var: &'static str,
    },
    /// The connection URI could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// The offending URI.
        uri: String,
        #[source]
        source: MongoError,
    },
    /// The client could not be built from the parsed options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    /// The initial ping never succeeded.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Number of ping attempts made.
        attempts: u32,
        #[source]
        source: MongoError,
    },
    /// A routine health-check ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    /// A read against a collection failed.
    #[error("failed to read from collection `{collection}`")]
    Read {
        /// Collection the read targeted.
        collection: String,
        #[source]
        source: MongoError,
    },
    /// A write against a collection failed.
    #[error("failed to write to collection `{collection}`")]
    Write {
        /// Collection the write targeted.
        collection: String,
        #[source]
        source: MongoError,
    },
    /// A merge update targeted a document that does not exist.
    #[error("document `{collection}/{id}` does not exist")]
    MissingDocument {
        /// Collection the update targeted.
        collection: String,
        /// Identifier of the missing document.
        id: String,
    },
    /// A client session could not be started.
    #[error("failed to start MongoDB session")]
    Session {
        #[source]
        source: MongoError,
    },
    /// A multi-document transaction failed to start or commit.
    #[error("MongoDB transaction failed")]
    Transaction {
        #[source]
        source: MongoError,
    },
}
