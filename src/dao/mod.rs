/// Document store abstraction and its backends.
pub mod document_store;
/// Typed record definitions for stored documents.
pub mod models;
/// Storage abstraction layer shared by all backends.
pub mod storage;
