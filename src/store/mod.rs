//! Document store access. Read-only views of the chat application's data.

pub mod libsql_backend;
pub mod memory;
pub mod traits;

pub use libsql_backend::LibSqlDocumentStore;
pub use memory::InMemoryStore;
pub use traits::{Collection, Document, DocumentStore, canonical_id};
