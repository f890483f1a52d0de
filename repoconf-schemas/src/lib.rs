//! Loading and verifying versioned schema artifacts.
//!
//! Schemas come from a [`source::SchemaSource`] (templated HTTP or a pinned git reference),
//! are checked against the [`lock::SchemaLockFile`], and HTTP downloads are kept in a
//! hash-verified [`cache::SchemaCache`].

pub mod cache;
pub mod loader;
pub mod lock;
pub mod source;

pub use cache::{CacheError, SchemaCache};
pub use loader::{SchemaLoadError, load_schema_set, load_schema_sets};
pub use lock::{LockError, SchemaLockFile, lock_file_path};
pub use source::{GitSchemaSource, HttpSchemaSource, SchemaSource, SourceError, UrlTemplate};
