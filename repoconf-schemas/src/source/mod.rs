//! Schema sources: where the bytes of a named schema come from.
//!
//! Both sources hash the raw bytes with SHA-256, so switching a schema between HTTP and
//! git does not change what ends up in the lock file.

mod git;
mod http;
mod template;

pub use git::GitSchemaSource;
pub use http::{HttpSchemaSource, logical_url};
pub use template::UrlTemplate;

use repoconf_types::config::SchemaLocator;
use repoconf_types::{CancelToken, Cancelled, LoadedSchema};
use std::io;
use thiserror::Error;

pub trait SchemaSource {
    /// Fetch the named schema and compute its hash.
    fn load_schema(&self, cancel: &CancelToken, name: &str) -> Result<LoadedSchema, SourceError>;

    /// The URL a schema would be downloaded from, for sources that can be cached.
    fn asset_url(&self, _name: &str) -> Result<Option<String>, SourceError> {
        Ok(None)
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid URL template {template:?}: {message}")]
    Template { template: String, message: String },

    #[error("invalid schema URL {url:?}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("fetch {url}: {message}")]
    Http { url: String, message: String },

    #[error("fetch {url}: server responded with {status}")]
    Status { url: String, status: u16 },

    #[error("git {operation}: {message}")]
    Git { operation: String, message: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Open the source a schema set points at.
///
/// For git this performs the shallow fetch of the pinned reference up front.
pub fn open_source(
    cancel: &CancelToken,
    locator: SchemaLocator<'_>,
    version: &str,
) -> Result<Box<dyn SchemaSource>, SourceError> {
    match locator {
        SchemaLocator::Http { url_template } => {
            Ok(Box::new(HttpSchemaSource::new(url_template, version)?))
        }
        SchemaLocator::Git { repository } => Ok(Box::new(GitSchemaSource::fetch(
            cancel, repository, version,
        )?)),
    }
}
