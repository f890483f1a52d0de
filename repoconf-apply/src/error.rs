//! Error types for repoconf-apply.
//!
//! Unsupported operations are kept apart from remote failures: the first is a known gap in
//! the repository's API, the second is whatever the repository answered.

use repoconf_domain::ApiError;
use repoconf_types::Cancelled;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecuteError {
    /// The repository offers no call for this change.
    #[error("not possible yet to {action}")]
    Unsupported { action: String },

    #[error("{action}: {source}")]
    Remote {
        action: String,
        #[source]
        source: ApiError,
    },

    #[error("schema {name}@{version} is not valid UTF-8")]
    InvalidSchemaEncoding { name: String, version: String },

    #[error("operation cancelled")]
    Cancelled,
}

impl ExecuteError {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, ExecuteError::Unsupported { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            ExecuteError::Cancelled
                | ExecuteError::Remote {
                    source: ApiError::Cancelled,
                    ..
                }
        )
    }
}

impl From<Cancelled> for ExecuteError {
    fn from(_: Cancelled) -> Self {
        ExecuteError::Cancelled
    }
}

/// Wrap a remote failure with the action that was attempted.
pub(crate) fn remote(action: &'static str) -> impl FnOnce(ApiError) -> ExecuteError {
    move |source| match source {
        ApiError::Cancelled => ExecuteError::Cancelled,
        source => ExecuteError::Remote {
            action: action.to_string(),
            source,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_reads_as_not_yet_possible() {
        let err = ExecuteError::Unsupported {
            action: "unregister meta types".to_string(),
        };
        assert!(err.is_unsupported());
        assert_eq!(err.to_string(), "not possible yet to unregister meta types");
    }

    #[test]
    fn remote_cancellation_is_cancellation() {
        let err = remote("set workflow")(ApiError::Cancelled);
        assert!(err.is_cancelled());

        let err = remote("set workflow")(ApiError::NotFound("core/article".to_string()));
        assert!(!err.is_cancelled());
        assert_eq!(err.to_string(), "set workflow: not found: core/article");
    }
}
