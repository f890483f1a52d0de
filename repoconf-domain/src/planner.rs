use crate::differs::{self, DiffContext, DiffError};
use crate::ports::RepositoryApi;
use repoconf_types::{Change, ChangeDomain};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("calculate {domain} changes: {source}")]
    Domain {
        domain: ChangeDomain,
        #[source]
        source: DiffError,
    },

    #[error("operation cancelled")]
    Cancelled,
}

/// Runs every differ in order and concatenates their changes.
///
/// The first failing domain fails the whole plan; no partial change list is returned.
pub struct Planner {
    differs: Vec<Box<dyn differs::Differ>>,
}

impl Default for Planner {
    fn default() -> Self {
        Self::new()
    }
}

impl Planner {
    pub fn new() -> Self {
        Self {
            differs: differs::builtin_differs(),
        }
    }

    pub fn with_differs(differs: Vec<Box<dyn differs::Differ>>) -> Self {
        Self { differs }
    }

    pub fn plan(
        &self,
        ctx: &DiffContext<'_>,
        api: &dyn RepositoryApi,
    ) -> Result<Vec<Change>, PlanError> {
        let mut changes = Vec::new();

        for differ in &self.differs {
            if ctx.cancel.is_cancelled() {
                return Err(PlanError::Cancelled);
            }

            let domain = differ.domain();
            let mut found = differ.diff(ctx, api).map_err(|e| match e {
                DiffError::Cancelled(_) => PlanError::Cancelled,
                source => PlanError::Domain { domain, source },
            })?;

            debug!(domain = %domain, changes = found.len(), "calculated changes");
            changes.append(&mut found);
        }

        Ok(changes)
    }
}
