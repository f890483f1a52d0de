use super::{Delta, DiffContext, DiffError, Differ, remote, set_diff};
use crate::ports::RepositoryApi;
use repoconf_types::change::MetricChange;
use repoconf_types::config::MetricAggregation;
use repoconf_types::{Change, ChangeDomain};
use std::collections::BTreeMap;

pub struct MetricDiffer;

impl Differ for MetricDiffer {
    fn domain(&self) -> ChangeDomain {
        ChangeDomain::Metric
    }

    fn diff(
        &self,
        ctx: &DiffContext<'_>,
        api: &dyn RepositoryApi,
    ) -> Result<Vec<Change>, DiffError> {
        let kinds = api.metric_kinds().map_err(remote("get current kinds"))?;

        let current: BTreeMap<&str, MetricAggregation> = kinds
            .iter()
            .map(|k| (k.name.as_str(), k.aggregation))
            .collect();
        let wanted: BTreeMap<&str, MetricAggregation> = ctx
            .config
            .metrics
            .iter()
            .map(|m| (m.kind.as_str(), m.effective_aggregation()))
            .collect();

        let changes = set_diff(&wanted, &current, |w, c| w == c)
            .into_iter()
            .map(|delta| match delta {
                Delta::Added { key, wanted } => MetricChange::Add {
                    kind: key.to_string(),
                    aggregation: *wanted,
                },
                Delta::Changed {
                    key,
                    current,
                    wanted,
                } => MetricChange::Update {
                    kind: key.to_string(),
                    from: *current,
                    to: *wanted,
                },
                Delta::Removed { key, .. } => MetricChange::Remove {
                    kind: key.to_string(),
                },
            })
            .map(Change::Metric)
            .collect();

        Ok(changes)
    }
}
