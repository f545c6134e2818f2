//! Cross-plugin finding deduplication.

use crate::core::{AggregatedFinding, PluginOutcome, ScanJob};

use std::cmp::Reverse;
use std::collections::HashMap;

/// Merges raw findings from every successful plugin outcome.
///
/// Findings from different plugins with the same vulnerability type
/// (case-insensitive) and location become one [`AggregatedFinding`]:
/// highest confidence, highest severity, the description of the more
/// confident report, and every reporting plugin in first-seen order.
/// Two findings from the same plugin are never merged with each other.
///
/// Error outcomes are skipped. The plugin name attached to each outcome is
/// taken as the finding's source.
pub fn aggregate<'a, I, K>(per_plugin_results: I) -> Vec<AggregatedFinding>
where
    I: IntoIterator<Item = (K, &'a PluginOutcome)>,
    K: AsRef<str>,
{
    let raw = per_plugin_results.into_iter().flat_map(|(plugin, outcome)| {
        let plugin = plugin.as_ref().to_string();
        outcome
            .findings()
            .unwrap_or_default()
            .iter()
            .cloned()
            .map(move |mut finding| {
                finding.source_plugin.clone_from(&plugin);
                AggregatedFinding::from(finding)
            })
    });

    merge(raw)
}

/// Aggregates a job's findings, visiting plugins in dispatch order.
pub fn aggregate_job(job: &ScanJob) -> Vec<AggregatedFinding> {
    aggregate(job.ordered_results())
}

/// Merges already-aggregated findings under the same rules as
/// [`aggregate`].
///
/// Two entries combine only when their source sets are disjoint, which
/// makes the operation idempotent: `merge(merge(x)) == merge(x)`.
pub fn merge<I>(findings: I) -> Vec<AggregatedFinding>
where
    I: IntoIterator<Item = AggregatedFinding>,
{
    let mut merged: Vec<AggregatedFinding> = Vec::new();
    let mut by_key: HashMap<(String, String), Vec<usize>> = HashMap::new();

    for finding in findings {
        let key = (
            finding.vulnerability_type.to_lowercase(),
            finding.location.clone(),
        );
        let slots = by_key.entry(key).or_default();

        let partner = slots
            .iter()
            .copied()
            .find(|&i| is_disjoint(&merged[i].source_plugins, &finding.source_plugins));

        match partner {
            Some(i) => absorb(&mut merged[i], finding),
            None => {
                slots.push(merged.len());
                merged.push(finding);
            }
        }
    }

    // Stable: entries that compare equal keep their input order.
    merged.sort_by(|a, b| {
        (
            Reverse(a.severity),
            a.vulnerability_type.to_lowercase(),
            &a.location,
            &a.source_plugins,
        )
            .cmp(&(
                Reverse(b.severity),
                b.vulnerability_type.to_lowercase(),
                &b.location,
                &b.source_plugins,
            ))
    });
    merged
}

fn is_disjoint(a: &[String], b: &[String]) -> bool {
    !a.iter().any(|name| b.contains(name))
}

fn absorb(into: &mut AggregatedFinding, other: AggregatedFinding) {
    if other.confidence > into.confidence {
        into.confidence = other.confidence;
        into.description = other.description;
    }
    into.severity = into.severity.max(other.severity);
    for source in other.source_plugins {
        if !into.source_plugins.contains(&source) {
            into.source_plugins.push(source);
        }
    }
}
