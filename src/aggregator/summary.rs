//! Finding counts for reporting.

use crate::core::{AggregatedFinding, Severity};

use serde::{Deserialize, Serialize};

/// Counts over a set of aggregated findings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingSummary {
    /// Total number of findings.
    pub total: usize,
    /// Findings at severity 4.
    pub critical: usize,
    /// Findings at severity 3.
    pub high: usize,
    /// Findings at severity 2.
    pub medium: usize,
    /// Findings at severity 1.
    pub low: usize,
    /// Findings at severity 0.
    pub info: usize,
    /// Findings reported by more than one plugin.
    pub corroborated: usize,
    /// Distinct reporting plugins, first-seen order.
    pub plugins: Vec<String>,
}

impl FindingSummary {
    /// Summarizes `findings`.
    pub fn from_findings(findings: &[AggregatedFinding]) -> Self {
        let mut summary = Self {
            total: findings.len(),
            ..Self::default()
        };

        for finding in findings {
            *summary.slot(finding.severity) += 1;
            if finding.is_corroborated() {
                summary.corroborated += 1;
            }
            for plugin in &finding.source_plugins {
                if !summary.plugins.contains(plugin) {
                    summary.plugins.push(plugin.clone());
                }
            }
        }

        summary
    }

    /// Returns the count at `severity`.
    pub fn count(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Info => self.info,
        }
    }

    /// Returns the most severe level present, if any.
    pub fn highest_severity(&self) -> Option<Severity> {
        Severity::DESCENDING
            .into_iter()
            .find(|&s| self.count(s) > 0)
    }

    fn slot(&mut self, severity: Severity) -> &mut usize {
        match severity {
            Severity::Critical => &mut self.critical,
            Severity::High => &mut self.high,
            Severity::Medium => &mut self.medium,
            Severity::Low => &mut self.low,
            Severity::Info => &mut self.info,
        }
    }
}
