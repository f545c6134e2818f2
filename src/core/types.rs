//! Core types used throughout the scanhub library.
//!
//! This module defines the fundamental data structures for describing
//! what is scanned, how it is scanned, and what the scanner plugins report.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Confidence assigned to a finding when the reporting plugin omits one.
pub const DEFAULT_CONFIDENCE: f32 = 0.5;

/// The kind of artifact a [`Target`] identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    /// A source file path.
    File,
    /// A deployed contract address.
    Address,
    /// A raw bytecode blob.
    Bytecode,
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Address => write!(f, "address"),
            Self::Bytecode => write!(f, "bytecode"),
        }
    }
}

/// What is being scanned.
///
/// A target is immutable once a scan starts; the scan job keeps its own copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Address, file path, or bytecode blob.
    pub identifier: String,

    /// The kind of artifact `identifier` refers to.
    pub target_type: TargetType,

    /// Chain label, e.g. "ethereum".
    pub blockchain: String,
}

impl Target {
    /// Creates a target on the default chain ("ethereum").
    pub fn new(identifier: impl Into<String>, target_type: TargetType) -> Self {
        Self {
            identifier: identifier.into(),
            target_type,
            blockchain: "ethereum".to_string(),
        }
    }

    /// Creates an address target.
    pub fn address(address: impl Into<String>) -> Self {
        Self::new(address, TargetType::Address)
    }

    /// Creates a file target.
    pub fn file(path: impl Into<String>) -> Self {
        Self::new(path, TargetType::File)
    }

    /// Creates a bytecode target.
    pub fn bytecode(code: impl Into<String>) -> Self {
        Self::new(code, TargetType::Bytecode)
    }

    /// Sets the chain label.
    pub fn with_blockchain(mut self, blockchain: impl Into<String>) -> Self {
        self.blockchain = blockchain.into();
        self
    }
}

/// The analysis style requested for a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanType {
    /// Static analysis of source or bytecode.
    Static,
    /// Dynamic analysis such as symbolic execution.
    Dynamic,
    /// Fuzzing.
    Fuzzing,
    /// Everything the plugin can do.
    Full,
}

impl ScanType {
    /// Returns `true` if a plugin advertising `supported` may serve a request
    /// for this scan type.
    ///
    /// A `Full` request matches every plugin, and a plugin that advertises
    /// `Full` serves every request.
    pub fn is_served_by(&self, supported: &BTreeSet<ScanType>) -> bool {
        *self == ScanType::Full || supported.contains(self) || supported.contains(&ScanType::Full)
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Dynamic => write!(f, "dynamic"),
            Self::Fuzzing => write!(f, "fuzzing"),
            Self::Full => write!(f, "full"),
        }
    }
}

impl FromStr for ScanType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "dynamic" => Ok(Self::Dynamic),
            "fuzzing" => Ok(Self::Fuzzing),
            "full" => Ok(Self::Full),
            other => Err(format!("unknown scan type '{}'", other)),
        }
    }
}

/// Per-request scan configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Requested analysis style.
    pub scan_type: ScanType,

    /// Plugin names to restrict dispatch to. Empty means every plugin
    /// supporting `scan_type`.
    #[serde(default)]
    pub enabled_plugins: BTreeSet<String>,

    /// Hard deadline for the whole scan.
    pub timeout_seconds: u64,

    /// Maximum number of plugins running at once.
    pub max_concurrency: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scan_type: ScanType::Full,
            enabled_plugins: BTreeSet::new(),
            timeout_seconds: 300,
            max_concurrency: 4,
        }
    }
}

impl ScanConfig {
    /// Creates a configuration for the given scan type with defaults.
    pub fn new(scan_type: ScanType) -> Self {
        Self {
            scan_type,
            ..Self::default()
        }
    }

    /// Restricts dispatch to the named plugin (may be called repeatedly).
    pub fn with_plugin(mut self, name: impl Into<String>) -> Self {
        self.enabled_plugins.insert(name.into());
        self
    }

    /// Restricts dispatch to the given plugin names.
    pub fn with_plugins<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled_plugins.extend(names.into_iter().map(Into::into));
        self
    }

    /// Sets the scan deadline in seconds.
    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the concurrency bound.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Returns the deadline as a `Duration`.
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds)
    }

    /// Returns the effective concurrency bound (never zero).
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }

    /// Returns `true` if the named plugin passes the `enabled_plugins` filter.
    pub fn allows_plugin(&self, name: &str) -> bool {
        self.enabled_plugins.is_empty() || self.enabled_plugins.contains(name)
    }
}

/// Health of a registered plugin as last observed by a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Never probed.
    #[default]
    Unknown,
    /// Last probe succeeded.
    Healthy,
    /// Last probe failed.
    Unhealthy,
}

impl HealthStatus {
    /// Returns `true` for `Healthy`.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Healthy => write!(f, "healthy"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Severity of a finding, ordinal 0 (informational) to 4 (critical).
///
/// Serialized as the bare integer to match the plugin wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Severity {
    /// 0 - informational.
    Info,
    /// 1 - low.
    Low,
    /// 2 - medium.
    Medium,
    /// 3 - high.
    High,
    /// 4 - critical.
    Critical,
}

impl Severity {
    /// Returns the ordinal value.
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Info => 0,
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }

    /// All severities from most to least severe.
    pub const DESCENDING: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];
}

impl TryFrom<u8> for Severity {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Info),
            1 => Ok(Self::Low),
            2 => Ok(Self::Medium),
            3 => Ok(Self::High),
            4 => Ok(Self::Critical),
            other => Err(format!("severity {} out of range 0-4", other)),
        }
    }
}

impl From<Severity> for u8 {
    fn from(severity: Severity) -> Self {
        severity.as_u8()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// A vulnerability as reported by a single plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilityFinding {
    /// Taxonomy-defined type, e.g. "reentrancy".
    pub vulnerability_type: String,

    /// Human-readable description.
    pub description: String,

    /// Severity ordinal.
    pub severity: Severity,

    /// Where the issue lives: line, offset, or address.
    pub location: String,

    /// Name of the plugin that reported this finding.
    pub source_plugin: String,

    /// Confidence in [0.0, 1.0].
    pub confidence: f32,
}

impl VulnerabilityFinding {
    /// Creates a finding with the default confidence.
    pub fn new(
        vulnerability_type: impl Into<String>,
        severity: Severity,
        location: impl Into<String>,
        source_plugin: impl Into<String>,
    ) -> Self {
        Self {
            vulnerability_type: vulnerability_type.into(),
            description: String::new(),
            severity,
            location: location.into(),
            source_plugin: source_plugin.into(),
            confidence: DEFAULT_CONFIDENCE,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the confidence, clamped into [0.0, 1.0].
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = clamp_confidence(confidence);
        self
    }

    /// Returns the merge key: lowercased type and exact location.
    pub fn merge_key(&self) -> (String, &str) {
        (self.vulnerability_type.to_lowercase(), &self.location)
    }
}

/// A finding after cross-plugin merging.
///
/// Identical to [`VulnerabilityFinding`] except that it can be corroborated
/// by several plugins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedFinding {
    /// Taxonomy-defined type, as first reported.
    pub vulnerability_type: String,

    /// Description from the most confident report.
    pub description: String,

    /// Highest reported severity.
    pub severity: Severity,

    /// Where the issue lives.
    pub location: String,

    /// Distinct reporting plugins, first-seen order.
    pub source_plugins: Vec<String>,

    /// Highest reported confidence.
    pub confidence: f32,
}

impl AggregatedFinding {
    /// Returns `true` if more than one plugin reported this issue.
    pub fn is_corroborated(&self) -> bool {
        self.source_plugins.len() > 1
    }
}

impl From<VulnerabilityFinding> for AggregatedFinding {
    fn from(f: VulnerabilityFinding) -> Self {
        Self {
            vulnerability_type: f.vulnerability_type,
            description: f.description,
            severity: f.severity,
            location: f.location,
            source_plugins: vec![f.source_plugin],
            confidence: f.confidence,
        }
    }
}

/// Clamps a confidence into [0.0, 1.0]; NaN becomes 0.0.
pub fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_type_matching() {
        let static_only: BTreeSet<_> = [ScanType::Static].into_iter().collect();
        let full: BTreeSet<_> = [ScanType::Full].into_iter().collect();

        assert!(ScanType::Static.is_served_by(&static_only));
        assert!(!ScanType::Dynamic.is_served_by(&static_only));
        assert!(ScanType::Full.is_served_by(&static_only));
        assert!(ScanType::Fuzzing.is_served_by(&full));
    }

    #[test]
    fn test_scan_type_from_str() {
        assert_eq!("STATIC".parse::<ScanType>(), Ok(ScanType::Static));
        assert_eq!("full".parse::<ScanType>(), Ok(ScanType::Full));
        assert!("symbolic".parse::<ScanType>().is_err());
    }

    #[test]
    fn test_severity_serde_as_integer() {
        let json = serde_json::to_string(&Severity::High).unwrap();
        assert_eq!(json, "3");

        let parsed: Severity = serde_json::from_str("4").unwrap();
        assert_eq!(parsed, Severity::Critical);

        assert!(serde_json::from_str::<Severity>("7").is_err());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Low);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let finding =
            VulnerabilityFinding::new("reentrancy", Severity::High, "L42", "slither").with_confidence(1.7);
        assert_eq!(finding.confidence, 1.0);
        assert_eq!(clamp_confidence(-0.2), 0.0);
        assert_eq!(clamp_confidence(f32::NAN), 0.0);
    }

    #[test]
    fn test_scan_config_builder() {
        let config = ScanConfig::new(ScanType::Static)
            .with_plugin("slither")
            .with_timeout_seconds(30)
            .with_max_concurrency(0);

        assert!(config.allows_plugin("slither"));
        assert!(!config.allows_plugin("mythril"));
        assert_eq!(config.effective_concurrency(), 1);
        assert_eq!(config.timeout(), std::time::Duration::from_secs(30));
    }

    #[test]
    fn test_target_constructors() {
        let target = Target::address("0xABC").with_blockchain("polygon");
        assert_eq!(target.target_type, TargetType::Address);
        assert_eq!(target.blockchain, "polygon");
        assert_eq!(Target::file("Token.sol").blockchain, "ethereum");
    }
}
