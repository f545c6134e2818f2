//! Basic scan example with in-process plugins.
//!
//! This example shows how to:
//! - Register plugins with the registry
//! - Probe their health
//! - Run a scan and read the aggregated findings
//!
//! Run with: cargo run --example basic_scan

use scanhub::prelude::*;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Scanhub Basic Scan Example ===\n");

    let registry = Arc::new(PluginRegistry::new());

    registry.register_plugin(
        PluginDescriptor::new("slither", "http://slither:8080").with_scan_type(ScanType::Static),
        MockPlugin::new("slither")
            .with_finding("reentrancy", Severity::High, "Vault.sol:42", 0.7)
            .with_finding("tx-origin", Severity::Medium, "Vault.sol:17", 0.6),
    );
    registry.register_plugin(
        PluginDescriptor::new("mythril", "http://mythril:8080")
            .with_scan_types([ScanType::Static, ScanType::Dynamic]),
        MockPlugin::new("mythril").with_finding("reentrancy", Severity::Critical, "Vault.sol:42", 0.9),
    );
    registry.register_plugin(
        PluginDescriptor::new("manticore", "http://manticore:8080").with_scan_type(ScanType::Static),
        CircuitBreaker::with_defaults(
            MockPlugin::new("manticore").with_error(PluginError::unreachable("connection refused")),
        ),
    );

    for (name, status) in probe_all(&registry, Duration::from_secs(5)).await {
        println!("Plugin {:<10} {}", name, status);
    }

    let orchestrator = ScanOrchestrator::builder()
        .with_registry(registry)
        .build();

    let target = Target::file("contracts/Vault.sol").with_blockchain("ethereum");
    let config = ScanConfig::new(ScanType::Static).with_timeout_seconds(30);

    let job = orchestrator.run_scan(target, config).await?;

    println!("\n=== Scan Results ===");
    println!("Job ID: {}", job.id);
    println!("Status: {}", job.status);
    println!("Dispatched: {}", job.dispatched_plugins.join(", "));

    for (plugin, outcome) in job.ordered_results() {
        match outcome {
            PluginOutcome::Findings { findings } => {
                println!("  {} reported {} finding(s)", plugin, findings.len());
            }
            PluginOutcome::Error { error } => {
                println!("  {} failed: {}", plugin, error);
            }
        }
    }

    let findings = orchestrator.results(job.id)?.unwrap_or_default();
    let summary = FindingSummary::from_findings(&findings);

    println!(
        "\n{} finding(s), {} corroborated by more than one plugin",
        summary.total, summary.corroborated
    );
    for finding in &findings {
        println!(
            "  [{}] {} at {} (confidence {:.2}, sources: {})",
            finding.severity,
            finding.vulnerability_type,
            finding.location,
            finding.confidence,
            finding.source_plugins.join(", ")
        );
    }

    println!("\n=== Example Complete ===");
    Ok(())
}
