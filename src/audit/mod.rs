//! Structured audit logging.
//!
//! Audit events are ordinary `tracing` events on the `scanhub::audit`
//! target, so any subscriber can route them separately from operational
//! logs (for example `RUST_LOG=scanhub::audit=info`).

mod events;

pub use events::{
    emit_health_changed, emit_plugin_completed, emit_scan_completed, emit_scan_started,
    AuditEvent, HealthAuditEvent, PluginSummary, ScanAuditEvent,
};
