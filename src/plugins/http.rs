//! HTTP scanner plugin client.
//!
//! Each analysis tool (Slither, Mythril, Manticore, MythX, ...) runs as an
//! isolated service exposing two endpoints:
//!
//! - `GET {endpoint}/health` answers `200 {"status": "ok"}` when ready.
//! - `POST {endpoint}/scan` takes `{"target": {...}, "config": {...}}` and
//!   answers `200 {"findings": [...]}` or `4xx/5xx {"error": "..."}`.
//!
//! This client turns every transport or protocol problem into a
//! [`PluginError`] so one misbehaving tool cannot abort a whole scan.

use crate::core::{
    clamp_confidence, HealthStatus, PluginError, ScanConfig, ScannerPlugin, Severity, Target,
    VulnerabilityFinding, DEFAULT_CONFIDENCE,
};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// HTTP plugin configuration.
#[derive(Debug, Clone)]
pub struct HttpPluginConfig {
    /// Plugin name, used as `source_plugin` on findings.
    pub name: String,

    /// Base URL of the plugin service.
    pub endpoint_url: String,

    /// Timeout for health probes.
    pub health_timeout: Duration,

    /// Optional bearer token (kept secret).
    pub api_key: Option<SecretString>,

    /// Confidence assigned to findings that do not carry one.
    pub default_confidence: f32,
}

impl HttpPluginConfig {
    /// Creates a new configuration for the plugin at `endpoint_url`.
    pub fn new(name: impl Into<String>, endpoint_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint_url: endpoint_url.into(),
            health_timeout: Duration::from_secs(5),
            api_key: None,
            default_confidence: DEFAULT_CONFIDENCE,
        }
    }

    /// Sets the health probe timeout.
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    /// Sets the bearer token.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(api_key.into().into()));
        self
    }

    /// Sets the default confidence for findings without one.
    pub fn with_default_confidence(mut self, confidence: f32) -> Self {
        self.default_confidence = clamp_confidence(confidence);
        self
    }
}

/// A scanner plugin reached over HTTP.
///
/// # Example
///
/// ```rust,ignore
/// use scanhub::plugins::{HttpPlugin, HttpPluginConfig};
///
/// let config = HttpPluginConfig::new("slither", "http://slither:8080");
/// let plugin = HttpPlugin::new(config)?;
/// ```
#[derive(Debug)]
pub struct HttpPlugin {
    config: HttpPluginConfig,
    client: reqwest::Client,
}

impl HttpPlugin {
    /// Creates a new HTTP plugin client.
    pub fn new(config: HttpPluginConfig) -> Result<Self, PluginError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| PluginError::unreachable(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Returns the plugin configuration.
    pub fn config(&self) -> &HttpPluginConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.endpoint_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key.expose_secret()),
            None => request,
        }
    }

    /// Sends the scan request and interprets the response.
    async fn exchange(
        &self,
        request: reqwest::RequestBuilder,
        started: Instant,
    ) -> Result<Vec<VulnerabilityFinding>, PluginError> {
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(e, started))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, started))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));
            return Err(PluginError::reported(message));
        }

        let parsed: ScanResponseBody =
            serde_json::from_str(&body).map_err(|e| PluginError::malformed(e.to_string()))?;

        Ok(parsed
            .findings
            .into_iter()
            .map(|f| self.stamp(f))
            .collect())
    }

    fn stamp(&self, wire: WireFinding) -> VulnerabilityFinding {
        VulnerabilityFinding::new(
            wire.vulnerability_type,
            wire.severity,
            wire.location,
            self.config.name.clone(),
        )
        .with_description(wire.description)
        .with_confidence(wire.confidence.unwrap_or(self.config.default_confidence))
    }
}

/// Maps a reqwest failure onto the plugin error taxonomy.
fn transport_error(error: reqwest::Error, started: Instant) -> PluginError {
    if error.is_timeout() {
        PluginError::timeout(started.elapsed())
    } else if error.is_decode() {
        PluginError::malformed(error.to_string())
    } else {
        PluginError::unreachable(error.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ScanRequestBody<'a> {
    target: &'a Target,
    config: &'a ScanConfig,
}

#[derive(Debug, Deserialize)]
struct ScanResponseBody {
    findings: Vec<WireFinding>,
}

/// A finding as the plugin sends it; `source_plugin` is added by the client.
#[derive(Debug, Deserialize)]
struct WireFinding {
    vulnerability_type: String,
    #[serde(default)]
    description: String,
    severity: Severity,
    location: String,
    #[serde(default)]
    confidence: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct HealthBody {
    status: String,
}

#[async_trait]
impl ScannerPlugin for HttpPlugin {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn health(&self) -> HealthStatus {
        let request = self
            .authorize(self.client.get(self.url("health")))
            .timeout(self.config.health_timeout);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(plugin = %self.config.name, error = %e, "Health probe failed");
                return HealthStatus::Unhealthy;
            }
        };

        if response.status() != reqwest::StatusCode::OK {
            tracing::debug!(
                plugin = %self.config.name,
                status = response.status().as_u16(),
                "Health probe returned non-200"
            );
            return HealthStatus::Unhealthy;
        }

        match response.json::<HealthBody>().await {
            Ok(body) if body.status == "ok" => HealthStatus::Healthy,
            _ => HealthStatus::Unhealthy,
        }
    }

    async fn submit_scan(
        &self,
        target: &Target,
        config: &ScanConfig,
    ) -> Result<Vec<VulnerabilityFinding>, PluginError> {
        let started = Instant::now();
        let deadline = config.timeout();

        let request = self
            .authorize(self.client.post(self.url("scan")))
            .timeout(deadline)
            .json(&ScanRequestBody { target, config });

        tracing::debug!(
            plugin = %self.config.name,
            target = %target.identifier,
            scan_type = %config.scan_type,
            "Submitting scan to plugin"
        );

        match tokio::time::timeout(deadline, self.exchange(request, started)).await {
            Ok(result) => result,
            Err(_) => Err(PluginError::timeout(started.elapsed())),
        }
    }
}
