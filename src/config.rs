//! Event log configuration
//!
//! Mirrors the option names accepted by the JavaScript client
//! (`prefix`, `analyticsClient`, `gaId`, `gosquaredId`, ...) so the same
//! JSON document can configure both.

use crate::error::{EventLogError, Result};
use serde::{Deserialize, Serialize};

/// Default analytics-client ingestion host
pub const DEFAULT_ANALYTICS_ENDPOINT: &str = "data.balena-cloud.com";

/// Default HTTP timeout applied by the built-in adaptors
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Configuration for an `EventLog`
///
/// Every backend section is optional; a backend without its section is
/// simply not instantiated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLogConfig {
    /// Name of the logical subsystem emitting events (e.g. "UI", "CLI")
    #[serde(default)]
    pub prefix: String,

    /// Log swallowed hook errors and disabled adaptors
    #[serde(default)]
    pub debug: bool,

    /// Analytics client settings (required)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics_client: Option<AnalyticsClientConfig>,

    /// Web analytics property id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ga_id: Option<String>,

    /// Web analytics site name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ga_site: Option<String>,

    /// GoSquared site token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gosquared_id: Option<String>,

    /// GoSquared API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gosquared_api_key: Option<String>,

    /// HTTP timeout for the built-in adaptors, in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            debug: false,
            analytics_client: None,
            ga_id: None,
            ga_site: None,
            gosquared_id: None,
            gosquared_api_key: None,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

/// Settings for the analytics-client backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsClientConfig {
    /// Project the events belong to
    pub project_name: String,

    /// Component name reported with every event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_name: Option<String>,

    /// Ingestion host, without scheme
    #[serde(default = "default_analytics_endpoint")]
    pub endpoint: String,

    /// API key sent with every batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_analytics_endpoint() -> String {
    DEFAULT_ANALYTICS_ENDPOINT.to_string()
}

impl AnalyticsClientConfig {
    /// Create settings for a project using the default endpoint
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            component_name: None,
            endpoint: default_analytics_endpoint(),
            api_key: None,
        }
    }

    /// Full URL of the batch ingestion API
    pub fn ingest_url(&self) -> String {
        let endpoint = self.endpoint.trim_end_matches('/');
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            format!("{}/amplitude/2/httpapi", endpoint)
        } else {
            format!("https://{}/amplitude/2/httpapi", endpoint)
        }
    }
}

impl EventLogConfig {
    /// Create a configuration with a prefix and analytics client settings
    pub fn new(prefix: impl Into<String>, analytics_client: AnalyticsClientConfig) -> Self {
        Self {
            prefix: prefix.into(),
            analytics_client: Some(analytics_client),
            ..Default::default()
        }
    }

    /// Parse a configuration from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Enable debug logging
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Enable the web analytics backend
    pub fn with_ga(mut self, id: impl Into<String>, site: impl Into<String>) -> Self {
        self.ga_id = Some(id.into());
        self.ga_site = Some(site.into());
        self
    }

    /// Enable the GoSquared backend
    pub fn with_gosquared(mut self, id: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.gosquared_id = Some(id.into());
        self.gosquared_api_key = Some(api_key.into());
        self
    }

    /// Check the options every event log needs
    pub fn validate(&self) -> Result<()> {
        if self.prefix.is_empty() {
            return Err(EventLogError::Validation("`prefix` is required.".to_string()));
        }
        if self.analytics_client.is_none() {
            return Err(EventLogError::Validation(
                "`analyticsClient` is required.".to_string(),
            ));
        }
        Ok(())
    }
}
