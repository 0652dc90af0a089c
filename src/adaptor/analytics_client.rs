//! Analytics client adaptor
//!
//! Sends events and user properties to the balena data endpoint using the
//! Amplitude-compatible batch API. Identity is the username; the device id
//! is a random v4 uuid that is regenerated on logout.

use super::http;
use super::Adaptor;
use crate::config::{AnalyticsClientConfig, EventLogConfig};
use crate::error::{EventLogError, Result};
use crate::types::{now_millis, prefixed_event_type, Context, DistinctIds, User};
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

const NAME: &str = "analyticsClient";

/// User fields that are only written the first time they are seen
const ONE_TIME_USER_FIELDS: &[&str] = &["$created"];

/// User fields that are overwritten on every login
const UPDATE_USER_FIELDS: &[&str] = &[
    "$email",
    "$name",
    "hasPasswordSet",
    "id",
    "permissions",
    "public_key",
    "username",
];

/// Identity state of the analytics client
#[derive(Debug, Clone)]
struct Identity {
    user_id: Option<String>,
    device_id: String,
}

impl Identity {
    fn anonymous() -> Self {
        Self {
            user_id: None,
            device_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// A single event in an ingestion batch
#[derive(Debug, Clone, Serialize)]
pub struct IngestEvent {
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub device_id: String,
    pub time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_properties: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_properties: Option<serde_json::Value>,
}

/// Request body of the ingestion API
#[derive(Debug, Clone, Serialize)]
pub struct IngestBatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub events: Vec<IngestEvent>,
}

/// Split a user record into set-once and always-set properties
///
/// `$email` and `$name` default to the record's `email` and `username`.
/// The `$created` first-seen marker is the only set-once field, so a
/// returning user produces an empty `$setOnce`.
pub fn user_properties(user: &User) -> serde_json::Value {
    let mut data = serde_json::Map::new();
    if let Some(ref email) = user.email {
        data.insert("$email".to_string(), email.clone().into());
    }
    if let Some(ref username) = user.username {
        data.insert("$name".to_string(), username.clone().into());
    }
    data.extend(user.to_properties());

    let pick = |fields: &[&str]| -> serde_json::Map<String, serde_json::Value> {
        fields
            .iter()
            .filter_map(|f| data.get(*f).map(|v| (f.to_string(), v.clone())))
            .collect()
    };

    serde_json::json!({
        "$setOnce": pick(ONE_TIME_USER_FIELDS),
        "$set": pick(UPDATE_USER_FIELDS),
    })
}

/// Adaptor for the analytics client backend
pub struct AnalyticsClientAdaptor {
    client: reqwest::Client,
    config: AnalyticsClientConfig,
    identity: RwLock<Identity>,
}

impl AnalyticsClientAdaptor {
    /// Create the adaptor with an explicit HTTP client
    pub fn new(client: reqwest::Client, config: AnalyticsClientConfig) -> Self {
        Self {
            client,
            config,
            identity: RwLock::new(Identity::anonymous()),
        }
    }

    /// Factory: enabled whenever `analyticsClient` is configured
    pub fn from_config(config: &EventLogConfig) -> Option<Box<dyn Adaptor>> {
        let settings = config.analytics_client.clone()?;
        let client = http::build_client(config.http_timeout_secs)?;
        Some(Box::new(Self::new(client, settings)))
    }

    /// Current user id (the username of the logged-in user)
    pub async fn user_id(&self) -> Option<String> {
        self.identity.read().await.user_id.clone()
    }

    /// Current device id
    pub async fn device_id(&self) -> String {
        self.identity.read().await.device_id.clone()
    }

    /// Build an event stamped with the current identity
    async fn event(
        &self,
        event_type: String,
        event_properties: Option<serde_json::Value>,
        user_properties: Option<serde_json::Value>,
    ) -> IngestEvent {
        let identity = self.identity.read().await;
        IngestEvent {
            event_type,
            user_id: identity.user_id.clone(),
            device_id: identity.device_id.clone(),
            time: now_millis(),
            platform: self.config.component_name.clone(),
            event_properties,
            user_properties,
        }
    }

    async fn send(&self, event: IngestEvent) -> Result<()> {
        let batch = IngestBatch {
            api_key: self.config.api_key.clone(),
            events: vec![event],
        };

        let resp = self
            .client
            .post(self.config.ingest_url())
            .json(&batch)
            .send()
            .await?;
        http::check_status(resp).await?;

        tracing::debug!(
            project = %self.config.project_name,
            event_type = %batch.events[0].event_type,
            "Analytics event sent"
        );
        Ok(())
    }
}

#[async_trait]
impl Adaptor for AnalyticsClientAdaptor {
    fn name(&self) -> &str {
        NAME
    }

    async fn login(&self, user: Option<&User>, _extra: Option<&serde_json::Value>) -> Result<()> {
        let user = match user {
            Some(user) => user,
            None => return Ok(()),
        };

        self.identity.write().await.user_id = user.username.clone();

        let event = self
            .event("$identify".to_string(), None, Some(user_properties(user)))
            .await;
        self.send(event)
            .await
            .map_err(|e| EventLogError::adaptor(NAME, e))
    }

    async fn logout(&self) -> Result<()> {
        let mut identity = self.identity.write().await;
        *identity = Identity::anonymous();
        Ok(())
    }

    async fn track(&self, prefix: &str, event_type: &str, data: &Context) -> Result<()> {
        let event = self
            .event(
                prefixed_event_type(prefix, event_type),
                Some(serde_json::Value::Object(data.clone())),
                None,
            )
            .await;
        self.send(event)
            .await
            .map_err(|e| EventLogError::adaptor(NAME, e))
    }

    async fn get_distinct_id(&self) -> Result<Option<DistinctIds>> {
        let device_id = self.device_id().await;
        let mut ids = DistinctIds::new();
        ids.insert(NAME.to_string(), Some(device_id.clone()));
        ids.insert("mixpanel".to_string(), Some(device_id));
        Ok(Some(ids))
    }

    async fn identify(&self, ids: &DistinctIds) -> Result<()> {
        if let Some(Some(id)) = ids.get(NAME) {
            self.identity.write().await.user_id = Some(id.clone());
        }
        Ok(())
    }
}
