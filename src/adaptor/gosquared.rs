//! GoSquared visitor-engagement adaptor

use super::http;
use super::Adaptor;
use crate::config::EventLogConfig;
use crate::error::{EventLogError, Result};
use crate::types::{prefixed_event_type, Context, DistinctIds, User};
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

const NAME: &str = "gosquared";

/// Tracking API event endpoint
pub const EVENT_URL: &str = "https://api.gosquared.com/tracking/v1/event";

/// Request body of the tracking API
#[derive(Debug, Clone, Serialize)]
pub struct TrackRequest {
    pub event: TrackedEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_id: Option<String>,
    pub visitor_id: String,
}

/// Event part of a tracking request
#[derive(Debug, Clone, Serialize)]
pub struct TrackedEvent {
    pub name: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone)]
struct Person {
    person_id: Option<String>,
    visitor_id: String,
}

impl Person {
    fn anonymous() -> Self {
        Self {
            person_id: None,
            visitor_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Adaptor for GoSquared
pub struct GoSquaredAdaptor {
    client: reqwest::Client,
    site_token: String,
    api_key: String,
    debug: bool,
    person: RwLock<Person>,
}

impl GoSquaredAdaptor {
    /// Create the adaptor for a site
    pub fn new(
        client: reqwest::Client,
        site_token: impl Into<String>,
        api_key: impl Into<String>,
        debug: bool,
    ) -> Self {
        Self {
            client,
            site_token: site_token.into(),
            api_key: api_key.into(),
            debug,
            person: RwLock::new(Person::anonymous()),
        }
    }

    /// Factory: enabled when both `gosquaredId` and `gosquaredApiKey` are set
    pub fn from_config(config: &EventLogConfig) -> Option<Box<dyn Adaptor>> {
        let site_token = match config.gosquared_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => {
                if config.debug {
                    tracing::debug!("`gosquaredId` is not set, gosquared tracking is disabled");
                }
                return None;
            }
        };
        let api_key = match config.gosquared_api_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => {
                if config.debug {
                    tracing::debug!(
                        "`gosquaredApiKey` is not set, gosquared tracking is disabled"
                    );
                }
                return None;
            }
        };
        let client = http::build_client(config.http_timeout_secs)?;
        Some(Box::new(Self::new(client, site_token, api_key, config.debug)))
    }

    /// Current person id, if a user is logged in
    pub async fn person_id(&self) -> Option<String> {
        self.person.read().await.person_id.clone()
    }

    /// Build the tracking request for an event
    pub async fn track_request(&self, prefix: &str, event_type: &str, data: &Context) -> TrackRequest {
        let person = self.person.read().await;
        TrackRequest {
            event: TrackedEvent {
                name: prefixed_event_type(prefix, event_type),
                data: serde_json::Value::Object(data.clone()),
            },
            person_id: person.person_id.clone(),
            visitor_id: person.visitor_id.clone(),
        }
    }
}

#[async_trait]
impl Adaptor for GoSquaredAdaptor {
    fn name(&self) -> &str {
        NAME
    }

    async fn login(&self, user: Option<&User>, _extra: Option<&serde_json::Value>) -> Result<()> {
        let mut person = self.person.write().await;
        match user {
            Some(user) => person.person_id = user.id.clone(),
            None => {
                if self.debug {
                    tracing::debug!("Gosquared: user.id not set, continuing with anon login");
                }
                *person = Person::anonymous();
            }
        }
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        *self.person.write().await = Person::anonymous();
        Ok(())
    }

    async fn track(&self, prefix: &str, event_type: &str, data: &Context) -> Result<()> {
        let body = self.track_request(prefix, event_type, data).await;

        let send = async {
            let resp = self
                .client
                .post(EVENT_URL)
                .query(&[("site_token", &self.site_token), ("api_key", &self.api_key)])
                .json(&body)
                .send()
                .await?;
            http::check_status(resp).await
        };
        send.await.map_err(|e| EventLogError::adaptor(NAME, e))?;

        tracing::debug!(event = %body.event.name, "GoSquared event sent");
        Ok(())
    }

    async fn get_distinct_id(&self) -> Result<Option<DistinctIds>> {
        let mut ids = DistinctIds::new();
        ids.insert("gs".to_string(), None);
        Ok(Some(ids))
    }
}
