//! Web analytics adaptor (Measurement Protocol)

use super::http;
use super::Adaptor;
use crate::config::EventLogConfig;
use crate::error::{EventLogError, Result};
use crate::types::{Context, DistinctIds, User};
use async_trait::async_trait;
use tokio::sync::RwLock;

const NAME: &str = "ga";

/// Measurement Protocol collection endpoint
pub const COLLECT_URL: &str = "https://www.google-analytics.com/collect";

#[derive(Debug, Clone)]
struct Visitor {
    client_id: String,
    user_id: Option<String>,
}

impl Visitor {
    fn anonymous() -> Self {
        Self {
            client_id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
        }
    }
}

/// Adaptor for a web analytics property
pub struct GaAdaptor {
    client: reqwest::Client,
    property_id: String,
    site: String,
    debug: bool,
    visitor: RwLock<Visitor>,
}

impl GaAdaptor {
    /// Create the adaptor for a property/site pair
    pub fn new(
        client: reqwest::Client,
        property_id: impl Into<String>,
        site: impl Into<String>,
        debug: bool,
    ) -> Self {
        Self {
            client,
            property_id: property_id.into(),
            site: site.into(),
            debug,
            visitor: RwLock::new(Visitor::anonymous()),
        }
    }

    /// Factory: enabled when both `gaId` and `gaSite` are set
    pub fn from_config(config: &EventLogConfig) -> Option<Box<dyn Adaptor>> {
        let (property_id, site) = match (&config.ga_id, &config.ga_site) {
            (Some(id), Some(site)) if !id.is_empty() && !site.is_empty() => (id, site),
            _ => {
                if config.debug {
                    tracing::debug!("`gaId` and/or `gaSite` are not set, GA tracking is disabled");
                }
                return None;
            }
        };
        let client = http::build_client(config.http_timeout_secs)?;
        Some(Box::new(Self::new(
            client,
            property_id.clone(),
            site.clone(),
            config.debug,
        )))
    }

    /// Current `(client_id, user_id)` pair
    pub async fn visitor(&self) -> (String, Option<String>) {
        let visitor = self.visitor.read().await;
        (visitor.client_id.clone(), visitor.user_id.clone())
    }

    /// Form parameters of an event hit
    pub async fn event_hit(&self, prefix: &str, event_type: &str) -> Vec<(&'static str, String)> {
        let visitor = self.visitor.read().await;
        let mut params = vec![
            ("v", "1".to_string()),
            ("tid", self.property_id.clone()),
            ("cid", visitor.client_id.clone()),
            ("t", "event".to_string()),
            ("ec", prefix.to_string()),
            ("ea", event_type.to_string()),
            ("el", self.site.clone()),
        ];
        if let Some(ref uid) = visitor.user_id {
            params.push(("uid", uid.clone()));
        }
        params
    }
}

#[async_trait]
impl Adaptor for GaAdaptor {
    fn name(&self) -> &str {
        NAME
    }

    async fn login(&self, user: Option<&User>, _extra: Option<&serde_json::Value>) -> Result<()> {
        let mut visitor = self.visitor.write().await;
        match user {
            Some(user) => visitor.user_id = user.id.clone(),
            None => {
                if self.debug {
                    tracing::debug!("GA: user.id not set, continuing with anon login");
                }
                *visitor = Visitor::anonymous();
            }
        }
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        *self.visitor.write().await = Visitor::anonymous();
        Ok(())
    }

    async fn track(&self, prefix: &str, event_type: &str, _data: &Context) -> Result<()> {
        let params = self.event_hit(prefix, event_type).await;

        let send = async {
            let resp = self.client.post(COLLECT_URL).form(&params).send().await?;
            http::check_status(resp).await
        };
        send.await.map_err(|e| EventLogError::adaptor(NAME, e))?;

        tracing::debug!(site = %self.site, event_type, "GA hit sent");
        Ok(())
    }

    async fn get_distinct_id(&self) -> Result<Option<DistinctIds>> {
        let mut ids = DistinctIds::new();
        ids.insert(NAME.to_string(), None);
        Ok(Some(ids))
    }
}
