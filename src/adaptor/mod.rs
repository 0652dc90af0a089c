//! Adaptor trait: the uniform contract every analytics backend implements
//!
//! Backends (analytics client, web analytics, GoSquared, test fakes, ...)
//! implement `Adaptor`. Every capability has a no-op default, so a backend
//! that does not support e.g. `identify` simply leaves it out.

use crate::config::EventLogConfig;
use crate::error::Result;
use crate::types::{Context, DistinctIds, User};
use async_trait::async_trait;

pub mod analytics_client;
pub mod ga;
pub mod gosquared;
mod http;

pub use analytics_client::AnalyticsClientAdaptor;
pub use ga::GaAdaptor;
pub use gosquared::GoSquaredAdaptor;

/// Core trait for analytics backends
#[async_trait]
pub trait Adaptor: Send + Sync {
    /// Adaptor name (e.g., "ga", "gosquared"), used in logs and errors
    fn name(&self) -> &str;

    /// Switch the backend to `user`, or to an anonymous visitor when `None`
    ///
    /// `extra` is passed through from `EventLog::start` untouched.
    async fn login(&self, _user: Option<&User>, _extra: Option<&serde_json::Value>) -> Result<()> {
        Ok(())
    }

    /// Forget the current user
    async fn logout(&self) -> Result<()> {
        Ok(())
    }

    /// Record an event; `data` is the context with `jsonData` merged in
    async fn track(&self, _prefix: &str, _event_type: &str, _data: &Context) -> Result<()> {
        Ok(())
    }

    /// Visitor identifiers known to this backend
    ///
    /// `Ok(None)` means the backend has no such capability and is left out
    /// of `EventLog::get_distinct_id` results.
    async fn get_distinct_id(&self) -> Result<Option<DistinctIds>> {
        Ok(None)
    }

    /// Adopt identifiers produced elsewhere (e.g. by another process)
    async fn identify(&self, _ids: &DistinctIds) -> Result<()> {
        Ok(())
    }
}

/// Builds an adaptor from configuration
///
/// Returns `None` when the options this backend needs are missing. That is
/// not an error: the backend is just disabled.
pub trait AdaptorFactory: Send + Sync {
    fn create(&self, config: &EventLogConfig) -> Option<Box<dyn Adaptor>>;
}

impl<F> AdaptorFactory for F
where
    F: Fn(&EventLogConfig) -> Option<Box<dyn Adaptor>> + Send + Sync,
{
    fn create(&self, config: &EventLogConfig) -> Option<Box<dyn Adaptor>> {
        self(config)
    }
}

/// Ordered list of adaptor factories
///
/// Order decides fan-out order, and therefore which error is reported
/// first when several adaptors fail.
pub struct AdaptorRegistry {
    factories: Vec<Box<dyn AdaptorFactory>>,
}

impl AdaptorRegistry {
    /// Create an empty registry
    pub fn empty() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// Append a factory
    pub fn with(mut self, factory: impl AdaptorFactory + 'static) -> Self {
        self.factories.push(Box::new(factory));
        self
    }

    /// Append a pre-built adaptor that is always enabled
    pub fn with_adaptor<A>(self, adaptor: A) -> Self
    where
        A: Adaptor + Clone + 'static,
    {
        self.with(move |_: &EventLogConfig| Some(Box::new(adaptor.clone()) as Box<dyn Adaptor>))
    }

    /// Number of registered factories
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// True if no factory is registered
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Run every factory and keep the adaptors that were configured
    pub fn instantiate(&self, config: &EventLogConfig) -> Vec<Box<dyn Adaptor>> {
        self.factories
            .iter()
            .enumerate()
            .filter_map(|(index, factory)| {
                let adaptor = factory.create(config);
                if adaptor.is_none() {
                    tracing::debug!(factory = index, "Adaptor not configured, skipping");
                }
                adaptor
            })
            .collect()
    }
}

impl Default for AdaptorRegistry {
    /// The built-in backends: web analytics, analytics client, GoSquared
    fn default() -> Self {
        Self::empty()
            .with(GaAdaptor::from_config)
            .with(AnalyticsClientAdaptor::from_config)
            .with(GoSquaredAdaptor::from_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyticsClientConfig;

    #[derive(Clone)]
    struct Silent;

    #[async_trait]
    impl Adaptor for Silent {
        fn name(&self) -> &str {
            "silent"
        }
    }

    fn config() -> EventLogConfig {
        EventLogConfig::new("TEST", AnalyticsClientConfig::new("balena-test"))
    }

    #[tokio::test]
    async fn test_default_capabilities_are_noops() {
        let adaptor = Silent;
        adaptor.login(None, None).await.unwrap();
        adaptor.logout().await.unwrap();
        adaptor.track("TEST", "x", &Context::new()).await.unwrap();
        assert!(adaptor.get_distinct_id().await.unwrap().is_none());
        adaptor.identify(&DistinctIds::new()).await.unwrap();
    }

    #[test]
    fn test_registry_skips_unconfigured() {
        let registry = AdaptorRegistry::empty()
            .with(|_: &EventLogConfig| -> Option<Box<dyn Adaptor>> { None })
            .with_adaptor(Silent)
            .with(|_: &EventLogConfig| -> Option<Box<dyn Adaptor>> { None });

        assert_eq!(registry.len(), 3);
        let adaptors = registry.instantiate(&config());
        assert_eq!(adaptors.len(), 1);
        assert_eq!(adaptors[0].name(), "silent");
    }

    #[test]
    fn test_default_registry_analytics_client_only() {
        let registry = AdaptorRegistry::default();
        assert_eq!(registry.len(), 3);

        let adaptors = registry.instantiate(&config());
        let names: Vec<&str> = adaptors.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["analyticsClient"]);
    }

    #[test]
    fn test_default_registry_all_backends() {
        let config = config().with_ga("UA-1", "balena.io").with_gosquared("GSN-1", "key");
        let adaptors = AdaptorRegistry::default().instantiate(&config);
        let names: Vec<&str> = adaptors.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["ga", "analyticsClient", "gosquared"]);
    }

    #[test]
    fn test_empty_registry() {
        let registry = AdaptorRegistry::empty();
        assert!(registry.is_empty());
        assert!(registry.instantiate(&config()).is_empty());
    }
}
