//! Event dispatcher built on pluggable adaptors
//!
//! `EventLog` keeps the current user session and fans every call out to
//! all live adaptors concurrently. A failing adaptor never stops its
//! siblings: every adaptor call settles, then the first error in adaptor
//! order is reported.

use crate::adaptor::{Adaptor, AdaptorRegistry};
use crate::config::EventLogConfig;
use crate::error::{EventLogError, Result};
use crate::hooks::{
    AfterCreateHook, BeforeCreateHook, CreateEvent, HookDecision, HookOverrides, Hooks,
};
use crate::taxonomy;
use crate::types::{track_payload, Context, DistinctIds, User};
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::sync::RwLock;

/// Rejection message of `start` for a user without id or username
pub const USER_REQUIRED_FIELDS: &str = ".id & .username are required when logging in a user";

/// Identity of the current logical user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Set by `start(user)`, cleared by `end()`
    pub user_id: Option<String>,
}

/// Multi-provider event log
///
/// Owns its adaptors exclusively. Concurrent `start`/`create`/`end` calls
/// are not serialized; callers that need strict ordering must await each
/// call before issuing the next.
pub struct EventLog {
    prefix: String,
    debug: bool,
    adaptors: Vec<Box<dyn Adaptor>>,
    hooks: Hooks,
    session: RwLock<Session>,
}

/// Builder for `EventLog`
pub struct EventLogBuilder {
    config: EventLogConfig,
    registry: AdaptorRegistry,
    hooks: HookOverrides,
}

impl EventLogBuilder {
    /// Replace the built-in adaptor factories
    pub fn registry(mut self, registry: AdaptorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Override hooks
    pub fn hooks(mut self, hooks: HookOverrides) -> Self {
        self.hooks = hooks;
        self
    }

    /// Override the `before_create` hook
    pub fn before_create(mut self, hook: impl BeforeCreateHook + 'static) -> Self {
        self.hooks = self.hooks.before_create(hook);
        self
    }

    /// Override the `after_create` hook
    pub fn after_create(mut self, hook: impl AfterCreateHook + 'static) -> Self {
        self.hooks = self.hooks.after_create(hook);
        self
    }

    /// Validate the configuration and instantiate adaptors
    pub fn build(self) -> Result<EventLog> {
        self.config.validate()?;

        let adaptors = self.registry.instantiate(&self.config);
        tracing::info!(
            prefix = %self.config.prefix,
            adaptors = ?adaptors.iter().map(|a| a.name()).collect::<Vec<_>>(),
            "Event log created"
        );

        Ok(EventLog {
            prefix: self.config.prefix,
            debug: self.config.debug,
            adaptors,
            hooks: Hooks::default().merge(self.hooks),
            session: RwLock::new(Session::default()),
        })
    }
}

impl EventLog {
    /// Create an event log with the built-in adaptors and default hooks
    pub fn new(config: EventLogConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Start building an event log
    pub fn builder(config: EventLogConfig) -> EventLogBuilder {
        EventLogBuilder {
            config,
            registry: AdaptorRegistry::default(),
            hooks: HookOverrides::default(),
        }
    }

    /// Subsystem prefix sent with every event
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Names of the live adaptors, in fan-out order
    pub fn adaptor_names(&self) -> Vec<&str> {
        self.adaptors.iter().map(|a| a.name()).collect()
    }

    /// Id of the current user, `None` when anonymous
    pub async fn user_id(&self) -> Option<String> {
        self.session.read().await.user_id.clone()
    }

    /// Snapshot of the session state
    pub async fn session(&self) -> Session {
        self.session.read().await.clone()
    }

    /// Log in `user` on every adaptor, or an anonymous visitor when `None`
    ///
    /// A user must carry a non-empty `id` and `username`. Calling `start`
    /// again without `end` switches user; adaptors are not logged out first.
    pub async fn start(
        &self,
        user: Option<&User>,
        extra: Option<&serde_json::Value>,
    ) -> Result<()> {
        if let Some(user) = user {
            if !user.is_identified() {
                return Err(EventLogError::Validation(USER_REQUIRED_FIELDS.to_string()));
            }
            self.session.write().await.user_id = user.id.clone();
            tracing::info!(
                user_id = ?user.id,
                first_seen = user.is_first_seen(),
                "Session started"
            );
        }

        self.fan_out("login", |adaptor| adaptor.login(user, extra)).await?;
        Ok(())
    }

    /// Log out of every adaptor; does nothing while anonymous
    pub async fn end(&self) -> Result<()> {
        {
            let mut session = self.session.write().await;
            if session.user_id.take().is_none() {
                return Ok(());
            }
        }
        tracing::info!("Session ended");

        self.fan_out("logout", |adaptor| adaptor.logout()).await?;
        Ok(())
    }

    /// Track an event on every adaptor
    ///
    /// Runs `before_create`, the track fan-out, then `after_create`. Hook
    /// failures are swallowed. The first adaptor error, or the error of an
    /// aborting `before_create`, is returned after `after_create` ran.
    pub async fn create(
        &self,
        event_type: &str,
        json_data: Option<serde_json::Value>,
        context: Option<Context>,
    ) -> Result<()> {
        let context = context.unwrap_or_default();
        let event = CreateEvent {
            event_type,
            json_data: json_data.as_ref(),
            context: &context,
        };

        let mut error = self.run_before_hook(&event).await;

        match error {
            Some(ref e) => {
                tracing::debug!(event_type, error = %e, "Event aborted by beforeCreate");
            }
            None => {
                let data = track_payload(&context, json_data.as_ref());
                let prefix = self.prefix.as_str();
                if let Err(e) = self
                    .fan_out("track", |adaptor| adaptor.track(prefix, event_type, &data))
                    .await
                {
                    error = Some(e);
                }
            }
        }

        self.run_after_hook(error.as_ref(), &event).await;

        match error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Track a taxonomy event by name, e.g. `("device", "rename")`
    ///
    /// Namespace aliases are accepted.
    pub async fn track_action(
        &self,
        namespace: &str,
        action: &str,
        json_data: Option<serde_json::Value>,
        context: Option<Context>,
    ) -> Result<()> {
        let event_type =
            taxonomy::lookup(namespace, action).ok_or_else(|| EventLogError::UnknownEvent {
                namespace: namespace.to_string(),
                action: action.to_string(),
            })?;
        self.create(&event_type, json_data, context).await
    }

    /// Shared target of the generated taxonomy methods
    pub(crate) async fn create_taxonomy_event(
        &self,
        namespace: &str,
        action: &str,
        json_data: Option<serde_json::Value>,
        context: Option<Context>,
    ) -> Result<()> {
        self.create(&taxonomy::label(namespace, action), json_data, context)
            .await
    }

    /// Visitor ids of every adaptor that has them, in adaptor order
    pub async fn get_distinct_id(&self) -> Result<Vec<DistinctIds>> {
        let ids = self
            .fan_out("getDistinctId", |adaptor| adaptor.get_distinct_id())
            .await?;
        Ok(ids.into_iter().flatten().collect())
    }

    /// Hand externally obtained ids to every adaptor
    pub async fn identify(&self, ids: &DistinctIds) -> Result<()> {
        self.fan_out("identify", |adaptor| adaptor.identify(ids)).await?;
        Ok(())
    }

    /// Call every adaptor at once and wait for all of them to settle
    async fn fan_out<'s, T, F>(&'s self, operation: &'static str, call: F) -> Result<Vec<T>>
    where
        F: Fn(&'s dyn Adaptor) -> BoxFuture<'s, Result<T>>,
    {
        let results = join_all(self.adaptors.iter().map(|adaptor| call(adaptor.as_ref()))).await;

        let mut values = Vec::with_capacity(results.len());
        let mut first_error = None;
        for (adaptor, result) in self.adaptors.iter().zip(results) {
            match result {
                Ok(value) => values.push(value),
                Err(e) => {
                    tracing::warn!(
                        adaptor = adaptor.name(),
                        operation,
                        error = %e,
                        "Adaptor call failed"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(values),
        }
    }

    async fn run_before_hook(&self, event: &CreateEvent<'_>) -> Option<EventLogError> {
        let outcome = AssertUnwindSafe(self.hooks.before_create.before_create(event))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(HookDecision::Proceed)) => None,
            Ok(Ok(HookDecision::Abort(e))) => Some(e),
            Ok(Err(e)) => {
                self.discard_hook_error("beforeCreate", &e.to_string());
                None
            }
            Err(panic) => {
                self.discard_hook_error("beforeCreate", &panic_message(panic.as_ref()));
                None
            }
        }
    }

    async fn run_after_hook(&self, error: Option<&EventLogError>, event: &CreateEvent<'_>) {
        let outcome = AssertUnwindSafe(self.hooks.after_create.after_create(error, event))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => self.discard_hook_error("afterCreate", &e.to_string()),
            Err(panic) => self.discard_hook_error("afterCreate", &panic_message(panic.as_ref())),
        }
    }

    fn discard_hook_error(&self, hook: &str, reason: &str) {
        if self.debug {
            let error = EventLogError::Hook(reason.to_string());
            tracing::warn!(hook, error = %error, "Hook error discarded");
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "hook panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyticsClientConfig;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Counting {
        logins: Arc<AtomicUsize>,
        tracks: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Adaptor for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn login(
            &self,
            _user: Option<&User>,
            _extra: Option<&serde_json::Value>,
        ) -> Result<()> {
            self.logins.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn track(&self, _prefix: &str, _event_type: &str, _data: &Context) -> Result<()> {
            self.tracks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn config() -> EventLogConfig {
        EventLogConfig::new("TEST", AnalyticsClientConfig::new("balena-test"))
    }

    fn log_with(adaptor: Counting) -> EventLog {
        EventLog::builder(config())
            .registry(AdaptorRegistry::empty().with_adaptor(adaptor))
            .build()
            .unwrap()
    }

    #[test]
    fn test_new_rejects_missing_prefix() {
        let mut config = config();
        config.prefix.clear();
        let err = EventLog::new(config).err().unwrap();
        assert_eq!(err.to_string(), "`prefix` is required.");
    }

    #[test]
    fn test_new_with_default_registry() {
        let log = EventLog::new(config()).unwrap();
        assert_eq!(log.prefix(), "TEST");
        assert_eq!(log.adaptor_names(), vec!["analyticsClient"]);
    }

    #[tokio::test]
    async fn test_start_and_end_session() {
        let adaptor = Counting::default();
        let log = log_with(adaptor.clone());

        log.start(Some(&User::new("1", "u")), None).await.unwrap();
        assert_eq!(log.user_id().await.as_deref(), Some("1"));
        assert_eq!(adaptor.logins.load(Ordering::SeqCst), 1);

        log.end().await.unwrap();
        assert_eq!(log.session().await, Session::default());
    }

    #[tokio::test]
    async fn test_anonymous_start_keeps_session() {
        let adaptor = Counting::default();
        let log = log_with(adaptor.clone());

        log.start(None, None).await.unwrap();
        assert!(log.user_id().await.is_none());
        assert_eq!(adaptor.logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_user_rejected() {
        let adaptor = Counting::default();
        let log = log_with(adaptor.clone());

        let err = log.start(Some(&User::default()), None).await.unwrap_err();
        assert_eq!(err.to_string(), USER_REQUIRED_FIELDS);
        assert!(log.user_id().await.is_none());
        assert_eq!(adaptor.logins.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_create_without_adaptors() {
        let log = EventLog::builder(config())
            .registry(AdaptorRegistry::empty())
            .build()
            .unwrap();
        assert!(log.adaptor_names().is_empty());
        log.create("x", None, None).await.unwrap();
        assert!(log.get_distinct_id().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_track_action_unknown_event() {
        let adaptor = Counting::default();
        let log = log_with(adaptor.clone());

        let err = log.track_action("device", "explode", None, None).await.unwrap_err();
        assert!(matches!(err, EventLogError::UnknownEvent { .. }));
        assert_eq!(adaptor.tracks.load(Ordering::SeqCst), 0);

        log.track_action("fleet", "open", None, None).await.unwrap();
        assert_eq!(adaptor.tracks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "hook panicked");
    }
}
