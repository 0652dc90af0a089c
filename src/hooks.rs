//! Hooks run around `EventLog::create`
//!
//! `before_create` runs before the track fan-out and may abort it;
//! `after_create` runs once the fan-out settled (or was aborted). Failures
//! inside either hook are swallowed by the dispatcher and only logged when
//! `debug` is enabled. User overrides are given as `HookOverrides` and merged
//! over the default `Hooks`.

use crate::error::{EventLogError, Result};
use crate::types::Context;
use async_trait::async_trait;
use std::sync::Arc;

/// The event being created, as seen by hooks
#[derive(Debug, Clone, Copy)]
pub struct CreateEvent<'a> {
    /// Event type, e.g. "Device Rename"
    pub event_type: &'a str,
    /// Event data as given by the caller
    pub json_data: Option<&'a serde_json::Value>,
    /// Normalized context (empty when the caller gave none)
    pub context: &'a Context,
}

/// What `before_create` decided
#[derive(Debug)]
pub enum HookDecision {
    /// Go on with the track fan-out
    Proceed,
    /// Skip the fan-out; the error is handed to `after_create` and returned
    /// from `create`
    Abort(EventLogError),
}

/// Hook run before an event is tracked
#[async_trait]
pub trait BeforeCreateHook: Send + Sync {
    /// An `Err` is treated as a hook failure and ignored; use
    /// `HookDecision::Abort` to stop the event.
    async fn before_create(&self, event: &CreateEvent<'_>) -> Result<HookDecision>;
}

/// Hook run after an event was tracked (or failed to be)
#[async_trait]
pub trait AfterCreateHook: Send + Sync {
    async fn after_create(
        &self,
        error: Option<&EventLogError>,
        event: &CreateEvent<'_>,
    ) -> Result<()>;
}

#[async_trait]
impl<F> BeforeCreateHook for F
where
    F: Fn(&CreateEvent<'_>) -> Result<HookDecision> + Send + Sync,
{
    async fn before_create(&self, event: &CreateEvent<'_>) -> Result<HookDecision> {
        self(event)
    }
}

#[async_trait]
impl<F> AfterCreateHook for F
where
    F: Fn(Option<&EventLogError>, &CreateEvent<'_>) -> Result<()> + Send + Sync,
{
    async fn after_create(
        &self,
        error: Option<&EventLogError>,
        event: &CreateEvent<'_>,
    ) -> Result<()> {
        self(error, event)
    }
}

/// Default `before_create`: proceed immediately
#[derive(Debug, Default, Clone, Copy)]
pub struct Proceed;

#[async_trait]
impl BeforeCreateHook for Proceed {
    async fn before_create(&self, _event: &CreateEvent<'_>) -> Result<HookDecision> {
        Ok(HookDecision::Proceed)
    }
}

/// Default `after_create`: do nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct Noop;

#[async_trait]
impl AfterCreateHook for Noop {
    async fn after_create(
        &self,
        _error: Option<&EventLogError>,
        _event: &CreateEvent<'_>,
    ) -> Result<()> {
        Ok(())
    }
}

/// The hooks an `EventLog` runs
#[derive(Clone)]
pub struct Hooks {
    pub before_create: Arc<dyn BeforeCreateHook>,
    pub after_create: Arc<dyn AfterCreateHook>,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            before_create: Arc::new(Proceed),
            after_create: Arc::new(Noop),
        }
    }
}

impl Hooks {
    /// Apply overrides on top of these hooks
    pub fn merge(self, overrides: HookOverrides) -> Self {
        Self {
            before_create: overrides.before_create.unwrap_or(self.before_create),
            after_create: overrides.after_create.unwrap_or(self.after_create),
        }
    }
}

/// Optional replacements for the default hooks
#[derive(Clone, Default)]
pub struct HookOverrides {
    pub before_create: Option<Arc<dyn BeforeCreateHook>>,
    pub after_create: Option<Arc<dyn AfterCreateHook>>,
}

impl HookOverrides {
    /// Override `before_create`
    pub fn before_create(mut self, hook: impl BeforeCreateHook + 'static) -> Self {
        self.before_create = Some(Arc::new(hook));
        self
    }

    /// Override `after_create`
    pub fn after_create(mut self, hook: impl AfterCreateHook + 'static) -> Self {
        self.after_create = Some(Arc::new(hook));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(context: &Context) -> CreateEvent<'_> {
        CreateEvent {
            event_type: "x",
            json_data: None,
            context,
        }
    }

    #[tokio::test]
    async fn test_default_hooks() {
        let hooks = Hooks::default();
        let context = Context::new();

        let decision = hooks.before_create.before_create(&event(&context)).await.unwrap();
        assert!(matches!(decision, HookDecision::Proceed));
        hooks.after_create.after_create(None, &event(&context)).await.unwrap();
    }

    #[tokio::test]
    async fn test_merge_keeps_unset_defaults() {
        let hooks = Hooks::default().merge(HookOverrides::default().before_create(
            |_: &CreateEvent<'_>| -> Result<HookDecision> {
                Ok(HookDecision::Abort(EventLogError::Aborted("no".to_string())))
            },
        ));
        let context = Context::new();

        let decision = hooks.before_create.before_create(&event(&context)).await.unwrap();
        assert!(matches!(decision, HookDecision::Abort(_)));
        assert!(hooks.after_create.after_create(None, &event(&context)).await.is_ok());
    }

    #[tokio::test]
    async fn test_closure_after_hook_sees_error() {
        let hook = |error: Option<&EventLogError>, event: &CreateEvent<'_>| -> Result<()> {
            assert_eq!(event.event_type, "x");
            match error {
                Some(e) => Err(EventLogError::Hook(e.to_string())),
                None => Ok(()),
            }
        };
        let context = Context::new();

        assert!(hook.after_create(None, &event(&context)).await.is_ok());
        let err = EventLogError::Aborted("boom".to_string());
        assert!(hook.after_create(Some(&err), &event(&context)).await.is_err());
    }
}
