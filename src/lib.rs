//! # balena-event-log
//!
//! Multi-provider analytics event tracking behind a single semantic API.
//!
//! ## Overview
//!
//! `balena-event-log` keeps one logical user session and fans every event out
//! to all configured analytics backends (analytics client, web analytics,
//! GoSquared, or your own). A failing backend never blocks the others.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use balena_event_log::{AnalyticsClientConfig, EventLog, EventLogConfig, User};
//!
//! # async fn example() -> balena_event_log::Result<()> {
//! let config = EventLogConfig::new("UI", AnalyticsClientConfig::new("balena-cloud"));
//! let log = EventLog::new(config)?;
//!
//! log.start(Some(&User::new("123", "alice")), None).await?;
//! log.device()
//!     .rename(Some(serde_json::json!({"name": "rpi-kitchen"})), None)
//!     .await?;
//! log.end().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Adaptors
//!
//! - **analyticsClient** — batch ingestion API of the balena data endpoint
//! - **ga** — web analytics Measurement Protocol
//! - **gosquared** — GoSquared tracking API
//!
//! ## Architecture
//!
//! - **Adaptor** trait — uniform contract every backend implements
//! - **AdaptorRegistry** — ordered factories, injected at construction
//! - **EventLog** — session state, concurrent fan-out, hooks
//! - **taxonomy** — namespace/action table and generated typed methods

pub mod adaptor;
pub mod completion;
pub mod config;
pub mod error;
pub mod event_log;
pub mod hooks;
pub mod taxonomy;
pub mod types;

// Re-export core types
pub use adaptor::{Adaptor, AdaptorFactory, AdaptorRegistry};
pub use completion::with_completion;
pub use config::{AnalyticsClientConfig, EventLogConfig};
pub use error::{EventLogError, Result};
pub use event_log::{EventLog, EventLogBuilder, Session, USER_REQUIRED_FIELDS};
pub use hooks::{
    AfterCreateHook, BeforeCreateHook, CreateEvent, HookDecision, HookOverrides, Hooks,
};
pub use types::{Context, DistinctIds, User};

// Re-export adaptors for convenience
pub use adaptor::{AnalyticsClientAdaptor, GaAdaptor, GoSquaredAdaptor};
