//! Broadcaster configuration.
//!
//! Configuration is plain data so it can live in whatever settings file the
//! host application already parses:
//!
//! ```rust,ignore
//! let config: BroadcasterConfig = serde_json::from_str(r#"{
//!     "name": "actions",
//!     "on_misuse": "escalate"
//! }"#)?;
//! let actions = Broadcaster::<Action>::with_config(config);
//! ```

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::report::{ErrorReporter, LogReporter, NoopReporter, PanicReporter};

/// What to do when a value is published with no active subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MisusePolicy {
    /// Emit a `tracing` warning.
    #[default]
    Log,
    /// Drop the report silently.
    Ignore,
    /// Panic with the report message.
    Escalate,
}

impl MisusePolicy {
    /// Build the reporter implementing this policy.
    ///
    /// `name` only matters for [`MisusePolicy::Log`], where it tags the warning.
    pub fn reporter(self, name: Option<String>) -> Arc<dyn ErrorReporter> {
        match self {
            MisusePolicy::Log => Arc::new(LogReporter::new(name)),
            MisusePolicy::Ignore => Arc::new(NoopReporter),
            MisusePolicy::Escalate => Arc::new(PanicReporter),
        }
    }
}

impl FromStr for MisusePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "log" => Ok(MisusePolicy::Log),
            "ignore" => Ok(MisusePolicy::Ignore),
            "escalate" => Ok(MisusePolicy::Escalate),
            other => Err(format!(
                "unknown misuse policy '{other}', expected one of: log, ignore, escalate"
            )),
        }
    }
}

/// Construction-time settings for a [`Broadcaster`](crate::broadcast::Broadcaster).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcasterConfig {
    /// Name used in log output. Purely diagnostic.
    pub name: Option<String>,

    /// Handling of publishes that find no subscription.
    pub on_misuse: MisusePolicy,
}

impl BroadcasterConfig {
    /// Config with the given name and the default misuse policy.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Replace the misuse policy.
    pub fn on_misuse(mut self, policy: MisusePolicy) -> Self {
        self.on_misuse = policy;
        self
    }
}
