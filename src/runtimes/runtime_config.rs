use std::time::Duration;

use tracing::warn;

use crate::utils::id_generator::IdConfig;

/// Default bound on node executions per run.
pub const DEFAULT_STEP_LIMIT: u64 = 10_000;

const STEP_LIMIT_ENV: &str = "STEPGRAPH_STEP_LIMIT";
const DEADLINE_ENV: &str = "STEPGRAPH_DEADLINE_MS";

/// Limits applied to every run of a compiled graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Maximum node executions before a run fails with `StepLimitExceeded`.
    pub step_limit: u64,
    /// Wall-clock budget per run, checked between steps.
    pub deadline: Option<Duration>,
    /// How run ids are generated.
    pub ids: IdConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            step_limit: DEFAULT_STEP_LIMIT,
            deadline: None,
            ids: IdConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn new(step_limit: u64, deadline: Option<Duration>) -> Self {
        Self {
            step_limit,
            deadline,
            ids: IdConfig::default(),
        }
    }

    #[must_use]
    pub fn with_step_limit(mut self, step_limit: u64) -> Self {
        self.step_limit = step_limit;
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_ids(mut self, ids: IdConfig) -> Self {
        self.ids = ids;
        self
    }

    /// Reads `STEPGRAPH_STEP_LIMIT` and `STEPGRAPH_DEADLINE_MS` (a `.env` file is
    /// honoured). Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = lookup(STEP_LIMIT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(limit) => config.step_limit = limit,
                Err(e) => warn!(var = STEP_LIMIT_ENV, value = %raw, error = %e, "ignoring invalid step limit"),
            }
        }
        if let Some(raw) = lookup(DEADLINE_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.deadline = Some(Duration::from_millis(ms)),
                Err(e) => warn!(var = DEADLINE_ENV, value = %raw, error = %e, "ignoring invalid deadline"),
            }
        }
        config
    }
}
