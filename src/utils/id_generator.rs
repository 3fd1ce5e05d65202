//! Run identifiers.
//!
//! Every [`Execution`](crate::runtimes::Execution) gets a run id that is passed
//! to nodes through [`NodeContext`](crate::node::NodeContext) and attached to
//! its tracing spans. Ids are random UUIDs by default; a seed set through
//! [`RuntimeConfig::with_ids`](crate::runtimes::RuntimeConfig::with_ids) makes
//! them predictable, which tests rely on.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// How ids are produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdConfig {
    /// Replaces the UUID with `seeded-{seed}-{counter}`.
    pub seed: Option<u64>,
    /// Prepended to every id, before the kind prefix.
    pub namespace: Option<String>,
}

/// Thread-safe id source.
///
/// ```
/// use stepgraph::utils::id_generator::{IdConfig, IdGenerator};
///
/// let ids = IdGenerator::with_config(IdConfig { seed: Some(7), ..Default::default() });
/// assert_eq!(ids.generate_run_id(), "run-seeded-7-0");
/// assert_eq!(ids.generate_run_id(), "run-seeded-7-1");
/// ```
#[derive(Debug, Default)]
pub struct IdGenerator {
    config: IdConfig,
    counter: AtomicU64,
}

impl IdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: IdConfig) -> Self {
        Self {
            config,
            counter: AtomicU64::new(0),
        }
    }

    /// `run-` followed by the base id, behind the namespace if one is set.
    #[must_use]
    pub fn generate_run_id(&self) -> String {
        let id = format!("run-{}", self.base_id());
        match &self.config.namespace {
            Some(ns) => format!("{ns}-{id}"),
            None => id,
        }
    }

    fn base_id(&self) -> String {
        match self.config.seed {
            Some(seed) => {
                let n = self.counter.fetch_add(1, Ordering::Relaxed);
                format!("seeded-{seed}-{n}")
            }
            None => Uuid::new_v4().to_string(),
        }
    }
}

/// True if `id` has the shape `{prefix}-{rest}` with a non-empty rest.
pub fn has_prefix(id: &str, prefix: &str) -> bool {
    id.split_once('-')
        .is_some_and(|(p, rest)| p == prefix && !rest.is_empty())
}
