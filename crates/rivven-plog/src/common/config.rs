//! # Reader Configuration
//!
//! [`PlogReaderConfig`] controls batching, waiting and resumption of a
//! [`PlogReader`](crate::reader::PlogReader). [`CriteriaConfig`] describes
//! a schema/SCN filter chain and compiles it into a boxed [`Criteria`].
//!
//! Both deserialize with serde, and the reader config can also be read
//! from the flat `plog.*` property form:
//!
//! | Key | Default |
//! |-----|---------|
//! | `plog.flush.threshold` | 1000 |
//! | `plog.wait.interval.ms` | 1000 |
//! | `plog.restart.wait.limit` | 60 |
//! | `plog.flush.trailing.transactions` | true |
//! | `plog.start.offset` | unset (`file:offset`) |
//!
//! ## Example
//!
//! ```rust
//! use rivven_plog::common::PlogReaderConfig;
//! use std::time::Duration;
//!
//! let config = PlogReaderConfig::builder()
//!     .flush_threshold(500)
//!     .wait_interval(Duration::from_millis(250))
//!     .build();
//! assert!(config.validate().is_ok());
//! ```

use crate::common::{PlogError, ReplicateOffset, Result};
use crate::criteria::{
    And, BoxedCriteria, CriteriaExt, Filterable, SchemaCriteria, SchemaOffsetCriteria,
    SystemChangeNumberCriteria,
};
use crate::stream::WaitPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

pub const PROP_FLUSH_THRESHOLD: &str = "plog.flush.threshold";
pub const PROP_WAIT_INTERVAL_MS: &str = "plog.wait.interval.ms";
pub const PROP_RESTART_WAIT_LIMIT: &str = "plog.restart.wait.limit";
pub const PROP_FLUSH_TRAILING: &str = "plog.flush.trailing.transactions";
pub const PROP_START_OFFSET: &str = "plog.start.offset";

fn default_flush_threshold() -> usize {
    1000
}

fn default_wait_interval_ms() -> u64 {
    1000
}

fn default_restart_wait_limit() -> u32 {
    60
}

fn default_flush_trailing() -> bool {
    true
}

/// Configuration for a PLOG reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlogReaderConfig {
    /// Output batch size at which reads report a full batch
    #[serde(default = "default_flush_threshold")]
    pub flush_threshold: usize,

    /// Suggested sleep between polls for new data, in milliseconds
    #[serde(default = "default_wait_interval_ms")]
    pub wait_interval_ms: u64,

    /// Consecutive waits tolerated on a file from a restarted mining run
    #[serde(default = "default_restart_wait_limit")]
    pub restart_wait_limit: u32,

    /// Emit still-open transactions when the footer is reached
    #[serde(default = "default_flush_trailing")]
    pub flush_trailing_transactions: bool,

    /// Checkpoint to resume from
    #[serde(default)]
    pub start_offset: Option<ReplicateOffset>,
}

impl Default for PlogReaderConfig {
    fn default() -> Self {
        Self {
            flush_threshold: default_flush_threshold(),
            wait_interval_ms: default_wait_interval_ms(),
            restart_wait_limit: default_restart_wait_limit(),
            flush_trailing_transactions: default_flush_trailing(),
            start_offset: None,
        }
    }
}

impl PlogReaderConfig {
    /// Create a new builder.
    pub fn builder() -> PlogReaderConfigBuilder {
        PlogReaderConfigBuilder::default()
    }

    /// Read the configuration from flat `plog.*` properties.
    ///
    /// Missing keys take their defaults; malformed values are config errors.
    pub fn from_properties(props: &HashMap<String, String>) -> Result<Self> {
        let default = Self::default();
        let start_offset = match props.get(PROP_START_OFFSET) {
            Some(value) if !value.trim().is_empty() => Some(value.parse::<ReplicateOffset>()?),
            _ => None,
        };
        let config = Self {
            flush_threshold: property(props, PROP_FLUSH_THRESHOLD, default.flush_threshold)?,
            wait_interval_ms: property(props, PROP_WAIT_INTERVAL_MS, default.wait_interval_ms)?,
            restart_wait_limit: property(
                props,
                PROP_RESTART_WAIT_LIMIT,
                default.restart_wait_limit,
            )?,
            flush_trailing_transactions: property(
                props,
                PROP_FLUSH_TRAILING,
                default.flush_trailing_transactions,
            )?,
            start_offset,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.flush_threshold == 0 {
            return Err(PlogError::config("flush_threshold must be greater than 0"));
        }
        Ok(())
    }

    /// Suggested sleep between polls for new data.
    pub fn wait_interval(&self) -> Duration {
        Duration::from_millis(self.wait_interval_ms)
    }

    /// Wait-for-data policy derived from this configuration.
    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy::new(self.wait_interval(), self.restart_wait_limit)
    }
}

fn property<T: FromStr>(props: &HashMap<String, String>, key: &str, default: T) -> Result<T> {
    match props.get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| PlogError::config(format!("invalid value '{}' for {}", value, key))),
        None => Ok(default),
    }
}

/// Builder for PlogReaderConfig.
#[derive(Default)]
pub struct PlogReaderConfigBuilder {
    flush_threshold: Option<usize>,
    wait_interval: Option<Duration>,
    restart_wait_limit: Option<u32>,
    flush_trailing_transactions: Option<bool>,
    start_offset: Option<ReplicateOffset>,
}

impl PlogReaderConfigBuilder {
    pub fn flush_threshold(mut self, n: usize) -> Self {
        self.flush_threshold = Some(n);
        self
    }

    pub fn wait_interval(mut self, d: Duration) -> Self {
        self.wait_interval = Some(d);
        self
    }

    pub fn restart_wait_limit(mut self, n: u32) -> Self {
        self.restart_wait_limit = Some(n);
        self
    }

    pub fn flush_trailing_transactions(mut self, v: bool) -> Self {
        self.flush_trailing_transactions = Some(v);
        self
    }

    pub fn start_offset(mut self, offset: ReplicateOffset) -> Self {
        self.start_offset = Some(offset);
        self
    }

    pub fn build(self) -> PlogReaderConfig {
        let default = PlogReaderConfig::default();
        PlogReaderConfig {
            flush_threshold: self.flush_threshold.unwrap_or(default.flush_threshold),
            wait_interval_ms: self
                .wait_interval
                .map(|d| d.as_millis() as u64)
                .unwrap_or(default.wait_interval_ms),
            restart_wait_limit: self.restart_wait_limit.unwrap_or(default.restart_wait_limit),
            flush_trailing_transactions: self
                .flush_trailing_transactions
                .unwrap_or(default.flush_trailing_transactions),
            start_offset: self.start_offset,
        }
    }
}

/// Minimum SCN for schemas matching a wildcard pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScnThreshold {
    pub pattern: String,
    pub scn: u64,
}

impl ScnThreshold {
    pub fn new(pattern: impl Into<String>, scn: u64) -> Self {
        Self {
            pattern: pattern.into(),
            scn,
        }
    }
}

/// Declarative description of a schema/SCN criteria chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaConfig {
    /// Schema name to include flag
    #[serde(default)]
    pub schemas: HashMap<String, bool>,

    /// Schema name to watermark offset
    #[serde(default)]
    pub schema_offsets: HashMap<String, ReplicateOffset>,

    /// SCN thresholds in priority order
    #[serde(default)]
    pub scn_thresholds: Vec<ScnThreshold>,
}

impl CriteriaConfig {
    /// Check whether no part of the chain is configured.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty() && self.schema_offsets.is_empty() && self.scn_thresholds.is_empty()
    }

    /// Compile the configured parts into one criteria.
    ///
    /// Parts are AND-combined in the order schema, schema offset, SCN.
    /// Returns `None` when nothing is configured.
    pub fn build<R: Filterable + 'static>(&self) -> Result<Option<BoxedCriteria<R>>> {
        let mut parts: Vec<BoxedCriteria<R>> = Vec::new();
        if !self.schemas.is_empty() {
            parts.push(SchemaCriteria::new(self.schemas.clone()).boxed());
        }
        if !self.schema_offsets.is_empty() {
            parts.push(SchemaOffsetCriteria::new(self.schema_offsets.clone()).boxed());
        }
        if !self.scn_thresholds.is_empty() {
            let thresholds = self
                .scn_thresholds
                .iter()
                .map(|t| (t.pattern.as_str(), t.scn));
            parts.push(SystemChangeNumberCriteria::new(thresholds)?.boxed());
        }

        Ok(parts
            .into_iter()
            .reduce(|chain, next| -> BoxedCriteria<R> { Box::new(And::new(chain, next)) }))
    }
}
