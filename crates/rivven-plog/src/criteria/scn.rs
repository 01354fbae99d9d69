//! SCN threshold criteria

use super::{Criteria, Filterable, NO_SCHEMA};
use crate::common::{PatternMatcher, PlogError, Result};
use tracing::trace;

/// Ordered wildcard schema patterns, each with a minimum SCN.
///
/// The first pattern matching the record schema (or `N/A` for records
/// without one) decides: the record passes when its SCN is at least the
/// threshold. Records matching no pattern fail.
#[derive(Debug, Clone, Default)]
pub struct SystemChangeNumberCriteria {
    thresholds: Option<Vec<(PatternMatcher, u64)>>,
}

impl SystemChangeNumberCriteria {
    /// Compile thresholds; earlier entries take priority.
    pub fn new<S, I>(thresholds: I) -> Result<Self>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = (S, u64)>,
    {
        let thresholds = thresholds
            .into_iter()
            .map(|(pattern, scn)| -> Result<(PatternMatcher, u64)> {
                Ok((PatternMatcher::new(pattern.as_ref())?, scn))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            thresholds: Some(thresholds),
        })
    }
}

impl<R: Filterable> Criteria<R> for SystemChangeNumberCriteria {
    fn meet(&self, record: &R) -> Result<bool> {
        let thresholds = self
            .thresholds
            .as_ref()
            .ok_or_else(|| PlogError::config("SystemChangeNumberCriteria has no thresholds"))?;
        let schema = record.record_schema().unwrap_or(NO_SCHEMA);
        match thresholds.iter().find(|(pattern, _)| pattern.matches(schema)) {
            Some((pattern, threshold)) => {
                trace!(
                    "schema {} matched SCN pattern {} (threshold {})",
                    schema,
                    pattern.pattern(),
                    threshold
                );
                Ok(record.record_scn() >= *threshold)
            }
            None => Ok(false),
        }
    }
}
