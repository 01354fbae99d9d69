//! Default filter for internal schemas

use super::{Criteria, Filterable};
use crate::common::{PatternSet, Result};

/// Schemas owned by the database and the replication tooling itself
pub const INTERNAL_SCHEMA_PATTERNS: &[&str] = &["SYS.*", "DBVREP.*", "DBVREP*.*"];

/// Rejects records whose schema matches an internal schema pattern.
///
/// Records without a schema pass.
#[derive(Debug, Clone)]
pub struct InternalDdlFilterCriteria {
    denylist: PatternSet,
}

impl InternalDdlFilterCriteria {
    pub fn new() -> Result<Self> {
        Ok(Self {
            denylist: PatternSet::from_patterns(INTERNAL_SCHEMA_PATTERNS)?,
        })
    }
}

impl<R: Filterable> Criteria<R> for InternalDdlFilterCriteria {
    fn meet(&self, record: &R) -> Result<bool> {
        Ok(record
            .record_schema()
            .map_or(true, |schema| !self.denylist.matches(schema)))
    }
}
