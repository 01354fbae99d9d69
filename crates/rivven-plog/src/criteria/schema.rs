//! Criteria keyed by schema name
//!
//! Schema keys are looked up exactly, then in lower case, then in upper
//! case. Non-data records always pass.

use super::{Criteria, Filterable};
use crate::common::{PlogError, ReplicateOffset, Result};
use std::collections::HashMap;

fn lookup<'a, V>(map: &'a HashMap<String, V>, schema: &str) -> Option<&'a V> {
    map.get(schema)
        .or_else(|| map.get(&schema.to_lowercase()))
        .or_else(|| map.get(&schema.to_uppercase()))
}

/// Per-schema include flags. Data records without an entry fail.
#[derive(Debug, Clone, Default)]
pub struct SchemaCriteria {
    schemas: Option<HashMap<String, bool>>,
}

impl SchemaCriteria {
    pub fn new(schemas: HashMap<String, bool>) -> Self {
        Self {
            schemas: Some(schemas),
        }
    }
}

impl<R: Filterable> Criteria<R> for SchemaCriteria {
    fn meet(&self, record: &R) -> Result<bool> {
        let schemas = self
            .schemas
            .as_ref()
            .ok_or_else(|| PlogError::config("SchemaCriteria has no schema map"))?;
        if !record.is_data_record() {
            return Ok(true);
        }
        Ok(record
            .record_schema()
            .and_then(|schema| lookup(schemas, schema))
            .copied()
            .unwrap_or(false))
    }
}

/// Per-schema watermarks for data records.
///
/// A data record passes when strictly after its schema's watermark, or
/// when its schema has no watermark at all.
#[derive(Debug, Clone, Default)]
pub struct SchemaOffsetCriteria {
    offsets: Option<HashMap<String, ReplicateOffset>>,
}

impl SchemaOffsetCriteria {
    pub fn new(offsets: HashMap<String, ReplicateOffset>) -> Self {
        Self {
            offsets: Some(offsets),
        }
    }
}

impl<R: Filterable> Criteria<R> for SchemaOffsetCriteria {
    fn meet(&self, record: &R) -> Result<bool> {
        let offsets = self
            .offsets
            .as_ref()
            .ok_or_else(|| PlogError::config("SchemaOffsetCriteria has no offset map"))?;
        if !record.is_data_record() {
            return Ok(true);
        }
        let watermark = record
            .record_schema()
            .and_then(|schema| lookup(offsets, schema));
        Ok(match watermark {
            Some(watermark) => record.record_offset() > *watermark,
            None => true,
        })
    }
}
