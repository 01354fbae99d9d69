//! # Criteria Pipeline
//!
//! Composable boolean predicates deciding, per record, whether it is
//! parsed, emitted or persisted. Criteria only see records through the
//! [`Filterable`] view, so the same predicates apply to raw entry records
//! and to emitted domain records.
//!
//! - [`TypeCriteria`] / [`TypeOffsetCriteria`] - per record type
//! - [`SchemaCriteria`] / [`SchemaOffsetCriteria`] - per schema, with
//!   case-insensitive fallback
//! - [`SystemChangeNumberCriteria`] - wildcard schema to minimum SCN
//! - [`InternalDdlFilterCriteria`] - default denylist of internal schemas
//! - [`And`] / [`Or`] - short-circuit combinators
//!
//! A criteria created through `Default` has no data and fails every
//! evaluation with a config error.
//!
//! ## Example
//!
//! ```rust
//! use rivven_plog::criteria::{And, Criteria, SchemaCriteria, TypeCriteria};
//! use rivven_plog::model::{EntryRecord, EntrySubType};
//! use std::collections::HashMap;
//!
//! let schemas = SchemaCriteria::new(HashMap::from([("SOE.ORDERS".to_string(), true)]));
//! let types = TypeCriteria::new(HashMap::from([(EntrySubType::Insert, true)]));
//! let criteria = And::new(schemas, types);
//!
//! let mut record = EntryRecord::new(EntrySubType::Insert);
//! record.owner = Some("SOE.ORDERS".to_string());
//! assert!(criteria.meet(&record).unwrap());
//! ```

mod internal;
mod schema;
mod scn;
mod type_criteria;

pub use internal::*;
pub use schema::*;
pub use scn::*;
pub use type_criteria::*;

use crate::common::{ReplicateOffset, Result};
use crate::model::{EntryRecord, EntrySubType, EntryType};
use std::fmt::Debug;
use std::hash::Hash;

/// Schema placeholder for records without a schema
pub const NO_SCHEMA: &str = "N/A";

/// Uniform view of a record for criteria evaluation
pub trait Filterable {
    /// Record type discriminator
    type Kind: Copy + Eq + Hash + Debug;

    fn record_type(&self) -> Self::Kind;

    fn record_offset(&self) -> ReplicateOffset;

    /// Qualified schema name, if the record has one
    fn record_schema(&self) -> Option<&str>;

    /// Whether the record carries row-level or DDL change data
    fn is_data_record(&self) -> bool;

    fn record_scn(&self) -> u64;
}

/// A predicate over filterable records
pub trait Criteria<R: ?Sized> {
    /// Decide whether the record passes.
    fn meet(&self, record: &R) -> Result<bool>;
}

/// Boxed criteria as stored by readers and parsers
pub type BoxedCriteria<R> = Box<dyn Criteria<R> + Send + Sync>;

impl<R: ?Sized, C: Criteria<R> + ?Sized> Criteria<R> for Box<C> {
    fn meet(&self, record: &R) -> Result<bool> {
        (**self).meet(record)
    }
}

/// Both operands must pass; the second is skipped when the first fails.
#[derive(Debug, Clone)]
pub struct And<A, B> {
    first: A,
    second: B,
}

impl<A, B> And<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<R: ?Sized, A: Criteria<R>, B: Criteria<R>> Criteria<R> for And<A, B> {
    fn meet(&self, record: &R) -> Result<bool> {
        Ok(self.first.meet(record)? && self.second.meet(record)?)
    }
}

/// Either operand must pass; the second is skipped when the first passes.
#[derive(Debug, Clone)]
pub struct Or<A, B> {
    first: A,
    second: B,
}

impl<A, B> Or<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<R: ?Sized, A: Criteria<R>, B: Criteria<R>> Criteria<R> for Or<A, B> {
    fn meet(&self, record: &R) -> Result<bool> {
        Ok(self.first.meet(record)? || self.second.meet(record)?)
    }
}

/// Combinator helpers for every criteria
pub trait CriteriaExt<R: ?Sized>: Criteria<R> + Sized {
    fn and<C: Criteria<R>>(self, other: C) -> And<Self, C> {
        And::new(self, other)
    }

    fn or<C: Criteria<R>>(self, other: C) -> Or<Self, C> {
        Or::new(self, other)
    }

    fn boxed(self) -> BoxedCriteria<R>
    where
        Self: Send + Sync + 'static,
    {
        Box::new(self)
    }
}

impl<R: ?Sized, T: Criteria<R>> CriteriaExt<R> for T {}

impl Filterable for EntryRecord {
    type Kind = EntrySubType;

    fn record_type(&self) -> EntrySubType {
        self.sub_type
    }

    fn record_offset(&self) -> ReplicateOffset {
        self.unique_offset
    }

    fn record_schema(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    fn is_data_record(&self) -> bool {
        self.sub_type.parent() == EntryType::Data
    }

    fn record_scn(&self) -> u64 {
        self.scn
    }
}
