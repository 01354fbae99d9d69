//! Criteria keyed by record type

use super::{Criteria, Filterable};
use crate::common::{PlogError, ReplicateOffset, Result};
use std::collections::HashMap;
use std::hash::Hash;

/// Per-type include flags. Types without an entry fail.
#[derive(Debug, Clone)]
pub struct TypeCriteria<K> {
    types: Option<HashMap<K, bool>>,
}

impl<K> Default for TypeCriteria<K> {
    fn default() -> Self {
        Self { types: None }
    }
}

impl<K: Eq + Hash> TypeCriteria<K> {
    pub fn new(types: HashMap<K, bool>) -> Self {
        Self { types: Some(types) }
    }
}

impl<R: Filterable> Criteria<R> for TypeCriteria<R::Kind> {
    fn meet(&self, record: &R) -> Result<bool> {
        let types = self
            .types
            .as_ref()
            .ok_or_else(|| PlogError::config("TypeCriteria has no type map"))?;
        Ok(types.get(&record.record_type()).copied().unwrap_or(false))
    }
}

/// Per-type watermarks: a record passes only when strictly after its
/// type's watermark. Types without a watermark fail.
#[derive(Debug, Clone)]
pub struct TypeOffsetCriteria<K> {
    offsets: Option<HashMap<K, ReplicateOffset>>,
}

impl<K> Default for TypeOffsetCriteria<K> {
    fn default() -> Self {
        Self { offsets: None }
    }
}

impl<K: Eq + Hash> TypeOffsetCriteria<K> {
    pub fn new(offsets: HashMap<K, ReplicateOffset>) -> Self {
        Self {
            offsets: Some(offsets),
        }
    }
}

impl<R: Filterable> Criteria<R> for TypeOffsetCriteria<R::Kind> {
    fn meet(&self, record: &R) -> Result<bool> {
        let offsets = self
            .offsets
            .as_ref()
            .ok_or_else(|| PlogError::config("TypeOffsetCriteria has no offset map"))?;
        Ok(offsets
            .get(&record.record_type())
            .is_some_and(|watermark| record.record_offset() > *watermark))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::test_support::TestRecord;
    use crate::model::EntrySubType;

    #[test]
    fn test_type_criteria() {
        let criteria = TypeCriteria::new(HashMap::from([
            (EntrySubType::Insert, true),
            (EntrySubType::Delete, false),
        ]));
        assert!(criteria
            .meet(&TestRecord::data("A", EntrySubType::Insert))
            .unwrap());
        assert!(!criteria
            .meet(&TestRecord::data("A", EntrySubType::Delete))
            .unwrap());
        // absent type fails closed
        assert!(!criteria
            .meet(&TestRecord::data("A", EntrySubType::Update))
            .unwrap());
    }

    #[test]
    fn test_type_criteria_unconfigured() {
        let criteria = TypeCriteria::<EntrySubType>::default();
        assert!(matches!(
            criteria.meet(&TestRecord::control(EntrySubType::Commit)),
            Err(PlogError::Config(_))
        ));
    }

    #[test]
    fn test_type_offset_criteria() {
        let watermark = ReplicateOffset::new(2, 512);
        let criteria = TypeOffsetCriteria::new(HashMap::from([(EntrySubType::Commit, watermark)]));

        let commit = TestRecord::control(EntrySubType::Commit);
        assert!(!criteria.meet(&commit.clone().at(watermark)).unwrap());
        assert!(!criteria
            .meet(&commit.clone().at(ReplicateOffset::new(2, 100)))
            .unwrap());
        assert!(criteria
            .meet(&commit.clone().at(ReplicateOffset::new(2, 513)))
            .unwrap());
        assert!(criteria
            .meet(&commit.at(ReplicateOffset::new(3, 0)))
            .unwrap());

        let begin = TestRecord::control(EntrySubType::Begin).at(ReplicateOffset::new(9, 9));
        assert!(!criteria.meet(&begin).unwrap());
    }

    #[test]
    fn test_type_offset_unconfigured() {
        let criteria = TypeOffsetCriteria::<EntrySubType>::default();
        assert!(criteria
            .meet(&TestRecord::control(EntrySubType::Commit))
            .is_err());
    }
}
