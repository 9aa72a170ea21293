use linkbox_core::registry::Result;
use linkbox_core::{OwnerId, SaveOutcome, ShortCode, StorageError, UrlRecord};
use std::collections::BTreeMap;

/// The record map shared by the in-process registries.
///
/// Not synchronized: owners wrap it in a single mutex so every
/// check-then-write sequence below runs as one step.
#[derive(Debug, Default)]
pub(crate) struct RecordTable {
    records: BTreeMap<ShortCode, UrlRecord>,
}

impl RecordTable {
    pub(crate) fn from_records(records: BTreeMap<ShortCode, UrlRecord>) -> Self {
        Self { records }
    }

    pub(crate) fn records(&self) -> &BTreeMap<ShortCode, UrlRecord> {
        &self.records
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn get(&self, code: &ShortCode) -> Option<UrlRecord> {
        self.records.get(code).cloned()
    }

    /// Linear scan, O(n) per lookup.
    fn code_for(&self, original_url: &str, owner: &OwnerId) -> Option<&ShortCode> {
        self.records
            .iter()
            .find(|(_, record)| record.original_url == original_url && &record.owner == owner)
            .map(|(code, _)| code)
    }

    pub(crate) fn save(
        &mut self,
        code: &ShortCode,
        original_url: &str,
        owner: &OwnerId,
    ) -> Result<SaveOutcome> {
        if let Some(existing) = self.code_for(original_url, owner) {
            return Ok(SaveOutcome::Existing(existing.clone()));
        }

        if self.records.contains_key(code) {
            return Err(StorageError::CodeTaken(code.to_string()));
        }

        self.records.insert(
            code.clone(),
            UrlRecord::new(original_url, owner.clone()),
        );
        Ok(SaveOutcome::Created(code.clone()))
    }

    /// Inserts a batch item. Unlike [`save`](Self::save), an already
    /// registered (url, owner) pair is a conflict.
    pub(crate) fn insert(
        &mut self,
        code: &ShortCode,
        original_url: &str,
        owner: &OwnerId,
    ) -> Result<()> {
        if self.records.contains_key(code) {
            return Err(StorageError::CodeTaken(code.to_string()));
        }

        if let Some(existing) = self.code_for(original_url, owner) {
            return Err(StorageError::Conflict(existing.to_string()));
        }

        self.records.insert(
            code.clone(),
            UrlRecord::new(original_url, owner.clone()),
        );
        Ok(())
    }

    pub(crate) fn owner_urls(&self, owner: &OwnerId) -> BTreeMap<ShortCode, String> {
        self.records
            .iter()
            .filter(|(_, record)| &record.owner == owner)
            .map(|(code, record)| (code.clone(), record.original_url.clone()))
            .collect()
    }

    /// Flips `deleted` on the owner's active records among `codes` and
    /// returns how many changed.
    pub(crate) fn delete(&mut self, codes: &[ShortCode], owner: &OwnerId) -> usize {
        let mut changed = 0;
        for code in codes {
            if let Some(record) = self.records.get_mut(code) {
                if &record.owner == owner && !record.deleted {
                    record.deleted = true;
                    changed += 1;
                }
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn owner(s: &str) -> OwnerId {
        OwnerId::new(s).unwrap()
    }

    #[test]
    fn save_dedups_per_owner() {
        let mut table = RecordTable::default();

        let first = table.save(&code("ghi"), "https://a.com", &owner("u1")).unwrap();
        let second = table.save(&code("xyz"), "https://a.com", &owner("u1")).unwrap();
        let other = table.save(&code("zzz"), "https://a.com", &owner("u2")).unwrap();

        assert_eq!(first, SaveOutcome::Created(code("ghi")));
        assert_eq!(second, SaveOutcome::Existing(code("ghi")));
        assert_eq!(other, SaveOutcome::Created(code("zzz")));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn save_rejects_taken_code() {
        let mut table = RecordTable::default();
        table.save(&code("ghi"), "https://a.com", &owner("u1")).unwrap();

        let err = table
            .save(&code("ghi"), "https://b.com", &owner("u1"))
            .unwrap_err();

        assert!(matches!(err, StorageError::CodeTaken(_)));
        assert_eq!(table.get(&code("ghi")).unwrap().original_url, "https://a.com");
    }

    #[test]
    fn insert_treats_registered_pair_as_conflict() {
        let mut table = RecordTable::default();
        table.insert(&code("ghi"), "https://a.com", &owner("u1")).unwrap();

        let err = table
            .insert(&code("xyz"), "https://a.com", &owner("u1"))
            .unwrap_err();

        assert!(matches!(err, StorageError::Conflict(_)));
        assert!(table.get(&code("xyz")).is_none());
    }

    #[test]
    fn delete_counts_only_owned_active_records() {
        let mut table = RecordTable::default();
        table.save(&code("ghi"), "https://a.com", &owner("u1")).unwrap();
        table.save(&code("zzz"), "https://a.com", &owner("u2")).unwrap();

        let codes = [code("ghi"), code("zzz"), code("nope")];
        assert_eq!(table.delete(&codes, &owner("u1")), 1);
        assert_eq!(table.delete(&codes, &owner("u1")), 0);
        assert!(!table.get(&code("zzz")).unwrap().deleted);
    }
}
