use std::collections::HashMap;

use moodshelf_core::{ContentRecord, ContentRepository, IdentityKey, Result};
use serde::Serialize;

/// Records sharing one identity key, ascending by id.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    pub key: IdentityKey,
    pub records: Vec<ContentRecord>,
}

impl DuplicateGroup {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> Vec<i64> {
        self.records.iter().map(|r| r.id).collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateLocator;

impl DuplicateLocator {
    pub fn new() -> Self {
        Self
    }

    /// Scan the catalog and return every identity key held by more than one
    /// record, with the member records fetched in ascending id order.
    pub fn find_duplicate_groups<R: ContentRepository>(&self, repo: &R) -> Result<Vec<DuplicateGroup>> {
        let buckets = partition(repo.list_identities()?);

        let mut groups = Vec::with_capacity(buckets.len());
        for (key, ids) in buckets {
            let records = repo.find_many(&ids)?;
            if records.len() < 2 {
                tracing::warn!(title = %key.title, expected = ids.len(), found = records.len(), "group shrank during scan");
                continue;
            }
            groups.push(DuplicateGroup { key, records });
        }

        tracing::info!(groups = groups.len(), "duplicate scan finished");
        Ok(groups)
    }
}

/// Bucket `(id, key)` pairs by key, keep buckets of two or more, and order
/// them by size descending, then type, title, creator and lowest id.
///
/// Ids inside a bucket keep ascending order as long as the input does.
pub fn partition(identities: Vec<(i64, IdentityKey)>) -> Vec<(IdentityKey, Vec<i64>)> {
    let mut buckets: HashMap<IdentityKey, Vec<i64>> = HashMap::new();
    for (id, key) in identities {
        buckets.entry(key).or_default().push(id);
    }

    let mut groups: Vec<(IdentityKey, Vec<i64>)> = buckets
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(key, mut ids)| {
            ids.sort_unstable();
            (key, ids)
        })
        .collect();

    groups.sort_by(|(a_key, a_ids), (b_key, b_ids)| {
        b_ids
            .len()
            .cmp(&a_ids.len())
            .then_with(|| a_key.kind.cmp(&b_key.kind))
            .then_with(|| a_key.title.cmp(&b_key.title))
            .then_with(|| a_key.creator.cmp(&b_key.creator))
            .then_with(|| a_ids[0].cmp(&b_ids[0]))
    });
    groups
}
