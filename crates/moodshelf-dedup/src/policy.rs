use std::cmp::Ordering;

use moodshelf_core::{ContentRecord, ContentType, IdentityKey};
use serde::{Deserialize, Serialize};

use crate::locator::DuplicateGroup;
use crate::scoring::QualityScorer;

#[derive(Debug, Clone, Serialize)]
pub struct ScoredRecord {
    pub record: ContentRecord,
    pub score: u32,
}

/// One line of the audit report: a deleted record and the survivor it lost to.
///
/// `title` and `creator` are the group's normalized key, so every entry of a
/// group reads the same. A missing creator is the empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub title: String,
    pub creator: String,
    #[serde(rename = "type")]
    pub kind: ContentType,
    pub quality_score: u32,
    pub kept_instead: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub key: IdentityKey,
    pub keeper: ScoredRecord,
    pub losers: Vec<ScoredRecord>,
}

impl Resolution {
    pub fn group_size(&self) -> usize {
        self.losers.len() + 1
    }

    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.losers
            .iter()
            .map(|loser| AuditEntry {
                id: loser.record.id,
                title: self.key.title.clone(),
                creator: self.key.creator.clone(),
                kind: loser.record.kind,
                quality_score: loser.score,
                kept_instead: self.keeper.record.id,
            })
            .collect()
    }
}

/// Every resolution of one run, in locator order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolutionPlan {
    pub resolutions: Vec<Resolution>,
}

impl ResolutionPlan {
    pub fn is_empty(&self) -> bool {
        self.resolutions.is_empty()
    }

    pub fn groups_found(&self) -> usize {
        self.resolutions.len()
    }

    pub fn records_to_keep(&self) -> usize {
        self.resolutions.len()
    }

    pub fn records_to_delete(&self) -> usize {
        self.resolutions.iter().map(|r| r.losers.len()).sum()
    }

    /// Sum of all group sizes.
    pub fn records_grouped(&self) -> usize {
        self.resolutions.iter().map(Resolution::group_size).sum()
    }

    pub fn loser_ids(&self) -> Vec<i64> {
        self.resolutions
            .iter()
            .flat_map(|r| r.losers.iter().map(|l| l.record.id))
            .collect()
    }

    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.resolutions
            .iter()
            .flat_map(Resolution::audit_entries)
            .collect()
    }
}

/// Keeps the highest-scoring record of each group. Equal scores go to the
/// lowest id, i.e. the record inserted first.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolutionPolicy {
    scorer: QualityScorer,
}

impl ResolutionPolicy {
    pub fn new(scorer: QualityScorer) -> Self {
        Self { scorer }
    }

    pub fn scorer(&self) -> &QualityScorer {
        &self.scorer
    }

    pub fn resolve(&self, group: DuplicateGroup) -> Option<Resolution> {
        let mut ranked: Vec<ScoredRecord> = group
            .records
            .into_iter()
            .map(|record| ScoredRecord {
                score: self.scorer.score(&record),
                record,
            })
            .collect();
        ranked.sort_by(rank);

        let mut members = ranked.into_iter();
        let keeper = members.next()?;
        Some(Resolution {
            key: group.key,
            keeper,
            losers: members.collect(),
        })
    }

    pub fn plan(&self, groups: Vec<DuplicateGroup>) -> ResolutionPlan {
        ResolutionPlan {
            resolutions: groups
                .into_iter()
                .filter_map(|group| self.resolve(group))
                .collect(),
        }
    }
}

/// Score descending, then id ascending.
pub fn rank(a: &ScoredRecord, b: &ScoredRecord) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.record.id.cmp(&b.record.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(records: Vec<ContentRecord>) -> DuplicateGroup {
        DuplicateGroup {
            key: records[0].identity_key(),
            records,
        }
    }

    fn with_fields(id: i64, filled: usize) -> ContentRecord {
        let mut record = ContentRecord::new(id, ContentType::Book, "Dune");
        let values = ["a", "b", "c", "d", "e"];
        for (idx, value) in values.iter().take(filled).enumerate() {
            let value = Some(value.to_string());
            match idx {
                0 => record.description = value,
                1 => record.image_url = value,
                2 => record.mood = value,
                3 => record.genre = value,
                _ => record.epoch = value,
            }
        }
        record
    }

    #[test]
    fn dune_pair_keeps_lower_id_on_tie() {
        let mut first = ContentRecord::new(1, ContentType::Book, "Dune").with_creator("Frank Herbert");
        first.genre = Some("sci-fi".to_string());
        first.year = Some(1965);
        let mut second = ContentRecord::new(2, ContentType::Book, " DUNE").with_creator("Frank HERBERT");
        second.year = Some(1965);
        second.description = Some("...".to_string());

        let resolution = ResolutionPolicy::default()
            .resolve(group(vec![first, second]))
            .unwrap();

        assert_eq!(resolution.keeper.record.id, 1);
        assert_eq!(resolution.keeper.score, 2);
        assert_eq!(
            resolution.audit_entries(),
            vec![AuditEntry {
                id: 2,
                title: "dune".to_string(),
                creator: "frank herbert".to_string(),
                kind: ContentType::Book,
                quality_score: 2,
                kept_instead: 1,
            }]
        );
    }

    #[test]
    fn audit_entry_without_creator_has_empty_creator() {
        let resolution = ResolutionPolicy::default()
            .resolve(group(vec![with_fields(1, 1), with_fields(2, 0)]))
            .unwrap();
        let entries = resolution.audit_entries();

        assert_eq!(entries[0].id, 2);
        assert_eq!(entries[0].title, "dune");
        assert_eq!(entries[0].creator, "");
    }

    #[test]
    fn tie_at_top_goes_to_lowest_id() {
        let resolution = ResolutionPolicy::default()
            .resolve(group(vec![with_fields(10, 5), with_fields(11, 3), with_fields(12, 5)]))
            .unwrap();

        assert_eq!(resolution.keeper.record.id, 10);
        let losers: Vec<(i64, u32)> = resolution
            .losers
            .iter()
            .map(|l| (l.record.id, l.score))
            .collect();
        assert_eq!(losers, vec![(12, 5), (11, 3)]);
    }

    #[test]
    fn tie_break_does_not_depend_on_input_order() {
        let resolution = ResolutionPolicy::default()
            .resolve(group(vec![with_fields(12, 5), with_fields(11, 3), with_fields(10, 5)]))
            .unwrap();
        assert_eq!(resolution.keeper.record.id, 10);
    }

    #[test]
    fn higher_score_beats_lower_id() {
        let resolution = ResolutionPolicy::default()
            .resolve(group(vec![with_fields(1, 0), with_fields(2, 4)]))
            .unwrap();
        assert_eq!(resolution.keeper.record.id, 2);
        assert_eq!(resolution.losers[0].record.id, 1);
    }

    #[test]
    fn empty_group_has_no_resolution() {
        let empty = DuplicateGroup {
            key: IdentityKey::new("x", None, ContentType::Book),
            records: Vec::new(),
        };
        assert!(ResolutionPolicy::default().resolve(empty).is_none());
    }

    #[test]
    fn plan_counts_are_conserved() {
        let policy = ResolutionPolicy::default();
        let plan = policy.plan(vec![
            group(vec![with_fields(1, 1), with_fields(2, 2), with_fields(3, 0)]),
            group(vec![with_fields(7, 0), with_fields(8, 0)]),
        ]);

        assert_eq!(plan.groups_found(), 2);
        assert_eq!(plan.records_to_keep(), 2);
        assert_eq!(plan.records_to_delete(), 3);
        assert_eq!(plan.records_to_delete() + plan.records_to_keep(), plan.records_grouped());
        assert_eq!(plan.loser_ids(), vec![1, 3, 8]);
        assert_eq!(plan.audit_entries().len(), 3);
    }
}
