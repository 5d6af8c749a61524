use moodshelf_core::{ContentRecord, ScoringConfig};

/// Optional columns that each add `field` points when populated.
pub const SCORED_FIELDS: [&str; 7] = [
    "description",
    "image_url",
    "year",
    "rating",
    "mood",
    "genre",
    "epoch",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringWeights {
    pub field: u32,
    /// Awarded when `needs_ai` is false.
    pub ai_description: u32,
    /// Awarded when `source_id` is present.
    pub source_id: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            field: 1,
            ai_description: 2,
            source_id: 1,
        }
    }
}

impl From<&ScoringConfig> for ScoringWeights {
    fn from(config: &ScoringConfig) -> Self {
        Self {
            field: config.field_weight,
            ai_description: config.ai_description_bonus,
            source_id: config.source_id_bonus,
        }
    }
}

/// Completeness heuristic used to rank records inside one duplicate group.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityScorer {
    weights: ScoringWeights,
}

impl QualityScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    pub fn score(&self, record: &ContentRecord) -> u32 {
        let mut score = self.weights.field.saturating_mul(filled_fields(record));

        if !record.needs_ai {
            score = score.saturating_add(self.weights.ai_description);
        }
        if has_text(record.source_id.as_deref()) {
            score = score.saturating_add(self.weights.source_id);
        }

        score
    }

    /// Score of a record with everything populated.
    pub fn max_score(&self) -> u32 {
        self.weights
            .field
            .saturating_mul(SCORED_FIELDS.len() as u32)
            .saturating_add(self.weights.ai_description)
            .saturating_add(self.weights.source_id)
    }
}

/// Number of [`SCORED_FIELDS`] that are non-null and non-blank. A numeric
/// column holding text that is not a number still counts.
pub fn filled_fields(record: &ContentRecord) -> u32 {
    [
        has_text(record.description.as_deref()),
        has_text(record.image_url.as_deref()),
        record.year.is_some() || record.has_unparsed("year"),
        record.rating.is_some() || record.has_unparsed("rating"),
        has_text(record.mood.as_deref()),
        has_text(record.genre.as_deref()),
        has_text(record.epoch.as_deref()),
    ]
    .into_iter()
    .filter(|filled| *filled)
    .count() as u32
}

fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodshelf_core::ContentType;

    fn bare() -> ContentRecord {
        ContentRecord::new(1, ContentType::Book, "Dune")
    }

    fn full() -> ContentRecord {
        let mut record = bare();
        record.description = Some("Desert planet".to_string());
        record.image_url = Some("https://covers.example/dune.jpg".to_string());
        record.year = Some(1965);
        record.rating = Some(4.3);
        record.mood = Some("epic".to_string());
        record.genre = Some("sci-fi".to_string());
        record.epoch = Some("1960s".to_string());
        record.needs_ai = false;
        record.source_id = Some("gb:B00B7NPRY8".to_string());
        record
    }

    #[test]
    fn bare_record_scores_zero() {
        assert_eq!(QualityScorer::default().score(&bare()), 0);
    }

    #[test]
    fn full_record_scores_ten_with_default_weights() {
        let scorer = QualityScorer::default();
        assert_eq!(scorer.score(&full()), 10);
        assert_eq!(scorer.max_score(), 10);
    }

    #[test]
    fn blank_strings_do_not_count() {
        let mut record = bare();
        record.description = Some("   ".to_string());
        record.genre = Some(String::new());
        record.source_id = Some(" ".to_string());
        assert_eq!(QualityScorer::default().score(&record), 0);
    }

    #[test]
    fn numeric_fields_count_when_present() {
        let mut record = bare();
        record.year = Some(0);
        record.rating = Some(0.0);
        assert_eq!(filled_fields(&record), 2);
    }

    #[test]
    fn unparsed_numeric_text_counts_as_filled() {
        let mut record = bare();
        record.unparsed = vec!["year", "rating"];
        assert_eq!(filled_fields(&record), 2);
        assert_eq!(QualityScorer::default().score(&record), 2);
    }

    #[test]
    fn huge_weights_saturate() {
        let scorer = QualityScorer::new(ScoringWeights {
            field: u32::MAX / 2,
            ai_description: u32::MAX,
            source_id: u32::MAX,
        });
        let mut record = bare();
        record.description = Some("d".to_string());
        let one = scorer.score(&record);
        record.genre = Some("g".to_string());
        let two = scorer.score(&record);
        record.year = Some(1999);
        let three = scorer.score(&record);

        assert!(one <= two && two <= three);
        assert_eq!(three, u32::MAX);
        assert_eq!(scorer.score(&full()), u32::MAX);
        assert_eq!(scorer.max_score(), u32::MAX);
    }

    #[test]
    fn ai_description_adds_exactly_its_weight() {
        let scorer = QualityScorer::default();
        let mut record = full();
        record.needs_ai = true;
        let before = scorer.score(&record);
        record.needs_ai = false;
        assert_eq!(scorer.score(&record), before + 2);
    }

    #[test]
    fn filling_any_field_never_lowers_the_score() {
        let scorer = QualityScorer::default();
        let setters: [fn(&mut ContentRecord); 7] = [
            |r| r.description = Some("d".to_string()),
            |r| r.image_url = Some("u".to_string()),
            |r| r.year = Some(2000),
            |r| r.rating = Some(1.0),
            |r| r.mood = Some("calm".to_string()),
            |r| r.genre = Some("drama".to_string()),
            |r| r.epoch = Some("modern".to_string()),
        ];

        for mask in 0u32..(1 << setters.len()) {
            let mut record = bare();
            for (bit, set) in setters.iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    set(&mut record);
                }
            }
            let base = scorer.score(&record);
            for set in &setters {
                let mut filled = record.clone();
                set(&mut filled);
                assert!(scorer.score(&filled) >= base);
            }
        }
    }

    #[test]
    fn custom_weights_apply() {
        let scorer = QualityScorer::new(ScoringWeights {
            field: 2,
            ai_description: 0,
            source_id: 5,
        });
        let mut record = bare();
        record.genre = Some("noir".to_string());
        record.needs_ai = false;
        record.source_id = Some("tmdb:1".to_string());
        assert_eq!(scorer.score(&record), 7);
        assert_eq!(scorer.max_score(), 19);
    }

    #[test]
    fn weights_from_config() {
        let weights = ScoringWeights::from(&ScoringConfig::default());
        assert_eq!(weights, ScoringWeights::default());
    }
}
