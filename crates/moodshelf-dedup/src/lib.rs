//! Moodshelf Dedup: backup, locate, score, resolve, delete, report.

pub mod backup;
pub mod confirm;
pub mod engine;
pub mod error;
pub mod executor;
pub mod locator;
pub mod policy;
pub mod report;
pub mod scoring;

pub use backup::BackupManager;
pub use confirm::{AutoApprove, Confirmation, Decline, PromptConfirmation, render_plan};
pub use engine::{DedupConfig, DedupEngine, RunOutcome, RunState, preview_catalog};
pub use error::{DedupError, Result};
pub use executor::TransactionExecutor;
pub use locator::{DuplicateGroup, DuplicateLocator};
pub use policy::{AuditEntry, Resolution, ResolutionPlan, ResolutionPolicy, ScoredRecord};
pub use report::{AuditReport, AuditReporter, RunStatistics};
pub use scoring::{QualityScorer, ScoringWeights};
