use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use moodshelf_core::{AppConfig, CatalogStore, ContentRepository};
use serde::Serialize;

use crate::backup::BackupManager;
use crate::confirm::Confirmation;
use crate::error::{DedupError, Result};
use crate::executor::TransactionExecutor;
use crate::locator::DuplicateLocator;
use crate::policy::{ResolutionPlan, ResolutionPolicy};
use crate::report::{AuditReport, AuditReporter, RunStatistics};
use crate::scoring::{QualityScorer, ScoringWeights};

/// Everything the engine needs, passed in explicitly.
#[derive(Debug, Clone)]
pub struct DedupConfig {
    pub database_path: PathBuf,
    pub backup_dir: PathBuf,
    pub report_dir: PathBuf,
    pub weights: ScoringWeights,
}

impl From<&AppConfig> for DedupConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            database_path: config.database_path(),
            backup_dir: config.backup_dir(),
            report_dir: config.report_dir(),
            weights: ScoringWeights::from(&config.scoring),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    BackedUp,
    Scanned,
    NoGroups,
    GroupsFound,
    AwaitingConfirmation,
    Declined,
    Aborted,
    Approved,
    Deleting,
    RolledBack,
    Committed,
    ReportWritten,
    Done,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub state: RunState,
    pub history: Vec<RunState>,
    pub backup_path: PathBuf,
    pub report_path: Option<PathBuf>,
    pub statistics: RunStatistics,
    pub plan: ResolutionPlan,
}

impl RunOutcome {
    /// `true` for a completed run, including one that found nothing to do.
    pub fn succeeded(&self) -> bool {
        self.state == RunState::Done
    }
}

struct RunTracker {
    history: Vec<RunState>,
}

impl RunTracker {
    fn start() -> Self {
        tracing::debug!(state = ?RunState::Idle, "dedup run state");
        Self {
            history: vec![RunState::Idle],
        }
    }

    fn enter(&mut self, state: RunState) {
        tracing::debug!(from = ?self.current(), to = ?state, "dedup run state");
        self.history.push(state);
    }

    fn current(&self) -> RunState {
        self.history.last().copied().unwrap_or(RunState::Idle)
    }
}

/// Backup, locate, score, confirm, delete, report.
///
/// Assumes exclusive access to the catalog for the length of a run.
pub struct DedupEngine {
    config: DedupConfig,
    locator: DuplicateLocator,
    policy: ResolutionPolicy,
    executor: TransactionExecutor,
}

impl DedupEngine {
    pub fn new(config: DedupConfig) -> Self {
        let policy = ResolutionPolicy::new(QualityScorer::new(config.weights));
        Self {
            config,
            locator: DuplicateLocator::new(),
            policy,
            executor: TransactionExecutor::new(),
        }
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Read-only: scan and resolve without backup or mutation.
    pub fn preview(&self) -> Result<ResolutionPlan> {
        let store = self.open_store()?;
        self.scan(&store)
    }

    pub fn run(&self, confirmation: &mut dyn Confirmation) -> Result<RunOutcome> {
        self.run_at(confirmation, Local::now())
    }

    /// Full run with an explicit run timestamp shared by backup and report.
    pub fn run_at(&self, confirmation: &mut dyn Confirmation, started: DateTime<Local>) -> Result<RunOutcome> {
        let database = self.config.database_path.as_path();
        let mut tracker = RunTracker::start();
        tracing::info!(database = %database.display(), "dedup run started");

        let backup_path = BackupManager::new(&self.config.backup_dir).create_backup_at(database, started)?;
        tracker.enter(RunState::BackedUp);

        let mut store = self.open_store()?;
        let total_before = store.records().count().map_err(DedupError::QueryFailure)?;
        let plan = self.scan(&store)?;
        tracker.enter(RunState::Scanned);

        let mut statistics = RunStatistics {
            groups_found: plan.groups_found(),
            total_before,
            total_after: total_before,
            records_deleted: 0,
            records_kept: 0,
        };

        if plan.is_empty() {
            tracker.enter(RunState::NoGroups);
            tracker.enter(RunState::Done);
            tracing::info!("no duplicates found, catalog is clean");
            return Ok(finish(tracker, backup_path, None, statistics, plan));
        }

        tracker.enter(RunState::GroupsFound);
        tracing::info!(
            groups = plan.groups_found(),
            to_delete = plan.records_to_delete(),
            to_keep = plan.records_to_keep(),
            "duplicate groups found"
        );

        tracker.enter(RunState::AwaitingConfirmation);
        if !confirmation.confirm(&plan, &backup_path) {
            tracker.enter(RunState::Declined);
            tracker.enter(RunState::Aborted);
            tracing::info!("deletion declined by operator, catalog untouched");
            return Ok(finish(tracker, backup_path, None, statistics, plan));
        }
        tracker.enter(RunState::Approved);

        tracker.enter(RunState::Deleting);
        let deleted = match self.executor.delete_all(store.connection_mut(), &plan.loser_ids()) {
            Ok(deleted) => deleted,
            Err(e) => {
                tracker.enter(RunState::RolledBack);
                tracing::error!(error = %e, backup = %backup_path.display(), "run failed, catalog unchanged");
                return Err(e);
            }
        };
        tracker.enter(RunState::Committed);

        statistics.records_deleted = deleted;
        statistics.records_kept = plan.records_to_keep();
        statistics.total_after = self.count_after(&store, total_before - deleted);

        let report = AuditReport {
            timestamp: started,
            database: database.display().to_string(),
            backup: backup_path.display().to_string(),
            statistics,
            deleted_records: plan.audit_entries(),
        };
        let report_path = match AuditReporter::new(&self.config.report_dir).write(&report) {
            Ok(path) => {
                tracker.enter(RunState::ReportWritten);
                Some(path)
            }
            Err(e) => {
                tracing::warn!(error = %e, "audit report not written, deletions stay committed");
                None
            }
        };

        tracker.enter(RunState::Done);
        tracing::info!(
            deleted = statistics.records_deleted,
            kept = statistics.records_kept,
            total_after = statistics.total_after,
            "dedup run finished"
        );
        Ok(finish(tracker, backup_path, report_path, statistics, plan))
    }

    fn open_store(&self) -> Result<CatalogStore> {
        CatalogStore::open(&self.config.database_path).map_err(DedupError::ConnectionFailure)
    }

    fn scan(&self, store: &CatalogStore) -> Result<ResolutionPlan> {
        let groups = self
            .locator
            .find_duplicate_groups(&store.records())
            .map_err(DedupError::QueryFailure)?;
        Ok(self.policy.plan(groups))
    }

    /// The commit already happened, so a failed recount only costs accuracy.
    fn count_after(&self, store: &CatalogStore, expected: usize) -> usize {
        match store.records().count() {
            Ok(actual) => {
                if actual != expected {
                    tracing::warn!(actual, expected, "row count after commit differs from plan");
                }
                actual
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not recount catalog after commit");
                expected
            }
        }
    }
}

fn finish(
    tracker: RunTracker,
    backup_path: PathBuf,
    report_path: Option<PathBuf>,
    statistics: RunStatistics,
    plan: ResolutionPlan,
) -> RunOutcome {
    RunOutcome {
        state: tracker.current(),
        history: tracker.history,
        backup_path,
        report_path,
        statistics,
        plan,
    }
}

/// Convenience for callers holding only a path.
pub fn preview_catalog(database: &Path, weights: ScoringWeights) -> Result<ResolutionPlan> {
    let store = CatalogStore::open(database).map_err(DedupError::ConnectionFailure)?;
    let groups = DuplicateLocator::new()
        .find_duplicate_groups(&store.records())
        .map_err(DedupError::QueryFailure)?;
    Ok(ResolutionPolicy::new(QualityScorer::new(weights)).plan(groups))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::{AutoApprove, Decline};
    use moodshelf_core::{ContentRecord, ContentType};
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> DedupConfig {
        DedupConfig {
            database_path: dir.path().join("content.db"),
            backup_dir: dir.path().join("backups"),
            report_dir: dir.path().join("reports"),
            weights: ScoringWeights::default(),
        }
    }

    fn seed(config: &DedupConfig, records: &[ContentRecord]) {
        let store = CatalogStore::create(&config.database_path).unwrap();
        for record in records {
            store.records().insert_with_id(record).unwrap();
        }
    }

    #[test]
    fn history_follows_the_approved_path() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        seed(
            &config,
            &[
                ContentRecord::new(1, ContentType::Book, "Dune"),
                ContentRecord::new(2, ContentType::Book, "DUNE"),
            ],
        );

        let outcome = DedupEngine::new(config).run(&mut AutoApprove).unwrap();
        assert!(outcome.succeeded());
        assert_eq!(
            outcome.history,
            vec![
                RunState::Idle,
                RunState::BackedUp,
                RunState::Scanned,
                RunState::GroupsFound,
                RunState::AwaitingConfirmation,
                RunState::Approved,
                RunState::Deleting,
                RunState::Committed,
                RunState::ReportWritten,
                RunState::Done,
            ]
        );
    }

    #[test]
    fn history_for_clean_catalog() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        seed(&config, &[ContentRecord::new(1, ContentType::Book, "Dune")]);

        let outcome = DedupEngine::new(config).run(&mut Decline).unwrap();
        assert!(outcome.succeeded());
        assert_eq!(
            outcome.history,
            vec![
                RunState::Idle,
                RunState::BackedUp,
                RunState::Scanned,
                RunState::NoGroups,
                RunState::Done,
            ]
        );
        assert!(outcome.report_path.is_none());
        assert!(outcome.backup_path.exists());
    }

    #[test]
    fn declined_run_is_not_a_success() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        seed(
            &config,
            &[
                ContentRecord::new(1, ContentType::Music, "Song"),
                ContentRecord::new(2, ContentType::Music, "song"),
            ],
        );

        let outcome = DedupEngine::new(config).run(&mut Decline).unwrap();
        assert_eq!(outcome.state, RunState::Aborted);
        assert!(!outcome.succeeded());
        assert_eq!(outcome.statistics.records_deleted, 0);
    }

    #[test]
    fn preview_does_not_back_up() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        seed(
            &config,
            &[
                ContentRecord::new(1, ContentType::Movie, "Heat"),
                ContentRecord::new(2, ContentType::Movie, "heat"),
            ],
        );

        let plan = DedupEngine::new(config.clone()).preview().unwrap();
        assert_eq!(plan.records_to_delete(), 1);
        assert!(!config.backup_dir.exists());

        let same = preview_catalog(&config.database_path, ScoringWeights::default()).unwrap();
        assert_eq!(same.loser_ids(), plan.loser_ids());
    }

    #[test]
    fn config_from_app_config() {
        let mut app = AppConfig::default();
        app.set_database_path("/tmp/catalog.db");
        app.scoring.source_id_bonus = 4;

        let config = DedupConfig::from(&app);
        assert_eq!(config.database_path, PathBuf::from("/tmp/catalog.db"));
        assert_eq!(config.weights.source_id, 4);
    }
}
