use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use moodshelf_core::{AppConfig, CatalogStore, ContentRepository};
use moodshelf_dedup::{
    AutoApprove, Confirmation, DedupConfig, DedupEngine, DuplicateLocator, PromptConfirmation,
    ResolutionPlan, RunOutcome, RunState, render_plan,
};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "moodshelf",
    about = "Catalog maintenance for the moodshelf recommendation store",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting MOODSHELF_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Catalog database to operate on. Overrides config and MOODSHELF_DATABASE.
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Config file to load instead of the default location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up the catalog, then remove duplicate records after confirmation.
    Dedup {
        /// Skip the interactive confirmation.
        #[arg(long)]
        yes: bool,
    },

    /// Show duplicate groups and what a dedup run would keep. Read-only.
    Duplicates {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show catalog statistics.
    Stats {
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Create the catalog schema if it does not exist yet.
    Init,

    /// Run diagnostics.
    Doctor,
}

// ─── Main ────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let start = Instant::now();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("moodshelf=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let json_output = cli.json || std::env::var("MOODSHELF_JSON").as_deref() == Ok("1");

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    if let Some(db) = &cli.database {
        config.set_database_path(db.to_string_lossy());
    }

    match cli.command {
        // ── Dedup ──────────────────────────────────────────────────────────
        Commands::Dedup { yes } => {
            let engine = DedupEngine::new(DedupConfig::from(&config));
            let mut confirmation: Box<dyn Confirmation> = if yes {
                Box::new(AutoApprove)
            } else {
                Box::new(PromptConfirmation::stdio())
            };

            match engine.run(confirmation.as_mut()) {
                Ok(outcome) => {
                    let dur = start.elapsed().as_millis();
                    if json_output {
                        let status = if outcome.succeeded() { "ok" } else { "aborted" };
                        print_json(&serde_json::json!({
                            "status": status,
                            "data": outcome,
                            "meta": { "duration_ms": dur }
                        }))?;
                    } else {
                        print_run_summary(&outcome);
                    }
                    if !outcome.succeeded() {
                        std::process::exit(1);
                    }
                }
                Err(e) => {
                    let dur = start.elapsed().as_millis();
                    if json_output {
                        print_json(&serde_json::json!({
                            "status": "error",
                            "error": error_kind(&e),
                            "message": e.to_string(),
                            "meta": { "duration_ms": dur }
                        }))?;
                    } else {
                        eprintln!("Dedup failed: {e}");
                    }
                    std::process::exit(1);
                }
            }
        }

        // ── Duplicates ─────────────────────────────────────────────────────
        Commands::Duplicates { limit } => {
            let engine = DedupEngine::new(DedupConfig::from(&config));
            let mut plan = engine.preview()?;
            let total_groups = plan.groups_found();
            if let Some(limit) = limit {
                plan.resolutions.truncate(limit);
            }
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": {
                        "groups": plan.resolutions,
                        "total_groups": total_groups,
                        "records_to_delete": plan.records_to_delete(),
                    },
                    "meta": { "duration_ms": dur }
                }))?;
            } else if plan.is_empty() {
                println!("No duplicates found.");
            } else {
                println!("Found {total_groups} duplicate groups:");
                render_plan(&plan, &mut std::io::stdout().lock())?;
                if plan.groups_found() < total_groups {
                    println!("\n... and {} more", total_groups - plan.groups_found());
                }
            }
        }

        // ── Stats ──────────────────────────────────────────────────────────
        Commands::Stats { top } => {
            let store = CatalogStore::open(&config.database_path())?;
            let stats = store.stats().get_stats(top)?;
            let duplicate_groups = DuplicateLocator::new().find_duplicate_groups(&store.records())?.len();
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "stats": stats, "duplicate_groups": duplicate_groups },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("Catalog statistics:");
                println!("  Total records:     {}", stats.total);
                for entry in &stats.by_type {
                    println!("    {:<8}         {}", entry.kind, entry.count);
                }
                println!("  Needs AI:          {}", stats.needs_ai);
                println!("  Duplicate groups:  {duplicate_groups}");

                println!("\nTop genres:");
                for entry in &stats.top_genres {
                    println!("  {:<24} {}", entry.value.as_deref().unwrap_or("(none)"), entry.count);
                }
                println!("\nTop epochs:");
                for entry in &stats.top_epochs {
                    println!("  {:<24} {}", entry.value.as_deref().unwrap_or("(none)"), entry.count);
                }
            }
        }

        // ── Init ───────────────────────────────────────────────────────────
        Commands::Init => {
            let db_path = config.database_path();
            let store = CatalogStore::create(&db_path)?;
            let count = store.records().count()?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "database": db_path, "records": count },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("Catalog ready: {} ({count} records)", db_path.display());
            }
        }

        // ── Doctor ─────────────────────────────────────────────────────────
        Commands::Doctor => {
            let config_path = cli.config.clone().unwrap_or_else(AppConfig::config_path);
            if config_path.exists() {
                println!("✓ Config: {}", config_path.display());
            } else {
                println!("○ Config: not found (using defaults)");
            }

            let db_path = config.database_path();
            let mut issues = 0;
            match check_database(&db_path) {
                Ok(count) => println!("✓ Database: {} ({count} records)", db_path.display()),
                Err(e) => {
                    issues += 1;
                    println!("✗ Database: {e}");
                }
            }

            for (label, dir) in [("Backups", config.backup_dir()), ("Reports", config.report_dir())] {
                match check_dir(&dir) {
                    DirState::Ready => println!("✓ {label}: {}", dir.display()),
                    DirState::Missing => println!("○ {label}: {} (created on first run)", dir.display()),
                    DirState::NotADirectory => {
                        issues += 1;
                        println!("✗ {label}: {} is not a directory", dir.display());
                    }
                }
            }

            if issues == 0 {
                println!("\nAll checks passed ✓");
            } else {
                println!("\n{issues} issues found");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn error_kind(err: &moodshelf_dedup::DedupError) -> &'static str {
    use moodshelf_dedup::DedupError;
    match err {
        DedupError::BackupFailure { .. } => "backup_failure",
        DedupError::ConnectionFailure(_) => "connection_failure",
        DedupError::QueryFailure(_) => "query_failure",
        DedupError::DeletionFailure(_) => "deletion_failure",
        DedupError::ReportWriteFailure { .. } => "report_write_failure",
    }
}

fn print_run_summary(outcome: &RunOutcome) {
    let stats = &outcome.statistics;
    match outcome.state {
        RunState::Aborted => {
            println!("Deletion cancelled. Catalog unchanged.");
            println!("Backup kept at: {}", outcome.backup_path.display());
        }
        RunState::Done if outcome.plan.is_empty() => {
            println!("No duplicates found. Catalog is clean ({} records).", stats.total_before);
            println!("Backup: {}", outcome.backup_path.display());
        }
        _ => {
            print_plan_totals(&outcome.plan);
            println!("\nDeduplication complete:");
            println!("  Records before:  {}", stats.total_before);
            println!("  Records after:   {}", stats.total_after);
            println!("  Deleted:         {}", stats.records_deleted);
            println!("  Cleaned:         {:.1}%", stats.cleaned_percentage());
            println!("  Backup:          {}", outcome.backup_path.display());
            match &outcome.report_path {
                Some(path) => println!("  Report:          {}", path.display()),
                None => println!("  Report:          not written (see log)"),
            }
        }
    }
}

fn print_plan_totals(plan: &ResolutionPlan) {
    println!(
        "{} groups resolved: {} kept, {} deleted",
        plan.groups_found(),
        plan.records_to_keep(),
        plan.records_to_delete()
    );
}

/// Open the catalog, count it and read every identity, so rows the engine
/// would choke on show up here first.
fn check_database(path: &Path) -> moodshelf_core::Result<usize> {
    let store = CatalogStore::open(path)?;
    let records = store.records();
    let count = records.count()?;
    records.list_identities()?;
    Ok(count)
}

enum DirState {
    Ready,
    Missing,
    NotADirectory,
}

fn check_dir(dir: &Path) -> DirState {
    match std::fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => DirState::Ready,
        Ok(_) => DirState::NotADirectory,
        Err(_) => DirState::Missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodshelf_core::{ContentRecord, ContentType};
    use tempfile::TempDir;

    #[test]
    fn doctor_counts_healthy_catalog() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("content.db");
        let store = CatalogStore::create(&path).unwrap();
        store
            .records()
            .insert_with_id(&ContentRecord::new(1, ContentType::Music, "Song"))
            .unwrap();
        drop(store);

        assert_eq!(check_database(&path).unwrap(), 1);
    }

    #[test]
    fn doctor_reports_unreadable_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("content.db");
        let store = CatalogStore::create(&path).unwrap();
        store
            .connection()
            .execute("INSERT INTO content (type, title) VALUES ('podcast', 'X')", [])
            .unwrap();
        drop(store);

        assert!(check_database(&path).is_err());
    }

    #[test]
    fn doctor_reports_missing_catalog() {
        let dir = TempDir::new().unwrap();
        assert!(check_database(&dir.path().join("absent.db")).is_err());
    }

    #[test]
    fn dir_states() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file");
        std::fs::write(&file, b"x").unwrap();

        assert!(matches!(check_dir(dir.path()), DirState::Ready));
        assert!(matches!(check_dir(&dir.path().join("nope")), DirState::Missing));
        assert!(matches!(check_dir(&file), DirState::NotADirectory));
    }
}
