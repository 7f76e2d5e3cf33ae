//! Progress Reporter - weekly progress reports for scheduled student activities
//!
//! A CLI tool that aggregates activity-progress records into weekly
//! summaries, insights and score trends, per student or compared across
//! a group of students.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, unreadable snapshot, etc.)
//!   2 - Stale data found with --fail-on-stale

mod analysis;
mod cache;
mod cli;
mod clock;
mod config;
mod engine;
mod models;
mod report;
mod source;

use anyhow::{bail, Context, Result};
use cache::TtlReportCache;
use chrono::Duration;
use cli::{Args, OutputFormat, PeriodArg};
use clock::{Clock, SystemClock};
use config::{Config, CONFIG_FILE_NAME};
use engine::{EngineSettings, ReportEngine};
use models::{ComparisonPeriod, DataFreshness, StudentReport};
use source::SnapshotSource;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("progress-reporter v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Report generation failed: {}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .progress-reporter.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the lookback window, cache TTL and report sections.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the reporting workflow. Returns exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    // Load configuration
    let config = load_config(&args)?;

    // Step 1: Load the snapshot
    let data_path = args
        .data
        .clone()
        .context("A snapshot file is required (--data)")?;
    println!("📥 Loading snapshot: {}", data_path.display());
    let source = Arc::new(
        SnapshotSource::load(&data_path)
            .with_context(|| format!("Failed to load snapshot {}", data_path.display()))?,
    );

    let student_ids: Vec<String> = if args.students.is_empty() {
        source.student_ids()
    } else {
        engine::unique_ids(&args.students)
            .into_iter()
            .map(str::to_string)
            .collect()
    };
    if student_ids.is_empty() {
        bail!("No students found in {}", data_path.display());
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Handle --dry-run: count records and exit
    if args.dry_run {
        return handle_dry_run(&source, &student_ids, &config, clock.as_ref());
    }

    // Step 2: Build the engine
    let ttl = i64::try_from(config.engine.cache_ttl_seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .context("engine.cache_ttl_seconds is out of range")?;
    let cache = Arc::new(TtlReportCache::new(ttl, clock.clone()));
    let engine = ReportEngine::new(
        source,
        cache,
        clock,
        EngineSettings::from(&config.engine),
    );

    println!("🔬 Aggregating activity progress...");
    println!("   Students: {}", student_ids.len());
    println!("   Lookback: {} days", config.engine.lookback_days);

    // Step 3: Generate and render
    let (output, stale_count) = if args.compare {
        let period = period_from_arg(args.period);
        let report = engine.generate_comparative_report(&student_ids, period).await;

        println!("\n📊 Comparison Summary:");
        println!("   Period: {}", report.period);
        println!("   Students compared: {}", report.student_count);
        println!(
            "   Group completion rate: {:.1}%",
            report.averages.completion_rate
        );
        if !report.failed_students.is_empty() {
            println!("   Excluded: {}", report.failed_students.join(", "));
        }

        let output = match args.format {
            OutputFormat::Json => report::generate_json_report(&report)?,
            OutputFormat::Markdown => report::generate_comparative_markdown(&report),
        };
        (output, report.failed_students.len())
    } else {
        let reports: Vec<StudentReport> = futures::future::join_all(
            student_ids
                .iter()
                .map(|id| engine.generate_student_report(id)),
        )
        .await;

        print_student_summary(&reports);

        let stale_count = reports
            .iter()
            .filter(|r| r.data_freshness == DataFreshness::Stale)
            .count();
        let output = match args.format {
            OutputFormat::Json => report::generate_json_report(&reports[..])?,
            OutputFormat::Markdown => report::generate_markdown_report(&reports, &config.report),
        };
        (output, stale_count)
    };

    let output_path = PathBuf::from(&config.general.output);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    println!(
        "\n✅ Report saved to: {} ({:.2}s)",
        output_path.display(),
        start_time.elapsed().as_secs_f64()
    );

    if stale_count > 0 {
        warn!("{} student(s) fell back to stale data", stale_count);
        if args.fail_on_stale {
            eprintln!(
                "\n⛔ {} student(s) could not be reported on. Failing (exit code 2).",
                stale_count
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Print a one-line summary per student report.
fn print_student_summary(reports: &[StudentReport]) {
    println!("\n📊 Report Summary:");
    for report in reports {
        let latest = report
            .latest_week()
            .map(|w| format!("{:.0}% completed this week", w.summary.completion_rate))
            .unwrap_or_else(|| "no recent activity".to_string());
        println!(
            "   {} {} ({}): {}, {} points, trend {}",
            report.trend.direction.arrow(),
            report.student_name,
            report.data_freshness,
            latest,
            report.overall.total_points,
            report.trend.direction
        );
    }
}

/// Handle --dry-run: count in-window records per student, exit.
fn handle_dry_run(
    source: &SnapshotSource,
    student_ids: &[String],
    config: &Config,
    clock: &dyn Clock,
) -> Result<i32> {
    let since = Duration::try_days(config.engine.lookback_days)
        .and_then(|window| clock.today().checked_sub_signed(window))
        .context("engine.lookback_days is out of range")?;
    println!("\n🔍 Dry run: records scheduled since {} (no reports built)...\n", since);

    for id in student_ids {
        let count = source.count_records_since(id, since);
        let capped = count.min(config.engine.max_records);
        if capped < count {
            println!(
                "     📄 {}: {} records ({} would be used)",
                id, count, capped
            );
        } else {
            println!("     📄 {}: {} records", id, count);
        }
    }

    println!("\n✅ Dry run complete. No reports were written.");
    Ok(0)
}

/// Convert PeriodArg to ComparisonPeriod.
fn period_from_arg(period: PeriodArg) -> ComparisonPeriod {
    match period {
        PeriodArg::Week => ComparisonPeriod::Week,
        PeriodArg::Month => ComparisonPeriod::Month,
        PeriodArg::Quarter => ComparisonPeriod::Quarter,
    }
}

/// Load configuration from file or defaults, apply CLI overrides and validate.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = read_config(args)?;
    config.merge_with_args(args);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn read_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args_with_config(config: Option<PathBuf>) -> Args {
        Args {
            data: Some(PathBuf::from("snapshot.json")),
            students: vec![],
            compare: false,
            period: PeriodArg::Month,
            output: None,
            config,
            verbose: false,
            quiet: false,
            format: OutputFormat::Markdown,
            lookback_days: None,
            max_records: None,
            dry_run: false,
            fail_on_stale: false,
            init_config: false,
        }
    }

    #[test]
    fn test_load_config_rejects_huge_cache_ttl() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine]\ncache_ttl_seconds = 9223372036854775807").unwrap();

        let err = load_config(&args_with_config(Some(file.path().to_path_buf()))).unwrap_err();
        assert!(format!("{:#}", err).contains("cache_ttl_seconds"));
    }

    #[test]
    fn test_load_config_validates_after_cli_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine]\nlookback_days = 28").unwrap();
        let mut args = args_with_config(Some(file.path().to_path_buf()));

        let config = load_config(&args).unwrap();
        assert_eq!(config.engine.lookback_days, 28);

        args.lookback_days = Some(100_000_000);
        let err = load_config(&args).unwrap_err();
        assert!(format!("{:#}", err).contains("lookback_days"));
    }
}
