//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// Progress Reporter - weekly progress reports for scheduled student activities
///
/// Aggregates activity-progress records into weekly summaries, insights
/// and score trends, per student or compared across a group.
///
/// Examples:
///   progress-reporter --data snapshot.json
///   progress-reporter --data snapshot.json --student s1,s2 --format json
///   progress-reporter --data snapshot.json --compare --period quarter
///   progress-reporter --data snapshot.json --dry-run
///   progress-reporter --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// JSON snapshot with `students` and `activityProgress` documents
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "PROGRESS_DATA",
        required_unless_present = "init_config"
    )]
    pub data: Option<PathBuf>,

    /// Student ids to report on (comma-separated, repeatable)
    ///
    /// Defaults to every student in the snapshot.
    #[arg(short = 's', long = "student", value_name = "IDS", value_delimiter = ',')]
    pub students: Vec<String>,

    /// Produce a comparative report across the selected students
    #[arg(long)]
    pub compare: bool,

    /// Window used by --compare (week, month, quarter)
    #[arg(long, default_value = "month", value_name = "PERIOD")]
    pub period: PeriodArg,

    /// Output file path for the report
    ///
    /// Default: from config or progress_report.md
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .progress-reporter.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Days of activity history to include
    #[arg(long, value_name = "DAYS")]
    pub lookback_days: Option<i64>,

    /// Maximum activity records fetched per student
    #[arg(long, value_name = "COUNT")]
    pub max_records: Option<usize>,

    /// Dry run: count in-window records per student without building reports
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with code 2 when any report had to fall back to stale data
    #[arg(long)]
    pub fail_on_stale: bool,

    /// Generate a default .progress-reporter.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Comparison window for --period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PeriodArg {
    Week,
    Month,
    Quarter,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        match self.data {
            Some(ref path) if !path.is_file() => {
                return Err(format!("Snapshot file does not exist: {}", path.display()));
            }
            None => return Err("A snapshot file is required (--data)".to_string()),
            _ => {}
        }

        if self.students.iter().any(|id| id.trim().is_empty()) {
            return Err("Student ids must not be empty".to_string());
        }

        if let Some(days) = self.lookback_days {
            if days < 1 {
                return Err("Lookback must be at least 1 day".to_string());
            }
        }

        if self.max_records == Some(0) {
            return Err("Max records must be at least 1".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.dry_run && self.compare {
            return Err("Cannot use both --dry-run and --compare".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn make_args(data: PathBuf) -> Args {
        Args {
            data: Some(data),
            students: vec!["s1".to_string()],
            compare: false,
            period: PeriodArg::Month,
            output: None,
            config: None,
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

    fn snapshot_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{}}").unwrap();
        file
    }

    #[test]
    fn test_parse_student_list() {
        let args = Args::try_parse_from([
            "progress-reporter",
            "--data",
            "snapshot.json",
            "-s",
            "s1,s2",
            "--student",
            "s3",
            "--compare",
            "--period",
            "quarter",
        ])
        .unwrap();

        assert_eq!(args.students, vec!["s1", "s2", "s3"]);
        assert!(args.compare);
        assert_eq!(args.period, PeriodArg::Quarter);
        assert_eq!(args.format, OutputFormat::Markdown);
    }

    #[test]
    fn test_validation_accepts_existing_snapshot() {
        let file = snapshot_file();
        assert!(make_args(file.path().to_path_buf()).validate().is_ok());
    }

    #[test]
    fn test_validation_missing_snapshot() {
        let args = make_args(PathBuf::from("/nonexistent/snapshot.json"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let file = snapshot_file();
        let mut args = make_args(file.path().to_path_buf());
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());

        let mut args = make_args(file.path().to_path_buf());
        args.dry_run = true;
        args.compare = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_limits() {
        let file = snapshot_file();
        let mut args = make_args(file.path().to_path_buf());
        args.lookback_days = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args(file.path().to_path_buf());
        args.max_records = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let file = snapshot_file();
        let mut args = make_args(file.path().to_path_buf());
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
