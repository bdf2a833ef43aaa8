//! is-my-code-great: test smell analyzer CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use globset::GlobSet;
use imcg::config::{
    build_ignore_set, is_ignored, load_config, Config, CONFIG_FILENAME, DEFAULT_MAX_PARAMETERS,
};
use imcg::reporter::{ConsoleReporter, JsonReporter, SarifReporter};
use imcg::{AnalysisEngine, CancellationToken, ProfileRegistry, Severity};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Directories never descended into during discovery
const SKIPPED_DIRS: &[&str] = &["node_modules", ".git", "bin", "obj", ".dart_tool", "build"];

/// is-my-code-great: test smell analyzer for C#, TypeScript/JavaScript, Dart and Java
#[derive(Parser, Debug)]
#[command(name = "is-my-code-great")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Test files or directories to analyze (omit when using a subcommand)
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Output as one JSON document
    #[arg(long, short, conflicts_with_all = ["jsonl", "sarif"])]
    json: bool,

    /// Output one JSON record per finding per line
    #[arg(long, conflicts_with = "sarif")]
    jsonl: bool,

    /// Output in SARIF format (for GitHub Code Scanning)
    #[arg(long)]
    sarif: bool,

    /// Path to config file (default: search .imcgrc.json in current dir and parents)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Parameter threshold for too-many-arguments
    #[arg(long, value_name = "N")]
    max_parameters: Option<usize>,

    /// Comma-separated rule ids to run (default: all)
    #[arg(long, value_delimiter = ',', value_name = "RULES")]
    rules: Option<Vec<String>>,

    /// Lowest severity that fails the run: error, warning, info
    #[arg(long, value_parser = parse_severity, value_name = "SEVERITY")]
    fail_on: Option<Severity>,

    /// Number of parallel threads (default: number of CPU cores)
    #[arg(long, value_name = "N")]
    jobs: Option<usize>,

    /// Quiet mode (one line per finding)
    #[arg(long, short)]
    quiet: bool,

    /// Verbose output (suggestions, all notes, debug logging)
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create .imcgrc.json with sensible defaults
    Init {
        /// Directory in which to create config (default: current)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Parameter threshold written to the config
        #[arg(long, value_name = "N")]
        max_parameters: Option<usize>,
    },
}

fn parse_severity(value: &str) -> Result<Severity, String> {
    match value.to_ascii_lowercase().as_str() {
        "error" => Ok(Severity::Error),
        "warning" => Ok(Severity::Warning),
        "info" => Ok(Severity::Info),
        other => Err(format!("unknown severity '{other}' (expected error, warning or info)")),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "imcg=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("IMCG_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Some(Commands::Init {
        dir,
        max_parameters,
    }) = args.command
    {
        return run_init(dir.as_deref(), max_parameters);
    }

    // Resolve work directory for config search
    let first = args.paths.first().cloned().unwrap_or_else(|| PathBuf::from("."));
    let work_dir = if first.is_file() {
        first.parent().map(Path::to_path_buf).unwrap_or_default()
    } else {
        first.clone()
    };
    let work_dir = if work_dir.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        work_dir
    };

    // Load and validate config before touching any input file (CLI flags win)
    let config = load_config(&work_dir, args.config.as_deref())?.merge_with_cli(
        args.max_parameters,
        args.rules.clone(),
        args.fail_on,
    );
    let engine = AnalysisEngine::from_config(&config).context("Invalid configuration")?;
    let ignore_set = if config.ignore.is_empty() {
        None
    } else {
        Some(build_ignore_set(&config.ignore)?)
    };

    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .ok();
    }

    let files = collect_files(&args.paths, ignore_set.as_ref(), engine.registry())?;
    if files.is_empty() {
        eprintln!("{}: No supported test files found", "Warning".yellow());
        return Ok(ExitCode::from(2));
    }
    tracing::debug!(files = files.len(), "discovered input files");

    let report = engine.analyze_paths(&files, &CancellationToken::new());

    if args.sarif {
        println!("{}", SarifReporter::new().report(&report));
    } else if args.jsonl {
        print!("{}", JsonReporter::new().report_lines(&report));
    } else if args.json {
        println!("{}", JsonReporter::new().pretty().report(&report));
    } else if args.quiet {
        ConsoleReporter::new().report_quiet(&report);
    } else {
        let mut reporter = ConsoleReporter::new();
        if args.verbose {
            reporter = reporter.verbose();
        }
        reporter.report(&report);
    }

    // Machine-readable formats carry skipped files in their payload or not at all
    if args.sarif || args.jsonl || args.quiet {
        for warning in &report.warnings {
            eprintln!("{}: {}", "Warning".yellow(), warning.message);
        }
    }

    if report.files_analyzed == 0 {
        return Ok(ExitCode::from(2));
    }
    if report.has_failures() {
        if !args.quiet && !args.json && !args.jsonl && !args.sarif {
            eprintln!(
                "\n{}: findings at or above {}",
                "Failed".red().bold(),
                report.fail_on
            );
        }
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

fn run_init(dir: Option<&Path>, max_parameters: Option<usize>) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let dir = dir.unwrap_or(&cwd);
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() {
        eprintln!(
            "{}: {} already exists; use --dir to write elsewhere or remove it first",
            "Warning".yellow(),
            config_path.display()
        );
        return Ok(ExitCode::SUCCESS);
    }

    let max_parameters = max_parameters.unwrap_or(DEFAULT_MAX_PARAMETERS);
    if max_parameters == 0 {
        anyhow::bail!("--max-parameters must be at least 1");
    }
    let json = serde_json::to_string_pretty(&Config::starter(max_parameters))
        .context("Failed to serialize config")?;

    std::fs::write(&config_path, json + "\n")
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    println!(
        "{}: Created {} with maxParameters={}",
        "Done".green().bold(),
        config_path.display(),
        max_parameters
    );
    Ok(ExitCode::SUCCESS)
}

/// Expand the CLI paths into supported source files. Explicit files are kept
/// even when unsupported so the engine can report them as warnings.
fn collect_files(
    paths: &[PathBuf],
    ignore_set: Option<&GlobSet>,
    registry: &ProfileRegistry,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            if ignore_set.is_some_and(|set| is_ignored(path, set)) {
                continue;
            }
            files.push(path.clone());
            continue;
        }

        if !path.is_dir() {
            anyhow::bail!("Path does not exist: {}", path.display());
        }

        let walker = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e.path()));
        for entry in walker.filter_map(|e| e.ok()) {
            let file_path = entry.path();
            if !entry.file_type().is_file() || registry.for_path(file_path).is_none() {
                continue;
            }
            if ignore_set.is_some_and(|set| is_ignored(file_path, set)) {
                continue;
            }
            files.push(file_path.to_path_buf());
        }
    }

    // Sort for consistent output
    files.sort();
    files.dedup();

    Ok(files)
}

fn is_skipped_dir(path: &Path) -> bool {
    path.is_dir()
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}
