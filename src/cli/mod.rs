//! Command-line interface for repeatability testing.

pub mod prompt;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::core::angle::{parser_from_config, AngleParser};
use crate::core::loaders::{self, RawTable};
use crate::core::schema::{ColumnMapping, SchemaLibrary, SchemaStore};
use crate::core::writers;
use crate::processors::repeatability::{AeroRepeatability, Probe, ProbePair, RepeatabilityReport};
use crate::processors::resolver::{self, SchemaResolver};
use crate::processors::Verdict;
use crate::visualization::BitmapPlotter;
use crate::PipelineConfig;

use prompt::TerminalPrompter;

/// Exit status for a fatal error or a channel that could not be processed.
pub const EXIT_CHANNEL_ERROR: i32 = 1;

/// Exit status when every channel ran but at least one failed its band.
pub const EXIT_FAIL_VERDICT: i32 = 2;

#[derive(Parser)]
#[command(name = "aero-repeatability")]
#[command(about = "Pressure probe repeatability testing against a golden probe", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a unit under test against a golden probe
    Compare {
        /// Golden probe log
        golden: PathBuf,
        /// Unit under test log
        uut: PathBuf,
        /// Stored schema name (skips the interactive prompts)
        #[arg(short, long)]
        schema: Option<String>,
        /// Directory for reports and plots
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Origin bound for the total pressure channel
        #[arg(long)]
        total_bound: Option<f64>,
        /// Origin bound for both static pressure channels
        #[arg(long)]
        static_bound: Option<f64>,
        /// Write CSV reports only
        #[arg(long)]
        no_plots: bool,
    },

    /// Reduce one probe log and write its per-angle profile
    Reduce {
        /// Probe log
        file: PathBuf,
        /// Stored schema name (skips the interactive prompts)
        #[arg(short, long)]
        schema: Option<String>,
        /// Output CSV path (defaults to <file name>-reduced.csv in the output directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the column mappings in the schema library
    Schemas,
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<60} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 39 {
            format!("{}...", value.chars().take(36).collect::<String>())
        } else {
            value.clone()
        };
        println!("║ {:<18}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!("Failed to load config from {}: {}, using defaults", path.display(), e);
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };

    // Dispatch to subcommands
    let outcome = match cli.command {
        Commands::Compare {
            golden,
            uut,
            schema,
            output_dir,
            total_bound,
            static_bound,
            no_plots,
        } => {
            let mut config = config;
            if let Some(dir) = output_dir {
                config.output.directory = dir;
            }
            if let Some(bound) = total_bound {
                config.tolerance.total_pressure_bound = bound;
            }
            if let Some(bound) = static_bound {
                config.tolerance.static_pressure_bound = bound;
            }
            if no_plots {
                config.output.render_plots = false;
            }
            cmd_compare(&golden, &uut, schema.as_deref(), &config)
        }
        Commands::Reduce { file, schema, output } => {
            cmd_reduce(&file, schema.as_deref(), output, &config).map(|()| 0)
        }
        Commands::Schemas => cmd_schemas(&config).map(|()| 0),
    };

    match outcome {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(EXIT_CHANNEL_ERROR);
        }
    }
}

fn open_library(config: &PipelineConfig) -> Result<SchemaLibrary> {
    let path = &config.schema.library_path;
    SchemaLibrary::open(path)
        .with_context(|| format!("Failed to open schema library {}", path.display()))
}

/// A named schema is looked up directly; otherwise the operator is asked.
fn resolve_mapping(
    library: &mut SchemaLibrary,
    table: &RawTable,
    schema: Option<&str>,
) -> Result<ColumnMapping> {
    let mapping = match schema {
        Some(name) => resolver::resolve_named(&*library, table, name)?,
        None => {
            let mut prompter = TerminalPrompter::stdio();
            SchemaResolver::new(library, &mut prompter).resolve(table, None)?
        }
    };
    Ok(mapping)
}

fn load_table(path: &Path) -> Result<RawTable> {
    loaders::load_raw_table(path)
        .with_context(|| format!("Failed to load {}", path.display()))
}

fn cmd_compare(
    golden_path: &Path,
    uut_path: &Path,
    schema: Option<&str>,
    config: &PipelineConfig,
) -> Result<i32> {
    let start = Instant::now();

    println!("Golden: {}", golden_path.display());
    println!("UUT: {}", uut_path.display());

    let parser =
        parser_from_config(&config.angle).context("Invalid angle configuration")?;
    let mut library = open_library(config)?;

    let pair = load_pair(golden_path, uut_path, parser.as_ref(), |table| {
        resolve_mapping(&mut library, table, schema)
    })?;

    let spinner = create_spinner("Comparing channels...");

    let plotter = BitmapPlotter {
        width: config.output.plot_width,
        height: config.output.plot_height,
    };
    let mut runner = AeroRepeatability::new(config.tolerance.clone(), &config.output.directory);
    if config.output.render_plots {
        runner = runner.with_plotter(&plotter);
    }
    let report = runner.run(&pair);

    spinner.finish_and_clear();

    let mut items = Vec::new();
    for (channel, outcome) in &report.channels {
        let line = match outcome {
            Ok(o) => {
                let failures = o.result.failures();
                if failures.is_empty() {
                    o.verdict().to_string()
                } else {
                    format!("{} at {:?}", o.verdict(), failures)
                }
            }
            Err(e) => {
                error!("{}: {}", channel.title(), e);
                "ERROR".to_string()
            }
        };
        items.push((channel.title(), line));
    }
    items.push(("Output directory", config.output.directory.display().to_string()));
    items.push(("Duration", format!("{:.2?}", start.elapsed())));

    print_summary("Repeatability Comparison Complete", &items);

    Ok(exit_code(&report))
}

/// Both logs are read before `resolve` runs on the golden table.
fn load_pair<F>(
    golden_path: &Path,
    uut_path: &Path,
    parser: &dyn AngleParser,
    resolve: F,
) -> Result<ProbePair>
where
    F: FnOnce(&RawTable) -> Result<ColumnMapping>,
{
    let golden_table = load_table(golden_path)?;
    let uut_table = load_table(uut_path)?;

    let mapping = resolve(&golden_table)
        .with_context(|| format!("Failed to resolve columns of {}", golden_path.display()))?;

    let golden = Probe::from_table(golden_path, &golden_table, &mapping, parser)
        .with_context(|| format!("Failed to reduce {}", golden_path.display()))?;
    ProbePair::with_golden_table(golden, uut_path, &uut_table, parser)
        .with_context(|| format!("Failed to reduce {}", uut_path.display()))
}

fn exit_code(report: &RepeatabilityReport) -> i32 {
    if report.has_errors() {
        EXIT_CHANNEL_ERROR
    } else if report.verdict() == Verdict::Fail {
        EXIT_FAIL_VERDICT
    } else {
        0
    }
}

fn cmd_reduce(
    file: &Path,
    schema: Option<&str>,
    output: Option<PathBuf>,
    config: &PipelineConfig,
) -> Result<()> {
    let start = Instant::now();

    let output_path = output.unwrap_or_else(|| {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "probe".to_string());
        config.output.directory.join(format!("{}-reduced.csv", name))
    });

    println!("Input: {}", file.display());
    println!("Output: {}", output_path.display());

    let parser =
        parser_from_config(&config.angle).context("Invalid angle configuration")?;
    let mut library = open_library(config)?;

    let table = load_table(file)?;
    let mapping = resolve_mapping(&mut library, &table, schema)
        .with_context(|| format!("Failed to resolve columns of {}", file.display()))?;

    let spinner = create_spinner("Reducing probe data...");

    let probe = Probe::from_table(file, &table, &mapping, parser.as_ref())
        .with_context(|| format!("Failed to reduce {}", file.display()));
    let written = probe.and_then(|probe| {
        writers::write_reduced_profile(&output_path, probe.profile())
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
        Ok(probe)
    });

    spinner.finish_and_clear();
    let probe = written?;

    let offsets = probe.profile().offsets();
    print_summary(
        "Reduction Complete",
        &[
            ("Input file", file.display().to_string()),
            ("Output CSV", output_path.display().to_string()),
            ("Rows", table.len().to_string()),
            ("Angle groups", probe.profile().len().to_string()),
            ("Offset total", format!("{:.6}", offsets.total)),
            ("Offset static 1", format!("{:.6}", offsets.static1)),
            ("Offset static 2", format!("{:.6}", offsets.static2)),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );

    Ok(())
}

fn cmd_schemas(config: &PipelineConfig) -> Result<()> {
    let library = open_library(config)?;
    let path = config.schema.library_path.display();

    if library.is_empty() {
        println!("No schemas in {}", path);
        return Ok(());
    }

    println!("Schemas in {}:", path);
    for name in library.names() {
        println!("  {}", name);
        if let Some(mapping) = library.lookup(&name) {
            for (column, field) in mapping.iter() {
                println!("    {:>3}  {}", column, field);
            }
        }
    }

    Ok(())
}
