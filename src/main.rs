//! codeml-graph CLI Entry Point
//!
//! Builds the codeml job graph and hands it to an engine.
//!
//! # Usage
//!
//! ```bash
//! # Declare jobs with the default layout, write a YAML manifest
//! codeml-graph --genes candidate_genes.csv
//!
//! # Use a configuration file
//! codeml-graph pipeline.yaml
//!
//! # SLURM batch scripts instead of a manifest
//! codeml-graph pipeline.yaml --format slurm --output steps/jobs
//!
//! # Preview the jobs without touching the filesystem
//! codeml-graph --genes genes.tsv --dry-run
//! ```

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use colored::Colorize;
use log::{error, info};

use codeml_graph::config::{load_config, PipelineConfig};
use codeml_graph::engine::{submit, JobSink, ManifestFormat, ManifestSink, ScriptSink};
use codeml_graph::genes::load_gene_set;
use codeml_graph::workflow::{validate_graph, GraphBuilder, JobGraph};
use codeml_graph::{APP_NAME, VERSION};

/// Default output format.
const DEFAULT_FORMAT: &str = "yaml";

/// Default directory for SLURM batch scripts.
const DEFAULT_SCRIPT_DIR: &str = "steps/jobs";

/// Command-line options parsed from arguments.
#[derive(Debug)]
struct CliOptions {
    config_path: Option<PathBuf>,
    genes_path: Option<PathBuf>,
    format: String,
    output: Option<PathBuf>,
    dry_run: bool,
    working_dir: Option<PathBuf>,
    verbose: bool,
}

impl Default for CliOptions {
    fn default() -> Self {
        Self {
            config_path: None,
            genes_path: None,
            format: DEFAULT_FORMAT.to_string(),
            output: None,
            dry_run: false,
            working_dir: None,
            verbose: false,
        }
    }
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME.bold(), VERSION);
    println!("codeml job graph generator");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: codeml-graph [OPTIONS] [CONFIG_FILE]");
    println!();
    println!("Arguments:");
    println!("  [CONFIG_FILE]       Pipeline configuration (YAML); defaults apply if omitted");
    println!();
    println!("Options:");
    println!("  --genes PATH        Gene allowlist (CSV, TSV or one name per line)");
    println!("  --format FORMAT     yaml, json or slurm (default: {})", DEFAULT_FORMAT);
    println!("  --output PATH       Manifest file or script directory");
    println!("  --dry-run           Print the jobs without creating any files");
    println!("  --working-dir PATH  Resolve relative paths from this directory");
    println!("  --verbose           Enable debug logging");
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
    println!();
    println!("Examples:");
    println!("  codeml-graph --genes candidate_genes.csv");
    println!("  codeml-graph pipeline.yaml --format slurm --output steps/jobs");
    println!("  codeml-graph --genes genes.tsv --dry-run");
}

/// Parses command-line arguments into CliOptions.
fn parse_arguments(args: &[String]) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut positional_index = 0;
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--dry-run" => {
                options.dry_run = true;
            }
            "--verbose" | "-v" => {
                options.verbose = true;
            }
            "--genes" | "--format" | "--output" | "--working-dir" => {
                i += 1;
                let value = args
                    .get(i)
                    .ok_or_else(|| format!("{} requires an argument", arg))?;
                match arg.as_str() {
                    "--genes" => options.genes_path = Some(PathBuf::from(value)),
                    "--format" => options.format = value.to_ascii_lowercase(),
                    "--output" => options.output = Some(PathBuf::from(value)),
                    _ => options.working_dir = Some(PathBuf::from(value)),
                }
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                match positional_index {
                    0 => options.config_path = Some(PathBuf::from(arg)),
                    _ => return Err(format!("Unexpected argument: {}", arg)),
                }
                positional_index += 1;
            }
        }
        i += 1;
    }

    if !matches!(options.format.as_str(), "yaml" | "yml" | "json" | "slurm") {
        return Err(format!("Unknown format: {}", options.format));
    }

    Ok(options)
}

/// Validates and switches to the working directory.
fn setup_working_directory(working_dir: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(dir) = working_dir else {
        info!("Working directory: {}", env::current_dir()?.display());
        return Ok(());
    };

    if !dir.is_dir() {
        return Err(format!("Working directory does not exist: {}", dir.display()).into());
    }

    env::set_current_dir(&dir)?;
    info!("Working directory: {}", env::current_dir()?.display());
    Ok(())
}

/// Creates the sink selected by `--format`.
fn create_sink(options: &CliOptions) -> Result<Box<dyn JobSink>, Box<dyn std::error::Error>> {
    if options.format == "slurm" {
        let dir = options
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCRIPT_DIR));
        return Ok(Box::new(ScriptSink::new(dir)));
    }

    let format: ManifestFormat = options.format.parse()?;
    let default_name = match format {
        ManifestFormat::Yaml => "jobs.yaml",
        ManifestFormat::Json => "jobs.json",
    };
    let path = options
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(default_name));
    Ok(Box::new(ManifestSink::new(path, format)))
}

/// Prints the jobs in dependency order.
fn print_plan(graph: &JobGraph) -> Result<(), Box<dyn std::error::Error>> {
    let order = validate_graph(graph)?;

    println!();
    for name in &order {
        let Some(job) = graph.get_job(name) else { continue };
        println!(
            "{} [{}] cores={} walltime={} memory={}",
            job.name.cyan().bold(),
            job.kind,
            job.resources.cores,
            job.resources.walltime,
            job.resources.memory
        );
        if !job.previous.is_empty() {
            println!("  after:   {}", job.previous.join(", "));
        }
        println!("  inputs:  {}", job.inputs.join(" "));
        println!("  outputs: {}", job.outputs.join(" "));
        for line in job.command.lines() {
            println!("  $ {}", line);
        }
    }
    println!();
    Ok(())
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let options = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    setup_logging(options.verbose);
    print_banner();

    if options.dry_run {
        info!("Mode: DRY RUN (no directories or files will be created)");
    }

    setup_working_directory(options.working_dir.clone())?;

    let config = match &options.config_path {
        Some(path) => load_config(path)?,
        None => {
            let config = PipelineConfig::default();
            config.validate()?;
            config
        }
    };

    let genes_path = options
        .genes_path
        .clone()
        .or_else(|| config.genes.clone())
        .ok_or("No gene allowlist given (use --genes or set 'genes' in the configuration)")?;

    let genes = load_gene_set(&genes_path, &config.gene_column).map_err(|e| {
        error!("Failed to load gene allowlist: {}", e);
        e
    })?;

    let graph = GraphBuilder::new(&config)
        .dry_run(options.dry_run)
        .build(&genes)?;

    if options.dry_run {
        print_plan(&graph)?;
        println!(
            "{} {} jobs for {} genes (dry run)",
            "Planned".green().bold(),
            graph.len(),
            graph.analysis_jobs().len()
        );
        return Ok(());
    }

    let mut sink = create_sink(&options)?;
    let registered = submit(&graph, sink.as_mut())?;

    println!();
    println!(
        "{} {} jobs for {} genes",
        "Declared".green().bold(),
        registered,
        graph.analysis_jobs().len()
    );
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("codeml-graph")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_defaults() {
        let options = parse_arguments(&args(&[])).unwrap();
        assert!(options.config_path.is_none());
        assert_eq!(options.format, "yaml");
        assert!(!options.dry_run);
    }

    #[test]
    fn test_parse_all_options() {
        let options = parse_arguments(&args(&[
            "pipeline.yaml",
            "--genes",
            "genes.tsv",
            "--format",
            "SLURM",
            "--output",
            "jobs",
            "--dry-run",
            "--working-dir",
            "/data",
            "-v",
        ]))
        .unwrap();

        assert_eq!(options.config_path, Some(PathBuf::from("pipeline.yaml")));
        assert_eq!(options.genes_path, Some(PathBuf::from("genes.tsv")));
        assert_eq!(options.format, "slurm");
        assert_eq!(options.output, Some(PathBuf::from("jobs")));
        assert_eq!(options.working_dir, Some(PathBuf::from("/data")));
        assert!(options.dry_run);
        assert!(options.verbose);
    }

    #[test]
    fn test_parse_missing_value() {
        let err = parse_arguments(&args(&["--genes"])).unwrap_err();
        assert!(err.contains("--genes requires an argument"));
    }

    #[test]
    fn test_parse_unknown_option_and_format() {
        assert!(parse_arguments(&args(&["--parallel"])).is_err());
        assert!(parse_arguments(&args(&["--format", "xml"])).is_err());
    }

    #[test]
    fn test_parse_extra_positional() {
        let err = parse_arguments(&args(&["a.yaml", "b.yaml"])).unwrap_err();
        assert!(err.contains("Unexpected argument"));
    }

    #[test]
    fn test_create_sink_defaults() {
        let options = CliOptions {
            format: "json".to_string(),
            ..CliOptions::default()
        };
        assert!(create_sink(&options).is_ok());

        let options = CliOptions {
            format: "slurm".to_string(),
            ..CliOptions::default()
        };
        assert!(create_sink(&options).is_ok());
    }
}
