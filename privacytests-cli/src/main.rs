//! PrivacyTests CLI - renders browser privacy test results as an HTML report

#![deny(warnings)]

// Global invariants enforced:
// - One results document per invocation
// - Any read or write failure aborts the run with a non-zero exit

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use privacytests_core::config::{self, ResolvedConfig};
use privacytests_core::report::{self, ReportPaths};
use privacytests_core::{render, RenderOptions, ResultsDocument};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "privacytests")]
#[command(about = "Render browser privacy test results as an HTML comparison table")]
#[command(version = env!("PRIVACYTESTS_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a results JSON file to HTML
    Render {
        /// Results JSON file (default: latest file in the results directory)
        data_file: Option<PathBuf>,

        /// Do not open the report in a viewer when done
        #[arg(long)]
        live: bool,

        /// Fold repeated trials of one configuration together
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        aggregate: bool,

        /// Directory holding results files and latest.html (overrides config file)
        #[arg(long)]
        results_dir: Option<PathBuf>,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate a configuration file
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without rendering
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            data_file,
            live,
            aggregate,
            results_dir,
            config: config_path,
        } => {
            let project_root = std::env::current_dir()?;
            let mut resolved_config = config::load_and_resolve(&project_root, config_path.as_deref())
                .context("failed to load configuration")?;
            if let Some(config_path) = &resolved_config.config_path {
                info!("Using config: {}", config_path.display());
            }
            // CLI flags override config file values
            if let Some(dir) = results_dir {
                resolved_config.results_dir = dir;
            }

            let paths = render_command(data_file, aggregate, &resolved_config)?;
            if !live {
                open_in_viewer(&paths.per_run);
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref());

                match resolved {
                    Ok(config) => {
                        if let Some(ref p) = config.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref())
                    .context("failed to load configuration")?;
                print_config(&resolved);
            }
        },
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` overrides the default `info` level
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Read one results file, render it, and write both report copies
fn render_command(
    data_file: Option<PathBuf>,
    aggregate: bool,
    config: &ResolvedConfig,
) -> anyhow::Result<ReportPaths> {
    let input = match data_file {
        Some(path) => path,
        None => report::latest_results_file(&config.results_dir)?,
    };
    info!("Reading from raw results file: {}", input.display());

    let document = ResultsDocument::from_path(&input)?;
    let json_filename = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let html = render(
        &document,
        &json_filename,
        config,
        &RenderOptions { aggregate },
    )?;

    // latest.html is replaced only once the per-run copy is on disk
    let paths = report::output_paths(&input, &config.results_dir);
    report::write_report(&paths.per_run, &html)?;
    info!("Wrote out {}", file_url(&paths.per_run));
    report::write_report(&paths.latest, &html)?;
    info!("Wrote out {}", file_url(&paths.latest));

    Ok(paths)
}

fn file_url(path: &Path) -> String {
    let absolute = path
        .canonicalize()
        .or_else(|_| std::env::current_dir().map(|cwd| cwd.join(path)))
        .unwrap_or_else(|_| path.to_path_buf());
    match Url::from_file_path(&absolute) {
        Ok(url) => url.to_string(),
        Err(()) => absolute.display().to_string(),
    }
}

/// Open a report with the platform's default viewer; failures only warn
fn open_in_viewer(path: &Path) {
    let url = file_url(path);
    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    } else {
        Command::new("xdg-open")
    };

    match command.arg(&url).status() {
        Ok(status) if status.success() => {}
        Ok(status) => warn!("viewer exited with {} for {}", status, url),
        Err(e) => warn!("failed to open {}: {}", url, e),
    }
}

fn print_config(resolved: &ResolvedConfig) {
    println!("Configuration:");
    if let Some(ref p) = resolved.config_path {
        println!("  Source: {}", p.display());
    } else {
        println!("  Source: defaults (no config file found)");
    }
    println!();
    println!("Page:");
    println!("  title: {}", resolved.title);
    println!("  table_title: {}", resolved.table_title);
    println!("  css_files: {}", resolved.css_files.join(", "));
    println!("  preview_image_url: {}", resolved.preview_image_url);
    println!();
    println!("Sources:");
    println!("  repository_url: {}", resolved.repository_url);
    println!("  results_dir: {}", resolved.results_dir.display());
    println!(
        "  logo_base_url: {}",
        resolved.logo_base_url.as_deref().unwrap_or("none")
    );
}
