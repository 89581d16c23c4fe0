//! schemapress CLI - compile a MySQL schema into a WordPress plugin installer.

use clap::{Parser, Subcommand};
use schemapress::{manifest, Config, Orchestrator, PressError};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "schemapress")]
#[command(about = "Compile a MySQL schema into a prefix-agnostic WordPress plugin installer")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Introspect the source database into a manifest file
    Manifest {
        /// Manifest file to write
        #[arg(short, long, default_value = "manifest.json")]
        output: PathBuf,

        /// Override the table prefix
        #[arg(long)]
        prefix: Option<String>,

        /// Capture seed rows
        #[arg(long)]
        include_seed_data: bool,

        /// Seed rows per table (0 captures every row)
        #[arg(long)]
        row_limit: Option<i64>,
    },

    /// Compile a manifest into installer files
    Installer {
        /// Manifest file to compile
        manifest: PathBuf,

        /// Override the installer class name
        #[arg(long)]
        class: Option<String>,

        /// Directory to write the generated files to
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Check a manifest without compiling it
    Validate {
        /// Manifest file to check
        manifest: PathBuf,

        /// Installer class name to check instead of the manifest's
        #[arg(long)]
        class: Option<String>,
    },

    /// Answer one JSON request read from stdin
    Request,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), PressError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let mut config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => Config::default(),
    };

    match cli.command {
        Commands::Manifest {
            output,
            prefix,
            include_seed_data,
            row_limit,
        } => {
            // Apply overrides
            if let Some(prefix) = prefix {
                config.introspection.prefix = prefix;
            }
            if include_seed_data {
                config.introspection.include_seed_data = true;
            }
            if let Some(limit) = row_limit {
                config.introspection.default_row_limit = limit;
            }
            config.validate()?;

            let cancel_token = setup_signal_handler();
            let orchestrator = Orchestrator::new(config).with_cancellation(cancel_token);
            let snapshot = orchestrator.introspect().await?;
            manifest::save(&snapshot, &output)?;

            if cli.output_json {
                println!("{}", manifest::to_json(&snapshot)?);
            } else {
                println!("Manifest written to {}", output.display());
                println!("  Database: {}", snapshot.database);
                println!("  Tables: {}", snapshot.tables.len());
                println!("  Views: {}", snapshot.views.len());
                println!("  Procedures: {}", snapshot.stored_procedures.len());
                println!("  Triggers: {}", snapshot.triggers.len());
            }
        }

        Commands::Installer {
            manifest: path,
            class,
            output_dir,
        } => {
            let snapshot = manifest::load(&path)?;
            let orchestrator = Orchestrator::new(config);
            let dir = output_dir.unwrap_or_else(|| orchestrator.output_dir().to_path_buf());
            let (compiled, written) = orchestrator.compile_to(&snapshot, class.as_deref(), &dir)?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&compiled.report)?);
            } else {
                let report = &compiled.report;
                println!("Installer {} generated:", report.class_name);
                for file in &written {
                    println!("  {}", file.display());
                }
                println!("  Tables: {}", report.tables.len());
                for excluded in &report.excluded_tables {
                    println!("    skipped {} ({:?})", excluded.name, excluded.reason);
                }
                println!("  Views: {}", report.views.len());
                println!("  Procedures: {}", report.stored_procedures.len());
                println!("  Triggers: {}", report.triggers.len());
                println!("  Seed rows: {}", report.seed_rows);
            }
        }

        Commands::Validate {
            manifest: path,
            class,
        } => {
            let snapshot = manifest::load(&path)?;
            let report = Orchestrator::new(config).validate(&snapshot, class.as_deref());

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for warning in &report.warnings {
                    println!("  warning: {}", warning);
                }
                for error in &report.errors {
                    println!("  error: {}", error);
                }
            }

            if !report.is_valid() {
                return Err(PressError::invalid_manifest(report.errors.join("; ")));
            }
            if !cli.output_json {
                println!("Manifest is valid");
            }
        }

        Commands::Request => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;

            let cancel_token = setup_signal_handler();
            let orchestrator = Orchestrator::new(config).with_cancellation(cancel_token);
            let response = schemapress::orchestrator::handle(&orchestrator, &text).await;
            println!("{}", serde_json::to_string(&response)?);
        }
    }

    Ok(())
}

/// Logs go to stderr; stdout carries command output.
fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Cancel introspection on SIGINT (Ctrl-C) or SIGTERM.
#[cfg(unix)]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    let token_int = cancel_token.clone();
    let token_term = cancel_token.clone();

    // SIGINT handler (Ctrl-C)
    tokio::spawn(async move {
        match signal(SignalKind::interrupt()) {
            Ok(mut sigint) => {
                sigint.recv().await;
                eprintln!("\nReceived SIGINT. Stopping introspection...");
                token_int.cancel();
            }
            Err(e) => warn!("Could not install SIGINT handler: {}", e),
        }
    });

    // SIGTERM handler
    tokio::spawn(async move {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                eprintln!("\nReceived SIGTERM. Stopping introspection...");
                token_term.cancel();
            }
            Err(e) => warn!("Could not install SIGTERM handler: {}", e),
        }
    });

    cancel_token
}

/// Cancel introspection on Ctrl-C.
#[cfg(not(unix))]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Stopping introspection...");
            token.cancel();
        }
    });

    cancel_token
}
