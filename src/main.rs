use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::Layer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use voxarch::app::{RunChoices, build_orchestrator, build_request, model_store, model_statuses};
use voxarch::cancel::CancellationToken;
use voxarch::cli::{Cli, Commands, ConfigAction};
use voxarch::config::Config;
use voxarch::output::{ProgressRenderer, print_outcome};
use voxarch::pipeline::RunOutcome;
use voxarch::progress::ChannelProgressSink;

/// Exit status after Ctrl-C, as shells report SIGINT.
const EXIT_CANCELLED: i32 = 130;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "voxarch", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    init_logging(&config, cli.log_file.as_deref(), cli.verbose)?;
    tracing::debug!(version = %voxarch::version_string(), "voxarch starting");

    match cli.command {
        Commands::Run(args) => {
            let code = run_pipeline(config, args.into(), cli.quiet, cli.verbose).await?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::Models => list_models(&config),
        Commands::Config { action } => handle_config_command(action, cli.config.as_deref(), &config)?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config), which must exist
/// 2. Default config path (~/.config/voxarch/config.toml)
/// 3. Built-in defaults with environment variable overrides
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = match custom_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path())?,
    };

    Ok(config.with_env_overrides())
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` wins over the configured filter; `-vv` forces debug for this
/// crate. The terminal only shows warnings unless `-v` is given, so log
/// lines don't tear the progress bar. The log file gets everything the
/// filter lets through.
fn init_logging(config: &Config, cli_log_file: Option<&Path>, verbose: u8) -> Result<()> {
    let fallback = if verbose >= 2 {
        "voxarch=debug".to_string()
    } else {
        config.logging.filter.clone()
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&fallback))
        .with_context(|| format!("invalid log filter '{fallback}'"))?;

    let terminal_level = if verbose > 0 {
        LevelFilter::TRACE
    } else {
        LevelFilter::WARN
    };
    let terminal = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(terminal_level);

    let file_layer = match cli_log_file.or(config.logging.file.as_deref()) {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(terminal)
        .with(file_layer)
        .init();
    Ok(())
}

/// Run the pipeline on a blocking worker while this thread renders progress.
///
/// Returns the process exit code: 0 completed, 1 failed, 130 cancelled.
async fn run_pipeline(config: Config, choices: RunChoices, quiet: bool, verbose: u8) -> Result<i32> {
    let request = match build_request(&config, choices) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("{}", format!("Error: {e}").red());
            return Ok(1);
        }
    };
    tracing::info!(
        audio = %request.audio_path.display(),
        output = %request.output_path.display(),
        model = %request.model_size,
        analysis = request.generate_analysis,
        platform = ?request.platform,
        "starting run"
    );

    let mut orchestrator = build_orchestrator(&config);
    let token = CancellationToken::new();
    let (sink, events) = ChannelProgressSink::new();

    let renderer = std::thread::spawn(move || ProgressRenderer::new(quiet, verbose).drain(events));

    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() && signal_token.cancel() {
            eprintln!();
            eprintln!("{}", "Stopping after the current segment… (Ctrl-C again to quit)".yellow());
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(EXIT_CANCELLED);
        }
    });

    // The sink moves into the worker; dropping it there closes the channel
    // and lets the renderer finish.
    let outcome = tokio::task::spawn_blocking(move || {
        orchestrator.run(request, &token, &sink, || {
            tracing::debug!("run finalized");
        })
    })
    .await
    .context("pipeline worker died")?;

    if renderer.join().is_err() {
        tracing::warn!("progress renderer panicked");
    }

    print_outcome(&outcome);
    Ok(match outcome {
        RunOutcome::Completed { .. } => 0,
        RunOutcome::Cancelled => EXIT_CANCELLED,
        RunOutcome::Failed(_) => 1,
    })
}

/// List Whisper model sizes with install status.
fn list_models(config: &Config) {
    let store = model_store(config);
    println!("Models in {}:", store.dir().display());
    for status in model_statuses(&store) {
        let marker = if status.size == config.transcription.model {
            "●".green().to_string()
        } else {
            "○".to_string()
        };
        let installed = if status.installed {
            "installed".green().to_string()
        } else {
            "not installed".dimmed().to_string()
        };
        println!(
            "  {} {:<7} {:>5}MB  {}",
            marker, status.size, status.size_mb, installed
        );
        if !status.installed {
            println!("      {}", status.path.display().dimmed());
        }
    }
    println!();
    println!("Backend: {}", voxarch::defaults::gpu_backend());
}

/// Handle configuration commands.
fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Path => {
            let path = custom_path
                .map(Path::to_path_buf)
                .unwrap_or_else(Config::default_path);
            println!("{}", path.display());
        }
        ConfigAction::Show => print!("{}", config.to_display_toml()?),
    }
    Ok(())
}
