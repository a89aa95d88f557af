use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use fxagent::cli::{Cli, Commands};
use fxagent::config::{AppConfig, LoggingConfig};
use fxagent::error::{FxError, Result};
use fxagent::pipeline::{latest_model, run_evaluation, run_training};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::InitConfig { output } = &cli.command {
        init_logging_simple();
        let rendered = AppConfig::default().to_toml()?;
        match output {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, rendered)?;
                println!("Wrote default configuration to {}", path.display());
            }
            None => print!("{}", rendered),
        }
        return Ok(());
    }

    let mut config = AppConfig::load_from(&cli.config_dir)?;
    cli.command.apply_overrides(&mut config);
    let _log_guard = init_logging(&config.logging);

    match &cli.command {
        Commands::Train { .. } => run_train_mode(config).await?,
        Commands::Eval { model, .. } => run_eval_mode(config, model.clone()).await?,
        Commands::InitConfig { .. } => {}
    }

    Ok(())
}

async fn run_train_mode(config: AppConfig) -> Result<()> {
    info!("Starting training mode");
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               fxagent Training Mode                          ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  Pretrain Epochs: {:>6}                                      ║", config.pretrain.epochs);
    println!("║  Episodes:        {:>6}                                      ║", config.a2c.episodes);
    println!("║  Learning Rate:   {:>10.6}                                  ║", config.a2c.lr);
    println!("║  Gamma:           {:>10.4}                                  ║", config.a2c.gamma);
    println!("║  Commission:      {:>10.6}                                  ║", config.env.commission_rate);
    println!("║  Checkpoint Dir:  {}", config.output.checkpoint_dir.display());
    println!("╚══════════════════════════════════════════════════════════════╝");

    let stop = Arc::new(AtomicBool::new(false));
    let task_stop = stop.clone();
    let mut handle = tokio::task::spawn_blocking(move || run_training(&config, task_stop));

    let report = tokio::select! {
        joined = &mut handle => joined,
        _ = shutdown_signal() => {
            warn!("Shutdown signal received, finishing the current episode");
            stop.store(true, Ordering::SeqCst);
            handle.await
        }
    }
    .map_err(|e| FxError::Other(anyhow::anyhow!("training task failed: {}", e)))??;

    println!();
    println!("Training complete:");
    println!("  Episodes:             {}", report.training.num_episodes);
    println!("  Avg reward:           {:.6}", report.training.avg_reward);
    println!("  Final avg reward:     {:.6}", report.training.final_avg_reward);
    println!("  Test RMSE:            {:.6}", report.forecast.rmse);
    println!("  Directional accuracy: {:.1}%", report.forecast.directional_accuracy * 100.0);
    println!("  Backtest reward:      {:.6}", report.backtest.total_reward);
    if let Some(name) = &report.checkpoint {
        println!("  Checkpoint:           {}", name);
    }
    if report.interrupted {
        println!("  (interrupted before all episodes ran)");
    }

    Ok(())
}

async fn run_eval_mode(config: AppConfig, model: Option<String>) -> Result<()> {
    let model = match model {
        Some(name) => name,
        None => latest_model(&config)?.ok_or_else(|| {
            FxError::Checkpoint(format!(
                "no checkpoints in {}",
                config.output.checkpoint_dir.display()
            ))
        })?,
    };

    info!("Evaluating checkpoint {}", model);
    let evaluation = tokio::task::spawn_blocking(move || run_evaluation(&config, &model))
        .await
        .map_err(|e| FxError::Other(anyhow::anyhow!("evaluation task failed: {}", e)))??;

    println!("{}", serde_json::to_string_pretty(&evaluation)?);
    Ok(())
}

/// Console logging plus an optional daily-rolling file sink
///
/// The returned guard flushes the file writer when dropped.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if logging.level == "info" {
            EnvFilter::new("info,fxagent=debug")
        } else {
            EnvFilter::new(&logging.level)
        }
    });

    let mut guard = None;
    let file_layer = logging.file_dir.as_ref().and_then(|dir| {
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("fxagent")
            .filename_suffix("log")
            .build(dir);

        match appender {
            Ok(appender) => {
                let (non_blocking, file_guard) = tracing_appender::non_blocking(appender);
                guard = Some(file_guard);
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true),
                )
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not open log directory {} ({}), file logging disabled",
                    dir.display(),
                    e
                );
                None
            }
        }
    });

    let (json_layer, console_layer) = if logging.json {
        (Some(tracing_subscriber::fmt::layer().json().with_target(true)), None)
    } else {
        (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            ),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .with(file_layer)
        .init();

    guard
}

fn init_logging_simple() {
    // Minimal logging for CLI commands
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
