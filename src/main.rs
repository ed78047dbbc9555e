mod cli;

use shelfwatch::config::{self, Config};
use shelfwatch::context::AppContext;
use shelfwatch::rules::{self, MediaDescriptor};
use shelfwatch::session::Session;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tokio::signal;

async fn run(config: Config) -> Result<()> {
    tracing::info!(
        host = %config.host,
        concurrency = config.concurrency,
        scan_on_start = config.scan_on_start,
        exit_when_drained = config.exit_when_drained,
        "Starting shelfwatch"
    );

    let ctx = AppContext::from_config(config);
    let session = Session::new(ctx.clone())?;
    let _resync = ctx.spawn_resync_loop();
    let session_handle = tokio::spawn(session.run());

    tokio::select! {
        _ = shutdown_signal() => {
            tracing::info!("Shutdown requested");
            ctx.shutdown.cancel();
        }
        _ = ctx.shutdown.cancelled() => {}
    }

    if let Err(e) = session_handle.await {
        tracing::error!("Realtime session task failed: {}", e);
    }

    if !ctx.queue.is_empty() {
        tracing::info!(
            queued = ctx.queue.len(),
            running = ctx.queue.running(),
            "Waiting for queued items to dispatch; signal again to force exit"
        );
        tokio::select! {
            _ = ctx.queue.drain(ctx.config.drain_poll()) => {}
            _ = shutdown_signal() => tracing::warn!("Forced exit with items still queued"),
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "shelfwatch=trace".to_string()
        } else {
            "shelfwatch=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let config = config::load_config_or_default(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            if let Err(e) = config::validate_config(&config) {
                tracing::error!("{}", e);
                return Err(e.into());
            }
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run(config))
        }
        Commands::CheckRules {
            codec,
            bit_rate,
            channels,
        } => check_rules(&config, &codec, bit_rate, channels),
        Commands::Validate => {
            config::validate_config(&config)?;
            println!("Configuration is valid");
            Ok(())
        }
        Commands::Version => {
            println!("shelfwatch {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn check_rules(config: &Config, codec: &str, bit_rate: u64, channels: u32) -> Result<()> {
    let info = MediaDescriptor::new(codec, bit_rate, channels);

    if config.is_excluded(&info.codec) {
        println!("{}: excluded codec, item would be skipped", info.codec);
        return Ok(());
    }

    let table = rules::parse_rule_table(&config.rules);
    match rules::resolve_action(&table, &info) {
        Some(params) => println!("{} -> {}", info.codec, params),
        None => println!("{}: no rule matches, item would be skipped", info.codec),
    }

    Ok(())
}
