mod collectors;
mod config;
mod exec;
mod http;
mod snapshot;
mod writer;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::serve;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::Config;
use exec::{CommandRunner, SystemRunner};

const DEFAULT_CONFIG_PATH: &str = "./config.yaml";

#[derive(Parser, Debug)]
#[command(name = "hostprobe")]
#[command(version)]
struct Cli {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let cfg = if cli.config == DEFAULT_CONFIG_PATH && !Path::new(&cli.config).exists() {
        info!("no config file found, using defaults");
        Config::default()
    } else {
        match Config::load_from_file(&cli.config) {
            Ok(cfg) => cfg,
            Err(err) => {
                error!(error = %err, "failed to load configuration");
                std::process::exit(1);
            }
        }
    };
    let cfg = Arc::new(cfg);

    let addr: SocketAddr = match cfg.listen.parse() {
        Ok(addr) => addr,
        Err(err) => {
            error!(error = %err, listen = %cfg.listen, "invalid listen address");
            std::process::exit(1);
        }
    };

    // An unavailable port is a misconfiguration; fail fast rather than retry.
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, listen = %cfg.listen, "failed to bind HTTP listener");
            std::process::exit(1);
        }
    };

    info!(
        listen = %cfg.listen,
        interval_secs = cfg.interval_secs,
        "starting hostprobe"
    );

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_task = {
        let app = http::build_router(cfg.clone(), runner.clone());
        let mut shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            let server = serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            });
            if let Err(err) = server.await {
                error!(error = %err, "http server error");
            }
        })
    };

    let writer_task = {
        let cfg = cfg.clone();
        let runner = runner.clone();
        let shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            writer::run(cfg, runner, shutdown_rx).await;
        })
    };

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to wait for Ctrl+C");
    }
    info!("received Ctrl+C, shutting down");

    let _ = shutdown_tx.send(true);

    let _ = writer_task.await;
    let _ = http_task.await;
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
