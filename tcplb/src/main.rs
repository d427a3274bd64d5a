//! tcplb - TCP load balancer entry point
//!
//! Boots the backend pool, accepts clients until Ctrl-C / SIGTERM, then
//! closes every listener.

use std::sync::Arc;

use clap::Parser;
use log::{error, info};

use tcplb_config::{config::Config, validator::validate as validate_config};
use tcplb_edge::LoadBalancer;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// YAML config file; built-in defaults are used when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Load balancing algorithm (roundrobin, random)
    #[arg(long)]
    algo: Option<String>,

    /// Number of backend servers (1-1000)
    #[arg(long)]
    servers: Option<usize>,

    /// Listen port, 0 picks a free one
    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(algo) = &self.algo {
            config.load_balancing.lb_type = algo.clone();
        }
        if let Some(servers) = self.servers {
            config.backends.count = servers;
        }
        if let Some(port) = self.port {
            config.listen.port = port;
        }
        if let Some(level) = &self.log_level {
            config.log.level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match tcplb_config::loader::read_config(path) {
            Ok(cfg) => cfg,
            Err(err_msg) => {
                eprintln!("Error loading config: {}", err_msg);
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };
    cli.apply(&mut config);

    let log_file = config.log.file.as_deref();
    if let Err(err) = tcplb_utils::logger::init_logger(&config.log.level, log_file) {
        eprintln!("Error initializing logger: {}", err);
        std::process::exit(1);
    }

    if !validate_config(&config) {
        error!("Configuration validation failed. Exiting...");
        std::process::exit(1);
    }

    let lb = match LoadBalancer::from_config(&config).await {
        Ok(lb) => Arc::new(lb),
        Err(err) => {
            error!("Failed to start load balancer: {}", err);
            std::process::exit(1);
        }
    };

    let signal_lb = Arc::clone(&lb);
    tokio::spawn(async move {
        shutdown_signal().await;
        println!("\nshutting down...");
        signal_lb.close().await;
    });

    println!(
        "load balancer listening on {} (algo={}, backends={})",
        lb.addr(),
        lb.selector_name(),
        lb.backend_count()
    );

    if let Err(err) = lb.accept_connections().await {
        error!("Load balancer stopped: {}", err);
        lb.close().await;
        std::process::exit(1);
    }

    info!("tcplb exited cleanly");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
