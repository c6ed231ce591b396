//! ClawOS kernel binary — the HTTP control plane for agent identity,
//! capability tokens, action dispatch, and task lifecycle.

use clap::Parser;
use clawos_kernel::{KernelConfig, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "clawosd")]
#[command(about = "ClawOS kernel - agent control plane", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(short, long, env = "KERNEL_CONFIG")]
    config: Option<String>,

    #[arg(short, long, env = "KERNEL_PORT")]
    port: Option<u16>,

    #[arg(long, env = "KERNEL_LOGGING_LEVEL", default_value = "info")]
    log_level: String,

    #[arg(long, env = "KERNEL_LOGGING_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let mut config = KernelConfig::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    println!(
        r#"
   ____ _               ___  ____
  / ___| | __ ___      _/ _ \/ ___|
 | |   | |/ _` \ \ /\ / / | | \___ \
 | |___| | (_| |\ V  V /| |_| |___) |
  \____|_|\__,_| \_/\_/  \___/|____/

  ClawOS Kernel
  Version: {}
  Listening: 0.0.0.0:{}
"#,
        env!("CARGO_PKG_VERSION"),
        config.server.port
    );

    let server = Server::new(config).await?;
    server.run().await
}
