use std::net::SocketAddr;

use anyhow::Context as _;
use clap::Parser;

use recapper::config::RecapConfig;
use recapper::http::{AppState, router};
use recapper::service::RecapService;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct AppArgs {
    #[arg(long, env = "RECAP_ADDR", default_value = "127.0.0.1:8080")]
    addr: SocketAddr,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    recapper::logging::init("info,tower_http=debug")?;

    let args = AppArgs::parse();
    tracing::info!(?args, "starting recap-app");

    let config = RecapConfig::from_env().context("load config")?;
    let service = RecapService::from_config(&config).context("build recap service")?;
    let app = router(AppState { service });

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(addr = %args.addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "install ctrl-c handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
