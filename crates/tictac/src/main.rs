use clap::Parser;
use tictac::TictacServer;
use tracing_subscriber::EnvFilter;

/// Matchmaking and tic-tac-toe server.
#[derive(Parser, Debug)]
#[command(name = "tictac-server", version, about)]
struct Args {
    /// Port to listen on
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let server = TictacServer::builder()
        .bind(&format!("0.0.0.0:{}", args.port))
        .build()
        .await?;

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping");
            shutdown.stop();
        }
    });

    server.run().await?;
    Ok(())
}
