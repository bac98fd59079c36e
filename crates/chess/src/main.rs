//! Binary entry point: load configuration from the environment, wire up
//! structured logging, and run the server until the process is killed.

use chess::prelude::*;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, "invalid configuration");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(config).await {
        tracing::error!(%err, "server exited with an error");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), ChessCoreError> {
    let server = Server::build(config).await?;
    if let Ok(addr) = server.local_addr() {
        tracing::info!(%addr, "listening");
    }
    server.run().await
}
