use anyhow::Result;
use able_mind::{config::Config, http::start_http_server, init_tracing, server::AbleMindServer};
use rmcp::{ServiceExt, transport::stdio};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;
    init_tracing(&config.runtime);

    info!(
        "Starting AbleMind MCP server: model={}:{}, db={} {}/{}",
        config.model.provider,
        config.model.model,
        config.system.database_url,
        config.system.database_ns,
        config.system.database_db
    );

    let transport = config.runtime.transport.clone();
    let server = AbleMindServer::connect(config).await.map_err(|e| {
        eprintln!("Failed to create server: {}", e);
        e
    })?;

    if transport == "http" {
        start_http_server(server).await?;
        return Ok(());
    }

    let service = server.serve(stdio()).await.map_err(|e| {
        eprintln!("Failed to start MCP service: {}", e);
        e
    })?;
    info!("MCP server ready on stdio");
    service.waiting().await?;

    Ok(())
}
