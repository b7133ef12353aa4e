use crewline_server::{start_server, ServerConfig};

#[tokio::main]
async fn main() {
    let defaults = ServerConfig::default();
    let config = ServerConfig {
        host: std::env::var("CREWLINE_HOST").unwrap_or(defaults.host),
        port: std::env::var("CREWLINE_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port),
        crews_dir: std::env::var("CREWLINE_CREWS_DIR").unwrap_or(defaults.crews_dir),
        static_dir: std::env::var("CREWLINE_STATIC_DIR").ok(),
    };

    match start_server(config).await {
        Ok(addr) => {
            tracing::info!("Crewline server running at http://{}", addr);
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutting down");
        }
        Err(e) => {
            eprintln!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    }
}
