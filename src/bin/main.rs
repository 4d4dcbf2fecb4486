use credito::config::CONFIG;
use credito::ledger::Ledger;
use credito::logging::init_tracing;
use credito::web_api_server::WebApiServer;
use tracing::*;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting credito on {}", CONFIG.bind_addr);

    let ledger = match Ledger::from_config(&CONFIG).await {
        Ok(ledger) => ledger,
        Err(e) => {
            error!("Failed to open ledger: {}", e);
            std::process::exit(1);
        }
    };

    let server = WebApiServer::new(&ledger);
    if let Err(e) = server.run(&CONFIG.bind_addr).await {
        error!("Server stopped: {}", e);
        std::process::exit(1);
    }
}
