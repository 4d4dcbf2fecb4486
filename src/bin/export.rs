//!
//! Dumps every contract, with its paid total, as a JSON array.
//! Usage: export [output file]. Writes to stdout when no file is given.
//!

use credito::config::CONFIG;
use credito::ledger::Ledger;
use credito::logging::init_tracing;
use std::io::Write as _;
use tracing::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let ledger = Ledger::from_config(&CONFIG).await?;
    let rows = ledger.export().await?;
    let json = serde_json::to_string_pretty(&rows)?;

    match std::env::args().nth(1) {
        Some(path) => {
            std::fs::write(&path, json)?;
            info!("Exported {} contracts to {}", rows.len(), path);
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}
