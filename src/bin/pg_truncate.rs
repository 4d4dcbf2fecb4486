//!
//! Deletes all contracts and installments from the configured database.
//!

use credito::config::CONFIG;
use credito::database::DbClient;
use credito::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let database_url = CONFIG
        .database_url
        .as_deref()
        .ok_or("DATABASE_URL must be set")?;
    let db = DbClient::new(database_url, 1).await?;
    db.truncate().await?;
    println!("All tables truncated");
    Ok(())
}
