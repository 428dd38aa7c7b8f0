//! `docbot stats` command.

use super::build_store;
use docbot_core::{AppConfig, AppResult};

pub async fn run(config: AppConfig) -> AppResult<()> {
    let store = build_store(&config)?;
    let count = store.count().await?;

    println!("Collection: {}", config.qdrant.collection);
    println!("Qdrant URL: {}", config.qdrant.url);
    println!("Points:     {}", count);
    Ok(())
}
