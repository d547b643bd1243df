use std::sync::Arc;

use app::{App, Terminal};
use persistence::JsonFiles;

mod app;
mod commands;
mod config;
mod error;
mod persistence;
mod state;
mod views;

#[tokio::main]
async fn main() -> error::Result<()> {
    let config = config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "spese={level},engine={level},store={level},router={level}",
            level = config.log_level
        ))
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(data_dir = %config.data_dir.display(), timezone = %config.timezone, "starting");
    let persistence = Arc::new(JsonFiles::new(&config.data_dir));
    let (app, changes) = App::build(config, persistence, Arc::new(Terminal))?;
    app.run(changes).await
}
