mod action;
mod app;
mod cli;
mod components;
mod config;
mod format;
mod logging;
mod tui;
mod view_state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let log_path = logging::initialize_logging()?;
    logging::initialize_panic_handler();

    tracing::debug!("starting app, logging to {}", log_path.display());

    cli::run().await?;

    Ok(())
}
