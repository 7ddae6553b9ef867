use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use revu_config::{
    default_config_file, default_document, parse_refresh_interval, DisplayZone,
    PartialViewerConfig, ViewerConfig,
};
use revu_provider::{http::HttpOptions, ReviewProvider};

use crate::{app::App, config::Config};

#[derive(Parser)]
#[command(author, version, about = "Live terminal dashboard for WhatsApp product reviews", long_about = None)]
pub struct Command {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch the review collection (default)
    View,
    /// Write a default revu.kdl into the config directory
    Init,
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long, env = "REVU_CONFIG_FILE", global = true, help_heading = "Config")]
    config_file: Option<PathBuf>,

    /// Backend address, e.g. http://localhost:8000
    #[arg(long, global = true, help_heading = "Config")]
    base_url: Option<String>,

    /// Seconds between automatic refreshes
    #[arg(long, global = true, help_heading = "Config", value_parser = parse_refresh_interval)]
    refresh_interval: Option<u64>,

    /// `local` or `utc`
    #[arg(long, global = true, help_heading = "Config")]
    timezone: Option<DisplayZone>,
}

impl ConfigArgs {
    fn overrides(&self) -> PartialViewerConfig {
        PartialViewerConfig {
            base_url: self.base_url.clone(),
            refresh_interval: self.refresh_interval,
            timezone: self.timezone,
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Command::parse();

    match cli.command.unwrap_or(Commands::View) {
        Commands::Init => init(cli.config.config_file)?,
        Commands::View => {
            let viewer =
                ViewerConfig::load(cli.config.config_file.as_deref(), cli.config.overrides());
            tracing::info!("starting tui against {}", viewer.base_url);

            let provider = ReviewProvider::http(HttpOptions {
                base_url: viewer.base_url.clone(),
                ..Default::default()
            })?;

            let mut app = App::new(Config::new(viewer));
            app.register_components(provider);
            if let Err(e) = app.run().await {
                tracing::error!("{}", e);
                return Err(e);
            }

            tracing::info!("stopping tui");
        }
    }

    Ok(())
}

fn init(config_file: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_file
        .or_else(default_config_file)
        .context("could not determine a config directory, pass --config-file")?;

    if path.exists() {
        println!("config already exists at {}", path.display());
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, default_document())
        .with_context(|| format!("failed to write {}", path.display()))?;

    tracing::info!("wrote default config to {}", path.display());
    println!("wrote default config to {}", path.display());

    Ok(())
}

#[cfg(test)]
mod test {
    use clap::{CommandFactory, Parser};

    use super::{Command, Commands, DisplayZone};

    #[test]
    fn test_cli_is_well_formed() {
        Command::command().debug_assert();
    }

    #[test]
    fn test_config_flags_become_overrides() {
        let cli = Command::parse_from([
            "revu",
            "view",
            "--base-url",
            "http://reviews:9000",
            "--refresh-interval",
            "30",
            "--timezone",
            "utc",
        ]);

        let overrides = cli.config.overrides();
        assert!(matches!(cli.command, Some(Commands::View)));
        assert_eq!(Some("http://reviews:9000".to_string()), overrides.base_url);
        assert_eq!(Some(30), overrides.refresh_interval);
        assert_eq!(Some(DisplayZone::Utc), overrides.timezone);
    }

    #[test]
    fn test_rejects_zero_refresh_interval() {
        assert!(Command::try_parse_from(["revu", "--refresh-interval", "0"]).is_err());
    }
}
