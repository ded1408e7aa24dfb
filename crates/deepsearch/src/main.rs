use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deepsearch::config::DeepSearchConfig;
use deepsearch::core::DeepSearch;
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "deepsearch", version, about = "Deep search chat service")]
struct Cli {
    /// Explicit config file; skips layered discovery.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default).
    Serve,
    /// Print the effective config with auth tokens redacted.
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    deepsearch::init_logging();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let service =
                DeepSearch::from_config(config.clone()).context("failed to build service")?;
            deepsearch::server::serve(service, &config)
                .await
                .context("http server failed")?;
        }
        Command::CheckConfig => {
            println!("{}", render_config(&config)?);
        }
    }
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<DeepSearchConfig> {
    if let Some(path) = path {
        return DeepSearchConfig::load_from_path(path).context("failed to load config");
    }
    let cwd = std::env::current_dir().context("failed to resolve cwd")?;
    let layered = DeepSearchConfig::load_layered(&cwd).context("failed to load layered config")?;
    for layer in &layered.layers {
        info!(
            "config layer applied (source={:?}, path={})",
            layer.source,
            layer.path.display()
        );
    }
    Ok(layered.config)
}

fn render_config(config: &DeepSearchConfig) -> Result<String> {
    let mut redacted = config.clone();
    redacted.auth.tokens = redacted
        .auth
        .tokens
        .into_values()
        .enumerate()
        .map(|(idx, user)| (format!("<redacted-{idx}>"), user))
        .collect();
    serde_json::to_string_pretty(&redacted).context("failed to render config")
}
