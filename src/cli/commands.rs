//! CLI commands and argument parsing
//!
//! This module defines the command-line interface structure using clap
//! and runs each command against a loaded [`Config`].

use crate::config::Config;
use crate::error::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "hydra-bootstrap")]
#[command(about = "Resolve hydra settings and bootstrap cluster credentials")]
#[command(version, author)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Settings file to use instead of ~/.hydra.yml
    #[arg(long, global = true, value_name = "PATH", env = "HYDRA_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the resolved settings
    Show,
    /// Print the cluster URL, optionally joined with path segments
    Url {
        /// Path segments to append
        segments: Vec<String>,
    },
    /// Authenticate against the cluster with the client credentials
    Token {
        /// Give up after this many seconds
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
    /// Write cluster URL and client credentials to the settings file
    Save,
    /// Make sure a system secret exists, generating one if needed
    Secret,
}

impl Cli {
    /// Load the configuration this invocation refers to
    pub async fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::load_from_path(path).await,
            None => Config::load().await,
        }
    }

    pub async fn execute(self, config: Config) -> Result<()> {
        match self.command {
            Commands::Show => execute_show(&config),
            Commands::Url { segments } => {
                println!("{}", config.resolve(segments.as_slice())?);
                Ok(())
            }
            Commands::Token { timeout_secs } => {
                execute_token(&config, Duration::from_secs(timeout_secs)).await
            }
            Commands::Save => {
                config.save().await?;
                println!("Settings saved to {}", config.settings_path()?.display());
                Ok(())
            }
            Commands::Secret => {
                let secret = config.get_system_secret().await?;
                println!("System secret is set ({} bytes)", secret.len());
                Ok(())
            }
        }
    }
}

fn execute_show(config: &Config) -> Result<()> {
    println!("Address:               {}", config.get_address());
    println!("Issuer:                {}", config.get_issuer());
    println!(
        "Access token lifespan: {}s",
        config.get_access_token_lifespan().as_secs()
    );
    if config.cluster_url.is_empty() {
        println!("Cluster URL:           <unset>");
    } else {
        println!("Cluster URL:           {}", config.resolve::<&str>(&[])?);
    }
    println!("Client ID:             {}", config.client_id);
    println!("Settings file:         {}", config.settings_path()?.display());
    Ok(())
}

async fn execute_token(config: &Config, timeout: Duration) -> Result<()> {
    let client = config.oauth2_client_with_timeout(timeout).await?;
    let token = client.token().await?;

    println!("Authenticated as {}", client.credentials().client_id);
    println!("Token type: {}", token.token_type);
    match token.expires_at {
        Some(expires_at) => println!("Expires at: {}", expires_at.to_rfc3339()),
        None => println!("Expires at: never"),
    }
    Ok(())
}
