//! gpgbridge - command line entry point
//!
//! Thin CLI over the library. Key material goes to stdout untouched; logs go
//! to stderr.

use std::io::Write;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use gpgbridge::{ClientFactory, Config, GpgClient, KeyId, Passphrase};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zeroize::Zeroizing;

#[derive(Parser, Debug)]
#[command(author, version, about = "Dialect-aware bridge to gpg / gpg2", long_about = None)]
struct Cli {
    /// GnuPG dialect to use (v1 or v2); overrides GPGBRIDGE_GPG_VERSION
    #[arg(long, global = true)]
    gpg_version: Option<String>,

    /// GnuPG home directory; overrides GPGBRIDGE_HOMEDIR
    #[arg(long, global = true)]
    homedir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the detected dialect
    Detect,
    /// Write the public keyring export to stdout
    ExportPublic,
    /// Write one secret key export to stdout; prompts for the passphrase
    ExportSecret {
        /// Key ID in hex, with or without 0x
        key_id: String,
    },
    /// Look up a key and print the result as JSON
    KeyDetails {
        key_id: String,
        /// Query the secret keyring instead of the public one
        #[arg(long)]
        secret: bool,
    },
    /// Resolve recipients to email addresses where known
    Resolve {
        #[arg(required = true)]
        identifiers: Vec<String>,
    },
}

#[derive(Serialize)]
struct KeyDetailsOutput {
    key_id: String,
    found: bool,
    details: String,
}

#[derive(Serialize)]
struct ResolveOutput<'a> {
    input: &'a [String],
    resolved: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gpgbridge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?.with_overrides(cli.gpg_version, cli.homedir);
    let factory = ClientFactory::new(config.programs.clone());

    let client = factory
        .create(config.gpg_version.as_deref(), &config.home_dir)
        .await
        .context("Failed to set up gpg client")?;

    match cli.command {
        Commands::Detect => {
            println!("{}", client.dialect());
            Ok(())
        }
        Commands::ExportPublic => {
            let bytes = client.read_public_keyring().await?;
            write_stdout(&bytes)
        }
        Commands::ExportSecret { key_id } => export_secret(&client, &key_id).await,
        Commands::KeyDetails { key_id, secret } => {
            let key_id = parse_key_id(&key_id)?;
            let lookup = if secret {
                client.get_secret_key_details(key_id).await?
            } else {
                client.get_key_details(key_id).await?
            };
            let output = KeyDetailsOutput {
                key_id: key_id.to_string(),
                found: lookup.found,
                details: String::from_utf8_lossy(&lookup.output).to_string(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Commands::Resolve { identifiers } => {
            let resolved = client.resolve_recipients(&identifiers).await;
            let output = ResolveOutput {
                input: &identifiers,
                resolved,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
    }
}

async fn export_secret(client: &GpgClient, key_id: &str) -> Result<()> {
    let key_id = parse_key_id(key_id)?;
    let lookup = client.get_secret_key_details(key_id).await?;
    if !lookup.found {
        return Err(anyhow!("no secret key {} in keyring", key_id));
    }

    let entered = Zeroizing::new(
        rpassword::prompt_password(format!("Passphrase for key {}: ", key_id))
            .map_err(|e| anyhow!("password prompt: {e}"))?,
    );
    let passphrase = Passphrase::from(entered.as_str());

    info!(key_id = %key_id, dialect = %client.dialect(), "Passphrase entered, requesting export");
    let bytes = client.get_private_key(key_id, passphrase).await?;
    write_stdout(&bytes)
}

fn parse_key_id(value: &str) -> Result<KeyId> {
    value
        .parse()
        .map_err(|e| anyhow!("invalid key ID '{}': {}", value, e))
}

fn write_stdout(bytes: &[u8]) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(bytes).context("Failed to write to stdout")?;
    stdout.flush().context("Failed to flush stdout")?;
    Ok(())
}
