use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;

use keysign_core::utils::logging;
use keysign_core::{BuilderRegistry, KeysignConfig, KeysignPayload, SignatureMap, VaultKeys};

#[derive(Parser)]
#[command(name = "keysign", version, about = "Build and co-sign transactions for a threshold vault")]
struct Cli {
    /// JSON file overriding the default chain configuration
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print debug logs to stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the pre-image hashes the signer must sign, as a JSON array
    Hashes(PayloadArgs),
    /// Verify signatures and print the signed transaction as JSON
    Sign(SignArgs),
}

#[derive(Args)]
struct PayloadArgs {
    /// Keysign payload JSON
    #[arg(long, value_name = "FILE")]
    payload: PathBuf,
}

#[derive(Args)]
struct SignArgs {
    #[command(flatten)]
    payload: PayloadArgs,

    /// Vault public keys JSON
    #[arg(long, value_name = "FILE")]
    vault: PathBuf,

    /// Signer responses keyed by pre-image hash
    #[arg(long, value_name = "FILE")]
    signatures: PathBuf,
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read {} {}", what, path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("invalid {} {}", what, path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.debug {
        logging::enable_debug();
    }

    let config = match &cli.config {
        Some(path) => KeysignConfig::from_file(path)?,
        None => KeysignConfig::default(),
    };
    let registry = BuilderRegistry::new(&config);

    match cli.command {
        Commands::Hashes(args) => {
            let payload: KeysignPayload = read_json(&args.payload, "payload")?;
            let hashes = registry.pre_image_hashes(&payload)?;
            println!("{}", serde_json::to_string_pretty(&hashes)?);
        }
        Commands::Sign(args) => {
            let payload: KeysignPayload = read_json(&args.payload.payload, "payload")?;
            let vault: VaultKeys = read_json(&args.vault, "vault")?;
            let signatures: SignatureMap = read_json(&args.signatures, "signatures")?;
            let signed = registry.sign(&payload, &vault, &signatures)?;
            println!("{}", serde_json::to_string_pretty(&signed)?);
        }
    }

    Ok(())
}
