//! keygen — client-side helper for the proof-of-possession flow.
//!
//! Generates the P-256 keypair a caller registers with `/v6/zkp/identity`,
//! and signs challenge nonces into the URL-safe base64 DER form that
//! `/v6/zkp/mint` verifies.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use titan_crypto::{sign_nonce, IdentityKeys};

#[derive(Parser, Debug)]
#[command(name = "keygen", version, about = "Generate identity keys and sign challenge nonces")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a fresh P-256 keypair and write both PEMs to a directory.
    Generate {
        /// Output directory for private.pem and public.pem.
        #[arg(long, default_value = "u-data")]
        out_dir: PathBuf,
    },
    /// Sign a challenge nonce with a private key PEM.
    Sign {
        /// Path to the PKCS#8 private key PEM.
        #[arg(long)]
        key: PathBuf,
        /// The nonce string returned by /v6/zkp/challenge.
        #[arg(long)]
        nonce: String,
    },
}

fn main() -> anyhow::Result<()> {
    match Args::parse().command {
        Command::Generate { out_dir } => {
            let keys = IdentityKeys::generate().context("generating keypair")?;
            std::fs::create_dir_all(&out_dir)
                .with_context(|| format!("creating {}", out_dir.display()))?;

            let private_path = out_dir.join("private.pem");
            let public_path = out_dir.join("public.pem");
            std::fs::write(&private_path, keys.private_key_pem.as_bytes())
                .with_context(|| format!("writing {}", private_path.display()))?;
            std::fs::write(&public_path, keys.public_key_pem.as_bytes())
                .with_context(|| format!("writing {}", public_path.display()))?;

            println!("private key: {}", private_path.display());
            println!("public key:  {}", public_path.display());
            println!();
            println!("register the public key:");
            println!("  POST /v6/zkp/identity {{\"pubkey_pem\": <public.pem contents>}}");
        }
        Command::Sign { key, nonce } => {
            let pem = std::fs::read_to_string(&key)
                .with_context(|| format!("reading {}", key.display()))?;
            println!("{}", sign_nonce(&pem, &nonce).context("signing nonce")?);
        }
    }
    Ok(())
}
