//! titan-server — the Titan intra-service auth engine binary.
//!
//! Startup sequence:
//!   1. Open (or initialise) the CA identity store
//!   2. Generate the process signing key (ES256 by default)
//!   3. Build the challenge cache, signing executor and telemetry stores
//!   4. Serve the HTTP surface

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpSocket;
use tracing::{error, info};

use titan_ca::{CaService, IdentityStore};
use titan_core::constants::{ENGINE_NAME, MAX_CHALLENGES};
use titan_core::Settings;
use titan_crypto::signer_for;
use titan_engine::{ChallengeCache, SigningExecutor, TokenMinter};
use titan_http::{app, AppState};
use titan_metrics::{MetricsStore, ZkpMetrics};

#[derive(Parser, Debug)]
#[command(
    name = "titan-server",
    version,
    about = "Titan intra-service auth engine — proof-of-possession token minting"
)]
struct Args {
    /// Bind host (overrides TITAN_HOST).
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides TITAN_PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Identity store directory (overrides TITAN_CA_DB_PATH).
    #[arg(long)]
    ca_db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,titan=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    let mut settings = Settings::from_env().context("reading TITAN_* environment")?;
    if let Some(host) = args.host {
        settings.host = host;
    }
    if let Some(port) = args.port {
        settings.port = port;
    }
    if let Some(ca_db) = args.ca_db {
        settings.ca_db_path = ca_db;
    }

    info!(version = %settings.version, "{ENGINE_NAME} starting");

    // ── CA identity store ─────────────────────────────────────────────────────
    if let Some(parent) = settings.ca_db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating data dir {}", parent.display()))?;
        }
    }
    let store = Arc::new(
        IdentityStore::open(&settings.ca_db_path).context("opening identity store")?,
    );
    let ca = Arc::new(CaService::new(store));

    // ── Signing key + executor ────────────────────────────────────────────────
    // The key lives and dies with the process; restart is the rotation path.
    let signer = signer_for(settings.jwt_algorithm).context("generating signing key")?;
    let executor = Arc::new(SigningExecutor::new(settings.slots()));
    info!(
        threads = settings.threads_per_worker,
        slots = settings.slots(),
        algorithm = %settings.jwt_algorithm,
        "signing pipeline ready"
    );

    // ── Telemetry ─────────────────────────────────────────────────────────────
    let metrics = Arc::new(MetricsStore::new(settings.version.clone(), settings.workers));
    let zkp_metrics = Arc::new(ZkpMetrics::new());

    // ── Mint pipeline ─────────────────────────────────────────────────────────
    let challenges = Arc::new(ChallengeCache::new(MAX_CHALLENGES));
    let minter = Arc::new(TokenMinter::from_settings(
        Arc::clone(&signer),
        Arc::clone(&executor),
        Arc::clone(&metrics),
        &settings,
    ));

    let signing_algorithm = signer.algorithm();
    let state = AppState {
        metrics,
        zkp_metrics,
        ca,
        challenges,
        minter,
        signing_algorithm,
    };

    // ── HTTP surface ──────────────────────────────────────────────────────────
    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", settings.host, settings.port))?;
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .context("creating listen socket")?;
    #[cfg(unix)]
    socket.set_reuseaddr(true).context("setting SO_REUSEADDR")?;

    if let Err(e) = socket.bind(addr) {
        if e.kind() == std::io::ErrorKind::AddrInUse {
            error!(%addr, "port already in use — free it or set TITAN_PORT to another port");
        }
        return Err(anyhow::Error::new(e).context(format!("binding {addr}")));
    }
    let listener = socket.listen(settings.backlog).context("listening")?;
    info!(%addr, backlog = settings.backlog, "HTTP surface ready");

    axum::serve(listener, app(state))
        .await
        .context("serving HTTP")?;

    Ok(())
}
