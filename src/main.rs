//!
//! cryptsession server binary
//! --------------------------
//! Command-line entry point. Configuration comes from `CRYPTSESSION_*`
//! environment variables; flags given on the command line override them.

use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use cryptsession::config::ServerConfig;

const USAGE: &str = "cryptsession\n\nUSAGE:\n  cryptsession [--http-port N] [--cas-url URL] [--service-url URL] [--public-dir PATH]\n\nOPTIONS:\n  --http-port N        HTTP port (env: CRYPTSESSION_HTTP_PORT, default 3000)\n  --cas-url URL        CAS server base URL (env: CRYPTSESSION_CAS_URL, default https://testcas.cs.ksu.edu)\n  --service-url URL    Externally reachable base URL of this server (env: CRYPTSESSION_SERVICE_URL, default http://localhost:<port>)\n  --public-dir PATH    Directory holding index.html (env: CRYPTSESSION_PUBLIC_DIR, default public)\n\nSECRETS (environment only):\n  CRYPTSESSION_KEY     32-byte cookie encryption key\n  CRYPTSESSION_IV      16-byte initialization vector\n\nTUNING (environment only):\n  CRYPTSESSION_VALIDATE_TIMEOUT_MS   per-attempt CAS validation timeout (default 5000)\n  CRYPTSESSION_VALIDATE_RETRIES      retries after a transport error (default 1)\n";

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut config = ServerConfig::from_env()?;

    // CLI arguments override environment
    if let Some(port) = arg_value(&args, "--http-port") {
        config.http_port = port
            .parse()
            .map_err(|_| anyhow::anyhow!("--http-port: cannot parse '{}'", port))?;
        if std::env::var("CRYPTSESSION_SERVICE_URL").is_err() {
            config.service_base_url = format!("http://localhost:{}", config.http_port);
        }
    }
    if let Some(url) = arg_value(&args, "--cas-url") {
        config.cas_base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(url) = arg_value(&args, "--service-url") {
        config.service_base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(dir) = arg_value(&args, "--public-dir") {
        config.public_dir = PathBuf::from(dir);
    }

    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(target: "startup", "RUST_LOG='{}', callback={}", rust_log, config.callback_url());

    cryptsession::server::run_with_config(config).await
}
