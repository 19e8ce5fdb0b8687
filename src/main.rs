//! PDF toolkit - Entry point
//!
//! Serves the PDF tools over MCP on stdio.

use clap::Parser;
use pdf_toolkit::{run_server_with_config, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const MB: u64 = 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "pdf-toolkit")]
#[command(version, about = "PDF utilities via Model Context Protocol")]
struct Args {
    /// Directory to expose as PDF resources; also restricts file paths (repeatable)
    #[arg(long = "resource-dir")]
    resource_dirs: Vec<String>,

    /// Allow URL sources that resolve to private or reserved addresses
    #[arg(long)]
    allow_private_urls: bool,

    /// Maximum download size for URL sources, in megabytes
    #[arg(long, default_value = "100")]
    max_download_mb: u64,

    /// Output cache budget in megabytes
    #[arg(long, default_value = "512")]
    cache_max_mb: u64,

    /// Maximum number of cached documents
    #[arg(long, default_value = "100")]
    cache_max_entries: usize,

    /// Maximum number of open viewer sessions
    #[arg(long, default_value = "16")]
    max_sessions: usize,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            resource_dirs: self.resource_dirs,
            allow_private_urls: self.allow_private_urls,
            max_download_bytes: self.max_download_mb.saturating_mul(MB),
            cache_max_bytes: usize::try_from(self.cache_max_mb.saturating_mul(MB))
                .unwrap_or(usize::MAX),
            cache_max_entries: self.cache_max_entries,
            max_sessions: self.max_sessions,
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // stdout carries the MCP protocol, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_toolkit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting PDF toolkit v{}", env!("CARGO_PKG_VERSION"));

    run_server_with_config(args.into_config()).await
}
