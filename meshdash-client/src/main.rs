use std::path::PathBuf;

use clap::Parser;
use meshdash_client::{ClientConfig, run_update_channel, upload_file};
use meshdash_core::Dashboard;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "meshdash")]
struct DashArgs {
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    node_url: String,

    /// Upload this file to the node before watching for updates.
    #[arg(long)]
    upload: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = DashArgs::parse();
    let base_url = match Url::parse(&args.node_url) {
        Ok(url) => url,
        Err(err) => {
            error!("invalid node URL {}: {}", args.node_url, err);
            std::process::exit(1);
        }
    };

    let config = ClientConfig::new(base_url);
    let http = reqwest::Client::new();
    info!(
        "session {} watching node at {}",
        config.session.id(),
        args.node_url
    );

    if let Some(path) = args.upload.as_deref() {
        if let Err(err) = upload_file(&http, &config, Some(path)).await {
            warn!("upload skipped: {err}");
        }
    }

    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let channel = tokio::spawn(run_update_channel(http, config, update_tx, shutdown_rx));

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let mut dashboard = Dashboard::new();
    while let Some(payload) = update_rx.recv().await {
        dashboard.apply(&payload);
        print_dashboard(&dashboard);
    }

    match channel.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!("update channel failed: {err}"),
        Err(err) => error!("update channel panicked: {err}"),
    }
}

fn print_dashboard(dashboard: &Dashboard) {
    if let Some(peers) = dashboard.peers_region() {
        println!("peers:");
        print!("{peers}");
    }
    if let Some(files) = dashboard.files_region() {
        println!("files:");
        print!("{files}");
    }
}
