use std::{path::Path, time::Duration};

use meshdash_core::{
    ClientSession, CoreError, Peer, SharedFile, UpdatePayload, decode_file_list, decode_peer_list,
    decode_update_body, download_url, files_url, peers_url, updates_url,
};
use reqwest::StatusCode;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use url::Url;

/// Fixed wait before retrying after a failed poll. There is no delay after
/// a 204 or an applied payload, and no request timeout: a healthy long poll
/// legitimately hangs until the node has news.
pub const RETRY_DELAY: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub session: ClientSession,
    pub retry_delay: Duration,
}

impl ClientConfig {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            session: ClientSession::generate(),
            retry_delay: RETRY_DELAY,
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("upload source unreadable: {0}")]
    UploadSource(#[from] std::io::Error),
}

#[derive(Debug)]
enum PollTurn {
    NoNewData,
    Update(UpdatePayload),
    Empty,
}

/// The long-poll loop against `GET /api/updates?id={clientID}`.
///
/// Exactly one request is outstanding at a time; the next is issued only
/// after the previous has fully settled, so payloads reach `update_tx` in
/// receipt order. A 204 re-polls immediately with zero delay. Transport
/// and decode failures are not distinguished: both wait `retry_delay` and
/// poll again, forever. The loop has no internal stop condition; it ends
/// only when `shutdown_rx` flips or its sender is dropped.
pub async fn run_update_channel(
    http: reqwest::Client,
    config: ClientConfig,
    update_tx: mpsc::UnboundedSender<UpdatePayload>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), ClientError> {
    let endpoint = updates_url(&config.base_url, config.session.id())?;
    info!(endpoint = %endpoint, "update channel starting");

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let turn = tokio::select! {
            _ = shutdown_rx.changed() => break,
            turn = poll_once(&http, &endpoint) => turn,
        };

        match turn {
            Ok(PollTurn::NoNewData) | Ok(PollTurn::Empty) => continue,
            Ok(PollTurn::Update(payload)) => {
                if update_tx.send(payload).is_err() {
                    break;
                }
            }
            Err(err) => {
                warn!(
                    "poll failed, retrying in {} ms: {err}",
                    config.retry_delay.as_millis()
                );
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = tokio::time::sleep(config.retry_delay) => {}
                }
            }
        }
    }

    info!("update channel stopped");
    Ok(())
}

async fn poll_once(http: &reqwest::Client, endpoint: &Url) -> Result<PollTurn, ClientError> {
    let response = http.get(endpoint.clone()).send().await?;
    if response.status() == StatusCode::NO_CONTENT {
        return Ok(PollTurn::NoNewData);
    }

    let body = response.bytes().await?;
    match decode_update_body(&body)? {
        Some(payload) => Ok(PollTurn::Update(payload)),
        None => Ok(PollTurn::Empty),
    }
}

/// Upload the user's current selection to `POST /api/files`.
///
/// No selection is a no-op performing zero requests. The node's reply is
/// deliberately not observed, retried, or reported; the update channel is
/// the only way the dashboard learns the file list changed.
pub async fn upload_file(
    http: &reqwest::Client,
    config: &ClientConfig,
    selection: Option<&Path>,
) -> Result<(), ClientError> {
    let Some(path) = selection else {
        debug!("upload requested with no file selected");
        return Ok(());
    };

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload")
        .to_owned();
    let data = tokio::fs::read(path).await?;
    let part = reqwest::multipart::Part::bytes(data).file_name(file_name);
    let form = reqwest::multipart::Form::new().part("file", part);
    let endpoint = files_url(&config.base_url)?;

    if let Err(err) = http.post(endpoint).multipart(form).send().await {
        debug!("upload request not delivered: {err}");
    }
    Ok(())
}

/// The deterministic navigation target for a file download. Visiting it is
/// the hosting context's terminal action; there is no result to observe
/// here.
pub fn download_target(config: &ClientConfig, file_id: &str) -> Result<Url, ClientError> {
    Ok(download_url(&config.base_url, file_id)?)
}

/// One-shot peer snapshot from `GET /api/peers`.
pub async fn fetch_peers(
    http: &reqwest::Client,
    config: &ClientConfig,
) -> Result<Vec<Peer>, ClientError> {
    let body = http
        .get(peers_url(&config.base_url)?)
        .send()
        .await?
        .bytes()
        .await?;
    Ok(decode_peer_list(&body)?)
}

/// One-shot shared-file snapshot from `GET /api/files`.
pub async fn fetch_files(
    http: &reqwest::Client,
    config: &ClientConfig,
) -> Result<Vec<SharedFile>, ClientError> {
    let body = http
        .get(files_url(&config.base_url)?)
        .send()
        .await?
        .bytes()
        .await?;
    Ok(decode_file_list(&body)?)
}
