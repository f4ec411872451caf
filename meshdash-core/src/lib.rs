use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub const SESSION_ID_LEN: usize = 9;
const SESSION_ID_CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub type ClientId = String;
pub type FileId = String;

/// One randomized identifier per process, stable for the session's lifetime.
///
/// The node uses it only to correlate poll requests to one logical
/// subscriber. Identifiers are generated independently with no registration
/// or uniqueness check; collisions are an accepted risk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSession {
    id: ClientId,
}

impl ClientSession {
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let id = (0..SESSION_ID_LEN)
            .map(|_| {
                let index = rng.random_range(0..SESSION_ID_CHARSET.len());
                SESSION_ID_CHARSET[index] as char
            })
            .collect();
        Self { id }
    }

    pub fn from_id(id: impl Into<ClientId>) -> Self {
        Self { id: id.into() }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Peer {
    pub address: String,
    #[serde(rename = "lastSeen")]
    pub last_seen: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SharedFile {
    pub id: FileId,
    pub name: String,
    pub size: u64,
}

/// One long-poll delivery from the node.
///
/// A `None` field means "unchanged, leave that region alone", not "empty".
/// An empty `Some(vec![])` clears the region.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct UpdatePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peers: Option<Vec<Peer>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<SharedFile>>,
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("cannot derive API endpoint from base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
    #[error("response body is not valid JSON: {0}")]
    Decode(String),
}

pub fn updates_url(base: &Url, client_id: &str) -> Result<Url, CoreError> {
    let mut url = base.join("/api/updates")?;
    url.query_pairs_mut().append_pair("id", client_id);
    Ok(url)
}

pub fn files_url(base: &Url) -> Result<Url, CoreError> {
    Ok(base.join("/api/files")?)
}

pub fn peers_url(base: &Url) -> Result<Url, CoreError> {
    Ok(base.join("/api/peers")?)
}

pub fn download_url(base: &Url, file_id: &str) -> Result<Url, CoreError> {
    Ok(base.join(&format!("/api/files/{file_id}/download"))?)
}

/// Decode a 200 update body.
///
/// The node may legitimately send a JSON `null` body, which carries no
/// state and must not touch the dashboard; that decodes to `Ok(None)`.
pub fn decode_update_body(body: &[u8]) -> Result<Option<UpdatePayload>, CoreError> {
    serde_json::from_slice(body).map_err(|err| CoreError::Decode(err.to_string()))
}

pub fn decode_peer_list(body: &[u8]) -> Result<Vec<Peer>, CoreError> {
    serde_json::from_slice(body).map_err(|err| CoreError::Decode(err.to_string()))
}

pub fn decode_file_list(body: &[u8]) -> Result<Vec<SharedFile>, CoreError> {
    serde_json::from_slice(body).map_err(|err| CoreError::Decode(err.to_string()))
}

/// One display row per peer, address then last-seen, input order kept.
pub fn render_peer_rows(peers: &[Peer]) -> String {
    peers
        .iter()
        .map(|peer| format!("{}  {}\n", peer.address, peer.last_seen))
        .collect()
}

/// One display row per file: name, size, then the download trigger
/// carrying the file's identifier.
pub fn render_file_rows(files: &[SharedFile]) -> String {
    files
        .iter()
        .map(|file| format!("{}  {}  [download {}]\n", file.name, file.size, file.id))
        .collect()
}

/// The rendered dashboard: two region strings, each fully rewritten from
/// the latest received sequence for that field.
///
/// Regions start as `None` and stay that way until a payload carrying the
/// field arrives; a region is never patched incrementally. Applying the
/// same payload twice is byte-identical to applying it once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dashboard {
    peers_region: Option<String>,
    files_region: Option<String>,
}

impl Dashboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, payload: &UpdatePayload) {
        if let Some(peers) = &payload.peers {
            self.peers_region = Some(render_peer_rows(peers));
        }
        if let Some(files) = &payload.files {
            self.files_region = Some(render_file_rows(files));
        }
    }

    #[must_use]
    pub fn peers_region(&self) -> Option<&str> {
        self.peers_region.as_deref()
    }

    #[must_use]
    pub fn files_region(&self) -> Option<&str> {
        self.files_region.as_deref()
    }
}
