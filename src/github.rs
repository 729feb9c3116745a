use std::time::Duration;

use anyhow::{bail, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::SourceConfig;

/// Bytes left alone by JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub user_agent: String,
    pub http_client: Option<HttpClient>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("listing url invalid: {0}")]
    Url(#[from] url::ParseError),
    #[error("listing request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("listing returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("listing body is not a list of entries: {0}")]
    Decode(#[source] serde_json::Error),
}

/// One object of the contents API response. Missing fields default to empty
/// and the image filter drops such entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContentItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub download_url: Option<String>,
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("github client user agent required");
        }

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(Duration::from_secs(20))
                .build()?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
        })
    }

    pub fn list_contents(&self, source: &SourceConfig) -> Result<Vec<ContentItem>, ListingError> {
        let url = contents_url(source)?;
        tracing::debug!(%url, "requesting repository listing");
        let response = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .map_err(ListingError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ListingError::Status(status));
        }

        let body = response.bytes().map_err(ListingError::Transport)?;
        decode_listing(&body)
    }
}

/// Only the outer array is mandatory; entries that do not decode are skipped.
pub fn decode_listing(body: &[u8]) -> Result<Vec<ContentItem>, ListingError> {
    let entries: Vec<serde_json::Value> =
        serde_json::from_slice(body).map_err(ListingError::Decode)?;
    let total = entries.len();
    let items: Vec<ContentItem> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect();
    if items.len() < total {
        tracing::debug!(skipped = total - items.len(), "ignoring malformed listing entries");
    }
    Ok(items)
}

/// `<api_base>/repos/<owner>/<repo>/contents/<folder>?ref=<branch>`
pub fn contents_url(source: &SourceConfig) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(source.api_base.trim_end_matches('/'))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
        segments.pop_if_empty();
        segments.extend(["repos", source.owner.as_str(), source.repo.as_str(), "contents"]);
        for part in source.folder.split('/').filter(|part| !part.is_empty()) {
            segments.push(part);
        }
    }
    url.query_pairs_mut().append_pair("ref", &source.branch);
    Ok(url)
}

/// Direct link to a file on the raw-content host, used when the listing
/// omits `download_url`.
pub fn raw_url(source: &SourceConfig, path: &str) -> String {
    format!(
        "{}/{}/{}/{}/{}",
        source.raw_base.trim_end_matches('/'),
        source.owner,
        source.repo,
        source.branch,
        utf8_percent_encode(path, URI_COMPONENT)
    )
}
