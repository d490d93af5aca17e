use std::error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use reqwest::{Client, StatusCode};

use super::normalize::parse_feed;
use super::whitelist::Whitelist;

#[derive(Debug)]
pub enum FetchError {
    /// Could not build the client, connect, or the request timed out
    Transport(reqwest::Error),
    /// Feed server responded with something other than 200. [status]
    Status(u16),
    /// Response body could not be read as text
    Body(reqwest::Error),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use FetchError::*;
        match self {
            Transport(err) => write!(f, "Request failed: {}", err),
            Status(code) => write!(f, "Unexpected status code: {}", code),
            Body(err) => write!(f, "Error reading response body: {}", err),
        }
    }
}

impl error::Error for FetchError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            FetchError::Transport(err) | FetchError::Body(err) => Some(err),
            FetchError::Status(_) => None,
        }
    }
}

/// Downloads a feed document and turns it into prefixes ready to announce
#[derive(Clone, Debug)]
pub struct FeedFetcher {
    url: String,
    client: Client,
    whitelist: Arc<Whitelist>,
}

impl FeedFetcher {
    pub fn new(url: &str, timeout: Duration, whitelist: Arc<Whitelist>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Transport)?;
        Ok(Self {
            url: url.to_string(),
            client,
            whitelist,
        })
    }

    /// GET the feed, returning unique normalized prefixes minus whitelisted ones
    pub async fn fetch(&self) -> Result<Vec<String>, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(FetchError::Transport)?;
        if response.status() != StatusCode::OK {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        let body = response.text().await.map_err(FetchError::Body)?;
        debug!("[Feed {}] Received {} bytes", self.url, body.len());

        let prefixes = parse_feed(&body)
            .into_iter()
            .filter(|prefix| {
                if self.whitelist.contains(prefix) {
                    info!("Prefix {} is whitelisted. Ignore it.", prefix);
                    false
                } else {
                    true
                }
            })
            .collect();
        Ok(prefixes)
    }
}
