use anyhow::{Context, Result};
use reqwest::blocking::Client;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("http status {0}")]
    Status(u16),
    /// The request never produced a response.
    #[error("{0}")]
    Transport(String),
}

/// Source of listing pages and documents.
pub trait Fetcher {
    fn fetch_bytes(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError>;

    fn fetch_text(&self, url: &str) -> std::result::Result<String, FetchError> {
        let bytes = self.fetch_bytes(url)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent.to_string())
            .build()
            .context("failed to build http client")?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_bytes(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        let body = response
            .bytes()
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::{FetchError, Fetcher};
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// In-memory fetcher keyed by absolute URL.
    #[derive(Default)]
    pub struct FakeFetcher {
        routes: RefCell<HashMap<String, Result<Vec<u8>, FetchError>>>,
        pub requests: RefCell<Vec<String>>,
    }

    impl FakeFetcher {
        pub fn serve(&self, url: &str, body: impl Into<Vec<u8>>) {
            self.routes
                .borrow_mut()
                .insert(url.to_string(), Ok(body.into()));
        }

        pub fn fail(&self, url: &str, err: FetchError) {
            self.routes.borrow_mut().insert(url.to_string(), Err(err));
        }
    }

    impl Fetcher for FakeFetcher {
        fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.requests.borrow_mut().push(url.to_string());
            self.routes
                .borrow()
                .get(url)
                .cloned()
                .unwrap_or(Err(FetchError::Status(404)))
        }
    }
}
