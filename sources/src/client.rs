//! HTTP access to the export service.
//!
//! All calls are signed `GET`s on the environment URL: without parameter we get the manifest
//! index, with `path=` we get that specific manifest or data file.  Redirects are followed (2
//! hops at most), there is no retry.
//!

use std::time::Duration;

use clap::{crate_name, crate_version};
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;
use tracing::{debug, info, trace};

use crate::{Environment, ExportError, SignedRequest};

/// Default per-request timeout
pub const DEF_TIMEOUT: Duration = Duration::from_secs(30);
/// How many redirections we follow
pub const MAX_REDIRECTS: usize = 2;

/// Tunables for the HTTP client
///
#[derive(Clone, Debug)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub max_redirects: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            timeout: DEF_TIMEOUT,
            max_redirects: MAX_REDIRECTS,
        }
    }
}

/// What we got back from the service.
///
#[derive(Clone, Debug)]
pub struct Response {
    /// HTTP status, always 2xx
    pub status: u16,
    /// Raw content
    pub body: Vec<u8>,
    /// Whether we asked for a compressed file, in which case the body is opaque
    pub binary: bool,
}

impl Response {
    /// Body as UTF-8 text
    ///
    pub fn text(&self) -> Result<String, ExportError> {
        String::from_utf8(self.body.clone()).map_err(|e| ExportError::Decode(e.to_string()))
    }

    /// Body as JSON
    ///
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ExportError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Compressed exports are the only binary content, they always have "gz" in their path.
///
#[inline]
pub fn is_binary(path: Option<&str>) -> bool {
    path.is_some_and(|p| p.contains("gz"))
}

/// Signed client for the export service.  Cheap to clone.
///
#[derive(Clone, Debug)]
pub struct ExportClient {
    client: reqwest::Client,
}

impl ExportClient {
    #[tracing::instrument]
    pub fn new(opts: &ClientOptions) -> Result<Self, ExportError> {
        trace!("exportclient::new");

        let client = reqwest::Client::builder()
            .redirect(Policy::limited(opts.max_redirects))
            .timeout(opts.timeout)
            .user_agent(format!("{}/{}", crate_name!(), crate_version!()))
            .build()?;
        Ok(ExportClient { client })
    }

    /// Fetch `path`, or the manifest index when there is none.
    ///
    #[tracing::instrument(skip(self, env))]
    pub async fn get(
        &self,
        env: &Environment,
        path: Option<&str>,
    ) -> Result<Response, ExportError> {
        match path {
            Some(path) => info!("Downloading {}", path),
            None => info!("Retrieving manifests"),
        }

        // Fresh timestamp for every call
        //
        let req = SignedRequest::new(env, path);

        let mut rb = self.client.get(&req.uri).query(&req.query());
        for (name, value) in req.headers() {
            rb = rb.header(name, value);
        }

        let resp = rb.send().await?;
        debug!("raw resp={:?}", &resp);

        // Check status
        //
        let status = resp.status();
        if !status.is_success() {
            return Err(ExportError::HttpStatus {
                code: status.as_u16(),
                message: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let body = resp.bytes().await?.to_vec();
        trace!("got {} bytes", body.len());

        Ok(Response {
            status: status.as_u16(),
            body,
            binary: is_binary(path),
        })
    }
}
