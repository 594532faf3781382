//! Request signing.
//!
//! Every request carries the passkey, a millisecond timestamp and an HMAC-SHA256 signature of
//! the canonical message built from them (and the `path` parameter when there is one), keyed by
//! the environment's secret.  The server recomputes the exact same string so field order and
//! separators matter:
//!
//! ```text
//! path=<path>&passkey=<passkey>&timestamp=<ms>
//! passkey=<passkey>&timestamp=<ms>
//! ```
//!

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::trace;

use crate::Environment;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the passkey
pub const PASSKEY_HEADER: &str = "X-Bazaarvoice-Passkey";
/// Header carrying the signature
pub const SIGNATURE_HEADER: &str = "X-Bazaarvoice-Signature";
/// Header carrying the timestamp
pub const TIMESTAMP_HEADER: &str = "X-Bazaarvoice-Timestamp";

/// Build the canonical message.  An empty path is the same as no path at all.
///
pub fn message(passkey: &str, timestamp: i64, path: Option<&str>) -> String {
    match path {
        Some(path) if !path.is_empty() => {
            format!("path={path}&passkey={passkey}&timestamp={timestamp}")
        }
        _ => format!("passkey={passkey}&timestamp={timestamp}"),
    }
}

/// HMAC-SHA256 of `message` keyed by `secret`, lowercase hex.
///
pub fn signature(message: &str, secret: &str) -> String {
    // HMAC accepts keys of any length, this can not fail.
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Sign a request for `path` (or the manifest list) at `timestamp` (ms since the epoch).
///
pub fn sign(passkey: &str, secret: &str, timestamp: i64, path: Option<&str>) -> String {
    signature(&message(passkey, timestamp, path), secret)
}

/// Everything needed to authenticate one request.  Built right before sending, never reused
/// since the signature is only valid for this timestamp.
///
#[derive(Clone, Debug)]
pub struct SignedRequest {
    pub uri: String,
    pub path: Option<String>,
    pub passkey: String,
    pub signature: String,
    pub timestamp: i64,
}

impl SignedRequest {
    /// Sign with the current time
    ///
    #[tracing::instrument(skip(env))]
    pub fn new(env: &Environment, path: Option<&str>) -> Self {
        Self::at(env, path, Utc::now().timestamp_millis())
    }

    /// Sign with an explicit timestamp
    ///
    pub fn at(env: &Environment, path: Option<&str>, timestamp: i64) -> Self {
        let signature = sign(&env.passkey, &env.secret, timestamp, path);
        trace!("signed {:?} at {}", path, timestamp);

        SignedRequest {
            uri: env.url.clone(),
            path: path.filter(|p| !p.is_empty()).map(String::from),
            passkey: env.passkey.clone(),
            signature,
            timestamp,
        }
    }

    /// The three authentication headers, in the order the service documents them.
    ///
    pub fn headers(&self) -> [(&'static str, String); 3] {
        [
            (PASSKEY_HEADER, self.passkey.clone()),
            (SIGNATURE_HEADER, self.signature.clone()),
            (TIMESTAMP_HEADER, self.timestamp.to_string()),
        ]
    }

    /// Query parameters, empty for the manifest list.
    ///
    pub fn query(&self) -> Vec<(&'static str, &str)> {
        match &self.path {
            Some(path) => vec![("path", path.as_str())],
            None => vec![],
        }
    }
}
