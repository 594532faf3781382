//! Module that defines what an environment of the export service is.
//!
//! This is used to configure the list of possible environments through `config.json`, each one
//! being an endpoint URL and the passkey/secret pair used to sign requests:
//!
//! ```json
//! {
//!     "prod": { "url": "https://…", "passkey": "…", "secret": "…" }
//! }
//! ```
//!

use std::collections::btree_map::Iter;
use std::collections::BTreeMap;
use std::fmt::{Debug, Display, Formatter};

use serde::{Deserialize, Serialize};
use tabled::builder::Builder;
use tabled::settings::Style;
use tracing::trace;

use crate::ExportError;

/// One environment of the export service.  Missing fields are accepted while parsing and
/// rejected by `Environments::get()`.
///
#[derive(Clone, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Environment {
    /// Endpoint
    #[serde(default)]
    pub url: String,
    /// Identifies the caller, sent with every request
    #[serde(default)]
    pub passkey: String,
    /// HMAC key, never sent
    #[serde(default)]
    pub secret: String,
}

impl Environment {
    pub fn new(url: &str, passkey: &str, secret: &str) -> Self {
        Environment {
            url: url.to_string(),
            passkey: passkey.to_string(),
            secret: secret.to_string(),
        }
    }

    /// List the fields that are missing or empty
    ///
    fn missing(&self) -> Vec<&'static str> {
        [
            ("url", &self.url),
            ("passkey", &self.passkey),
            ("secret", &self.secret),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_empty())
        .map(|(k, _)| k)
        .collect()
    }
}

impl Debug for Environment {
    /// Same as `Display`, the secret must not end up in logs
    ///
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Environment{self}")
    }
}

impl Display for Environment {
    /// Obfuscate the secret
    ///
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ url={} passkey={} secret=HIDDEN }}",
            self.url, self.passkey
        )
    }
}

/// All environments from the configuration file, by name.
///
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Environments(BTreeMap<String, Environment>);

impl From<BTreeMap<String, Environment>> for Environments {
    fn from(value: BTreeMap<String, Environment>) -> Self {
        Environments(value)
    }
}

impl Environments {
    /// Look the environment up and check that it is complete.
    ///
    #[tracing::instrument(skip(self))]
    pub fn get(&self, name: &str) -> Result<Environment, ExportError> {
        trace!("Loading environment {}", name);

        let env = self
            .0
            .get(name)
            .ok_or_else(|| ExportError::EnvironmentLookup {
                name: name.to_string(),
                reason: "not found in config".to_string(),
            })?;

        let missing = env.missing();
        if !missing.is_empty() {
            return Err(ExportError::EnvironmentLookup {
                name: name.to_string(),
                reason: format!(
                    "is missing one or more properties: {} in {}",
                    missing.join(", "),
                    env
                ),
            });
        }
        Ok(env.clone())
    }

    pub fn iter(&self) -> Iter<'_, String, Environment> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// List of currently known environments into a nicely formatted string.
    ///
    #[tracing::instrument(skip(self))]
    pub fn list(&self) -> String {
        let header = ["Name", "URL", "Passkey", "Secret"].map(String::from);

        let mut builder = Builder::default();
        builder.push_record(header);

        self.0.iter().for_each(|(n, e)| {
            let secret = if e.secret.is_empty() { "" } else { "HIDDEN" };
            builder.push_record([
                n.clone(),
                e.url.clone(),
                e.passkey.clone(),
                secret.to_string(),
            ]);
        });

        let table = builder.build().with(Style::modern()).to_string();
        format!("List all environments:\n{table}")
    }
}
