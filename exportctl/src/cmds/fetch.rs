//! This is the module handling the `fetch` sub-command.
//!
//! Without destination, the content is displayed on `stdout`: JSON is re-indented, compressed
//! files are inflated first and shown as a JSON string.
//!

use std::io::{self, Read, Write};

use eyre::Result;
use flate2::read::GzDecoder;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Serializer, Value};
use tracing::{info, trace, warn};

use exporter_sources::{Environment, ExportClient, ExportError, Response};

use crate::{FetchOpts, FileStore};

/// Name of the saved file when fetching the manifest list.
pub const MANIFESTS: &str = "manifests";

/// Fetch one file (or the manifest list) from the given environment then save or display it.
///
#[tracing::instrument(skip(client, env))]
pub async fn fetch_from_service(
    client: &ExportClient,
    env: &Environment,
    fopts: &FetchOpts,
) -> Result<()> {
    trace!("fetch_from_service({:?})", fopts.path);

    let path = fopts.path.as_deref().filter(|p| !p.is_empty());
    let resp = client.get(env, path).await?;

    match &fopts.dest {
        Some(dest) => {
            let store = FileStore::new(dest);
            let file = store.save(path.unwrap_or(MANIFESTS), &resp.body).await?;
            info!("{} bytes written to {}", resp.body.len(), file.display());
        }
        None => {
            let out = render(&resp)?;

            let mut stdout = io::stdout().lock();
            stdout.write_all(&out)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Prepare the body for display.
///
pub fn render(resp: &Response) -> Result<Vec<u8>, ExportError> {
    let mut out = if resp.binary {
        match gunzip(&resp.body) {
            Ok(text) => pretty(&Value::String(text))?,
            Err(e) => {
                warn!("could not gunzip: {}", e);
                resp.body.clone()
            }
        }
    } else {
        match serde_json::from_slice::<Value>(&resp.body) {
            Ok(value) => pretty(&value)?,
            Err(e) => {
                trace!("not JSON, displaying as-is: {}", e);
                resp.body.clone()
            }
        }
    };
    if !out.ends_with(b"\n") {
        out.push(b'\n');
    }
    Ok(out)
}

fn gunzip(data: &[u8]) -> io::Result<String> {
    let mut text = String::new();
    GzDecoder::new(data).read_to_string(&mut text)?;
    Ok(text)
}

/// Four spaces indentation.
///
fn pretty(value: &Value) -> Result<Vec<u8>, ExportError> {
    let mut out = Vec::new();
    let mut ser = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    Ok(out)
}
