//! Configuration of `exportctl`.
//!
//! The file only holds the environments we can talk to, see `Environments`.
//!

use std::path::Path;

use tracing::trace;

use exporter_common::ConfigFile;
use exporter_sources::{Environments, ExportError};

/// Read the configuration from `fname` or the default location.
///
#[tracing::instrument]
pub fn load_environments(fname: Option<&Path>) -> Result<Environments, ExportError> {
    let cfg = ConfigFile::<Environments>::load(fname)?;
    trace!("loaded {} environments from {:?}", cfg.inner().len(), cfg.path());
    Ok(cfg.into_inner())
}
