//! This is the module handling the `list` sub-command.
//!

use eyre::Result;
use tracing::{info, trace};

use exporter_sources::Environments;

use crate::{ListOpts, ListSubCommand};

/// Return the listing asked for, ready to display.
///
#[tracing::instrument(skip(envs))]
pub fn list_from_config(envs: &Environments, lopts: &ListOpts) -> Result<String> {
    trace!("list_from_config");

    let str = match lopts.cmd {
        ListSubCommand::Environments => {
            info!("Listing all environments:");

            envs.list()
        }
    };
    Ok(str)
}
