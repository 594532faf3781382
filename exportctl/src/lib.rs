//! Library part of the `exportctl` utility.
//!
//! The signing and HTTP parts live in `exporter-sources`, here we have the command-line
//! options, the local storage of downloaded files and one module per sub-command.
//!
//! Two ways of getting data:
//!
//! - `fetch` for one file, or the manifest list, displayed or saved,
//! - `bulk` for every file of a manifest selected by version, date and group.
//!

pub use cli::*;
pub use cmds::*;
pub use config::*;
pub use storage::*;

mod cli;
mod cmds;
mod config;
mod storage;
