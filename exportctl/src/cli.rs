//! Module describing all possible commands and sub-commands to the `exportctl` main driver
//!
//! We have two main commands:
//!
//! - `fetch`
//! - `bulk`
//!
//! `fetch` retrieve a single file (or the manifest index when no path is given) and either
//! saves it under a destination directory or displays it on `stdout`.
//!
//! `bulk` finds the manifest for a given version, date and group (`fulls` and/or
//! `incrementals`) in the index then downloads every file it lists, optionally restricted to
//! one category (`reviews`, `questions`, …).
//!
//! `list environments` shows what is in the configuration file, `completion` is here just to
//! configure the various shells completion system.
//!

use std::path::PathBuf;

use clap::{
    crate_authors, crate_description, crate_name, crate_version, Parser, Subcommand, ValueEnum,
};
use clap_complete::shells::Shell;

use exporter_sources::{Group, ALL, DEF_TIMEOUT};

/// CLI options
#[derive(Parser)]
#[command(disable_version_flag = true)]
#[clap(name = crate_name!(), about = crate_description!())]
#[clap(version = crate_version!(), author = crate_authors!())]
pub struct Opts {
    /// configuration file.
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,
    /// debug mode.
    #[clap(short = 'D', long = "debug")]
    pub debug: bool,
    /// Also log into hourly files in this directory.
    #[clap(short = 'L', long)]
    pub log_dir: Option<String>,
    /// Timeout for every HTTP request, in seconds.
    #[clap(
        short = 't',
        long,
        default_value_t = DEF_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,
    /// Verbose mode.
    #[clap(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
    /// Sub-commands (see below).
    #[clap(subcommand)]
    pub subcmd: SubCommand,
}

// ------

/// All sub-commands:
///
/// `bulk -e ENV --date DATE [--type CAT] [--fulls] [--incrementals] [-d DIR]`
/// `completion SHELL`
/// `fetch -e ENV [-p PATH] [-d DIR]`
/// `list environments`
/// `version`
///
#[derive(Debug, Subcommand)]
pub enum SubCommand {
    /// Download all files of a manifest
    Bulk(BulkOpts),
    /// Generate Completion stuff
    Completion(ComplOpts),
    /// Fetch one file or the list of manifests
    Fetch(FetchOpts),
    /// List things from the configuration
    List(ListOpts),
    /// List all package versions
    Version,
}

// ------

/// Options for fetching one file, displayed or saved.
///
#[derive(Debug, Parser)]
pub struct FetchOpts {
    /// Environment of the export service (must be present in config file).
    #[clap(short = 'e', long)]
    pub env: String,
    /// File path, the manifest list if not specified.
    #[clap(short = 'p', long)]
    pub path: Option<String>,
    /// Destination folder to store downloaded data, display it if not specified.
    #[clap(short = 'd', long)]
    pub dest: Option<PathBuf>,
}

// ------

/// Which family of tool we behave like, they differ in the default data version.
///
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Service {
    #[default]
    Exporter,
    Dce,
}

impl Service {
    pub fn default_version(&self) -> &'static str {
        match self {
            Service::Exporter => "v1",
            Service::Dce => "v2",
        }
    }
}

/// How files of a manifest are downloaded.
///
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum DownloadMode {
    /// One after the other, stop at the first error.
    #[default]
    Sequential,
    /// All at once, wait for every one of them.
    Concurrent,
}

/// What happens to the writes of downloaded files.
///
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum WriteMode {
    /// A failed write fails the download.
    #[default]
    Awaited,
    /// Writes run in the background, failures are only logged.
    Detached,
}

/// Options for `bulk`.
///
#[derive(Debug, Parser)]
pub struct BulkOpts {
    /// Environment of the export service (must be present in config file).
    #[clap(short = 'e', long)]
    pub env: String,
    /// Date of files to download, in YYYY-mm-dd format.
    #[clap(long)]
    pub date: String,
    /// Type of files, like reviews, questions…
    #[clap(long = "type", default_value = ALL)]
    pub category: String,
    /// Version of data to retrieve (default depends on the service).
    #[clap(long = "data-version", alias = "v")]
    pub version: Option<String>,
    /// Service flavour.
    #[clap(short = 'S', long, value_enum, default_value_t)]
    pub service: Service,
    /// Destination folder to store downloaded data.
    #[clap(short = 'd', long, default_value = "./output")]
    pub dest: PathBuf,
    /// Retrieve fulls.
    #[clap(long)]
    pub fulls: bool,
    /// Retrieve incrementals.
    #[clap(long)]
    pub incrementals: bool,
    /// Download files one by one or all together.
    #[clap(long, value_enum, default_value_t)]
    pub mode: DownloadMode,
    /// Wait for every write or let them run in the background.
    #[clap(long, value_enum, default_value_t)]
    pub writes: WriteMode,
}

impl BulkOpts {
    /// Data version, explicit or from the service flavour.
    ///
    pub fn version(&self) -> String {
        self.version
            .clone()
            .unwrap_or_else(|| self.service.default_version().to_string())
    }

    /// Requested groups, `fulls` first.
    ///
    pub fn groups(&self) -> Vec<Group> {
        let mut groups = vec![];
        if self.fulls {
            groups.push(Group::Fulls);
        }
        if self.incrementals {
            groups.push(Group::Incrementals);
        }
        groups
    }
}

// ------

/// Options to generate completion files at runtime
///
#[derive(Debug, Parser)]
pub struct ComplOpts {
    #[clap(value_parser)]
    pub shell: Shell,
}

// ------

/// All `list` sub-commands:
///
/// `list environments`
///
#[derive(Debug, Parser)]
pub struct ListOpts {
    #[clap(value_parser)]
    pub cmd: ListSubCommand,
}

/// These are the sub-commands for `list`
///
#[derive(Clone, Copy, Debug, Ord, PartialOrd, Eq, PartialEq, ValueEnum)]
pub enum ListSubCommand {
    /// List all environments from the configuration file
    Environments,
}
