use std::io;
use std::time::Duration;

use clap::{crate_authors, crate_description, crate_version, CommandFactory, Parser};
use clap_complete::generate;
use eyre::Result;
use tracing::trace;

use exporter_common::init_logging;
use exporter_sources::{ClientOptions, ExportClient};

use exportctl::{
    bulk_download, fetch_from_service, list_from_config, load_environments, Opts, SubCommand,
};

/// Binary name, using a different binary name
pub const NAME: &str = env!("CARGO_BIN_NAME");
/// Binary version
pub const VERSION: &str = crate_version!();
/// Authors
pub const AUTHORS: &str = crate_authors!();

#[tokio::main]
async fn main() -> Result<()> {
    let opts = Opts::parse();

    // Initialise logging, `stdout` is only for data.
    //
    init_logging(NAME, opts.debug, opts.verbose > 0, opts.log_dir.clone())?;

    // Banner
    //
    if opts.verbose > 0 {
        banner()?;
    }

    handle_subcmd(&opts).await
}

pub async fn handle_subcmd(opts: &Opts) -> Result<()> {
    let cfn = opts.config.as_deref();
    let clopts = ClientOptions {
        timeout: Duration::from_secs(opts.timeout),
        ..ClientOptions::default()
    };

    match &opts.subcmd {
        // Handle `fetch -e env [-p path]`
        //
        SubCommand::Fetch(fopts) => {
            trace!("fetch");

            // Config & environment are checked before any network activity.
            //
            let env = load_environments(cfn)?.get(&fopts.env)?;
            let client = ExportClient::new(&clopts)?;

            fetch_from_service(&client, &env, fopts).await?;
        }

        // Handle `bulk -e env --date date`
        //
        SubCommand::Bulk(bopts) => {
            trace!("bulk");

            let env = load_environments(cfn)?.get(&bopts.env)?;
            let client = ExportClient::new(&clopts)?;

            bulk_download(&client, &env, bopts).await?;
        }

        // Standalone completion generation
        //
        // NOTE: you can generate UNIX shells completion on Windows and vice-versa.  Not worth
        //       trying to limit depending on the OS.
        //
        SubCommand::Completion(copts) => {
            let generator = copts.shell;
            generate(generator, &mut Opts::command(), NAME, &mut io::stdout());
        }

        // Standalone `list` command
        //
        SubCommand::List(lopts) => {
            trace!("list");

            let envs = load_environments(cfn)?;
            let str = list_from_config(&envs, lopts)?;
            eprintln!("{}", str);
        }

        // Standalone `version` command
        //
        SubCommand::Version => {
            eprintln!("{}", version());
            eprintln!("Modules: ");
            eprintln!("\t{}", exporter_common::version());
            eprintln!("\t{}", exporter_sources::version());
        }
    }
    Ok(())
}

/// Return our version number
///
#[inline]
pub fn version() -> String {
    format!("{}/{}", NAME, VERSION)
}

/// Display banner
///
fn banner() -> Result<()> {
    Ok(eprintln!(
        r##"
{}/{} by {}
{}
"##,
        NAME,
        VERSION,
        AUTHORS,
        crate_description!()
    ))
}
