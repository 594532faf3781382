//! This is the `ConfigFile` struct.
//!
//! This is for finding the right default location for the configuration file of
//! `exportctl`.  This is a configuration file/struct neutral loading engine, storing only the
//! base directory and with `load()` read the proper file or the default one.
//!
//! Files ending in `.hcl` are parsed as HCL, everything else as JSON.  The schema is the same
//! for both.
//!
//! This encapsulates the configuration file, available with `.inner()` or `.into_inner()`.
//!

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, trace};

use crate::makepath;

/// Config filename
pub const CONFIG: &str = "config.json";

/// Main name for the directory base
pub const TAG: &str = "exportctl";

/// Everything that can go wrong while reading the configuration file.
///
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown config file {0:?}, no default in {1:?}")]
    NotFound(PathBuf, PathBuf),
    #[error("No HOME variable defined, can not find the configuration")]
    NoHome,
    #[error("Error reading {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Error parsing {path:?}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// Supported on-disk formats, selected by extension.
///
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Syntax {
    Hcl,
    Json,
}

impl Syntax {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("hcl") => Syntax::Hcl,
            _ => Syntax::Json,
        }
    }
}

/// Configuration file for the CLI tool, holding the base directory and the parsed content.
///
#[derive(Debug)]
pub struct ConfigFile<T: Debug + DeserializeOwned> {
    /// Tag is the project name.
    tag: String,
    /// This is the base directory for all files.
    basedir: PathBuf,
    /// The file we actually read.
    path: PathBuf,
    inner: T,
}

impl<T> ConfigFile<T>
where
    T: Debug + DeserializeOwned,
{
    /// Returns `$HOME/.config/<tag>` (or `%LOCALAPPDATA%\<tag>`)
    ///
    #[tracing::instrument]
    pub fn basedir(tag: &str) -> Result<PathBuf, ConfigError> {
        let base = BaseDirs::new().ok_or(ConfigError::NoHome)?;

        #[cfg(unix)]
        let base = base.home_dir().join(".config");

        #[cfg(windows)]
        let base = base.data_local_dir().to_path_buf();

        debug!("base = {base:?}");
        let base: PathBuf = makepath!(base, tag);
        Ok(base)
    }

    /// Returns the path of the default config file
    ///
    #[tracing::instrument]
    pub fn default_file() -> Result<PathBuf, ConfigError> {
        let cfg = Self::basedir(TAG)?.join(CONFIG);
        debug!("default = {cfg:?}");
        Ok(cfg)
    }

    /// Load the file and return a struct T in the right format.
    ///
    /// Use the following search path:
    /// - file specified on CLI
    /// - default basedir (base on $HOME or $LOCALAPPDATA)
    ///
    #[tracing::instrument]
    pub fn load(fname: Option<&Path>) -> Result<ConfigFile<T>, ConfigError> {
        let fname = match fname {
            Some(fname) => fname.to_path_buf(),
            None => Self::default_file()?,
        };

        if !fname.exists() {
            return Err(ConfigError::NotFound(
                fname,
                Self::default_file().unwrap_or_default(),
            ));
        }

        let basedir = fname
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        trace!("Loading config file {fname:?} from {basedir:?}");

        let data = fs::read_to_string(&fname).map_err(|source| ConfigError::Read {
            path: fname.clone(),
            source,
        })?;

        let inner = Self::parse(&fname, &data)?;
        debug!("struct data = {inner:?}");

        Ok(ConfigFile {
            tag: TAG.to_string(),
            basedir,
            path: fname,
            inner,
        })
    }

    /// Parse `data` according to the extension of `fname`.
    ///
    fn parse(fname: &Path, data: &str) -> Result<T, ConfigError> {
        let res = match Syntax::of(fname) {
            Syntax::Hcl => hcl::from_str(data).map_err(|e| e.to_string()),
            Syntax::Json => serde_json::from_str(data).map_err(|e| e.to_string()),
        };
        res.map_err(|reason| ConfigError::Parse {
            path: fname.to_path_buf(),
            reason,
        })
    }

    /// Returns the project tag
    ///
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns the directory holding the file we loaded
    ///
    pub fn config_path(&self) -> &Path {
        &self.basedir
    }

    /// Returns the file we loaded
    ///
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the inner configuration
    ///
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Consume the wrapper
    ///
    pub fn into_inner(self) -> T {
        self.inner
    }
}
