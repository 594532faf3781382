//! Local storage of downloaded files.
//!
//! Everything lands under one root directory, mirroring the paths given by the manifests.
//!

use std::io;
use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tracing::{info, trace};

use exporter_sources::ExportError;

/// Destination tree for downloads.
///
#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: &Path) -> Self {
        FileStore {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `rel` would be written.  Leading `/` are removed so that absolute paths from
    /// manifests stay under the root, `..` is refused for the same reason.
    ///
    pub fn target(&self, rel: &str) -> Result<PathBuf, ExportError> {
        let rel = Path::new(rel.trim_start_matches('/'));
        if rel.components().any(|c| c == Component::ParentDir) {
            let source = io::Error::new(io::ErrorKind::InvalidInput, "path outside of destination");
            return Err(ExportError::Io {
                path: self.root.join(rel),
                source,
            });
        }
        Ok(self.root.join(rel))
    }

    /// Write `content` into `rel`, creating all intermediate directories.  An existing file
    /// is overwritten.
    ///
    #[tracing::instrument(skip(self, content))]
    pub async fn save(&self, rel: &str, content: &[u8]) -> Result<PathBuf, ExportError> {
        let file = self.target(rel)?;
        info!("Saving as {}", file.display());

        let io_err = |source| ExportError::Io {
            path: file.clone(),
            source,
        };

        if let Some(dir) = file.parent() {
            trace!("mkdir -p {:?}", dir);
            fs::create_dir_all(dir).await.map_err(io_err)?;
        }
        fs::write(&file, content).await.map_err(io_err)?;
        Ok(file)
    }
}
