//! This is the module handling the `bulk` sub-command.
//!
//! For every requested group we go through the same steps:
//!
//! 1. get the manifest list,
//! 2. find the manifest for our version and date,
//! 3. get that manifest and extract the files for the category,
//! 4. download and save every file.
//!
//! Groups are independent, one failing does not prevent the other from running.
//!

use std::path::PathBuf;

use eyre::{eyre, Result};
use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

use exporter_sources::{
    files_for_category, find_manifest_path, Environment, ExportClient, ExportError, Group,
    ManifestIndex, ResolvedManifest,
};

use crate::{BulkOpts, DownloadMode, FileStore, WriteMode};

/// A background write
type Pending = JoinHandle<Result<PathBuf, ExportError>>;

/// Download every file of the selected manifests.
///
#[tracing::instrument(skip(client, env))]
pub async fn bulk_download(
    client: &ExportClient,
    env: &Environment,
    bopts: &BulkOpts,
) -> Result<()> {
    trace!("bulk_download({})", bopts.date);

    let groups = bopts.groups();
    if groups.is_empty() {
        return Err(eyre!("Must specify one or both of [--fulls, --incrementals]"));
    }

    let version = bopts.version();
    let store = FileStore::new(&bopts.dest);

    let mut failed = vec![];
    for group in groups {
        match download_group(client, env, &store, bopts, &version, group).await {
            Ok(files) => {
                info!("{}: {} files in {}", group, files.len(), store.root().display());
                debug!("Downloaded files: {:?}", files);
            }
            Err(e) => {
                error!("{}: {}", group, e);
                failed.push(format!("{group}: {e}"));
            }
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(eyre!(failed.join("\n")))
    }
}

/// Run all the steps for one group and return the list of downloaded files.
///
#[tracing::instrument(skip(client, env, store, bopts))]
pub async fn download_group(
    client: &ExportClient,
    env: &Environment,
    store: &FileStore,
    bopts: &BulkOpts,
    version: &str,
    group: Group,
) -> Result<Vec<String>, ExportError> {
    let resp = client.get(env, None).await?;
    let index = ManifestIndex::from_slice(&resp.body)?;

    let path = find_manifest_path(&index, version, &bopts.date, group)?;

    let resp = client.get(env, Some(&path)).await?;
    let resolved = ResolvedManifest::from_slice(&resp.body)?;

    let files = files_for_category(&resolved, &bopts.category);
    info!(
        "{} files to download for {} type={}",
        files.len(),
        group,
        bopts.category
    );

    let mut pending = vec![];
    let res = match bopts.mode {
        DownloadMode::Sequential => {
            sequential(client, env, store, &files, bopts.writes, &mut pending).await
        }
        DownloadMode::Concurrent => {
            concurrent(client, env, store, &files, bopts.writes, &mut pending).await
        }
    };

    // Whatever happened, do not leave writes behind.
    //
    drain(pending).await;
    res
}

/// One after the other, stop at the first error.
///
async fn sequential(
    client: &ExportClient,
    env: &Environment,
    store: &FileStore,
    files: &[String],
    writes: WriteMode,
    pending: &mut Vec<Pending>,
) -> Result<Vec<String>, ExportError> {
    let mut done = vec![];
    for file in files {
        let (path, bg) = download_file(client, env, store, file, writes).await?;
        pending.extend(bg);
        done.push(path);
    }
    Ok(done)
}

/// Everything at once, every download settles before we report the first error.
///
async fn concurrent(
    client: &ExportClient,
    env: &Environment,
    store: &FileStore,
    files: &[String],
    writes: WriteMode,
    pending: &mut Vec<Pending>,
) -> Result<Vec<String>, ExportError> {
    let all = files
        .iter()
        .map(|file| download_file(client, env, store, file, writes));

    let mut done = vec![];
    let mut first = None;
    for res in join_all(all).await {
        match res {
            Ok((path, bg)) => {
                pending.extend(bg);
                done.push(path);
            }
            Err(e) => {
                error!("{}", e);
                first.get_or_insert(e);
            }
        }
    }
    match first {
        Some(e) => Err(e),
        None => Ok(done),
    }
}

/// Get one file and save it, either right away or in the background.
///
async fn download_file(
    client: &ExportClient,
    env: &Environment,
    store: &FileStore,
    path: &str,
    writes: WriteMode,
) -> Result<(String, Option<Pending>), ExportError> {
    let resp = client.get(env, Some(path)).await?;

    let bg = match writes {
        WriteMode::Awaited => {
            store.save(path, &resp.body).await?;
            None
        }
        WriteMode::Detached => {
            let store = store.clone();
            let rel = path.to_string();
            Some(tokio::spawn(async move { store.save(&rel, &resp.body).await }))
        }
    };
    Ok((path.to_string(), bg))
}

/// Wait for background writes, failures are only logged.
///
async fn drain(pending: Vec<Pending>) {
    trace!("waiting for {} writes", pending.len());

    for handle in pending {
        match handle.await {
            Ok(Ok(file)) => trace!("{} written", file.display()),
            Ok(Err(e)) => error!("background write: {}", e),
            Err(e) => error!("background write aborted: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use httpmock::Mock;
    use rstest::rstest;
    use serde_json::json;
    use tempfile::{tempdir, TempDir};

    use exporter_sources::{ClientOptions, ErrorKind, ALL};

    use crate::Service;

    use super::*;

    const DATE: &str = "2024-01-01";

    fn bulk_opts(dest: &TempDir) -> BulkOpts {
        BulkOpts {
            env: "test".to_string(),
            date: DATE.to_string(),
            category: ALL.to_string(),
            version: Some("v2".to_string()),
            service: Service::Dce,
            dest: dest.path().to_path_buf(),
            fulls: true,
            incrementals: false,
            mode: DownloadMode::Sequential,
            writes: WriteMode::Awaited,
        }
    }

    fn client() -> ExportClient {
        ExportClient::new(&ClientOptions::default()).unwrap()
    }

    fn read(dir: &TempDir, rel: &str) -> String {
        std::fs::read_to_string(dir.path().join(rel)).unwrap()
    }

    /// Manifest list, only answers without `path`
    ///
    async fn mock_index(server: &MockServer) -> Mock<'_> {
        let index = json!({
            "manifests": [
                {"version": "v1", "fulls": [{"date": DATE, "path": "/v1/fulls.json"}]},
                {"version": "v2", "fulls": [{"date": DATE, "path": "/v2/fulls.json"}]}
            ]
        });
        server
            .mock_async(|when, then| {
                when.method(GET).path("/export").matches(|req| {
                    req.query_params
                        .as_ref()
                        .map_or(true, |q| q.iter().all(|(k, _)| k != "path"))
                });
                then.status(200).json_body(index.clone());
            })
            .await
    }

    async fn mock_path<'a>(
        server: &'a MockServer,
        path: &str,
        status: u16,
        body: &str,
    ) -> Mock<'a> {
        let (path, body) = (path.to_string(), body.to_string());
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/export")
                    .query_param("path", path.as_str());
                then.status(status).body(body.clone());
            })
            .await
    }

    async fn mock_manifest(server: &MockServer) -> Mock<'_> {
        mock_path(
            server,
            "/v2/fulls.json",
            200,
            r#"{
                "reviews": [{"path": "/data/reviews/r1.gz"}],
                "questions": [{"path": "/data/questions/q1.gz"}],
                "schemaVersion": "2"
            }"#,
        )
        .await
    }

    #[tokio::test]
    async fn test_download_group_sequential() {
        let server = MockServer::start_async().await;
        let index = mock_index(&server).await;
        let manifest = mock_manifest(&server).await;
        let r1 = mock_path(&server, "/data/reviews/r1.gz", 200, "R1").await;
        let q1 = mock_path(&server, "/data/questions/q1.gz", 200, "Q1").await;

        let dir = tempdir().unwrap();
        let bopts = bulk_opts(&dir);
        let env = Environment::new(&server.url("/export"), "p", "s");
        let store = FileStore::new(dir.path());

        let files = download_group(&client(), &env, &store, &bopts, "v2", Group::Fulls)
            .await
            .unwrap();

        index.assert_async().await;
        manifest.assert_async().await;
        r1.assert_async().await;
        q1.assert_async().await;
        assert_eq!(vec!["/data/reviews/r1.gz", "/data/questions/q1.gz"], files);
        assert_eq!("R1", read(&dir, "data/reviews/r1.gz"));
        assert_eq!("Q1", read(&dir, "data/questions/q1.gz"));
    }

    #[tokio::test]
    async fn test_download_group_concurrent_detached() {
        let server = MockServer::start_async().await;
        mock_index(&server).await;
        mock_manifest(&server).await;
        mock_path(&server, "/data/reviews/r1.gz", 200, "R1").await;
        mock_path(&server, "/data/questions/q1.gz", 200, "Q1").await;

        let dir = tempdir().unwrap();
        let mut bopts = bulk_opts(&dir);
        bopts.mode = DownloadMode::Concurrent;
        bopts.writes = WriteMode::Detached;
        let env = Environment::new(&server.url("/export"), "p", "s");
        let store = FileStore::new(dir.path());

        let files = download_group(&client(), &env, &store, &bopts, "v2", Group::Fulls)
            .await
            .unwrap();

        assert_eq!(2, files.len());
        assert_eq!("R1", read(&dir, "data/reviews/r1.gz"));
        assert_eq!("Q1", read(&dir, "data/questions/q1.gz"));
    }

    #[tokio::test]
    async fn test_download_group_category() {
        let server = MockServer::start_async().await;
        mock_index(&server).await;
        mock_manifest(&server).await;
        let r1 = mock_path(&server, "/data/reviews/r1.gz", 200, "R1").await;
        let q1 = mock_path(&server, "/data/questions/q1.gz", 200, "Q1").await;

        let dir = tempdir().unwrap();
        let mut bopts = bulk_opts(&dir);
        bopts.category = "reviews".to_string();
        let env = Environment::new(&server.url("/export"), "p", "s");
        let store = FileStore::new(dir.path());

        let files = download_group(&client(), &env, &store, &bopts, "v2", Group::Fulls)
            .await
            .unwrap();

        assert_eq!(vec!["/data/reviews/r1.gz"], files);
        assert_eq!(1, r1.hits_async().await);
        assert_eq!(0, q1.hits_async().await);
    }

    #[tokio::test]
    async fn test_download_group_no_version() {
        let server = MockServer::start_async().await;
        mock_index(&server).await;
        let manifest = mock_manifest(&server).await;

        let dir = tempdir().unwrap();
        let bopts = bulk_opts(&dir);
        let env = Environment::new(&server.url("/export"), "p", "s");
        let store = FileStore::new(dir.path());

        let e = download_group(&client(), &env, &store, &bopts, "v3", Group::Fulls)
            .await
            .unwrap_err();

        assert_eq!(ErrorKind::ManifestNotFound, e.kind());
        assert_eq!(0, manifest.hits_async().await);
    }

    #[tokio::test]
    async fn test_download_group_sequential_stops() {
        let server = MockServer::start_async().await;
        mock_index(&server).await;
        mock_manifest(&server).await;
        mock_path(&server, "/data/reviews/r1.gz", 404, "").await;
        let q1 = mock_path(&server, "/data/questions/q1.gz", 200, "Q1").await;

        let dir = tempdir().unwrap();
        let bopts = bulk_opts(&dir);
        let env = Environment::new(&server.url("/export"), "p", "s");
        let store = FileStore::new(dir.path());

        let e = download_group(&client(), &env, &store, &bopts, "v2", Group::Fulls)
            .await
            .unwrap_err();

        assert_eq!(ErrorKind::HttpStatus, e.kind());
        assert_eq!(0, q1.hits_async().await);
    }

    #[tokio::test]
    async fn test_download_group_concurrent_settles() {
        let server = MockServer::start_async().await;
        mock_index(&server).await;
        mock_manifest(&server).await;
        mock_path(&server, "/data/reviews/r1.gz", 404, "").await;
        let q1 = mock_path(&server, "/data/questions/q1.gz", 200, "Q1").await;

        let dir = tempdir().unwrap();
        let mut bopts = bulk_opts(&dir);
        bopts.mode = DownloadMode::Concurrent;
        let env = Environment::new(&server.url("/export"), "p", "s");
        let store = FileStore::new(dir.path());

        let e = download_group(&client(), &env, &store, &bopts, "v2", Group::Fulls)
            .await
            .unwrap_err();

        assert_eq!(ErrorKind::HttpStatus, e.kind());
        assert_eq!(1, q1.hits_async().await);
        assert!(dir.path().join("data/questions/q1.gz").exists());
    }

    /// Destination root that can not hold any file
    ///
    fn blocked_store(dir: &TempDir) -> FileStore {
        let root = dir.path().join("plain");
        std::fs::write(&root, b"").unwrap();
        FileStore::new(&root)
    }

    #[rstest]
    #[case(DownloadMode::Sequential)]
    #[case(DownloadMode::Concurrent)]
    #[tokio::test]
    async fn test_download_group_write_fails_awaited(#[case] mode: DownloadMode) {
        let server = MockServer::start_async().await;
        mock_index(&server).await;
        mock_manifest(&server).await;
        mock_path(&server, "/data/reviews/r1.gz", 200, "R1").await;
        mock_path(&server, "/data/questions/q1.gz", 200, "Q1").await;

        let dir = tempdir().unwrap();
        let mut bopts = bulk_opts(&dir);
        bopts.mode = mode;
        let env = Environment::new(&server.url("/export"), "p", "s");
        let store = blocked_store(&dir);

        let e = download_group(&client(), &env, &store, &bopts, "v2", Group::Fulls)
            .await
            .unwrap_err();

        assert_eq!(ErrorKind::Io, e.kind());
    }

    #[rstest]
    #[case(DownloadMode::Sequential)]
    #[case(DownloadMode::Concurrent)]
    #[tokio::test]
    async fn test_download_group_write_fails_detached(#[case] mode: DownloadMode) {
        let server = MockServer::start_async().await;
        mock_index(&server).await;
        mock_manifest(&server).await;
        let r1 = mock_path(&server, "/data/reviews/r1.gz", 200, "R1").await;
        let q1 = mock_path(&server, "/data/questions/q1.gz", 200, "Q1").await;

        let dir = tempdir().unwrap();
        let mut bopts = bulk_opts(&dir);
        bopts.mode = mode;
        bopts.writes = WriteMode::Detached;
        let env = Environment::new(&server.url("/export"), "p", "s");
        let store = blocked_store(&dir);

        // Failed writes are only logged
        //
        let files = download_group(&client(), &env, &store, &bopts, "v2", Group::Fulls)
            .await
            .unwrap();

        assert_eq!(2, files.len());
        assert_eq!(1, r1.hits_async().await);
        assert_eq!(1, q1.hits_async().await);
        assert!(dir.path().join("plain").is_file());
    }

    #[tokio::test]
    async fn test_bulk_download_needs_group() {
        let dir = tempdir().unwrap();
        let mut bopts = bulk_opts(&dir);
        bopts.fulls = false;
        let env = Environment::new("http://127.0.0.1:1/export", "p", "s");

        let e = bulk_download(&client(), &env, &bopts).await.unwrap_err();
        assert!(e.to_string().contains("--fulls"));
    }

    #[tokio::test]
    async fn test_bulk_download_groups_independent() {
        let server = MockServer::start_async().await;
        mock_index(&server).await;
        mock_manifest(&server).await;
        mock_path(&server, "/data/reviews/r1.gz", 200, "R1").await;
        mock_path(&server, "/data/questions/q1.gz", 200, "Q1").await;

        let dir = tempdir().unwrap();
        let mut bopts = bulk_opts(&dir);
        bopts.incrementals = true;
        let env = Environment::new(&server.url("/export"), "p", "s");

        // fulls succeeds, there is no incrementals for v2
        //
        let e = bulk_download(&client(), &env, &bopts).await.unwrap_err();

        let msg = e.to_string();
        assert!(msg.contains("incrementals"));
        assert!(!msg.starts_with("fulls"));
        assert!(dir.path().join("data/reviews/r1.gz").exists());
    }
}
