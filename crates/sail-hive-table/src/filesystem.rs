//! Filesystem behavior shared by table resources
//!
//! Paths are qualified against `fs.defaultFS` and resolved to an
//! [`ObjectStore`]: `file` URLs use the local filesystem, every other scheme
//! goes through [`object_store::parse_url`].

use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::buffered::BufWriter;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::config::{JobConf, FS_DEFAULT_FS, INPUT_DIR, OUTPUT_DIR};
use crate::error::{TapError, TapResult};
use crate::resource::Tap;

/// Qualify `location` against the job's default filesystem
///
/// Absolute paths take the scheme and authority of `fs.defaultFS`. Relative
/// paths resolve against the working directory on the local filesystem and
/// against the root elsewhere. Trailing slashes are dropped so that equal
/// locations compare equal.
pub fn make_qualified(location: &str, conf: &JobConf) -> TapResult<Url> {
    let invalid = |reason: String| TapError::InvalidLocation {
        location: location.to_string(),
        reason,
    };

    let mut url = match Url::parse(location) {
        // single letter schemes are drive letters
        Ok(url) if url.scheme().len() > 1 => url,
        Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse(conf.default_fs())
                .map_err(|e| invalid(format!("invalid {}: {}", FS_DEFAULT_FS, e)))?;
            let resolved = if location.starts_with('/') {
                base.join(location)
            } else if base.scheme() == "file" {
                let cwd = std::env::current_dir().map_err(|e| invalid(e.to_string()))?;
                Url::from_directory_path(cwd)
                    .map_err(|_| invalid("working directory is not absolute".to_string()))?
                    .join(location)
            } else {
                base.join(&format!("/{}", location))
            };
            resolved.map_err(|e| invalid(e.to_string()))?
        }
        Err(e) => return Err(invalid(e.to_string())),
    };

    let path = url.path().trim_end_matches('/').to_string();
    url.set_path(if path.is_empty() { "/" } else { &path });
    Ok(url)
}

/// Object store and object path behind a qualified URL
pub fn resolve_store(url: &Url) -> TapResult<(Arc<dyn ObjectStore>, ObjectPath)> {
    if url.scheme() == "file" {
        let path = ObjectPath::from_url_path(url.path()).map_err(|e| TapError::InvalidLocation {
            location: url.to_string(),
            reason: e.to_string(),
        })?;
        return Ok((Arc::new(LocalFileSystem::new()), path));
    }

    let (store, path) = object_store::parse_url(url).map_err(|source| TapError::Storage {
        path: url.to_string(),
        source,
    })?;
    Ok((Arc::from(store), path))
}

/// A directory of files on the job's filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTap {
    location: String,
}

impl FileTap {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn qualified_url(&self, conf: &JobConf) -> TapResult<Url> {
        make_qualified(&self.location, conf)
    }

    fn storage_error(&self, source: object_store::Error) -> TapError {
        TapError::Storage {
            path: self.location.clone(),
            source,
        }
    }

    async fn list(
        &self,
        conf: &JobConf,
    ) -> TapResult<(Arc<dyn ObjectStore>, Vec<object_store::ObjectMeta>)> {
        let (store, path) = resolve_store(&self.qualified_url(conf)?)?;
        let objects = store
            .list(Some(&path))
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| self.storage_error(e))?;
        Ok((store, objects))
    }
}

#[async_trait]
impl Tap for FileTap {
    fn identifier(&self) -> &str {
        &self.location
    }

    async fn create_resource(&self, conf: &JobConf) -> TapResult<bool> {
        let url = self.qualified_url(conf)?;
        // object stores have no directories to create
        if let Ok(dir) = url.to_file_path() {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| self.storage_error(io_error(&url, e)))?;
        }
        Ok(true)
    }

    async fn resource_exists(&self, conf: &JobConf) -> TapResult<bool> {
        let url = self.qualified_url(conf)?;
        if let Ok(path) = url.to_file_path() {
            return tokio::fs::try_exists(&path)
                .await
                .map_err(|e| self.storage_error(io_error(&url, e)));
        }
        let (_, objects) = self.list(conf).await?;
        Ok(!objects.is_empty())
    }

    async fn delete_resource(&self, conf: &JobConf) -> TapResult<bool> {
        let (store, objects) = self.list(conf).await?;
        debug!("Deleting {} objects under {}", objects.len(), self.location);
        for object in objects {
            store
                .delete(&object.location)
                .await
                .map_err(|e| self.storage_error(e))?;
        }

        let url = self.qualified_url(conf)?;
        if let Ok(dir) = url.to_file_path() {
            match tokio::fs::remove_dir_all(&dir).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(self.storage_error(io_error(&url, e))),
            }
        }
        Ok(true)
    }

    async fn commit_resource(&self, _conf: &JobConf) -> TapResult<bool> {
        Ok(true)
    }

    /// Latest modification time of any file below the location, in milliseconds
    async fn modified_time(&self, conf: &JobConf) -> TapResult<i64> {
        let (_, objects) = self.list(conf).await?;
        Ok(objects
            .iter()
            .map(|object| object.last_modified.timestamp_millis())
            .max()
            .unwrap_or(0))
    }

    async fn sink_conf_init(&self, conf: &mut JobConf) -> TapResult<()> {
        let url = self.qualified_url(conf)?;
        conf.set(OUTPUT_DIR, url.to_string());
        Ok(())
    }

    async fn source_conf_init(&self, conf: &mut JobConf) -> TapResult<()> {
        let url = self.qualified_url(conf)?.to_string();
        let input = match conf.get(INPUT_DIR) {
            Some(dirs) if dirs.split(',').any(|dir| dir == url) => return Ok(()),
            Some(dirs) if !dirs.is_empty() => format!("{},{}", dirs, url),
            _ => url,
        };
        conf.set(INPUT_DIR, input);
        Ok(())
    }

    async fn open_for_write(&self, conf: &JobConf, file_name: &str) -> TapResult<BufWriter> {
        let (store, path) = resolve_store(&self.qualified_url(conf)?)?;
        Ok(BufWriter::new(store, path.child(file_name)))
    }
}

fn io_error(url: &Url, source: std::io::Error) -> object_store::Error {
    object_store::Error::Generic {
        store: "LocalFileSystem",
        source: format!("{}: {}", url, source).into(),
    }
}
