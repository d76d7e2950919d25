//! Directory-per-build artifact storage.
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/<build-id>/config.json     metadata written by this service
//! <root>/<build-id>/ledmacher.bin   binary written by the build script
//! ```
//!
//! The build script creates `<root>/<build-id>/`. This store never creates
//! artifact directories; it only adds metadata to directories that already
//! exist. A directory without a metadata file is treated as absent.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use sha1::{Digest, Sha1};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncReadExt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{BuildConfig, BuildId, FirmwareInfo};

/// Default metadata file name inside an artifact directory
pub const METADATA_FILE: &str = "config.json";

/// Default binary file name inside an artifact directory
pub const BINARY_FILE: &str = "ledmacher.bin";

const HASH_CHUNK: usize = 64 * 1024;

/// Artifact store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("artifact not found: {0}")]
    NotFound(BuildId),

    #[error("artifact directory does not exist yet: {0}")]
    DirectoryMissing(BuildId),

    #[error("artifact {0} has metadata but no binary")]
    BinaryMissing(BuildId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metadata error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// True for errors that mean "nothing to serve for this identifier"
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_) | StoreError::BinaryMissing(_))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// An opened firmware binary, ready to stream
#[derive(Debug)]
pub struct BinaryHandle {
    pub file: File,
    pub size: u64,
}

/// Filesystem-backed artifact store
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    metadata_file: String,
    binary_file: String,
}

impl ArtifactStore {
    /// Create a store rooted at `root` with the default file names
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            metadata_file: METADATA_FILE.to_string(),
            binary_file: BINARY_FILE.to_string(),
        }
    }

    /// Override the metadata and binary file names
    pub fn with_file_names(
        mut self,
        metadata_file: impl Into<String>,
        binary_file: impl Into<String>,
    ) -> Self {
        self.metadata_file = metadata_file.into();
        self.binary_file = binary_file.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn binary_file_name(&self) -> &str {
        &self.binary_file
    }

    /// Directory holding everything for `id`
    pub fn artifact_dir(&self, id: &BuildId) -> PathBuf {
        self.root.join(id.as_str())
    }

    pub fn metadata_path(&self, id: &BuildId) -> PathBuf {
        self.artifact_dir(id).join(&self.metadata_file)
    }

    pub fn binary_path(&self, id: &BuildId) -> PathBuf {
        self.artifact_dir(id).join(&self.binary_file)
    }

    /// Whether an artifact directory exists for `id`
    pub async fn exists(&self, id: &BuildId) -> bool {
        fs::metadata(self.artifact_dir(id))
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Whether the build script has placed a binary for `id`
    pub async fn binary_exists(&self, id: &BuildId) -> bool {
        fs::metadata(self.binary_path(id))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Store `config` as the metadata of `id`.
    ///
    /// Fails with `DirectoryMissing` if the build script has not created the
    /// artifact directory yet; nothing is written in that case. The file is
    /// written under a per-call temporary name and renamed, so readers never
    /// see a partial document even when identical builds race on one id.
    pub async fn write_metadata(&self, id: &BuildId, config: &BuildConfig) -> Result<()> {
        if !self.exists(id).await {
            return Err(StoreError::DirectoryMissing(id.clone()));
        }

        let path = self.metadata_path(id);
        let tmp = self
            .artifact_dir(id)
            .join(format!(".{}.{}.tmp", self.metadata_file, Uuid::new_v4()));

        let json = serde_json::to_vec(config)?;
        fs::write(&tmp, &json).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        info!(build_id = %id, path = %path.display(), "Stored build metadata");
        Ok(())
    }

    /// Read the stored metadata of `id`, computing size and checksum of the
    /// binary from its current contents.
    pub async fn read_metadata(&self, id: &BuildId) -> Result<FirmwareInfo> {
        let path = self.metadata_path(id);

        let content = match fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        let config: BuildConfig = serde_json::from_slice(&content)?;

        let meta = fs::metadata(&path).await?;
        let date = creation_time(&meta);

        let (size, checksum) = match self.checksum(id).await {
            Ok(found) => found,
            Err(StoreError::NotFound(_)) => return Err(StoreError::BinaryMissing(id.clone())),
            Err(e) => return Err(e),
        };

        debug!(build_id = %id, size, checksum = %checksum, "Read build metadata");

        Ok(FirmwareInfo {
            build_hash: id.clone(),
            date,
            size,
            checksum,
            config,
        })
    }

    /// Open the binary of `id` for streaming
    pub async fn read_binary(&self, id: &BuildId) -> Result<BinaryHandle> {
        let file = self.open_binary(id).await?;
        let size = file.metadata().await?.len();
        Ok(BinaryHandle { file, size })
    }

    /// Byte size and hex SHA-1 of the binary of `id`
    pub async fn checksum(&self, id: &BuildId) -> Result<(u64, String)> {
        let mut file = self.open_binary(id).await?;
        let mut hasher = Sha1::new();
        let mut buf = vec![0u8; HASH_CHUNK];
        let mut size = 0u64;

        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            size += n as u64;
        }

        Ok((size, hex::encode(hasher.finalize())))
    }

    async fn open_binary(&self, id: &BuildId) -> Result<File> {
        let path = self.binary_path(id);
        match File::open(&path).await {
            Ok(file) => {
                if file.metadata().await?.is_file() {
                    Ok(file)
                } else {
                    Err(StoreError::NotFound(id.clone()))
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(id.clone())),
            Err(e) => Err(e.into()),
        }
    }
}

/// Birth time where the platform records one, modification time otherwise
fn creation_time(meta: &std::fs::Metadata) -> i64 {
    let time = meta
        .created()
        .or_else(|_| meta.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH);
    DateTime::<Utc>::from(time).timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LedColor;
    use tempfile::TempDir;

    fn id(s: &str) -> BuildId {
        BuildId::parse(s).unwrap()
    }

    #[test]
    fn test_layout() {
        let store = ArtifactStore::new("/srv/build");
        let build = id("abc");
        assert_eq!(store.artifact_dir(&build), PathBuf::from("/srv/build/abc"));
        assert_eq!(
            store.metadata_path(&build),
            PathBuf::from("/srv/build/abc/config.json")
        );
        assert_eq!(
            store.binary_path(&build),
            PathBuf::from("/srv/build/abc/ledmacher.bin")
        );

        let renamed = store.with_file_names("meta.json", "fw.bin");
        assert_eq!(renamed.binary_path(&build), PathBuf::from("/srv/build/abc/fw.bin"));
        assert_eq!(renamed.binary_file_name(), "fw.bin");
    }

    #[tokio::test]
    async fn test_metadata_write_needs_directory() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path());
        let build = id("notyet");
        let config = BuildConfig::new(1, 2, 3, 4, vec![LedColor::new(1, 2, 3)]);

        let result = store.write_metadata(&build, &config).await;
        assert!(matches!(result, Err(StoreError::DirectoryMissing(_))));
        assert!(!store.exists(&build).await);
    }

    #[tokio::test]
    async fn test_checksum_matches_sha1() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path());
        let build = id("hashme");
        std::fs::create_dir_all(store.artifact_dir(&build)).unwrap();
        std::fs::write(store.binary_path(&build), b"abc").unwrap();

        let (size, checksum) = store.checksum(&build).await.unwrap();
        assert_eq!(size, 3);
        assert_eq!(checksum, "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[tokio::test]
    async fn test_binary_directory_is_not_a_binary() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path());
        let build = id("weird");
        std::fs::create_dir_all(store.binary_path(&build)).unwrap();

        let result = store.read_binary(&build).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_not_found_classification() {
        assert!(StoreError::NotFound(id("a")).is_not_found());
        assert!(StoreError::BinaryMissing(id("a")).is_not_found());
        assert!(!StoreError::DirectoryMissing(id("a")).is_not_found());
    }
}
