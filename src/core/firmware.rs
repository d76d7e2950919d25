//! Firmware build orchestration.
//!
//! Drives one build request through render → invoke → persist, and answers
//! lookups for finished builds. HTTP concerns live in `crate::server`.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::adapters::{BuildError, Builder};
use crate::domain::{BuildConfig, BuildId, FirmwareInfo};

use super::artifact_store::{ArtifactStore, BinaryHandle, StoreError};

/// How long to wait for the build script's trailing filesystem writes.
///
/// The script prints its identifier and may still be flushing files into
/// the artifact directory when we respond.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlePolicy {
    /// Pause before answering a successful build or binary download
    pub response_delay: Duration,

    /// Extra metadata write attempts while the artifact directory is missing
    pub metadata_retries: u32,

    /// Pause between metadata write attempts
    pub retry_interval: Duration,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            response_delay: Duration::from_secs(1),
            metadata_retries: 0,
            retry_interval: Duration::from_millis(200),
        }
    }
}

impl SettlePolicy {
    /// No waiting at all (tests, in-process builders)
    pub fn immediate() -> Self {
        Self {
            response_delay: Duration::ZERO,
            metadata_retries: 0,
            retry_interval: Duration::ZERO,
        }
    }
}

#[derive(Debug, Error)]
pub enum FirmwareError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("firmware not found: {0}")]
    NotFound(BuildId),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for FirmwareError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) | StoreError::BinaryMissing(id) => FirmwareError::NotFound(id),
            other => FirmwareError::Store(other),
        }
    }
}

/// Request-level operations over a builder and an artifact store
pub struct FirmwareService {
    builder: Arc<dyn Builder>,
    store: ArtifactStore,
    settle: SettlePolicy,
}

impl FirmwareService {
    pub fn new(builder: Arc<dyn Builder>, store: ArtifactStore) -> Self {
        Self {
            builder,
            store,
            settle: SettlePolicy::default(),
        }
    }

    pub fn with_settle(mut self, settle: SettlePolicy) -> Self {
        self.settle = settle;
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn settle(&self) -> &SettlePolicy {
        &self.settle
    }

    /// Build firmware for `config` on behalf of `client`.
    ///
    /// Build failures abort without touching the store. Once an identifier
    /// is accepted, the metadata write is best effort: a missing artifact
    /// directory is logged and the identifier is still returned.
    #[instrument(skip(self, config), fields(builder = %self.builder.name()))]
    pub async fn build(&self, config: &BuildConfig, client: &str) -> Result<BuildId, FirmwareError> {
        let header = config.render_header();
        debug!(bytes = header.len(), colors = config.colors.len(), "Rendered build header");

        let id = match self.builder.invoke(header.as_bytes(), client).await {
            Ok(id) => id,
            Err(e) => {
                warn!(code = e.code(), error = %e, "Build rejected");
                return Err(e.into());
            }
        };
        info!(build_id = %id, "Build finished");

        self.persist_metadata(&id, config).await;

        if !self.settle.response_delay.is_zero() {
            tokio::time::sleep(self.settle.response_delay).await;
        }

        Ok(id)
    }

    /// Stored metadata for `id`
    pub async fn info(&self, id: &BuildId) -> Result<FirmwareInfo, FirmwareError> {
        let info = self.store.read_metadata(id).await?;
        Ok(info)
    }

    /// Open the binary of `id` for download.
    ///
    /// The file is opened and measured only after the settle delay, so the
    /// handle reflects whatever the build script finished writing meanwhile.
    pub async fn binary(&self, id: &BuildId) -> Result<BinaryHandle, FirmwareError> {
        if !self.store.binary_exists(id).await {
            return Err(FirmwareError::NotFound(id.clone()));
        }

        if !self.settle.response_delay.is_zero() {
            tokio::time::sleep(self.settle.response_delay).await;
        }

        let handle = self.store.read_binary(id).await?;
        Ok(handle)
    }

    async fn persist_metadata(&self, id: &BuildId, config: &BuildConfig) {
        let mut attempt = 0;

        loop {
            match self.store.write_metadata(id, config).await {
                Ok(()) => return,
                Err(StoreError::DirectoryMissing(_)) if attempt < self.settle.metadata_retries => {
                    attempt += 1;
                    debug!(build_id = %id, attempt, "Artifact directory not there yet, retrying");
                    tokio::time::sleep(self.settle.retry_interval).await;
                }
                Err(StoreError::DirectoryMissing(_)) => {
                    info!(build_id = %id, "Artifact directory missing, metadata not stored");
                    return;
                }
                Err(e) => {
                    warn!(build_id = %id, error = %e, "Failed to store build metadata");
                    return;
                }
            }
        }
    }
}
