//! Metadata describing a finished firmware build.

use serde::{Deserialize, Serialize};

use super::{BuildConfig, BuildId};

/// Everything known about a stored build, as served to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirmwareInfo {
    /// Identifier the build script emitted
    pub build_hash: BuildId,

    /// Creation time of the stored metadata, in epoch seconds
    pub date: i64,

    /// Size of the firmware binary in bytes
    pub size: u64,

    /// Hex-encoded SHA-1 of the firmware binary
    pub checksum: String,

    /// The configuration the build was requested with
    pub config: BuildConfig,
}
