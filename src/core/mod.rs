//! Core service logic.
//!
//! This module contains:
//! - ArtifactStore: Directory-per-build persistence
//! - FirmwareService: Build orchestration and artifact lookups

pub mod artifact_store;
pub mod firmware;

// Re-export commonly used types
pub use artifact_store::{ArtifactStore, BinaryHandle, StoreError};
pub use firmware::{FirmwareError, FirmwareService, SettlePolicy};
