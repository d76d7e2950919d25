//! ledmacher - LED firmware build service
//!
//! Accepts LED strip configurations over HTTP, runs an external build
//! script to compile firmware for them, and serves the resulting binaries
//! and their metadata by build hash.
//!
//! # Architecture
//!
//! - A client posts a configuration; it is rendered into a C header
//! - The build script compiles it, creates `<build-dir>/<hash>/` and prints
//!   the hash
//! - The configuration is stored next to the binary as metadata
//! - Later lookups by hash read the metadata and stream the binary
//!
//! # Modules
//!
//! - `adapters`: Builder implementations (external build script)
//! - `core`: Artifact store and build orchestration
//! - `domain`: Data structures (BuildConfig, BuildId, FirmwareInfo)
//! - `server`: HTTP routes
//! - `client`: HTTP client for a running service
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Run the service
//! ledmacher serve --bind 0.0.0.0:5544
//!
//! # Request a build and fetch the binary
//! ledmacher client build sample.json
//! ledmacher client download <hash> -o ledmacher.bin
//! ```

pub mod adapters;
pub mod cli;
pub mod client;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;

// Re-export main types at crate root for convenience
pub use adapters::{BuildError, BuildOutput, Builder, CommandBuilder};
pub use client::FirmwareClient;
pub use self::core::{ArtifactStore, FirmwareError, FirmwareService, SettlePolicy, StoreError};
pub use domain::{BuildConfig, BuildId, FirmwareInfo, LedColor};
