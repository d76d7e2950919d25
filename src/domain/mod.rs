//! Domain types for the firmware build service.
//!
//! - BuildConfig: what a client asks to have built
//! - BuildId: the identifier a finished build is stored under
//! - FirmwareInfo: metadata served for a stored build

pub mod build_config;
pub mod build_id;
pub mod firmware;

pub use build_config::{BuildConfig, LedColor};
pub use build_id::{BuildId, BuildIdError};
pub use firmware::FirmwareInfo;
