//! Shared test harness: an in-process stand-in for the build script.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ledmacher::adapters::{BuildError, BuildOutput, Builder};
use ledmacher::core::{ArtifactStore, FirmwareService, SettlePolicy};
use ledmacher::domain::{BuildConfig, LedColor};
use sha1::{Digest, Sha1};

/// How the fake build script behaves
#[derive(Debug, Clone, Copy)]
pub enum Mode {
    /// Create the artifact directory and binary, print the hash, exit 0
    Success,
    /// Print the hash and exit 0 without creating anything
    NoDirectory,
    /// Create the directory after the given delay, but print the hash right away
    LateDirectory(Duration),
    /// Create everything and print the hash, but exit with this code
    ExitCode(i32),
    /// Print nothing, exit 0
    Silent,
}

/// Builder that mimics the build script's filesystem behavior
pub struct FakeBuilder {
    root: PathBuf,
    mode: Mode,
    pub clients: Mutex<Vec<String>>,
}

impl FakeBuilder {
    pub fn new(root: impl Into<PathBuf>, mode: Mode) -> Self {
        Self {
            root: root.into(),
            mode,
            clients: Mutex::new(Vec::new()),
        }
    }

    /// Binary contents the fake produces for `input`
    pub fn firmware_for(input: &[u8]) -> Vec<u8> {
        let mut bin = b"\x7fFW".to_vec();
        bin.extend_from_slice(input);
        bin
    }

    fn emit(root: &Path, id: &str, input: &[u8]) {
        let dir = root.join(id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("ledmacher.bin"), Self::firmware_for(input)).unwrap();
    }
}

#[async_trait]
impl Builder for FakeBuilder {
    fn name(&self) -> &str {
        "fake"
    }

    async fn run(&self, input: &[u8], client: &str) -> Result<BuildOutput, BuildError> {
        self.clients.lock().unwrap().push(client.to_string());
        let id = hex::encode(Sha1::digest(input));

        let output = match self.mode {
            Mode::Success => {
                Self::emit(&self.root, &id, input);
                BuildOutput::success(format!("{}\n", id))
            }
            Mode::NoDirectory => BuildOutput::success(id),
            Mode::LateDirectory(delay) => {
                let root = self.root.clone();
                let input = input.to_vec();
                let late_id = id.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    Self::emit(&root, &late_id, &input);
                });
                BuildOutput::success(id)
            }
            Mode::ExitCode(code) => {
                Self::emit(&self.root, &id, input);
                BuildOutput::new(id, Some(code))
            }
            Mode::Silent => BuildOutput::new("", Some(0)),
        };

        Ok(output)
    }
}

/// Service over a fake builder writing into `root`, with no settle delay
pub fn service(root: &Path, mode: Mode) -> (Arc<FakeBuilder>, FirmwareService) {
    let builder = Arc::new(FakeBuilder::new(root, mode));
    let service = FirmwareService::new(builder.clone(), ArtifactStore::new(root))
        .with_settle(SettlePolicy::immediate());
    (builder, service)
}

pub fn sample_config() -> BuildConfig {
    BuildConfig::new(3, 100, 200, 5, vec![LedColor::new(255, 0, 0)])
}

pub const SAMPLE_JSON: &str = r#"{"num_leds":3,"wait_color":100,"wait_gradient":200,"gradient_steps":5,"colors":[{"r":255,"g":0,"b":0}]}"#;
