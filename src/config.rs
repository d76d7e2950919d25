//! Configuration for the firmware build service.
//!
//! Configuration sources (highest priority first):
//! 1. Command-line flags (applied by the CLI on top of the resolved config)
//! 2. Environment variables (LEDMACHER_BIND, LEDMACHER_BUILD_DIR,
//!    LEDMACHER_BUILDER, LEDMACHER_WORKDIR)
//! 3. Config file (.ledmacher/config.yaml, or the user config directory)
//! 4. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .ledmacher/config.yaml
//! - Falls back to <config dir>/ledmacher/config.yaml
//! - Relative paths in a project file are resolved against the project root
//!   (the parent of .ledmacher/); the user-level file does not move them

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::artifact_store::{BINARY_FILE, METADATA_FILE};
use crate::core::SettlePolicy;

const PROJECT_DIR: &str = ".ledmacher";

pub const DEFAULT_BIND: &str = "0.0.0.0:5544";
pub const DEFAULT_BUILD_DIR: &str = "./build";
pub const DEFAULT_BUILDER: &str = "./buildme.sh";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub builder: BuilderSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub settle: SettleSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerSection {
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuilderSection {
    /// Build script (relative to the project root)
    pub command: Option<String>,
    /// Directory the build script runs in
    pub working_dir: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreSection {
    /// Root of the artifact directories
    pub root: Option<String>,
    pub metadata_file: Option<String>,
    pub binary_file: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettleSection {
    pub delay_ms: Option<u64>,
    pub metadata_retries: Option<u32>,
    pub retry_interval_ms: Option<u64>,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Address the HTTP server binds to
    pub bind: String,
    /// Build script to run
    pub builder: PathBuf,
    /// Directory the build script runs in
    pub working_dir: PathBuf,
    /// Optional upper bound on a single build
    pub build_timeout: Option<Duration>,
    /// Artifact store root
    pub build_dir: PathBuf,
    pub metadata_file: String,
    pub binary_file: String,
    pub settle: SettlePolicy,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            builder: PathBuf::from(DEFAULT_BUILDER),
            working_dir: PathBuf::from("."),
            build_timeout: None,
            build_dir: PathBuf::from(DEFAULT_BUILD_DIR),
            metadata_file: METADATA_FILE.to_string(),
            binary_file: BINARY_FILE.to_string(),
            settle: SettlePolicy::default(),
            config_file: None,
        }
    }
}

/// Environment overrides, captured once so resolution stays testable
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub bind: Option<String>,
    pub build_dir: Option<String>,
    pub builder: Option<String>,
    pub working_dir: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            bind: std::env::var("LEDMACHER_BIND").ok(),
            build_dir: std::env::var("LEDMACHER_BUILD_DIR").ok(),
            builder: std::env::var("LEDMACHER_BUILDER").ok(),
            working_dir: std::env::var("LEDMACHER_WORKDIR").ok(),
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(PROJECT_DIR).join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    let user_config = dirs::config_dir()?.join("ledmacher").join("config.yaml");
    user_config.exists().then_some(user_config)
}

/// Load and parse config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Combine a parsed config file and environment overrides over the defaults
pub fn resolve(
    file: Option<(&Path, ConfigFile)>,
    env: &EnvOverrides,
) -> ResolvedConfig {
    let mut config = ResolvedConfig::default();

    if let Some((config_path, parsed)) = file {
        // Only a project file (.ledmacher/config.yaml) anchors relative paths;
        // a user-level file leaves them relative to where the service runs
        let project_root = config_path
            .parent()
            .filter(|dir| dir.file_name() == Some(OsStr::new(PROJECT_DIR)))
            .and_then(|dir| dir.parent());
        let anchored = |path: &str| match project_root {
            Some(root) => resolve_path(root, path),
            None => PathBuf::from(path),
        };

        if let Some(bind) = parsed.server.bind {
            config.bind = bind;
        }
        if let Some(command) = parsed.builder.command {
            config.builder = anchored(&command);
        }
        if let Some(dir) = parsed.builder.working_dir {
            config.working_dir = anchored(&dir);
        } else if let Some(root) = project_root {
            config.working_dir = root.to_path_buf();
        }
        if let Some(root) = parsed.store.root {
            config.build_dir = anchored(&root);
        } else if let Some(root) = project_root {
            config.build_dir = resolve_path(root, DEFAULT_BUILD_DIR);
        }
        config.build_timeout = parsed.builder.timeout_seconds.map(Duration::from_secs);
        if let Some(name) = parsed.store.metadata_file {
            config.metadata_file = name;
        }
        if let Some(name) = parsed.store.binary_file {
            config.binary_file = name;
        }
        if let Some(ms) = parsed.settle.delay_ms {
            config.settle.response_delay = Duration::from_millis(ms);
        }
        if let Some(retries) = parsed.settle.metadata_retries {
            config.settle.metadata_retries = retries;
        }
        if let Some(ms) = parsed.settle.retry_interval_ms {
            config.settle.retry_interval = Duration::from_millis(ms);
        }
        config.config_file = Some(config_path.to_path_buf());
    }

    if let Some(bind) = &env.bind {
        config.bind = bind.clone();
    }
    if let Some(dir) = &env.build_dir {
        config.build_dir = PathBuf::from(dir);
    }
    if let Some(builder) = &env.builder {
        config.builder = PathBuf::from(builder);
    }
    if let Some(dir) = &env.working_dir {
        config.working_dir = PathBuf::from(dir);
    }

    config
}

/// Load configuration from the config file (if any), environment and defaults
pub fn load_config() -> Result<ResolvedConfig> {
    let env = EnvOverrides::from_env();

    match find_config_file() {
        Some(path) => {
            let parsed = load_config_file(&path)?;
            Ok(resolve(Some((&path, parsed)), &env))
        }
        None => Ok(resolve(None, &env)),
    }
}
