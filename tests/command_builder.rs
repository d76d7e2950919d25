//! Build Script Integration Tests
//!
//! Runs `CommandBuilder` against small shell scripts that follow the build
//! script contract: header on stdin, client address as argument, hash on
//! stdout, artifact directory created under `build/`.

#![cfg(unix)]

mod common;

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use common::sample_config;
use ledmacher::adapters::{BuildError, Builder, CommandBuilder};
use ledmacher::core::{ArtifactStore, FirmwareError, FirmwareService, SettlePolicy};
use tempfile::TempDir;
use tokio::sync::Mutex;

// Writing a script while another test forks can leave it busy (ETXTBSY)
static SERIAL: Mutex<()> = Mutex::const_new(());

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Stores stdin as the "binary" and records the client argument
const WORKING_SCRIPT: &str = r#"
mkdir -p build/cafe01
cat > build/cafe01/ledmacher.bin
printf '%s' "$1" > build/cafe01/client.txt
printf 'cafe01\n'
"#;

#[tokio::test]
async fn test_script_output_and_side_effects() {
    let _serial = SERIAL.lock().await;
    let temp = TempDir::new().unwrap();
    write_script(temp.path(), "buildme.sh", WORKING_SCRIPT);
    let builder = CommandBuilder::default().with_working_dir(temp.path());

    let output = builder.run(b"HEADER", "10.1.2.3").await.unwrap();
    assert_eq!(output.stdout, "cafe01\n");
    assert_eq!(output.exit_code, Some(0));

    let dir = temp.path().join("build/cafe01");
    assert_eq!(std::fs::read(dir.join("ledmacher.bin")).unwrap(), b"HEADER");
    assert_eq!(std::fs::read_to_string(dir.join("client.txt")).unwrap(), "10.1.2.3");

    let id = builder.invoke(b"HEADER", "10.1.2.3").await.unwrap();
    assert_eq!(id.as_str(), "cafe01");
}

#[tokio::test]
async fn test_failing_script_with_output() {
    let _serial = SERIAL.lock().await;
    let temp = TempDir::new().unwrap();
    let script = write_script(
        temp.path(),
        "fail.sh",
        "cat > /dev/null\necho 'compiler exploded' >&2\nprintf 'abcdef'\nexit 3\n",
    );
    let builder = CommandBuilder::new(script);

    let result = builder.invoke(b"HEADER", "127.0.0.1").await;
    match result {
        Err(BuildError::Failed { code, identifier }) => {
            assert_eq!(code, Some(3));
            assert_eq!(identifier, "abcdef");
        }
        other => panic!("expected Failed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_script_ignoring_stdin() {
    let _serial = SERIAL.lock().await;
    let temp = TempDir::new().unwrap();
    let script = write_script(temp.path(), "quiet.sh", "exit 0\n");
    let builder = CommandBuilder::new(script);

    let input = vec![b'x'; 1 << 20];
    let result = builder.invoke(&input, "127.0.0.1").await;
    assert!(matches!(result, Err(BuildError::NoIdentifier)));
}

#[tokio::test]
async fn test_script_writing_before_reading_large_input() {
    let _serial = SERIAL.lock().await;
    let temp = TempDir::new().unwrap();
    // Fills the stderr pipe before touching stdin
    let script = write_script(
        temp.path(),
        "chatty.sh",
        "head -c 262144 /dev/zero >&2\ncat > /dev/null\nprintf 'big01\\n'\n",
    );
    let builder = CommandBuilder::new(script).with_timeout(Some(Duration::from_secs(30)));

    let input = vec![b'x'; 1 << 20];
    let id = builder.invoke(&input, "127.0.0.1").await.unwrap();
    assert_eq!(id.as_str(), "big01");
}

#[tokio::test]
async fn test_timeout_kills_hung_script() {
    let _serial = SERIAL.lock().await;
    let temp = TempDir::new().unwrap();
    let script = write_script(temp.path(), "hang.sh", "cat > /dev/null\nexec sleep 30\n");
    let builder = CommandBuilder::new(script).with_timeout(Some(Duration::from_millis(200)));

    let result = builder.run(b"", "127.0.0.1").await;
    assert!(matches!(result, Err(BuildError::TimedOut { .. })));
}

#[tokio::test]
async fn test_end_to_end_with_script() {
    let _serial = SERIAL.lock().await;
    let temp = TempDir::new().unwrap();
    write_script(temp.path(), "buildme.sh", WORKING_SCRIPT);

    let builder = CommandBuilder::default().with_working_dir(temp.path());
    let store = ArtifactStore::new(temp.path().join("build"));
    let service =
        FirmwareService::new(Arc::new(builder), store).with_settle(SettlePolicy::immediate());

    let config = sample_config();
    let id = service.build(&config, "127.0.0.1").await.unwrap();
    assert_eq!(id.as_str(), "cafe01");

    let info = service.info(&id).await.unwrap();
    assert_eq!(info.config.num_leds, 3);
    assert_eq!(info.size, config.render_header().len() as u64);
    assert_eq!(info.checksum.len(), 40);
}

#[tokio::test]
async fn test_missing_script_surfaces_as_build_error() {
    let _serial = SERIAL.lock().await;
    let temp = TempDir::new().unwrap();
    let builder = CommandBuilder::default().with_working_dir(temp.path());
    let service = FirmwareService::new(Arc::new(builder), ArtifactStore::new(temp.path()))
        .with_settle(SettlePolicy::immediate());

    let result = service.build(&sample_config(), "127.0.0.1").await;
    assert!(matches!(
        result,
        Err(FirmwareError::Build(BuildError::Spawn { .. }))
    ));
}
