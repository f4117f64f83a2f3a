use procbridge::core::adb::{locate_adb, AdbClient};
use procbridge::core::config::Config;
use procbridge::core::shell::ShellResolver;
use procbridge::error::BridgeError;

#[cfg(unix)]
fn fake_adb(dir: &std::path::Path, body: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("adb");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[tokio::test]
async fn missing_binary_is_reported_with_the_attempted_path() {
    let client = AdbClient::with_executable("/nonexistent/adb");
    let err = client.check().await.unwrap_err();
    assert!(err.is_executable_not_found(), "got: {err}");
}

#[cfg(unix)]
#[tokio::test]
async fn check_returns_the_version_line() {
    let dir = tempfile::tempdir().unwrap();
    let adb = fake_adb(dir.path(), r#"echo "Android Debug Bridge version 1.0.41""#);

    let client = AdbClient::with_executable(adb);
    let version = client.check().await.unwrap();
    assert_eq!(version, "Android Debug Bridge version 1.0.41");
}

#[cfg(unix)]
#[tokio::test]
async fn lists_and_enriches_connected_devices() {
    let dir = tempfile::tempdir().unwrap();
    // Dispatch on the first argument the way the real binary would.
    let adb = fake_adb(
        dir.path(),
        r#"
case "$1" in
  devices)
    echo "List of devices attached"
    echo "emulator-5554   device product:sdk_gphone64 model:Pixel_6"
    echo "R58M123ABC      unauthorized"
    ;;
  -s)
    case "$5" in
      ro.product.manufacturer) echo "Google" ;;
      ro.build.version.release) echo "14" ;;
    esac
    ;;
esac"#,
    );

    let client = AdbClient::with_executable(adb);
    let devices = client.list_devices().await.unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].id, "emulator-5554");
    assert_eq!(devices[0].model.as_deref(), Some("Pixel_6"));
    assert_eq!(devices[0].manufacturer.as_deref(), Some("Google"));
    assert_eq!(devices[0].android_version.as_deref(), Some("14"));

    // Offline devices are listed but never probed.
    assert_eq!(devices[1].state, "unauthorized");
    assert!(devices[1].manufacturer.is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn daemon_failure_surfaces_as_command_failed() {
    let dir = tempfile::tempdir().unwrap();
    let adb = fake_adb(dir.path(), r#"echo "error: device offline" >&2; exit 1"#);

    let client = AdbClient::with_executable(adb);
    let err = client.list_devices().await.unwrap_err();
    match err {
        BridgeError::CommandFailed { exit_code, stderr, .. } => {
            assert_eq!(exit_code, Some(1));
            assert!(stderr.contains("device offline"));
        }
        other => panic!("expected CommandFailed, got {other}"),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn screenshot_writes_only_verified_png_payloads() {
    let dir = tempfile::tempdir().unwrap();
    // printf the PNG magic followed by a fake body.
    let adb = fake_adb(
        dir.path(),
        r#"printf '\211PNG\r\n\032\n-fake-image-body-'"#,
    );

    let client = AdbClient::with_executable(adb);
    let dest = dir.path().join("shot.png");
    let written = client.capture_screenshot(None, &dest).await.unwrap();

    assert_eq!(written, dest);
    let bytes = std::fs::read(&dest).unwrap();
    assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
}

#[cfg(unix)]
#[tokio::test]
async fn failed_screenshot_leaves_no_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    // Emits some bytes before failing, like a disconnecting device.
    let adb = fake_adb(
        dir.path(),
        r#"printf 'partial'; echo "error: device '-' not found" >&2; exit 1"#,
    );

    let client = AdbClient::with_executable(adb);
    let dest = dir.path().join("shot.png");
    let err = client.capture_screenshot(None, &dest).await.unwrap_err();

    match err {
        BridgeError::CommandFailed { stderr, .. } => assert!(stderr.contains("not found")),
        other => panic!("expected CommandFailed, got {other}"),
    }
    assert!(!dest.exists());
}

#[cfg(unix)]
#[tokio::test]
async fn user_commands_pass_exit_codes_through() {
    let dir = tempfile::tempdir().unwrap();
    let adb = fake_adb(dir.path(), r#"echo "partial output"; exit 5"#);

    let client = AdbClient::with_executable(adb);
    let result = client
        .run_user_command(None, &["shell".to_string(), "true".to_string()])
        .await
        .unwrap();

    // Non-zero exits are the caller's to interpret, not errors.
    assert_eq!(result.exit_code, Some(5));
    assert_eq!(result.stdout_text().trim(), "partial output");
}

#[test]
fn explicit_config_path_wins_discovery() {
    let dir = tempfile::tempdir().unwrap();
    let fake = dir.path().join("adb");
    std::fs::write(&fake, b"").unwrap();

    let config = Config {
        adb_path: Some(fake.to_string_lossy().into_owned()),
        ..Config::default()
    };
    let located = locate_adb(&config, &ShellResolver::new());
    assert_eq!(located, fake);
}
