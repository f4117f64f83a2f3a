use std::time::{Duration, Instant};

use procbridge::core::process::{self, ProcessSpec, StreamEvent};
use procbridge::error::BridgeError;

#[tokio::test]
async fn captures_stdout_of_a_short_command() {
    let spec = ProcessSpec::new("echo").arg("hello from the runner");
    let result = process::run(&spec).await.unwrap();

    assert!(result.success());
    assert_eq!(result.stdout_text().trim(), "hello from the runner");
    assert!(!result.timed_out);
}

#[tokio::test]
async fn nonzero_exit_is_a_result_not_an_error() {
    let spec = ProcessSpec::new("sh").arg("-c").arg("echo oops >&2; exit 7");
    let result = process::run(&spec).await.unwrap();

    assert_eq!(result.exit_code, Some(7));
    assert!(!result.success());
    assert!(result.stderr.contains("oops"));
}

#[tokio::test]
async fn missing_executable_reports_attempted_path() {
    let spec = ProcessSpec::new("/no/such/binary-xyzzy");
    let err = process::run(&spec).await.unwrap_err();

    match err {
        BridgeError::ExecutableNotFound { attempted, .. } => {
            assert_eq!(attempted, std::path::PathBuf::from("/no/such/binary-xyzzy"));
        }
        other => panic!("expected ExecutableNotFound, got {other}"),
    }
}

#[tokio::test]
async fn timeout_kills_the_child_and_errors() {
    let spec = ProcessSpec::new("sleep")
        .arg("30")
        .timeout(Duration::from_millis(200));

    let started = Instant::now();
    let err = process::run(&spec).await.unwrap_err();

    assert!(matches!(err, BridgeError::Timeout { .. }), "got: {err}");
    // Well under the sleep duration proves the child was killed.
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn streaming_delivers_output_then_exit() {
    let spec = ProcessSpec::new("sh")
        .arg("-c")
        .arg("printf first; printf second; exit 0");
    let mut child = process::run_streaming(&spec).await.unwrap();

    let mut stdout = Vec::new();
    let mut exited = None;
    while let Some(event) = child.next_event().await {
        match event {
            StreamEvent::Stdout(chunk) => stdout.extend_from_slice(&chunk),
            StreamEvent::Stderr(_) => {}
            StreamEvent::Exited { exit_code, timed_out } => {
                exited = Some((exit_code, timed_out));
            }
        }
    }

    assert_eq!(String::from_utf8(stdout).unwrap(), "firstsecond");
    assert_eq!(exited, Some((Some(0), false)));
}

#[tokio::test]
async fn streaming_kill_terminates_a_long_runner() {
    let spec = ProcessSpec::new("sleep").arg("30");
    let mut child = process::run_streaming(&spec).await.unwrap();
    assert!(child.pid().is_some());

    child.kill();

    let started = Instant::now();
    let mut saw_exit = false;
    while let Some(event) = child.next_event().await {
        if let StreamEvent::Exited { .. } = event {
            saw_exit = true;
        }
    }
    assert!(saw_exit);
    assert!(started.elapsed() < Duration::from_secs(5));
}
