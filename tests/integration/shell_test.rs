use procbridge::core::shell::ShellResolver;
use procbridge::error::BridgeError;

#[cfg(unix)]
#[tokio::test]
async fn resolves_a_working_shell_on_the_default_chain() {
    let resolver = ShellResolver::new();
    let shell = resolver.resolve(None).await.unwrap();

    assert!(shell.executable.exists());
    // Resolution probes by spawning, so a second call hits the cache
    // and must agree with the first.
    let again = resolver.resolve(None).await.unwrap();
    assert_eq!(shell.executable, again.executable);
}

#[cfg(unix)]
#[tokio::test]
async fn honors_an_explicit_preference() {
    let resolver = ShellResolver::new();
    let shell = resolver.resolve(Some("sh")).await.unwrap();
    assert!(shell.executable.ends_with("sh"));
}

#[tokio::test]
async fn broken_preference_falls_back_to_platform_chain() {
    let resolver = ShellResolver::new();
    // The preferred name does not exist; the platform chain should still
    // produce a shell rather than erroring.
    let resolved = resolver.resolve(Some("no-such-shell-31337")).await;
    match resolved {
        Ok(shell) => assert!(shell.executable.exists()),
        // Acceptable only in an environment with no shell at all.
        Err(BridgeError::ShellNotFound(tried)) => {
            assert!(tried.contains("no-such-shell-31337"));
        }
        Err(other) => panic!("unexpected error: {other}"),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn command_lines_quote_each_argument_individually() {
    let resolver = ShellResolver::new();
    let shell = resolver.resolve(Some("sh")).await.unwrap();

    let line = shell.command_line(
        "echo",
        &["two words".to_string(), "plain".to_string()],
    );
    assert_eq!(line, "echo 'two words' plain");
}
