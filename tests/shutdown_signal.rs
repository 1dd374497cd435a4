//! Signal handling for graceful shutdown.
//!
//! Kept in its own test binary: delivering SIGTERM here must not interrupt
//! servers running in other tests.

#![cfg(unix)]

use std::time::Duration;

use catia_v5_mcp::mcp::server::shutdown_signal;

#[tokio::test]
async fn sigterm_resolves_shutdown_signal() {
    let signal = shutdown_signal();
    tokio::pin!(signal);

    // First poll installs the handlers.
    let pending = tokio::time::timeout(Duration::from_millis(50), &mut signal).await;
    assert!(pending.is_err());

    let status = std::process::Command::new("kill")
        .args(["-TERM", &std::process::id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let received = tokio::time::timeout(Duration::from_secs(5), signal)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received, "SIGTERM");
}
