use std::future::Future;

use anyhow::{Context, Result};
use log::info;
use tokio::signal;

/// Installs the SIGINT and SIGTERM handlers and returns a future that
/// resolves on the first of them. Both handlers are registered before this
/// returns, so a signal arriving before the future is first polled is not
/// lost to the default disposition.
#[cfg(unix)]
pub fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    use signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt()).context("install SIGINT handler")?;
    let mut terminate = signal(SignalKind::terminate()).context("install SIGTERM handler")?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => info!("Received interrupt signal"),
            _ = terminate.recv() => info!("Received terminate signal"),
        }
    })
}

/// Returns a future that resolves on ctrl-c.
#[cfg(not(unix))]
pub fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received interrupt signal"),
            Err(err) => {
                log::error!("Listen interrupt signal error: {err:#}");
                std::future::pending::<()>().await;
            }
        }
    })
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn test_signal_before_poll() {
        let shutdown = shutdown_signal().unwrap();

        // Raised before the future is ever polled: must be queued, not
        // kill the test process.
        unsafe {
            libc::raise(libc::SIGINT);
        }

        timeout(Duration::from_secs(5), shutdown)
            .await
            .expect("shutdown future resolves on SIGINT");
    }
}
