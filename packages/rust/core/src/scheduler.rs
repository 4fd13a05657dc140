//! Poll loop: run a cycle, sleep, repeat until shutdown.

use std::future::Future;
use std::time::Duration;

use dealscout_shared::Result;
use tracing::{error, info, warn};

use crate::pipeline::{Pipeline, ProgressReporter};

/// Pause after a cycle-level error before trying again.
pub const ERROR_BACKOFF: Duration = Duration::from_secs(60);

/// Run cycles every `interval` until `shutdown` resolves.
///
/// Shutdown is only observed between cycles; a cycle in flight finishes.
/// Fatal errors (configuration) end the loop; anything else is logged and
/// retried after [`ERROR_BACKOFF`].
pub async fn run_until<F>(
    pipeline: &Pipeline,
    interval: Duration,
    progress: &dyn ProgressReporter,
    shutdown: F,
) -> Result<u64>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut cycles = 0u64;

    info!(interval_secs = interval.as_secs(), "watching for new documents");
    loop {
        let wait = match pipeline.run_cycle(progress).await {
            Ok(_) => interval,
            Err(e) if e.is_fatal() => {
                error!(error = %e, "fatal error, stopping");
                return Err(e);
            }
            Err(e) => {
                warn!(error = %e, backoff_secs = ERROR_BACKOFF.as_secs(), "cycle failed");
                ERROR_BACKOFF
            }
        };
        cycles += 1;

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = &mut shutdown => {
                info!(cycles, "shutdown requested");
                return Ok(cycles);
            }
        }
    }
}

/// [`run_until`] stopped by Ctrl-C.
pub async fn run_forever(
    pipeline: &Pipeline,
    interval: Duration,
    progress: &dyn ProgressReporter,
) -> Result<u64> {
    run_until(pipeline, interval, progress, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    })
    .await
}
