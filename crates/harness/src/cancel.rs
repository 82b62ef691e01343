//! Cooperative cancellation between benchmark iterations.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

/// Exit status used when a second interrupt aborts a hung iteration.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Shared flag the benchmark loop polls before each iteration.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    is_cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.is_cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.is_cancelled.load(Ordering::SeqCst)
    }
}

/// Spawn a background thread that cancels `token` on the first Ctrl-C and
/// exits the process on the second.
///
/// The handler only flips the flag; an in-flight translate call is never
/// interrupted.
pub fn install_interrupt_handler(token: CancellationToken) -> io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    thread::Builder::new()
        .name("interrupt-handler".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    warn!(error = %err, "failed to listen for interrupts");
                    return;
                }
                info!("interrupt received; stopping after the current iteration");
                token.cancel();

                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("second interrupt received; exiting");
                    std::process::exit(FORCED_EXIT_CODE);
                }
            });
        })?;

    Ok(())
}
