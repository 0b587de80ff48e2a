//! Process-wide lifecycle guard
//!
//! Turns termination signals, uncontained panics and fatal server errors
//! into one ordered best-effort cleanup of the shared browser. Panics raised
//! while a tool handler is being polled are contained by the dispatcher and
//! never reach the guard.

use std::{
    any::Any,
    fmt,
    future::Future,
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock,
    },
    time::Duration,
};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::{
    sync::{watch, Notify},
    time::{sleep, timeout},
};
use tracing::{error, info, warn};

use crate::errors::AppError;

tokio::task_local! {
    static DISPATCH_SCOPE: ();
}

/// Polls `future` inside a dispatch scope and turns a panic into its message.
pub async fn contain_panics<F: Future>(future: F) -> Result<F::Output, String> {
    DISPATCH_SCOPE
        .scope((), AssertUnwindSafe(future).catch_unwind())
        .await
        .map_err(panic_message)
}

/// True while the current task is polling a tool handler.
pub fn in_dispatch_scope() -> bool {
    DISPATCH_SCOPE.try_with(|_| ()).is_ok()
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Owner of the shared browser resource. Both operations must be safe to
/// call when no browser is running.
#[async_trait]
pub trait BrowserManager: Send + Sync {
    async fn close_browser(&self) -> Result<(), AppError>;
    async fn force_kill_all_chrome_processes(&self) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupt,
    Terminate,
    UncaughtPanic,
    ServerFault,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShutdownReason::Interrupt => "SIGINT",
            ShutdownReason::Terminate => "SIGTERM",
            ShutdownReason::UncaughtPanic => "uncaught panic",
            ShutdownReason::ServerFault => "server fault",
        })
    }
}

pub struct LifecycleGuard {
    browser: Arc<dyn BrowserManager>,
    step_timeout: Duration,
    cleaned_up: AtomicBool,
    requested: OnceLock<ShutdownReason>,
    notify: Notify,
    completed: watch::Sender<bool>,
}

impl LifecycleGuard {
    pub fn new(browser: Arc<dyn BrowserManager>, step_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            browser,
            step_timeout,
            cleaned_up: AtomicBool::new(false),
            requested: OnceLock::new(),
            notify: Notify::new(),
            completed: watch::channel(false).0,
        })
    }

    /// Requests shutdown from synchronous code. The first reason wins.
    pub fn trigger(&self, reason: ShutdownReason) {
        if self.requested.set(reason).is_ok() {
            info!(reason = %reason, "shutdown requested");
        }
        self.notify.notify_one();
    }

    pub fn has_cleaned_up(&self) -> bool {
        self.cleaned_up.load(Ordering::SeqCst)
    }

    /// Logs every panic and requests shutdown for those raised outside a
    /// dispatch scope.
    pub fn install_panic_hook(self: &Arc<Self>) {
        let guard = Arc::clone(self);
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map(|location| location.to_string())
                .unwrap_or_else(|| "unknown".to_string());

            if in_dispatch_scope() {
                warn!(location = %location, panic = %info, "tool handler panicked");
                return;
            }

            error!(location = %location, panic = %info, "uncaught panic");
            guard.trigger(ShutdownReason::UncaughtPanic);
            previous(info);
        }));
    }

    /// Runs the cleanup sequence. Returns false when it already ran.
    pub async fn shutdown(&self, reason: ShutdownReason) -> bool {
        if self.cleaned_up.swap(true, Ordering::SeqCst) {
            return false;
        }

        info!(reason = %reason, "releasing browser resources");

        match timeout(self.step_timeout, self.browser.close_browser()).await {
            Ok(Ok(())) => info!("browser closed"),
            Ok(Err(err)) => warn!(error = %err, "closing browser failed"),
            Err(_) => warn!(
                timeout_ms = self.step_timeout.as_millis(),
                "closing browser timed out"
            ),
        }

        match timeout(
            self.step_timeout,
            self.browser.force_kill_all_chrome_processes(),
        )
        .await
        {
            Ok(Ok(())) => info!("orphaned browser processes terminated"),
            Ok(Err(err)) => warn!(error = %err, "terminating browser processes failed"),
            Err(_) => warn!(
                timeout_ms = self.step_timeout.as_millis(),
                "terminating browser processes timed out"
            ),
        }

        self.completed.send_replace(true);
        true
    }

    /// Resolves once cleanup has finished and then either `grace` elapsed
    /// or a second interrupt arrived. Bounds the server's graceful drain so
    /// a stalled request cannot keep the process alive.
    pub async fn drain_deadline(&self, grace: Duration) {
        let mut completed = self.completed.subscribe();
        if completed.wait_for(|done| *done).await.is_err() {
            return;
        }

        tokio::select! {
            _ = sleep(grace) => warn!(
                grace_ms = grace.as_millis(),
                "in-flight requests outlived the drain period"
            ),
            _ = interrupt() => warn!("second interrupt received, abandoning in-flight requests"),
        }
    }

    /// Resolves on the first of SIGINT, SIGTERM or a triggered request, after
    /// cleanup has run. Suitable for `with_graceful_shutdown`.
    pub async fn wait_for_shutdown(self: Arc<Self>) {
        let reason = tokio::select! {
            _ = interrupt() => ShutdownReason::Interrupt,
            _ = terminate() => ShutdownReason::Terminate,
            _ = self.notify.notified() => self
                .requested
                .get()
                .copied()
                .unwrap_or(ShutdownReason::ServerFault),
        };

        info!(reason = %reason, "shutdown signal received");
        self.shutdown(reason).await;
    }
}

async fn interrupt() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(err) => {
            warn!(error = %err, "failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
