use tokio::sync::watch;

/// Cooperative stop signal observed by long-running loops.
#[derive(Debug, Clone)]
pub struct RunContext {
    stop: watch::Receiver<bool>,
}

/// Owner side of a [`RunContext`]. Dropping it does not stop the run.
#[derive(Debug)]
pub struct StopHandle {
    stop: watch::Sender<bool>,
}

impl RunContext {
    pub fn new() -> (Self, StopHandle) {
        let (tx, rx) = watch::channel(false);
        (Self { stop: rx }, StopHandle { stop: tx })
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }

    /// Resolves once a stop is requested; pends forever if the handle is gone.
    pub async fn stopped(&self) {
        let mut rx = self.stop.clone();
        if rx.wait_for(|stopped| *stopped).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl StopHandle {
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_stop_wakes_waiters() {
        let (ctx, handle) = RunContext::new();
        assert!(!ctx.is_stopped());

        let waiter = ctx.clone();
        let task = tokio::spawn(async move { waiter.stopped().await });
        handle.stop();

        timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
        assert!(ctx.is_stopped());
    }

    #[tokio::test]
    async fn test_dropped_handle_never_stops() {
        let (ctx, handle) = RunContext::new();
        drop(handle);
        assert!(timeout(Duration::from_millis(30), ctx.stopped()).await.is_err());
        assert!(!ctx.is_stopped());
    }
}
