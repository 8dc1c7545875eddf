use std::sync::Arc;
use tokio::sync::watch;
use tracing::error;

/// Process-wide escalation of unrecoverable errors.
///
/// Any front end (bot handler or HTTP API) raises it when the store can no
/// longer be trusted; `main` waits on it and stops the process with an error.
#[derive(Clone)]
pub struct FatalSignal {
    tx: Arc<watch::Sender<Option<String>>>,
    rx: watch::Receiver<Option<String>>,
}

impl Default for FatalSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl FatalSignal {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(None);
        Self { tx: Arc::new(tx), rx }
    }

    /// Logs the error and wakes up everyone waiting. The first reason wins.
    pub fn raise(&self, source: &str, error: &str) {
        error!("FATAL: {} - {}", source, error);
        let reason = format!("{source}: {error}");
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
    }

    pub fn is_raised(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Resolves with the reason once the signal has been raised.
    pub async fn wait(&self) -> String {
        let mut rx = self.rx.clone();
        loop {
            if let Some(reason) = rx.borrow_and_update().clone() {
                return reason;
            }
            if rx.changed().await.is_err() {
                return "fatal signal dropped".to_string();
            }
        }
    }
}
