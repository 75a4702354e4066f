//! Fire-and-forget request logging.
//!
//! Log entries are handed to a bounded queue drained by a background task;
//! the HTTP response is never blocked or failed by logging. Queue-full and
//! store failures are reported to the operational log only. Within one
//! request there is a single log write, so ordering relative to the
//! response it describes is trivially preserved.

use crate::metrics;
use crate::model::RequestLog;
use crate::store::MockStore;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// Cheap cloneable handle to the background log writer.
#[derive(Clone)]
pub struct RequestLogWriter {
    tx: mpsc::Sender<RequestLog>,
}

impl RequestLogWriter {
    /// Spawn the consumer task and return the producer handle.
    pub fn spawn(store: Arc<dyn MockStore>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<RequestLog>(capacity);
        tokio::spawn(async move {
            while let Some(log) = rx.recv().await {
                if let Err(err) = store.insert_log(log).await {
                    warn!("request log write failed: {err}");
                    metrics::record_log_drop("store_error");
                }
            }
        });
        Self { tx }
    }

    /// Enqueue one log entry without waiting. Drops the entry when the
    /// queue is full or the consumer is gone.
    pub fn record(&self, log: RequestLog) {
        if self.tx.try_send(log).is_err() {
            warn!("request log queue full, dropping entry");
            metrics::record_log_drop("queue_full");
        }
    }
}
