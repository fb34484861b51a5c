use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::QueueClosed;

/// Unit of work: reconcile one fact sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileTask {
    pub entity_id: String,
}

impl ReconcileTask {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
        }
    }
}

/// Consumer of queued tasks. Failures are the handler's to report.
#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    async fn handle(&self, task: ReconcileTask);
}

/// FIFO queue drained by a single task, one item at a time.
pub struct WorkQueue {
    sender: Mutex<Option<mpsc::UnboundedSender<ReconcileTask>>>,
    consumer: Mutex<Option<JoinHandle<()>>>,
    pending: Arc<AtomicUsize>,
}

impl WorkQueue {
    /// Spawns the consumer on the current tokio runtime.
    pub fn spawn<H: TaskHandler>(handler: Arc<H>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<ReconcileTask>();
        let pending = Arc::new(AtomicUsize::new(0));
        let consumer = tokio::spawn({
            let pending = pending.clone();
            async move {
                while let Some(task) = receiver.recv().await {
                    debug!(entity_id = %task.entity_id, "dequeued task");
                    handler.handle(task).await;
                    pending.fetch_sub(1, Ordering::SeqCst);
                }
                debug!("work queue consumer stopped");
            }
        });
        Self {
            sender: Mutex::new(Some(sender)),
            consumer: Mutex::new(Some(consumer)),
            pending,
        }
    }

    pub fn push(&self, task: ReconcileTask) -> Result<(), QueueClosed> {
        let guard = self.sender.lock().map_err(|_| QueueClosed)?;
        let sender = guard.as_ref().ok_or(QueueClosed)?;
        self.pending.fetch_add(1, Ordering::SeqCst);
        sender.send(task).map_err(|_| {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            QueueClosed
        })
    }

    /// Tasks pushed but not yet fully handled.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().map(|guard| guard.is_none()).unwrap_or(true)
    }

    /// Stops accepting tasks and waits until every queued task was handled.
    pub async fn shutdown(&self) {
        if let Ok(mut guard) = self.sender.lock() {
            guard.take();
        }
        let consumer = self.consumer.lock().ok().and_then(|mut guard| guard.take());
        if let Some(consumer) = consumer {
            let remaining = self.pending();
            info!(remaining, "draining work queue");
            if let Err(err) = consumer.await {
                warn!(error = %err, "work queue consumer aborted");
            }
        }
    }
}
