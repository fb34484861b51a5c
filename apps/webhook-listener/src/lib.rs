pub mod config;
pub mod http;
pub mod payload;
pub mod reqid;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use lx_core::{Authenticate, LeanIxClient};
use lx_reconcile::{ReconcileWorker, WorkQueue, refresh_all};
use lx_sequencing::{InMemorySequenceStore, SequencingGuard, SharedSequenceStore, spawn_purger};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::ListenerConfig;
use crate::http::{ListenerState, build_router};

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Serves webhooks on `config.addr` until ctrl-c, then drains the queue.
pub async fn run(config: ListenerConfig) -> Result<()> {
    let client = Arc::new(LeanIxClient::from_config(config.client.clone())?);
    let auth: Arc<dyn Authenticate> = client.clone();
    let reconciler = config.reconciler.build(client);

    let worker = Arc::new(ReconcileWorker::new(auth.clone(), reconciler.clone()));
    let queue = Arc::new(WorkQueue::spawn(worker));

    let store: SharedSequenceStore =
        Arc::new(InMemorySequenceStore::new(config.sequencing.ttl()));
    let purger = spawn_purger(store.clone(), PURGE_INTERVAL);

    if config.sweep_on_start {
        let auth = auth.clone();
        let reconciler = reconciler.clone();
        tokio::spawn(async move {
            if let Err(err) = refresh_all(auth.as_ref(), reconciler.as_ref()).await {
                error!(error = %err, "startup sweep failed");
            }
        });
    }

    let router = build_router(ListenerState {
        auth,
        guard: SequencingGuard::new(store),
        queue: queue.clone(),
        fact_sheet_type: config.reconciler.fact_sheet_type(),
    });
    let listener = TcpListener::bind(config.addr).await?;
    info!(
        addr = %config.addr,
        fact_sheet_type = config.reconciler.fact_sheet_type(),
        "lx-webhook-listener listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    queue.shutdown().await;
    purger.abort();
    info!("lx-webhook-listener stopped");
    Ok(())
}
