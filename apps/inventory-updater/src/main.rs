use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use lx_core::{Authenticate, ClientConfig, LeanIxClient};
use lx_reconcile::{Reconciler, ReconcilerKind, SweepSummary, refresh_all};
use lx_telemetry::install as init_telemetry;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Reconciles a derived LeanIX field across the whole workspace")]
struct Cli {
    /// Derived field to reconcile
    #[arg(long, env = "RECONCILER", default_value_t = ReconcilerKind::OperationalStatus)]
    reconciler: ReconcilerKind,
    /// Repeat the sweep every N seconds instead of running once
    #[arg(long)]
    interval_secs: Option<u64>,
    /// Print each sweep summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

async fn sweep(auth: &dyn Authenticate, reconciler: &dyn Reconciler, json: bool) -> Result<SweepSummary> {
    let summary = refresh_all(auth, reconciler)
        .await
        .with_context(|| format!("{} sweep failed", reconciler.fact_sheet_type()))?;
    if json {
        println!("{}", serde_json::to_string(&summary)?);
    }
    Ok(summary)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry("lx-inventory-updater", env!("CARGO_PKG_VERSION"))?;
    let cli = Cli::parse();

    let client = Arc::new(LeanIxClient::from_config(ClientConfig::from_env()?)?);
    let reconciler = cli.reconciler.build(client.clone());

    let Some(interval_secs) = cli.interval_secs else {
        let summary = sweep(client.as_ref(), reconciler.as_ref(), cli.json).await?;
        if summary.failed > 0 {
            bail!("{} of {} updates failed", summary.failed, summary.updated + summary.failed);
        }
        return Ok(());
    };

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    info!(interval_secs, reconciler = %cli.reconciler, "running scheduled sweeps");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = sweep(client.as_ref(), reconciler.as_ref(), cli.json).await {
                    error!(error = %format!("{err:#}"), "scheduled sweep failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_single_operational_status_sweep() {
        let cli = Cli::try_parse_from(["lx-inventory-updater"]).unwrap();
        assert_eq!(cli.reconciler, ReconcilerKind::OperationalStatus);
        assert_eq!(cli.interval_secs, None);
        assert!(!cli.json);
    }

    #[test]
    fn accepts_interval_and_reconciler() {
        let cli = Cli::try_parse_from([
            "lx-inventory-updater",
            "--reconciler",
            "maturity-gap",
            "--interval-secs",
            "3600",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.reconciler, ReconcilerKind::MaturityGap);
        assert_eq!(cli.interval_secs, Some(3600));
        assert!(cli.json);
    }

    #[test]
    fn rejects_unknown_reconciler() {
        assert!(Cli::try_parse_from(["lx-inventory-updater", "--reconciler", "nope"]).is_err());
    }
}
