use anyhow::Result;
use lx_telemetry::install as init_telemetry;
use lx_webhook_listener::config::ListenerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry("lx-webhook-listener", env!("CARGO_PKG_VERSION"))?;

    let config = ListenerConfig::from_env()?;
    lx_webhook_listener::run(config).await
}
