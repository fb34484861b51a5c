use std::net::SocketAddr;

use anyhow::{Context, Result};
use lx_core::ClientConfig;
use lx_reconcile::ReconcilerKind;
use lx_sequencing::SequencingConfig;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub addr: SocketAddr,
    pub reconciler: ReconcilerKind,
    pub sweep_on_start: bool,
    pub client: ClientConfig,
    pub sequencing: SequencingConfig,
}

impl ListenerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_addr = lookup("LISTENER_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = raw_addr
            .parse()
            .with_context(|| format!("invalid LISTENER_ADDR '{raw_addr}'"))?;
        let reconciler = match lookup("RECONCILER") {
            Some(raw) => raw.parse()?,
            None => ReconcilerKind::OperationalStatus,
        };
        let sweep_on_start = lookup("SWEEP_ON_START")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);
        Ok(Self {
            addr,
            reconciler,
            sweep_on_start,
            client: ClientConfig::from_lookup(&lookup)?,
            sequencing: SequencingConfig::from_lookup(&lookup)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ListenerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.reconciler, ReconcilerKind::OperationalStatus);
        assert!(!config.sweep_on_start);
        assert_eq!(config.sequencing.ttl_secs, 120);
    }

    #[test]
    fn overrides() {
        let config = ListenerConfig::from_lookup(|key| match key {
            "LISTENER_ADDR" => Some("127.0.0.1:9000".into()),
            "RECONCILER" => Some("maturity-gap".into()),
            "SWEEP_ON_START" => Some("true".into()),
            "LXR_HOST" => Some("demo.leanix.net".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.addr.port(), 9000);
        assert_eq!(config.reconciler.fact_sheet_type(), "BusinessCapability");
        assert!(config.sweep_on_start);
        assert_eq!(config.client.credentials.host(), "demo.leanix.net");
    }

    #[test]
    fn unknown_reconciler_is_rejected() {
        let err = ListenerConfig::from_lookup(|key| {
            (key == "RECONCILER").then(|| "lifecycle".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("unknown reconciler"));
    }
}
