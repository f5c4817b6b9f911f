//! # HTTP Gateway
//!
//! Exposes the pipeline over HTTP: one POST route per finishing mode plus a
//! liveness probe.

mod server;

pub use server::{SharedOrchestrator, router as gateway_router, run as run_gateway};

use serde::{Deserialize, Serialize};

/// Configuration for the HTTP gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl GatewayConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_config_default() {
        let config = GatewayConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert_eq!(config.addr(), "127.0.0.1:3000");
    }

    #[test]
    fn test_gateway_config_serialization() {
        let config = GatewayConfig {
            host: "0.0.0.0".into(),
            port: 9090,
        };
        let json = serde_json::to_string(&config).unwrap();
        let restored: GatewayConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.host, "0.0.0.0");
        assert_eq!(restored.port, 9090);

        let partial: GatewayConfig = serde_json::from_str(r#"{"port": 8000}"#).unwrap();
        assert_eq!(partial.host, "127.0.0.1");
        assert_eq!(partial.port, 8000);
    }
}
