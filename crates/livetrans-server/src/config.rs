//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the relay server.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Host to bind (default `"0.0.0.0"`).
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Path of the translation `WebSocket` endpoint.
    pub ws_path: String,
    /// Max inbound `WebSocket` message size in bytes.
    pub max_message_size: usize,
    /// Seconds between server pings.
    pub ping_interval_secs: u64,
    /// Seconds without a pong before the connection is closed.
    pub ping_timeout_secs: u64,
    /// Maximum concurrent sessions (0 = unlimited).
    pub max_sessions: usize,
    /// Outbound frames buffered per connection.
    pub send_queue: usize,
    /// Seconds to wait for connections to drain on shutdown.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            ws_path: "/ws/translate".into(),
            max_message_size: 10 * 1024 * 1024,
            ping_interval_secs: 30,
            ping_timeout_secs: 30,
            max_sessions: 0,
            send_queue: 64,
            shutdown_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.ws_path, "/ws/translate");
        assert_eq!(cfg.max_message_size, 10 * 1024 * 1024);
        assert_eq!(cfg.ping_interval(), Duration::from_secs(30));
        assert_eq!(cfg.ping_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.max_sessions, 0);
    }

    #[test]
    fn bind_addr_joins_host_and_port() {
        let cfg = ServerConfig {
            host: "127.0.0.1".into(),
            port: 9001,
            ..ServerConfig::default()
        };
        assert_eq!(cfg.bind_addr(), "127.0.0.1:9001");
    }

    #[test]
    fn deserialize_from_json_string() {
        let json = r#"{"host":"10.0.0.1","port":3000,"ws_path":"/ws","max_message_size":512,
            "ping_interval_secs":5,"ping_timeout_secs":15,"max_sessions":2,"send_queue":8,
            "shutdown_timeout_secs":1}"#;
        let cfg: ServerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.host, "10.0.0.1");
        assert_eq!(cfg.ws_path, "/ws");
        assert_eq!(cfg.ping_timeout(), Duration::from_secs(15));
        assert_eq!(cfg.shutdown_timeout(), Duration::from_secs(1));
    }
}
