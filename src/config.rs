//! Process configuration read from the environment

use std::net::SocketAddr;

pub const DEFAULT_PORT: u16 = 3001;

/// Server settings. Game rules live in [`crate::types::GameConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Allowed CORS origin; `None` means permissive CORS
    pub frontend_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            frontend_url: None,
        }
    }
}

impl ServerConfig {
    /// Load config from environment variables
    /// PORT (default 3001) and FRONTEND_URL (optional CORS origin)
    pub fn from_env() -> Self {
        let port = match std::env::var("PORT") {
            Ok(raw) => match raw.trim().parse::<u16>() {
                Ok(port) => port,
                Err(_) => {
                    tracing::warn!("Invalid PORT {:?}, using {}", raw, DEFAULT_PORT);
                    DEFAULT_PORT
                }
            },
            Err(_) => DEFAULT_PORT,
        };

        let frontend_url = std::env::var("FRONTEND_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        match &frontend_url {
            Some(origin) => tracing::info!("CORS restricted to {}", origin),
            None => tracing::info!("FRONTEND_URL not set, CORS is permissive"),
        }

        Self { port, frontend_url }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}
