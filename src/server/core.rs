use log::{error, info};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::client::{ClientRegistry, handle_client};
use crate::config::ServerConfig;
use crate::error::ChatServerError;

/// A bound chat server. Sessions share one [`ClientRegistry`].
pub struct Server {
    registry: ClientRegistry,
    listener: TcpListener,
    config: Arc<ServerConfig>,
}

impl Server {
    /// Binds the listening socket. A bind failure is fatal to the caller.
    pub async fn bind(config: ServerConfig) -> Result<Self, ChatServerError> {
        let addr = config.listen_address();

        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => {
                info!("Server bound to {}", addr);
                listener
            }
            Err(source) => {
                error!("Failed to bind to {}: {}", addr, source);
                return Err(ChatServerError::Bind { addr, source });
            }
        };

        Ok(Self {
            registry: ClientRegistry::new(config.max_clients, config.max_username_length),
            listener,
            config: Arc::new(config),
        })
    }

    /// Actual bound address, useful when the configured port is 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle to the shared registry, e.g. for the operator console.
    pub fn registry(&self) -> ClientRegistry {
        self.registry.clone()
    }

    /// Accepts connections until an accept error occurs.
    pub async fn run(self) -> Result<(), ChatServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` completes or accepting fails.
    ///
    /// The listening socket is closed when this returns. Sessions already
    /// running are left to finish on their own.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ChatServerError>
    where
        F: Future<Output = ()>,
    {
        info!(
            "Starting relay chat server on {} (max {} users)",
            self.config.listen_address(),
            self.config.max_clients
        );

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        info!("New connection from {}", addr);
                        let registry = self.registry.clone();
                        let config = Arc::clone(&self.config);

                        // One task per connection so the accept loop never blocks
                        tokio::spawn(handle_client(stream, registry, config));
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        return Err(ChatServerError::Accept(e));
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ephemeral_config() -> ServerConfig {
        ServerConfig {
            bind_address: "127.0.0.1".into(),
            port: 0,
            ..ServerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_bind_reports_ephemeral_port() {
        let server = Server::bind(ephemeral_config()).await.unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);
        assert_eq!(server.registry().len().await, 0);
    }

    #[tokio::test]
    async fn test_bind_conflict_is_an_error() {
        let first = Server::bind(ephemeral_config()).await.unwrap();
        let taken = first.local_addr().unwrap().port();

        let config = ServerConfig {
            port: taken,
            ..ephemeral_config()
        };
        let err = Server::bind(config).await.err().unwrap();
        assert!(matches!(err, ChatServerError::Bind { .. }));
    }

    #[tokio::test]
    async fn test_run_until_stops_on_shutdown() {
        let server = Server::bind(ephemeral_config()).await.unwrap();
        let result = server.run_until(async {}).await;
        assert!(result.is_ok());
    }
}
