use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;

/// Active reachability check, used as a fallback for missed platform events.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// Treats the network as online when a TCP connection to `address` opens within `timeout`.
#[derive(Debug, Clone)]
pub struct TcpConnectivityProbe {
    address: String,
    timeout: Duration,
}

impl TcpConnectivityProbe {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl ConnectivityProbe for TcpConnectivityProbe {
    async fn is_reachable(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(err)) => {
                tracing::debug!(
                    target: "sync::connectivity",
                    address = %self.address,
                    error = %err,
                    "probe connection failed"
                );
                false
            }
            Err(_) => {
                tracing::debug!(
                    target: "sync::connectivity",
                    address = %self.address,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "probe timed out"
                );
                false
            }
        }
    }
}
