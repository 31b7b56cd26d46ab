//! Reachability probe: a bounded-timeout TCP connect to the coordinator.
//!
//! Independent of the duplex session. Any failure, including the timeout,
//! reads as "unreachable"; nothing is propagated.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio::net::TcpStream;

#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// True when the coordinator accepted a connection in time
    async fn probe(&self) -> bool;
}

/// Plain TCP connect to `host:port`
#[derive(Debug, Clone)]
pub struct TcpProbe {
    address: String,
    timeout: Duration,
}

impl TcpProbe {
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
impl ReachabilityProbe for TcpProbe {
    async fn probe(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                debug!("probe {} failed: {}", self.address, e);
                false
            }
            Err(_) => {
                debug!("probe {} timed out after {:?}", self.address, self.timeout);
                false
            }
        }
    }
}
