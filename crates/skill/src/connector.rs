use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use parley_core::SkillDescriptor;
use parley_grid::RpcClient;

use crate::channel::SkillChannel;
use crate::error::{Result, SkillError};

/// Opens the persistent connection a registered skill is reached through
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, descriptor: &SkillDescriptor) -> Result<Arc<dyn SkillChannel>>;
}

/// Connects to `host:port+1` over TCP. No retries: a skill that cannot be
/// reached has to register again.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    connect_timeout: Duration,
    call_timeout: Duration,
}

impl TcpConnector {
    pub fn new(connect_timeout: Duration, call_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            call_timeout,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(30))
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, descriptor: &SkillDescriptor) -> Result<Arc<dyn SkillChannel>> {
        let addr = descriptor.rpc_addr()?;
        info!("Connecting to skill {} at {}", descriptor.name, addr);

        match RpcClient::connect(&addr, self.connect_timeout, self.call_timeout).await {
            Ok(client) => Ok(Arc::new(client)),
            Err(e) => {
                error!("Skill {} unreachable at {}: {}", descriptor.name, addr, e);
                Err(SkillError::Connection {
                    skill: descriptor.name.clone(),
                    source: e,
                })
            }
        }
    }
}
