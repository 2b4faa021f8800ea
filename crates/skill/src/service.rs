//! Skill-side half of the protocol: serve `Run`/`FollowUp` on the RPC port
//! and register with the dispatch daemon.

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use parley_core::{SkillDescriptor, SkillResponse, Utterance};
use parley_grid::{RpcHandler, RpcServer};

use crate::error::{Result, SkillError};
use crate::protocol::{decode_params, encode_result, ControlClient};

/// What a skill does with the utterances routed to it
#[async_trait]
pub trait SkillHandler: Send + Sync + 'static {
    /// Fresh request
    async fn run(&self, utterance: Utterance) -> std::result::Result<SkillResponse, String>;

    /// Continuation of an exchange this skill already started
    async fn follow_up(&self, utterance: Utterance) -> std::result::Result<SkillResponse, String>;
}

/// Routes `<Prefix>.Run` / `<Prefix>.FollowUp` to a [`SkillHandler`]
struct ProcedureTable<H> {
    prefix: String,
    handler: Arc<H>,
}

#[async_trait]
impl<H: SkillHandler> RpcHandler for ProcedureTable<H> {
    async fn handle(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> std::result::Result<serde_json::Value, String> {
        let (prefix, procedure) = method
            .rsplit_once('.')
            .ok_or_else(|| format!("malformed method {}", method))?;

        if prefix != self.prefix {
            warn!("Rejecting {}: this is {}", method, self.prefix);
            return Err(format!("{} is not served by {}", method, self.prefix));
        }

        let utterance: Utterance = decode_params(method, params)?;
        let response = match procedure {
            "Run" => self.handler.run(utterance).await?,
            "FollowUp" => self.handler.follow_up(utterance).await?,
            other => return Err(format!("unknown procedure {}", other)),
        };

        encode_result(&response)
    }
}

pub struct SkillService<H> {
    descriptor: SkillDescriptor,
    handler: Arc<H>,
    control_timeout: Duration,
}

impl<H: SkillHandler> SkillService<H> {
    pub fn new(descriptor: SkillDescriptor, handler: H) -> Self {
        Self {
            descriptor,
            handler: Arc::new(handler),
            control_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_control_timeout(mut self, timeout: Duration) -> Self {
        self.control_timeout = timeout;
        self
    }

    pub fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    /// Bind `host:port+1`, start serving, then register with the daemon.
    pub async fn start(self, control_addr: &str) -> Result<RunningSkill> {
        let addr = self.descriptor.rpc_addr()?;
        let server = RpcServer::bind(addr.as_str())
            .await
            .map_err(|e| SkillError::Service {
                skill: self.descriptor.name.clone(),
                source: e,
            })?;
        self.start_on(server, control_addr).await
    }

    /// Like [`start`](Self::start) with an already bound listener.
    pub async fn start_on(self, server: RpcServer, control_addr: &str) -> Result<RunningSkill> {
        self.descriptor.validate()?;
        let skill = self.descriptor.name.clone();
        let service_err = |source: parley_grid::GridError| SkillError::Service {
            skill: skill.clone(),
            source,
        };

        let local_addr = server.local_addr().map_err(service_err)?;
        let table = Arc::new(ProcedureTable {
            prefix: self.descriptor.procedure_prefix(),
            handler: Arc::clone(&self.handler),
        });
        let task = server.spawn(table);
        info!("Skill {} serving on {}", skill, local_addr);

        let routes = match register(control_addr, &self.descriptor, self.control_timeout).await {
            Ok(routes) => routes,
            Err(e) => {
                task.abort();
                return Err(service_err(e));
            }
        };

        info!("Skill {} registered {} routes with {}", skill, routes.len(), control_addr);

        Ok(RunningSkill {
            descriptor: self.descriptor,
            local_addr,
            routes,
            task,
        })
    }
}

async fn register(
    control_addr: &str,
    descriptor: &SkillDescriptor,
    timeout: Duration,
) -> parley_grid::Result<Vec<String>> {
    let control = ControlClient::connect(control_addr, timeout).await?;
    control.register_skill(descriptor).await
}

/// A started skill service. Dropping it leaves the listener running;
/// call [`shutdown`](Self::shutdown) to stop it.
pub struct RunningSkill {
    descriptor: SkillDescriptor,
    local_addr: SocketAddr,
    routes: Vec<String>,
    task: JoinHandle<()>,
}

impl RunningSkill {
    pub fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Route keys the daemon registered for this skill
    pub fn routes(&self) -> &[String] {
        &self.routes
    }

    pub fn shutdown(self) {
        self.task.abort();
    }
}
