//! Control-port methods served by the dispatch daemon, and a client for them.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use parley_core::{LastResponse, SkillDescriptor, SkillResponse, UserId, Utterance};
use parley_grid::RpcClient;

use crate::executor::DispatchResult;

pub const REGISTER_SKILL: &str = "Parley.RegisterSkill";
pub const DISPATCH: &str = "Parley.Dispatch";
pub const ROUTES: &str = "Parley.Routes";
pub const SET_LAST_RESPONSE: &str = "Parley.SetLastResponse";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub utterance: Utterance,
    #[serde(default)]
    pub context_added: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchReply {
    pub response: SkillResponse,
    pub skill: String,
    pub route: String,
}

impl From<DispatchResult> for DispatchReply {
    fn from(result: DispatchResult) -> Self {
        Self {
            response: result.response,
            skill: result.skill,
            route: result.route,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetLastResponseRequest {
    pub user: UserId,
    pub last: LastResponse,
}

/// Client for a running daemon's control port
pub struct ControlClient {
    rpc: RpcClient,
}

impl ControlClient {
    pub async fn connect(addr: &str, timeout: Duration) -> parley_grid::Result<Self> {
        let rpc = RpcClient::connect(addr, timeout, timeout).await?;
        Ok(Self { rpc })
    }

    pub async fn register_skill(&self, descriptor: &SkillDescriptor) -> parley_grid::Result<Vec<String>> {
        self.rpc.call(REGISTER_SKILL, descriptor).await
    }

    pub async fn dispatch(
        &self,
        utterance: Utterance,
        context_added: bool,
    ) -> parley_grid::Result<DispatchReply> {
        let request = DispatchRequest {
            utterance,
            context_added,
        };
        self.rpc.call(DISPATCH, &request).await
    }

    pub async fn routes(&self) -> parley_grid::Result<Vec<String>> {
        self.rpc.call(ROUTES, &()).await
    }

    pub async fn set_last_response(&self, user: UserId, last: LastResponse) -> parley_grid::Result<()> {
        let request = SetLastResponseRequest { user, last };
        let _: serde_json::Value = self.rpc.call(SET_LAST_RESPONSE, &request).await?;
        Ok(())
    }
}

/// Decode control-method params, mapping failures to a remote error string.
pub fn decode_params<T: serde::de::DeserializeOwned>(
    method: &str,
    params: serde_json::Value,
) -> std::result::Result<T, String> {
    serde_json::from_value(params).map_err(|e| format!("invalid params for {}: {}", method, e))
}

/// Encode a control-method result.
pub fn encode_result<T: Serialize>(value: &T) -> std::result::Result<serde_json::Value, String> {
    serde_json::to_value(value).map_err(|e| format!("could not encode result: {}", e))
}
