use async_trait::async_trait;

use parley_core::{SkillResponse, Utterance};
use parley_grid::RpcClient;

/// An open connection to one skill service, shared by every dispatch to it
#[async_trait]
pub trait SkillChannel: Send + Sync {
    /// Call a skill procedure (e.g. `Weather.Run`) with the utterance.
    async fn invoke(&self, method: &str, utterance: &Utterance) -> parley_grid::Result<SkillResponse>;

    /// Human-readable remote address, for logs
    fn endpoint(&self) -> String;
}

#[async_trait]
impl SkillChannel for RpcClient {
    async fn invoke(&self, method: &str, utterance: &Utterance) -> parley_grid::Result<SkillResponse> {
        self.call(method, utterance).await
    }

    fn endpoint(&self) -> String {
        self.peer_addr().to_string()
    }
}
