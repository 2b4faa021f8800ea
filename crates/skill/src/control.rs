use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use parley_core::SkillDescriptor;
use parley_grid::RpcHandler;
use parley_storage::LastResponseStore;

use crate::connector::Connector;
use crate::executor::Dispatcher;
use crate::protocol::{
    decode_params, encode_result, DispatchReply, DispatchRequest, SetLastResponseRequest,
    DISPATCH, REGISTER_SKILL, ROUTES, SET_LAST_RESPONSE,
};
use crate::registry::SkillRegistry;
use crate::router::RouteResolver;

/// Serves the daemon's control port: registration, dispatch, route listing
/// and last-response updates.
pub struct ControlService {
    registry: Arc<SkillRegistry>,
    connector: Arc<dyn Connector>,
    dispatcher: Dispatcher,
    last_responses: Arc<dyn LastResponseStore>,
}

impl ControlService {
    pub fn new(
        registry: Arc<SkillRegistry>,
        connector: Arc<dyn Connector>,
        last_responses: Arc<dyn LastResponseStore>,
    ) -> Self {
        let resolver = Arc::new(RouteResolver::new(
            Arc::clone(&registry),
            Arc::clone(&last_responses),
        ));

        Self {
            registry,
            connector,
            dispatcher: Dispatcher::new(resolver),
            last_responses,
        }
    }

    pub fn registry(&self) -> &Arc<SkillRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    async fn register_skill(&self, descriptor: SkillDescriptor) -> Result<Vec<String>, String> {
        info!("Registering skill {} with listen port {}", descriptor.name, descriptor.port);
        self.registry
            .connect(self.connector.as_ref(), descriptor)
            .await
            .map_err(|e| e.to_string())
    }

    async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchReply, String> {
        self.dispatcher
            .dispatch(request.utterance, request.context_added)
            .await
            .map(DispatchReply::from)
            .map_err(|e| e.to_string())
    }

    async fn set_last_response(&self, request: SetLastResponseRequest) -> Result<(), String> {
        self.last_responses
            .set_last_response(request.user, request.last)
            .await
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl RpcHandler for ControlService {
    async fn handle(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, String> {
        match method {
            REGISTER_SKILL => {
                let routes = self.register_skill(decode_params(method, params)?).await?;
                encode_result(&routes)
            }
            DISPATCH => {
                let reply = self.dispatch(decode_params(method, params)?).await?;
                encode_result(&reply)
            }
            ROUTES => encode_result(&self.registry.routes()),
            SET_LAST_RESPONSE => {
                self.set_last_response(decode_params(method, params)?).await?;
                Ok(serde_json::Value::Null)
            }
            other => {
                warn!("Unknown control method {}", other);
                Err(format!("unknown method {}", other))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::NamedChannel;
    use crate::channel::SkillChannel;
    use crate::error::SkillError;
    use parley_core::{LastResponse, Trigger, UserId, Utterance};
    use parley_storage::MemoryLastResponseStore;
    use serde_json::json;

    /// Hands out in-memory channels named after the skill
    struct InMemory;

    #[async_trait]
    impl Connector for InMemory {
        async fn connect(
            &self,
            descriptor: &SkillDescriptor,
        ) -> crate::error::Result<Arc<dyn SkillChannel>> {
            match descriptor.name.as_str() {
                "weather" => Ok(Arc::new(NamedChannel("weather"))),
                other => Err(SkillError::Connection {
                    skill: other.to_string(),
                    source: parley_grid::GridError::ConnectionFailed("refused".into()),
                }),
            }
        }
    }

    fn service() -> ControlService {
        ControlService::new(
            Arc::new(SkillRegistry::new()),
            Arc::new(InMemory),
            Arc::new(MemoryLastResponseStore::new()),
        )
    }

    fn weather() -> SkillDescriptor {
        SkillDescriptor::new("weather", "127.0.0.1", 4100, Trigger::new(vec!["get"], vec!["forecast"]))
    }

    #[tokio::test]
    async fn test_register_then_list_routes() {
        let control = service();
        let routes = control
            .handle(REGISTER_SKILL, serde_json::to_value(weather()).unwrap())
            .await
            .unwrap();
        assert_eq!(routes, json!(["get_forecast", "get"]));

        let listed = control.handle(ROUTES, serde_json::Value::Null).await.unwrap();
        assert_eq!(listed, json!(["get", "get_forecast"]));
    }

    #[tokio::test]
    async fn test_register_unreachable_skill_fails() {
        let control = service();
        let mut descriptor = weather();
        descriptor.name = "offline".to_string();

        let err = control
            .handle(REGISTER_SKILL, serde_json::to_value(descriptor).unwrap())
            .await
            .unwrap_err();
        assert!(err.contains("offline"));
        assert!(control.registry().is_empty());
    }

    #[tokio::test]
    async fn test_set_last_response_enables_follow_up_dispatch() {
        let control = service();
        control
            .handle(REGISTER_SKILL, serde_json::to_value(weather()).unwrap())
            .await
            .unwrap();

        let set = SetLastResponseRequest {
            user: UserId::new(3),
            last: LastResponse::new("get_forecast"),
        };
        control
            .handle(SET_LAST_RESPONSE, serde_json::to_value(set).unwrap())
            .await
            .unwrap();

        let request = DispatchRequest {
            utterance: Utterance::new(Some(UserId::new(3))),
            context_added: false,
        };
        let reply = control
            .handle(DISPATCH, serde_json::to_value(&request).unwrap())
            .await
            .unwrap();
        let reply: DispatchReply = serde_json::from_value(reply).unwrap();
        assert_eq!(reply.skill, "weather");
        assert_eq!(reply.route, "get_forecast");

        let err = control
            .handle(DISPATCH, serde_json::to_value(&request).unwrap())
            .await
            .unwrap_err();
        assert!(err.contains("No skill registered"));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let err = service()
            .handle("Parley.Shutdown", serde_json::Value::Null)
            .await
            .unwrap_err();
        assert!(err.contains("unknown method"));
    }
}
