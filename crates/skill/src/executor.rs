use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use parley_core::{SkillResponse, Utterance};

use crate::error::SkillError;
use crate::router::RouteResolver;

/// How a skill is told about the utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationMode {
    /// Fresh request
    Run,
    /// Continuation of the previous exchange
    FollowUp,
}

impl InvocationMode {
    /// Continuation when context was already added this turn, when the route
    /// came from the previous turn, or when there are no commands at all.
    pub fn choose(context_added: bool, from_last_route: bool, utterance: &Utterance) -> Self {
        if context_added || from_last_route || utterance.is_continuation() {
            InvocationMode::FollowUp
        } else {
            InvocationMode::Run
        }
    }

    pub fn procedure(&self) -> &'static str {
        match self {
            InvocationMode::Run => "Run",
            InvocationMode::FollowUp => "FollowUp",
        }
    }

    /// Fully qualified method, e.g. `Weather.FollowUp`
    pub fn method_for(&self, procedure_prefix: &str) -> String {
        format!("{}.{}", procedure_prefix, self.procedure())
    }
}

/// Successful dispatch
#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub response: SkillResponse,
    pub skill: String,
    pub route: String,
    pub mode: InvocationMode,
    pub duration_ms: u64,
}

/// Failed dispatch, carrying whatever was known when it failed
#[derive(Debug, thiserror::Error)]
#[error("dispatch failed (skill: {}, route: '{route}'): {error}", .skill.as_deref().unwrap_or("none"))]
pub struct DispatchFailure {
    pub skill: Option<String>,
    pub route: String,
    #[source]
    pub error: SkillError,
}

impl DispatchFailure {
    pub fn is_missing_package(&self) -> bool {
        self.error.is_missing_package()
    }
}

/// Resolves utterances and calls the chosen skill. Never retries.
pub struct Dispatcher {
    resolver: Arc<RouteResolver>,
}

impl Dispatcher {
    pub fn new(resolver: Arc<RouteResolver>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &Arc<RouteResolver> {
        &self.resolver
    }

    pub async fn dispatch(
        &self,
        mut utterance: Utterance,
        context_added: bool,
    ) -> std::result::Result<DispatchResult, DispatchFailure> {
        let start = Instant::now();

        let resolved = match self.resolver.resolve(&mut utterance).await {
            Ok(resolved) => resolved,
            Err(e) => {
                let route = match &e {
                    SkillError::MissingPackage { route } => route.clone(),
                    _ => String::new(),
                };
                info!("Utterance {} not routed: {}", utterance.id, e);
                return Err(DispatchFailure {
                    skill: None,
                    route,
                    error: e,
                });
            }
        };

        let entry = Arc::clone(&resolved.entry);
        let skill = entry.name().to_string();
        let mode = InvocationMode::choose(context_added, resolved.from_last_route, &utterance);
        let method = mode.method_for(&entry.descriptor.procedure_prefix());

        utterance.route = Some(resolved.route.clone());
        info!("Sending utterance {} to {} ({})", utterance.id, skill, method);
        debug!("Calling {} with {:?}", method, utterance);

        match entry.channel.invoke(&method, &utterance).await {
            Ok(response) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                info!("{} answered in {}ms", method, duration_ms);
                Ok(DispatchResult {
                    response,
                    skill,
                    route: resolved.route,
                    mode,
                    duration_ms,
                })
            }
            Err(e) => {
                error!("Invalid response from {} via {}: {}", method, entry.channel.endpoint(), e);
                Err(DispatchFailure {
                    skill: Some(skill),
                    route: resolved.route,
                    error: SkillError::Dispatch { method, source: e },
                })
            }
        }
    }
}
