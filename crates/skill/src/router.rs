use std::sync::Arc;
use tracing::{debug, error, info};

use parley_core::{normalize_token, route_key, Utterance, ONBOARD_ROUTE};
use parley_storage::LastResponseStore;

use crate::error::{Result, SkillError};
use crate::registry::{RegistryEntry, SkillRegistry};

/// Outcome of resolving an utterance to a skill
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    /// Registry key that matched
    pub route: String,
    /// Whether the route was taken from the user's previous turn
    pub from_last_route: bool,
    pub entry: Arc<RegistryEntry>,
}

impl ResolvedRoute {
    pub fn skill_name(&self) -> &str {
        self.entry.name()
    }
}

/// Picks the skill that should handle an utterance
pub struct RouteResolver {
    registry: Arc<SkillRegistry>,
    last_responses: Arc<dyn LastResponseStore>,
}

impl RouteResolver {
    pub fn new(registry: Arc<SkillRegistry>, last_responses: Arc<dyn LastResponseStore>) -> Self {
        Self {
            registry,
            last_responses,
        }
    }

    pub fn registry(&self) -> &Arc<SkillRegistry> {
        &self.registry
    }

    /// Resolve the route for `utterance`.
    ///
    /// Exact `command_object` matches win outright. Otherwise the last bare
    /// object or command key seen is used. With nothing matched, the route of
    /// the user's previous turn is tried once and then forgotten.
    pub async fn resolve(&self, utterance: &mut Utterance) -> Result<ResolvedRoute> {
        let user = match utterance.user {
            Some(user) => user,
            None => return self.resolve_onboarding(),
        };

        if let Some(resolved) = self.match_tokens(utterance) {
            return Ok(resolved);
        }

        debug!("No trigger matched for {}, trying last route", user);

        // The utterance's own copy wins. Otherwise the stored one is removed
        // atomically, so concurrent turns cannot both fall back to it.
        let (last, from_store) = match utterance.last_response.take() {
            Some(last) => (Some(last), false),
            None => (self.last_responses.take_last_response(user).await?, true),
        };

        let Some(last) = last else {
            info!("No skill matched and no last route for {}", user);
            return Err(SkillError::MissingPackage {
                route: String::new(),
            });
        };

        let Some(entry) = self.registry.find(&last.route) else {
            info!("Last route '{}' for {} is no longer registered", last.route, user);
            let route = last.route.clone();
            if from_store {
                self.last_responses.set_last_response(user, last).await?;
            }
            return Err(SkillError::MissingPackage { route });
        };

        // One-shot: the next turn must not fall back to it again.
        if !from_store {
            self.last_responses.clear_last_response(user).await?;
        }

        info!("Resolved {} via last route '{}'", user, last.route);
        Ok(ResolvedRoute {
            route: last.route,
            from_last_route: true,
            entry,
        })
    }

    fn resolve_onboarding(&self) -> Result<ResolvedRoute> {
        match self.registry.find(ONBOARD_ROUTE) {
            Some(entry) => Ok(ResolvedRoute {
                route: ONBOARD_ROUTE.to_string(),
                from_last_route: false,
                entry,
            }),
            None => {
                error!("Missing required {} skill", ONBOARD_ROUTE);
                Err(SkillError::MissingPackage {
                    route: ONBOARD_ROUTE.to_string(),
                })
            }
        }
    }

    /// Walk commands (outer) and objects (inner) looking for a trigger.
    fn match_tokens(&self, utterance: &Utterance) -> Option<ResolvedRoute> {
        let mut fallback: Option<(String, Arc<RegistryEntry>)> = None;

        for command in utterance.commands() {
            for object in utterance.objects() {
                let key = route_key(command, object);
                debug!("Searching for route '{}'", key);

                if let Some(entry) = self.registry.find(&key) {
                    return Some(ResolvedRoute {
                        route: key,
                        from_last_route: false,
                        entry,
                    });
                }

                let object_key = normalize_token(object);
                if let Some(entry) = self.registry.find(&object_key) {
                    fallback = Some((object_key, entry));
                }
            }

            let command_key = normalize_token(command);
            if let Some(entry) = self.registry.find(&command_key) {
                fallback = Some((command_key, entry));
            }
        }

        fallback.map(|(route, entry)| ResolvedRoute {
            route,
            from_last_route: false,
            entry,
        })
    }
}
