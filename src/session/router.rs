use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::classifier::ClassificationLabel;
use crate::app::Config;
use crate::utils::RouterError;

/// The job a deployment does in the routing chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetRole {
    Classification,
    Question,
    Programming,
}

impl TargetRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetRole::Classification => "classification",
            TargetRole::Question => "question",
            TargetRole::Programming => "programming",
        }
    }
}

/// A deployment together with the prompt variable it reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub role: TargetRole,
    pub deployment_id: String,
    pub variable_key: String,
}

/// The deployments one session can route to
///
/// The question deployment is mandatory; the other two are optional and
/// their absence switches off the matching branch of the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTargets {
    question: Route,
    classification: Option<Route>,
    programming: Option<Route>,
}

impl RouteTargets {
    /// Build targets from the `[deployments]` and `[prompt_variables]` sections
    pub fn from_config(config: &Config) -> Result<Self, RouterError> {
        let deployments = &config.deployments;
        let keys = &config.prompt_variables;

        let question = route(TargetRole::Question, &deployments.question_id, &keys.question)
            .ok_or_else(|| {
                RouterError::Configuration(
                    "question deployment id is not set (deployments.question_id)".to_string(),
                )
            })?;

        Ok(Self {
            question,
            classification: route(
                TargetRole::Classification,
                &deployments.classification_id,
                &keys.classification,
            ),
            programming: route(
                TargetRole::Programming,
                &deployments.programming_id,
                &keys.programming,
            ),
        })
    }

    pub fn question(&self) -> &Route {
        &self.question
    }

    pub fn classification(&self) -> Option<&Route> {
        self.classification.as_ref()
    }

    pub fn programming(&self) -> Option<&Route> {
        self.programming.as_ref()
    }

    /// Every configured route, classification first
    pub fn configured(&self) -> Vec<&Route> {
        self.classification
            .iter()
            .chain(std::iter::once(&self.question))
            .chain(self.programming.iter())
            .collect()
    }
}

/// Blank ids count as unset
fn route(role: TargetRole, deployment_id: &Option<String>, variable_key: &str) -> Option<Route> {
    deployment_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| Route {
            role,
            deployment_id: id.to_string(),
            variable_key: variable_key.to_string(),
        })
}

/// Picks the deployment that answers a question
#[derive(Debug, Clone)]
pub struct Router {
    targets: RouteTargets,
    strict: bool,
}

impl Router {
    pub fn new(targets: RouteTargets, strict: bool) -> Self {
        Self { targets, strict }
    }

    pub fn targets(&self) -> &RouteTargets {
        &self.targets
    }

    /// Where classification should run, if anywhere
    pub fn classification_target(&self) -> Option<&Route> {
        self.targets.classification()
    }

    /// Map a classification outcome to the answering deployment
    ///
    /// `label` is `None` when classification did not run.
    pub fn select_target(&self, label: Option<ClassificationLabel>) -> Result<&Route, RouterError> {
        let question = self.targets.question();

        let selected = match label {
            _ if self.targets.classification().is_none() => question,
            None => question,
            Some(ClassificationLabel::Generic) => question,
            Some(ClassificationLabel::Programming) => match self.targets.programming() {
                Some(programming) => programming,
                None if self.strict => {
                    return Err(RouterError::Configuration(
                        "question was classified as programming but no programming deployment \
                         is configured (deployments.programming_id)"
                            .to_string(),
                    ));
                }
                None => {
                    warn!("No programming deployment configured; using the question deployment");
                    question
                }
            },
            Some(ClassificationLabel::Unknown) => {
                info!("Task was not determined; using the question deployment");
                question
            }
        };

        Ok(selected)
    }
}
