use async_trait::async_trait;

use super::types::PromptVariables;
use crate::utils::RouterError;

/// A remote service that runs deployed prompt templates
///
/// Implementations must not retry: a failure is reported once and the
/// caller decides what to do with the turn.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InferenceEndpoint: Send + Sync {
    /// Run `deployment_id` with the given prompt variables and return the generated text
    async fn invoke(
        &self,
        deployment_id: &str,
        variables: &PromptVariables,
    ) -> Result<String, RouterError>;

    /// Check that a deployment exists and is reachable with the current credentials
    async fn validate_deployment(&self, deployment_id: &str) -> Result<bool, RouterError>;
}
