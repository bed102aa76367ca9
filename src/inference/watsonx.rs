use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::traits::InferenceEndpoint;
use super::types::PromptVariables;
use crate::app::WatsonxConfig;
use crate::constants::{
    HEALTH_CHECK_TIMEOUT_SECS, HTTP_REQUEST_TIMEOUT_SECS, IAM_GRANT_TYPE, TOKEN_EXPIRY_MARGIN_SECS,
};
use crate::utils::RouterError;

/// Prompt template deployments on watsonx.ai, called over REST
///
/// The API key is exchanged for an IAM bearer token on first use; the token
/// is reused until shortly before it expires.
pub struct WatsonxEndpoint {
    client: Client,
    base_url: String,
    iam_url: String,
    api_version: String,
    api_key: String,
    space_id: Option<String>,
    token: Mutex<Option<BearerToken>>,
}

#[derive(Debug, Clone)]
struct BearerToken {
    access_token: String,
    /// Unix seconds
    expires_at: i64,
}

impl BearerToken {
    fn is_fresh(&self, now: i64) -> bool {
        now + TOKEN_EXPIRY_MARGIN_SECS < self.expires_at
    }
}

impl WatsonxEndpoint {
    /// Create an endpoint from the `[watsonx]` configuration section
    pub fn new(config: &WatsonxConfig) -> Result<Self, RouterError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                RouterError::Configuration(
                    "watsonx api_key is not set (TASKROUTE_WATSONX__API_KEY or api_key)".to_string(),
                )
            })?;

        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
                .build()?,
            base_url: config.url.trim_end_matches('/').to_string(),
            iam_url: config.iam_url.clone(),
            api_version: config.api_version.clone(),
            api_key,
            space_id: config.space_id.clone(),
            token: Mutex::new(None),
        })
    }

    /// Return a valid bearer token, exchanging the API key if needed
    async fn bearer_token(&self) -> Result<String, RouterError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_fresh(Utc::now().timestamp()) {
                return Ok(token.access_token.clone());
            }
        }

        let token = self.request_token().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    async fn request_token(&self) -> Result<BearerToken, RouterError> {
        debug!("Requesting IAM token from {}", self.iam_url);

        let response = self
            .client
            .post(&self.iam_url)
            .header("Accept", "application/json")
            .form(&[("grant_type", IAM_GRANT_TYPE), ("apikey", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RouterError::http(status, body));
        }

        parse_token(&body, Utc::now().timestamp())
    }

    fn generation_url(&self, deployment_id: &str) -> String {
        format!(
            "{}/ml/v1/deployments/{}/text/generation?version={}",
            self.base_url, deployment_id, self.api_version
        )
    }
}

#[async_trait]
impl InferenceEndpoint for WatsonxEndpoint {
    async fn invoke(
        &self,
        deployment_id: &str,
        variables: &PromptVariables,
    ) -> Result<String, RouterError> {
        let token = self.bearer_token().await?;
        let request_body = json!({
            "parameters": {
                "prompt_variables": variables,
            }
        });

        debug!("Invoking deployment {} with {:?}", deployment_id, variables);

        let response = self
            .client
            .post(self.generation_url(deployment_id))
            .bearer_auth(token)
            .header("Accept", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RouterError::http(status, body));
        }

        let generated = extract_generated_text(&body)?;
        info!("Deployment {} responded ({} chars)", deployment_id, generated.len());
        debug!("Response: {}", generated);

        Ok(generated)
    }

    async fn validate_deployment(&self, deployment_id: &str) -> Result<bool, RouterError> {
        let token = self.bearer_token().await?;
        let url = format!("{}/ml/v4/deployments/{}", self.base_url, deployment_id);

        let mut query = vec![("version", self.api_version.as_str())];
        if let Some(space_id) = &self.space_id {
            query.push(("space_id", space_id.as_str()));
        }

        let response = self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS))
            .bearer_auth(token)
            .query(&query)
            .send()
            .await?;

        Ok(response.status().is_success())
    }
}

// Response structures for the watsonx.ai REST API

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    /// Absolute expiry, unix seconds
    expiration: Option<i64>,
    /// Relative expiry, seconds
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    results: Vec<GenerationResult>,
}

#[derive(Debug, Deserialize)]
struct GenerationResult {
    generated_text: Option<String>,
}

fn parse_token(body: &str, now: i64) -> Result<BearerToken, RouterError> {
    let parsed: TokenResponse = serde_json::from_str(body)
        .map_err(|e| RouterError::UnexpectedResponseShape(format!("IAM token response: {}", e)))?;

    let access_token = parsed.access_token.ok_or_else(|| {
        RouterError::UnexpectedResponseShape("IAM response has no access_token".to_string())
    })?;

    let expires_at = parsed
        .expiration
        .or_else(|| parsed.expires_in.map(|secs| now + secs))
        .unwrap_or(now);

    Ok(BearerToken {
        access_token,
        expires_at,
    })
}

/// Pull `results[0].generated_text` out of a text generation response body
fn extract_generated_text(body: &str) -> Result<String, RouterError> {
    let parsed: GenerationResponse = serde_json::from_str(body)
        .map_err(|e| RouterError::UnexpectedResponseShape(format!("generation response: {}", e)))?;

    parsed
        .results
        .into_iter()
        .next()
        .and_then(|result| result.generated_text)
        .ok_or_else(|| {
            RouterError::UnexpectedResponseShape(
                "generation response has no results[0].generated_text".to_string(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_generated_text() {
        let body = r#"{"model_id":"ibm/granite-13b-chat-v2","results":[{"generated_text":"\"programming\"","stop_reason":"eos_token"}]}"#;
        assert_eq!(extract_generated_text(body).unwrap(), "\"programming\"");
    }

    #[test]
    fn test_empty_generated_text_is_not_an_error() {
        let body = r#"{"results":[{"generated_text":""}]}"#;
        assert_eq!(extract_generated_text(body).unwrap(), "");
    }

    #[test]
    fn test_missing_results_is_unexpected_shape() {
        for body in [r#"{"results":[]}"#, r#"{"errors":[]}"#, r#"{"results":[{}]}"#, "not json"] {
            match extract_generated_text(body) {
                Err(RouterError::UnexpectedResponseShape(_)) => {}
                other => panic!("Expected UnexpectedResponseShape for {}, got {:?}", body, other),
            }
        }
    }

    #[test]
    fn test_parse_token_uses_absolute_expiration() {
        let token = parse_token(r#"{"access_token":"abc","expiration":5000,"expires_in":3600}"#, 1000)
            .unwrap();
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.expires_at, 5000);
        assert!(token.is_fresh(1000));
        assert!(!token.is_fresh(5000 - TOKEN_EXPIRY_MARGIN_SECS));
    }

    #[test]
    fn test_parse_token_falls_back_to_relative_expiry() {
        let token = parse_token(r#"{"access_token":"abc","expires_in":3600}"#, 1000).unwrap();
        assert_eq!(token.expires_at, 4600);
    }

    #[test]
    fn test_parse_token_without_access_token() {
        assert!(matches!(
            parse_token(r#"{"errorCode":"BXNIM0415E"}"#, 0),
            Err(RouterError::UnexpectedResponseShape(_))
        ));
    }

    #[test]
    fn test_new_requires_api_key() {
        let config = WatsonxConfig::default();
        assert!(matches!(
            WatsonxEndpoint::new(&config),
            Err(RouterError::Configuration(_))
        ));
    }

    #[test]
    fn test_generation_url() {
        let config = WatsonxConfig {
            url: "https://us-south.ml.cloud.ibm.com/".to_string(),
            api_key: Some("key".to_string()),
            ..WatsonxConfig::default()
        };
        let endpoint = WatsonxEndpoint::new(&config).unwrap();
        assert_eq!(
            endpoint.generation_url("dep-1"),
            "https://us-south.ml.cloud.ibm.com/ml/v1/deployments/dep-1/text/generation?version=2023-05-29"
        );
    }
}
