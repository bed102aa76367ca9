use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_API_VERSION, DEFAULT_CLASSIFICATION_VARIABLE, DEFAULT_IAM_URL,
    DEFAULT_PROGRAMMING_VARIABLE, DEFAULT_QUESTION_VARIABLE, DEFAULT_WATSONX_URL,
};
use crate::session::ConversationMode;

/// Unprefixed variable names accepted from the environment (the lab `.env` layout)
const LEGACY_ENV_KEYS: &[&str] = &[
    "api_key",
    "url",
    "space_id",
    "classification_deployment_id",
    "question_deployment_id",
    "programming_deployment_id",
];

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Service endpoint and credentials
    #[serde(default)]
    pub watsonx: WatsonxConfig,

    /// Prompt template deployments, one per routing role
    #[serde(default)]
    pub deployments: DeploymentConfig,

    /// Prompt variable name each deployment expects
    #[serde(default)]
    pub prompt_variables: PromptVariableConfig,

    /// Routing behaviour
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Chat front-end settings
    #[serde(default)]
    pub chat: ChatConfig,
}

/// watsonx.ai connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatsonxConfig {
    /// Base URL of the regional watsonx.ai service
    pub url: String,
    /// IBM Cloud API key, exchanged for an IAM bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Deployment space holding the prompt template deployments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<String>,
    /// IAM token endpoint
    pub iam_url: String,
    /// `version` query parameter sent with every API call
    pub api_version: String,
}

impl Default for WatsonxConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WATSONX_URL.to_string(),
            api_key: None,
            space_id: None,
            iam_url: DEFAULT_IAM_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }
}

/// Deployment ids; a missing id disables the matching route
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub programming_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptVariableConfig {
    pub classification: String,
    pub question: String,
    pub programming: String,
}

impl Default for PromptVariableConfig {
    fn default() -> Self {
        Self {
            classification: DEFAULT_CLASSIFICATION_VARIABLE.to_string(),
            question: DEFAULT_QUESTION_VARIABLE.to_string(),
            programming: DEFAULT_PROGRAMMING_VARIABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Fail the turn when the classifier picks a route with no deployment.
    /// When false the question deployment answers instead.
    pub strict: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self { strict: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Whether prior turns are folded into the prompt
    pub mode: ConversationMode,
    /// Persist transcripts under `.taskroute/transcripts`
    pub save_transcripts: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            mode: ConversationMode::Stateless,
            save_transcripts: true,
        }
    }
}

/// Load configuration from multiple sources
pub fn load_config() -> Result<Config> {
    let config_dir = get_config_dir()?;
    let global_config = config_dir.join("config.toml");
    let local_config = PathBuf::from(".taskroute/config.toml");

    extract(layered(&[global_config, local_config]))
}

/// Load configuration from one explicit file, still honouring environment overrides
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        anyhow::bail!("Config file not found: {}", path.display());
    }
    extract(layered(&[path.to_path_buf()]))
}

fn layered(files: &[PathBuf]) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    for file in files {
        if file.exists() {
            figment = figment.merge(Toml::file(file));
        }
    }

    // Lab-style unprefixed variables, then TASKROUTE_ (highest priority)
    figment
        .merge(
            Env::raw()
                .only(LEGACY_ENV_KEYS)
                .map(|key| legacy_key_path(&key.as_str().to_ascii_lowercase()).into()),
        )
        .merge(Env::prefixed("TASKROUTE_").split("__"))
}

fn extract(figment: Figment) -> Result<Config> {
    figment.extract().context("Failed to load configuration")
}

/// Map a lab `.env` variable name onto its nested config key
fn legacy_key_path(key: &str) -> String {
    match key {
        "api_key" => "watsonx.api_key".to_string(),
        "url" => "watsonx.url".to_string(),
        "space_id" => "watsonx.space_id".to_string(),
        other => match other.strip_suffix("_deployment_id") {
            Some(role) => format!("deployments.{}_id", role),
            None => other.to_string(),
        },
    }
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "taskroute") {
        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;
        Ok(config_dir.to_path_buf())
    } else {
        // Fallback to home directory
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Could not determine home directory")?;
        let config_dir = PathBuf::from(home).join(".config").join("taskroute");
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }
}

/// Save configuration to file
pub fn save_config(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let path = if let Some(p) = path {
        p
    } else {
        get_config_dir()?.join("config.toml")
    };

    let toml_string = toml::to_string_pretty(config)?;
    std::fs::write(&path, toml_string)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

/// Create a default configuration file if it doesn't exist
pub fn init_config() -> Result<()> {
    let config_dir = get_config_dir()?;
    let config_file = config_dir.join("config.toml");

    if !config_file.exists() {
        save_config(&Config::default(), Some(config_file.clone()))?;
        println!("Created default configuration at: {}", config_file.display());
    }

    let local_example = PathBuf::from(".taskroute/config.toml.example");
    if !local_example.exists() {
        if let Some(parent) = local_example.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let example_config = r#"# taskroute project configuration
# Values here override the global config; TASKROUTE_* variables override both.

[watsonx]
url = "https://us-south.ml.cloud.ibm.com"
space_id = "<deployment space id>"
# api_key is best supplied as TASKROUTE_WATSONX__API_KEY

[deployments]
# Leave classification_id unset to send every question to question_id
classification_id = "<classification prompt deployment>"
question_id = "<question prompt deployment>"
programming_id = "<programming prompt deployment>"

[chat]
mode = "history"
"#;
        std::fs::write(&local_example, example_config)?;
        println!("Created example configuration at: {}", local_example.display());
    }

    Ok(())
}
