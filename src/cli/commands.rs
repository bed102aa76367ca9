use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use crate::{
    app::{get_config_dir, init_config, Config},
    inference::{InferenceEndpoint, WatsonxEndpoint},
    session::{Route, RouteTargets, TranscriptStore},
};

use super::Commands;

/// Handle CLI subcommands. Returns `false` when the chat should start.
pub async fn handle_command(command: &Commands, config: &Config, project_dir: &Path) -> Result<bool> {
    match command {
        Commands::Init => {
            println!("Initializing taskroute configuration...");
            init_config()?;
            println!("Configuration initialized successfully!");
            Ok(true)
        }
        Commands::Version => {
            show_version();
            Ok(true)
        }
        Commands::Status => {
            show_status(config).await?;
            Ok(true)
        }
        Commands::Transcripts => {
            list_transcripts(project_dir)?;
            Ok(true)
        }
        Commands::Chat => Ok(false), // Continue to chat interface
    }
}

/// Show version information
pub fn show_version() {
    println!("taskroute v{}", env!("CARGO_PKG_VERSION"));
    println!("   Routes questions to watsonx.ai prompt deployments");
}

/// List saved transcripts, newest first
pub fn list_transcripts(project_dir: &Path) -> Result<()> {
    let store = TranscriptStore::new(project_dir)?;
    let transcripts = store.list()?;

    if transcripts.is_empty() {
        println!("No transcripts in {}", store.dir().display());
        return Ok(());
    }

    println!("Transcripts in {}:", store.dir().display());
    for transcript in transcripts {
        println!("  • {} {}", transcript.id.green(), transcript.summary());
    }
    Ok(())
}

/// Show configuration and check that every configured deployment answers
async fn show_status(config: &Config) -> Result<()> {
    println!("taskroute Status:");
    println!();

    match get_config_dir() {
        Ok(dir) => {
            let path = dir.join("config.toml");
            if path.exists() {
                println!("  [OK] Configuration: {}", path.display());
            } else {
                println!("  [WARNING] Configuration: Not found (using defaults)");
            }
        }
        Err(e) => println!("  [WARNING] Configuration directory: {}", e),
    }

    println!("  Service: {}", config.watsonx.url);
    match &config.watsonx.space_id {
        Some(space_id) => println!("  Space: {}", space_id),
        None => println!("  [WARNING] Space: not set"),
    }

    let targets = match RouteTargets::from_config(config) {
        Ok(targets) => targets,
        Err(e) => {
            println!("  [ERROR] Routes: {}", e);
            return Ok(());
        }
    };

    if targets.classification().is_none() {
        println!("  [WARNING] No classification deployment: every question goes to the question deployment");
    }
    if targets.programming().is_none() {
        println!("  [WARNING] No programming deployment");
    }

    let endpoint = match WatsonxEndpoint::new(&config.watsonx) {
        Ok(endpoint) => endpoint,
        Err(e) => {
            println!("  [ERROR] Credentials: {}", e);
            return Ok(());
        }
    };

    for line in check_routes(&endpoint, &targets.configured()).await {
        println!("  {}", line);
    }

    println!();
    Ok(())
}

/// One status line per route, from asking the endpoint about its deployment
async fn check_routes(endpoint: &dyn InferenceEndpoint, routes: &[&Route]) -> Vec<String> {
    let mut lines = Vec::with_capacity(routes.len());
    for route in routes {
        let label = format!("{} ({})", route.role.as_str(), route.deployment_id);
        lines.push(match endpoint.validate_deployment(&route.deployment_id).await {
            Ok(true) => format!("[OK] {}", label),
            Ok(false) => format!("[ERROR] {}: not found or not accessible", label),
            Err(e) => format!("[ERROR] {}: {}", label, e),
        });
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::MockInferenceEndpoint;
    use crate::utils::RouterError;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_check_routes_reports_each_deployment() {
        let mut config = Config::default();
        config.deployments.classification_id = Some("C1".to_string());
        config.deployments.question_id = Some("Q1".to_string());
        config.deployments.programming_id = Some("P1".to_string());
        let targets = RouteTargets::from_config(&config).unwrap();

        let mut endpoint = MockInferenceEndpoint::new();
        endpoint
            .expect_validate_deployment()
            .times(3)
            .returning(|deployment_id| match deployment_id {
                "C1" => Ok(true),
                "Q1" => Ok(false),
                _ => Err(RouterError::Transport("HTTP 401: unauthorized".to_string())),
            });
        endpoint.expect_invoke().never();

        let lines = check_routes(&endpoint, &targets.configured()).await;
        assert_eq!(
            lines,
            vec![
                "[OK] classification (C1)".to_string(),
                "[ERROR] question (Q1): not found or not accessible".to_string(),
                format!(
                    "[ERROR] programming (P1): {}",
                    RouterError::Transport("HTTP 401: unauthorized".to_string())
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_chat_command_continues() {
        let temp_dir = TempDir::new().unwrap();
        let handled = handle_command(&Commands::Chat, &Config::default(), temp_dir.path())
            .await
            .unwrap();
        assert!(!handled);
    }

    #[tokio::test]
    async fn test_transcripts_command_on_empty_project() {
        let temp_dir = TempDir::new().unwrap();
        let handled = handle_command(&Commands::Transcripts, &Config::default(), temp_dir.path())
            .await
            .unwrap();
        assert!(handled);
        assert!(temp_dir.path().join(".taskroute/transcripts").is_dir());
    }
}
