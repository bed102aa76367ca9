use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::{
    app::{load_config, load_config_from, Config},
    cli::{handle_command, Cli},
    inference::WatsonxEndpoint,
    session::{ConversationController, TranscriptStore},
    utils::log_status,
};

use super::{chat::run_chat, non_interactive::NonInteractiveRunner};

/// Main runtime orchestrator
pub struct Orchestrator {
    cli: Cli,
    config: Config,
    project_dir: PathBuf,
}

impl Orchestrator {
    /// Create a new orchestrator from CLI args
    pub fn new(cli: Cli) -> Result<Self> {
        let mut config = if let Some(config_path) = &cli.config {
            load_config_from(config_path)?
        } else {
            match load_config() {
                Ok(cfg) => cfg,
                Err(e) => {
                    log_status(format!("⚠️  Failed to load config: {}. Using defaults.", e));
                    Config::default()
                }
            }
        };

        // CLI overrides config
        if let Some(mode) = cli.mode {
            config.chat.mode = mode;
        }
        if cli.no_transcript {
            config.chat.save_transcripts = false;
        }

        let project_dir = cli.path.clone().unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            cli,
            config,
            project_dir,
        })
    }

    /// Run the orchestrator. Returns `false` when a one-shot question failed.
    pub async fn run(self) -> Result<bool> {
        if let Some(command) = &self.cli.command {
            if handle_command(command, &self.config, &self.project_dir).await? {
                return Ok(true);
            }
        }

        let controller = self.build_controller()?;

        if let Some(prompt) = self.cli.prompt.clone() {
            return Ok(self.run_non_interactive(controller, prompt).await);
        }

        self.run_interactive(controller).await?;
        Ok(true)
    }

    fn build_controller(&self) -> Result<ConversationController> {
        let endpoint = WatsonxEndpoint::new(&self.config.watsonx)
            .context("Cannot connect to watsonx.ai")?;
        let controller = ConversationController::from_config(Arc::new(endpoint), &self.config)
            .context("Invalid deployment configuration")?;

        let targets = controller.router().targets();
        info!(
            "Routes: classification={:?} question={} programming={:?}",
            targets.classification().map(|r| r.deployment_id.as_str()),
            targets.question().deployment_id,
            targets.programming().map(|r| r.deployment_id.as_str()),
        );

        Ok(controller)
    }

    async fn run_non_interactive(&self, controller: ConversationController, prompt: String) -> bool {
        let mut runner = NonInteractiveRunner::new(controller);
        let result = runner.execute(prompt).await;
        println!("{}", runner.format_result(&result, self.cli.output_format));
        result.is_success()
    }

    async fn run_interactive(&self, mut controller: ConversationController) -> Result<()> {
        let store = if self.config.chat.save_transcripts {
            Some(TranscriptStore::new(&self.project_dir)?)
        } else {
            None
        };

        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut stdout = std::io::stdout();
        let transcript = run_chat(&mut controller, store.as_ref(), stdin, &mut stdout).await?;

        if let Some(store) = &store {
            if transcript.has_user_entries() {
                log_status(format!(
                    "{} {}",
                    "Transcript saved to".dimmed(),
                    store.dir().join(format!("{}.json", transcript.id)).display()
                ));
            }
        }

        Ok(())
    }
}
