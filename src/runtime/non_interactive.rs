use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::{
    cli::OutputFormat,
    session::{ClassificationLabel, ConversationController, ConversationMode, Route},
};

/// Result of a non-interactive run
#[derive(Debug, Serialize, Deserialize)]
pub struct NonInteractiveResult {
    /// The question that was asked
    pub prompt: String,
    /// The generated answer (empty when the turn failed)
    pub response: String,
    /// Any errors that occurred
    pub errors: Vec<String>,
    /// How the question was routed
    pub metadata: ExecutionMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    /// Classification outcome, if classification ran
    pub label: Option<ClassificationLabel>,
    /// Deployment that produced the answer
    pub route: Option<Route>,
    pub mode: ConversationMode,
    /// Execution time in milliseconds
    pub duration_ms: u128,
}

impl NonInteractiveResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Answers a single question and exits
pub struct NonInteractiveRunner {
    controller: ConversationController,
}

impl NonInteractiveRunner {
    pub fn new(controller: ConversationController) -> Self {
        Self { controller }
    }

    /// Execute a single question and return the result
    pub async fn execute(&mut self, prompt: String) -> NonInteractiveResult {
        let start_time = std::time::Instant::now();
        let mode = self.controller.mode();

        let (response, label, route, errors) = match self.controller.run_turn(&prompt).await {
            Ok(report) => (report.answer, report.label, Some(report.route), Vec::new()),
            Err(e) => (String::new(), None, None, vec![e.to_string()]),
        };

        NonInteractiveResult {
            prompt,
            response,
            errors,
            metadata: ExecutionMetadata {
                label,
                route,
                mode,
                duration_ms: start_time.elapsed().as_millis(),
            },
        }
    }

    /// Format the result according to the output format
    pub fn format_result(&self, result: &NonInteractiveResult, format: OutputFormat) -> String {
        match format {
            OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_else(|e| {
                format!("{{\"error\": \"Failed to serialize result: {}\"}}", e)
            }),
            OutputFormat::Text => {
                let mut output = String::new();
                output.push_str(&result.response);

                if !result.errors.is_empty() {
                    if !output.is_empty() {
                        output.push('\n');
                    }
                    for error in &result.errors {
                        output.push_str(&format!("{} {}\n", "error:".red(), error));
                    }
                }

                output
            }
            OutputFormat::Markdown => {
                let mut output = String::new();

                output.push_str("## Response\n\n");
                output.push_str(&result.response);
                output.push_str("\n\n");

                if !result.errors.is_empty() {
                    output.push_str("## Errors\n\n");
                    for error in &result.errors {
                        output.push_str(&format!("- {}\n", error));
                    }
                    output.push('\n');
                }

                let label = result
                    .metadata
                    .label
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "not classified".to_string());
                let deployment = result
                    .metadata
                    .route
                    .as_ref()
                    .map(|r| format!("{} ({})", r.role.as_str(), r.deployment_id))
                    .unwrap_or_else(|| "none".to_string());

                output.push_str("---\n");
                output.push_str(&format!(
                    "*Task: {} | Deployment: {} | Mode: {} | Duration: {}ms*\n",
                    label, deployment, result.metadata.mode, result.metadata.duration_ms
                ));

                output
            }
        }
    }
}
