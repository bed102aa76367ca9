use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use super::router::Route;
use crate::constants::{TASK_GENERIC, TASK_PROGRAMMING};
use crate::inference::{single_variable, InferenceEndpoint};
use crate::utils::RouterError;

/// What kind of task a question is, as judged by the classification prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationLabel {
    Generic,
    Programming,
    Unknown,
}

impl ClassificationLabel {
    /// Interpret raw classifier output
    ///
    /// The classification prompt answers with the label wrapped in double
    /// quotes. Every `"` is removed and the rest must match exactly;
    /// anything else is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.replace('"', "").as_str() {
            TASK_GENERIC => ClassificationLabel::Generic,
            TASK_PROGRAMMING => ClassificationLabel::Programming,
            _ => ClassificationLabel::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationLabel::Generic => TASK_GENERIC,
            ClassificationLabel::Programming => TASK_PROGRAMMING,
            ClassificationLabel::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ClassificationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Labels questions by running them through the classification deployment
pub struct TaskClassifier<'a> {
    endpoint: &'a dyn InferenceEndpoint,
}

impl<'a> TaskClassifier<'a> {
    pub fn new(endpoint: &'a dyn InferenceEndpoint) -> Self {
        Self { endpoint }
    }

    /// Classify the raw question (never the history-rendered prompt)
    pub async fn classify(
        &self,
        question: &str,
        target: &Route,
    ) -> Result<ClassificationLabel, RouterError> {
        let variables = single_variable(target.variable_key.as_str(), question);
        let raw = self.endpoint.invoke(&target.deployment_id, &variables).await?;

        let label = ClassificationLabel::parse(&raw);
        info!("Task type: {} (raw: {:?})", label, raw);
        Ok(label)
    }
}
