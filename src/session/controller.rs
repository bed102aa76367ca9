use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use super::classifier::{ClassificationLabel, TaskClassifier};
use super::history::HistoryBuffer;
use super::message::Message;
use super::router::{Route, RouteTargets, Router};
use crate::app::Config;
use crate::inference::{single_variable, InferenceEndpoint};
use crate::utils::RouterError;

/// How the outgoing prompt is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum ConversationMode {
    /// Send only the current question
    #[serde(rename = "stateless")]
    #[value(name = "stateless")]
    Stateless,
    /// Send the recent history with the current question appended
    #[serde(rename = "history", alias = "history-aware")]
    #[value(name = "history")]
    HistoryAware,
}

impl fmt::Display for ConversationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationMode::Stateless => f.write_str("stateless"),
            ConversationMode::HistoryAware => f.write_str("history"),
        }
    }
}

/// Where a turn currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Classifying,
    Routing,
    Generating,
    Updating,
}

/// Everything that happened during one turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnReport {
    pub question: String,
    pub answer: String,
    /// `None` when no classification deployment is configured
    pub label: Option<ClassificationLabel>,
    pub route: Route,
    pub mode: ConversationMode,
}

/// One conversation: its history, its routes and the turn loop over them
///
/// A controller is never shared between conversations. Turns take `&mut self`,
/// so a single conversation is only ever driven by one caller at a time.
pub struct ConversationController {
    endpoint: Arc<dyn InferenceEndpoint>,
    router: Router,
    history: HistoryBuffer,
    mode: ConversationMode,
    phase: TurnPhase,
}

impl ConversationController {
    pub fn new(endpoint: Arc<dyn InferenceEndpoint>, router: Router, mode: ConversationMode) -> Self {
        Self {
            endpoint,
            router,
            history: HistoryBuffer::new(),
            mode,
            phase: TurnPhase::Idle,
        }
    }

    /// Start a conversation with the routes and mode from `config`
    pub fn from_config(
        endpoint: Arc<dyn InferenceEndpoint>,
        config: &Config,
    ) -> Result<Self, RouterError> {
        let targets = RouteTargets::from_config(config)?;
        let router = Router::new(targets, config.routing.strict);
        Ok(Self::new(endpoint, router, config.chat.mode))
    }

    /// Answer one user question
    pub async fn handle_turn(&mut self, question: &str) -> Result<String, RouterError> {
        self.run_turn(question).await.map(|report| report.answer)
    }

    /// Answer one user question, reporting how it was routed
    pub async fn run_turn(&mut self, question: &str) -> Result<TurnReport, RouterError> {
        let result = self.turn(question).await;
        self.enter(TurnPhase::Idle);
        result
    }

    async fn turn(&mut self, question: &str) -> Result<TurnReport, RouterError> {
        let label = match self.router.classification_target().cloned() {
            Some(target) => {
                self.enter(TurnPhase::Classifying);
                let classifier = TaskClassifier::new(self.endpoint.as_ref());
                Some(classifier.classify(question, &target).await?)
            }
            None => {
                debug!("No classification deployment configured; skipping classification");
                None
            }
        };

        self.enter(TurnPhase::Routing);
        let route = self.router.select_target(label)?.clone();
        info!(
            "Routing to {} deployment {}",
            route.role.as_str(),
            route.deployment_id
        );

        self.enter(TurnPhase::Generating);
        let prompt = match self.mode {
            ConversationMode::Stateless => question.to_string(),
            ConversationMode::HistoryAware => {
                self.history.append(Message::user(question));
                self.history.render()
            }
        };
        let variables = single_variable(route.variable_key.as_str(), prompt);
        let answer = self.endpoint.invoke(&route.deployment_id, &variables).await?;

        self.enter(TurnPhase::Updating);
        if self.mode == ConversationMode::HistoryAware {
            self.history.append(Message::assistant(answer.as_str()));
        }

        Ok(TurnReport {
            question: question.to_string(),
            answer,
            label,
            route,
            mode: self.mode,
        })
    }

    fn enter(&mut self, phase: TurnPhase) {
        if self.phase != phase {
            debug!("Turn phase: {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn mode(&self) -> ConversationMode {
        self.mode
    }

    /// Switch prompt mode; takes effect from the next turn
    pub fn set_mode(&mut self, mode: ConversationMode) {
        self.mode = mode;
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Forget all prior turns
    pub fn reset(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::MockInferenceEndpoint;
    use crate::session::message::MessageRole;
    use crate::session::router::TargetRole;
    use mockall::Sequence;
    use pretty_assertions::assert_eq;

    fn config(classification: Option<&str>, programming: Option<&str>) -> Config {
        let mut config = Config::default();
        config.deployments.classification_id = classification.map(String::from);
        config.deployments.question_id = Some("Q1".to_string());
        config.deployments.programming_id = programming.map(String::from);
        config
    }

    fn controller(endpoint: MockInferenceEndpoint, config: &Config) -> ConversationController {
        ConversationController::from_config(Arc::new(endpoint), config).unwrap()
    }

    #[tokio::test]
    async fn test_single_call_without_classification() {
        let mut endpoint = MockInferenceEndpoint::new();
        endpoint
            .expect_invoke()
            .withf(|deployment_id, variables| {
                deployment_id == "Q1"
                    && variables.get("question").map(String::as_str) == Some("print hello world")
            })
            .times(1)
            .returning(|_, _| Ok("print('hello world')".to_string()));

        let mut controller = controller(endpoint, &config(None, Some("P1")));
        let answer = controller.handle_turn("print hello world").await.unwrap();

        assert_eq!(answer, "print('hello world')");
        assert_eq!(controller.phase(), TurnPhase::Idle);
        assert!(controller.history().is_empty());
    }

    #[tokio::test]
    async fn test_classify_then_route_to_programming() {
        let mut seq = Sequence::new();
        let mut endpoint = MockInferenceEndpoint::new();
        endpoint
            .expect_invoke()
            .withf(|deployment_id, variables| {
                deployment_id == "C1" && variables.get("question").is_some()
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("\"programming\"".to_string()));
        endpoint
            .expect_invoke()
            .withf(|deployment_id, variables| {
                deployment_id == "P1"
                    && variables.get("task").map(String::as_str) == Some("print hello world")
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("fn main() { println!(\"hello world\"); }".to_string()));

        let mut controller = controller(endpoint, &config(Some("C1"), Some("P1")));
        let report = controller.run_turn("print hello world").await.unwrap();

        assert_eq!(report.label, Some(ClassificationLabel::Programming));
        assert_eq!(report.route.role, TargetRole::Programming);
        assert_eq!(report.route.deployment_id, "P1");
        assert_eq!(report.mode, ConversationMode::Stateless);
    }

    #[tokio::test]
    async fn test_unrecognized_label_falls_back_to_question() {
        let mut seq = Sequence::new();
        let mut endpoint = MockInferenceEndpoint::new();
        endpoint
            .expect_invoke()
            .withf(|deployment_id, _| deployment_id == "C1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("banana".to_string()));
        endpoint
            .expect_invoke()
            .withf(|deployment_id, _| deployment_id == "Q1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("an answer".to_string()));

        let mut controller = controller(endpoint, &config(Some("C1"), Some("P1")));
        let report = controller.run_turn("what is a monad?").await.unwrap();

        assert_eq!(report.label, Some(ClassificationLabel::Unknown));
        assert_eq!(report.route.deployment_id, "Q1");
        assert_eq!(report.answer, "an answer");
    }

    #[tokio::test]
    async fn test_history_mode_sends_rendered_history() {
        let mut seq = Sequence::new();
        let mut endpoint = MockInferenceEndpoint::new();
        endpoint
            .expect_invoke()
            .withf(|_, variables| variables.get("question").map(String::as_str) == Some("hi"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("hello".to_string()));
        endpoint
            .expect_invoke()
            .withf(|_, variables| {
                variables.get("question").map(String::as_str) == Some("hi hello how are you")
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("fine".to_string()));

        let mut cfg = config(None, None);
        cfg.chat.mode = ConversationMode::HistoryAware;
        let mut controller = controller(endpoint, &cfg);

        assert_eq!(controller.handle_turn("hi").await.unwrap(), "hello");
        assert_eq!(controller.handle_turn("how are you").await.unwrap(), "fine");

        let stored: Vec<_> = controller
            .history()
            .all()
            .map(|m| (m.role(), m.content().to_string()))
            .collect();
        assert_eq!(
            stored,
            vec![
                (MessageRole::User, "hi".to_string()),
                (MessageRole::Assistant, "hello".to_string()),
                (MessageRole::User, "how are you".to_string()),
                (MessageRole::Assistant, "fine".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_classification_uses_raw_question_in_history_mode() {
        let mut seq = Sequence::new();
        let mut endpoint = MockInferenceEndpoint::new();
        // (question, label, deployment, variable, prompt, answer)
        let turns = [
            ("q1", "\"generic\"", "Q1", "question", "q1", "a1"),
            ("q2", "\"programming\"", "P1", "task", "q1 a1 q2", "a2"),
        ];
        for (question, label, deployment, key, prompt, answer) in turns {
            endpoint
                .expect_invoke()
                .withf(move |deployment_id, variables| {
                    deployment_id == "C1"
                        && variables.len() == 1
                        && variables.get("question").map(String::as_str) == Some(question)
                })
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |_, _| Ok(label.to_string()));
            endpoint
                .expect_invoke()
                .withf(move |deployment_id, variables| {
                    deployment_id == deployment
                        && variables.len() == 1
                        && variables.get(key).map(String::as_str) == Some(prompt)
                })
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |_, _| Ok(answer.to_string()));
        }

        let mut cfg = config(Some("C1"), Some("P1"));
        cfg.chat.mode = ConversationMode::HistoryAware;
        let mut controller = controller(endpoint, &cfg);

        assert_eq!(controller.handle_turn("q1").await.unwrap(), "a1");
        let report = controller.run_turn("q2").await.unwrap();
        assert_eq!(report.label, Some(ClassificationLabel::Programming));
        assert_eq!(report.answer, "a2");
        assert_eq!(controller.history().render(), "q1 a1 q2 a2");
    }

    #[tokio::test]
    async fn test_generation_error_keeps_question_in_history() {
        let mut seq = Sequence::new();
        let mut endpoint = MockInferenceEndpoint::new();
        endpoint
            .expect_invoke()
            .withf(|deployment_id, _| deployment_id == "C1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("\"generic\"".to_string()));
        endpoint
            .expect_invoke()
            .withf(|deployment_id, _| deployment_id == "Q1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(RouterError::Transport("HTTP 502: bad gateway".to_string())));

        let mut cfg = config(Some("C1"), Some("P1"));
        cfg.chat.mode = ConversationMode::HistoryAware;
        let mut controller = controller(endpoint, &cfg);

        let result = controller.handle_turn("hello").await;
        assert!(matches!(result, Err(RouterError::Transport(_))));
        assert_eq!(controller.history().len(), 1);
        assert_eq!(controller.history().all().next().unwrap().role(), MessageRole::User);
        assert_eq!(controller.history().render(), "hello");
        assert_eq!(controller.phase(), TurnPhase::Idle);
    }

    #[tokio::test]
    async fn test_classification_error_aborts_turn() {
        let mut endpoint = MockInferenceEndpoint::new();
        endpoint
            .expect_invoke()
            .times(1)
            .returning(|_, _| Err(RouterError::Transport("HTTP 401: unauthorized".to_string())));

        let mut cfg = config(Some("C1"), Some("P1"));
        cfg.chat.mode = ConversationMode::HistoryAware;
        let mut controller = controller(endpoint, &cfg);

        let result = controller.handle_turn("hello").await;
        assert!(matches!(result, Err(RouterError::Transport(_))));
        assert!(controller.history().is_empty());
        assert_eq!(controller.phase(), TurnPhase::Idle);
    }

    #[tokio::test]
    async fn test_missing_programming_deployment_aborts_turn() {
        let mut endpoint = MockInferenceEndpoint::new();
        endpoint
            .expect_invoke()
            .withf(|deployment_id, _| deployment_id == "C1")
            .times(1)
            .returning(|_, _| Ok("\"programming\"".to_string()));

        let mut controller = controller(endpoint, &config(Some("C1"), None));
        let err = controller.handle_turn("write a loop").await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_unexpected_shape_surfaces() {
        let mut endpoint = MockInferenceEndpoint::new();
        endpoint.expect_invoke().times(1).returning(|_, _| {
            Err(RouterError::UnexpectedResponseShape("no generated_text".to_string()))
        });

        let mut controller = controller(endpoint, &config(None, None));
        assert!(matches!(
            controller.handle_turn("hello").await,
            Err(RouterError::UnexpectedResponseShape(_))
        ));
    }

    #[tokio::test]
    async fn test_set_mode_and_reset() {
        let mut endpoint = MockInferenceEndpoint::new();
        endpoint
            .expect_invoke()
            .times(2)
            .returning(|_, _| Ok("ok".to_string()));

        let mut controller = controller(endpoint, &config(None, None));
        controller.handle_turn("one").await.unwrap();
        assert!(controller.history().is_empty());

        controller.set_mode(ConversationMode::HistoryAware);
        controller.handle_turn("two").await.unwrap();
        assert_eq!(controller.history().len(), 2);

        controller.reset();
        assert!(controller.history().is_empty());
    }
}
