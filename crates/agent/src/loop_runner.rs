//! The planning-execution loop implementation.

use crate::run_context::RunContext;
use chrono::Utc;
use intentus_core::agent::{AgentConfig, Verbosity};
use intentus_core::error::{AgentError, ReasonerError, ToolError};
use intentus_core::event::{DomainEvent, EventBus};
use intentus_core::intention::Intention;
use intentus_core::memory::{MemoryRecord, Outcome, RecordedAction};
use intentus_core::reasoner::{Decision, PromptMaterials, Reasoner};
use intentus_core::run::{RunResult, TerminationReason};
use intentus_core::tool::{Tool, ToolRegistry};
use intentus_memory::WindowLimit;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// The agent: drives the Reasoner and the tool registry for one run at a time.
///
/// An `Agent` holds no per-run state and can serve many concurrent runs;
/// each run gets its own [`RunContext`]. The tool registry is shared and
/// read afresh at every Decide step.
pub struct Agent {
    /// The Reasoner Client
    reasoner: Arc<dyn Reasoner>,

    /// Shared tool registry
    tools: Arc<ToolRegistry>,

    /// Budgets and policies
    config: AgentConfig,

    /// Event bus for domain events
    event_bus: Arc<EventBus>,
}

impl Agent {
    /// Create a new agent.
    pub fn new(reasoner: Arc<dyn Reasoner>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        Self {
            reasoner,
            tools,
            config,
            event_bus: Arc::new(EventBus::default()),
        }
    }

    /// Publish domain events on a shared bus.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Run the loop for a query and optional structured context.
    ///
    /// Fails only when `query` is empty. Every other outcome, including
    /// budget exhaustion and an unreachable Reasoner, is a `RunResult`.
    pub async fn run(
        &self,
        query: &str,
        context: Option<serde_json::Value>,
    ) -> Result<RunResult, AgentError> {
        let ctx = self.start(uuid::Uuid::new_v4().to_string(), query, context, None)?;
        Ok(self.drive(ctx).await)
    }

    /// Run the loop for an inbound intention.
    pub async fn run_intention(&self, intention: &Intention) -> Result<RunResult, AgentError> {
        let ctx = self.start(
            intention.session_id.clone(),
            &intention.to_query(),
            Some(intention.to_context()),
            Some(intention),
        )?;
        Ok(self.drive(ctx).await)
    }

    /// Start: validate the query and create the run's context.
    fn start(
        &self,
        session_id: String,
        query: &str,
        context: Option<serde_json::Value>,
        intention: Option<&Intention>,
    ) -> Result<RunContext, AgentError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AgentError::EmptyQuery);
        }

        let intention_type = intention.map(|i| i.intention_type.as_str().to_string());
        if self.config.verbosity != Verbosity::Quiet {
            info!(
                session_id = %session_id,
                intention_type = intention_type.as_deref().unwrap_or("none"),
                max_steps = self.config.max_steps,
                "Run started"
            );
        }
        self.event_bus.publish(DomainEvent::RunStarted {
            session_id: session_id.clone(),
            query_preview: query.chars().take(120).collect(),
            intention_type,
            timestamp: Utc::now(),
        });

        Ok(RunContext::new(
            session_id,
            query,
            context,
            self.config.max_time(),
        ))
    }

    async fn drive(&self, mut ctx: RunContext) -> RunResult {
        self.analyze(&mut ctx).await;

        while !ctx.is_terminated() {
            if ctx.steps_taken() >= self.config.max_steps || ctx.is_expired() {
                self.exhaust_budget(&mut ctx);
                break;
            }

            self.decide(&mut ctx).await;

            if !ctx.is_terminated() && ctx.is_expired() {
                self.exhaust_budget(&mut ctx);
            }
        }

        self.finalize(ctx)
    }

    /// Analyze: query analysis plus the tool-free base response.
    async fn analyze(&self, ctx: &mut RunContext) {
        let materials = self.materials(ctx);

        match self.bounded(ctx, self.reasoner.analyze(&materials)).await {
            Ok(analysis) => ctx.analysis = analysis,
            Err(e) => return self.reasoner_failed(ctx, e),
        }

        if self.config.generate_base_response {
            let materials = self.materials(ctx);
            match self.bounded(ctx, self.reasoner.respond(&materials)).await {
                Ok(text) => ctx.base_response = text,
                Err(e) => self.reasoner_failed(ctx, e),
            }
        }
    }

    /// Decide: the single branching point of the loop.
    async fn decide(&self, ctx: &mut RunContext) {
        let materials = self.materials(ctx);
        debug!(
            session_id = %ctx.session_id,
            step = materials.step,
            tools = materials.tools.len(),
            "Deciding next action"
        );

        let decision = match self.bounded(ctx, self.reasoner.decide(&materials)).await {
            Ok(decision) => decision,
            Err(ReasonerError::Malformed(reason)) => {
                return self.planning_error(
                    ctx,
                    RecordedAction::NoDecision,
                    format!("Malformed decision: {reason}"),
                    Outcome::Malformed,
                    String::new(),
                );
            }
            Err(ReasonerError::Timeout(ms)) => {
                let observation = format!("Decide call abandoned after {ms}ms: run time budget exhausted");
                self.record(ctx, RecordedAction::NoDecision, observation.clone(), Outcome::TimedOut, "");
                ctx.error = Some(observation);
                return self.exhaust_budget(ctx);
            }
            Err(e) => return self.reasoner_failed(ctx, e),
        };

        match decision {
            Decision::FinalAnswer { text, rationale } => {
                self.record(ctx, RecordedAction::FinalAnswer, text.clone(), Outcome::Succeeded, rationale);
                ctx.final_answer = Some(text);
                ctx.terminate(TerminationReason::Completed);
            }
            Decision::Clarify { question } => {
                self.record(ctx, RecordedAction::Clarification, question.clone(), Outcome::Succeeded, "");
                ctx.clarification = Some(question);
                ctx.terminate(TerminationReason::ClarificationNeeded);
            }
            Decision::InvokeTool {
                name,
                arguments,
                rationale,
            } => match self.tools.resolve(&name) {
                Ok(tool) => self.execute(ctx, tool, name, arguments, rationale).await,
                Err(e) => {
                    let observation =
                        format!("{e}. Available tools: {}", self.tools.names().join(", "));
                    self.planning_error(
                        ctx,
                        RecordedAction::ToolCall {
                            tool: name,
                            arguments,
                        },
                        observation,
                        Outcome::UnknownTool,
                        rationale,
                    );
                }
            },
        }
    }

    /// Execute: invoke the tool under min(tool timeout, remaining run time).
    async fn execute(
        &self,
        ctx: &mut RunContext,
        tool: Arc<dyn Tool>,
        name: String,
        arguments: serde_json::Value,
        rationale: String,
    ) {
        let budget = self.config.tool_timeout().min(ctx.remaining());
        let started = Instant::now();

        // On timeout the invocation future is dropped, so a late result is
        // discarded rather than merged into a later step.
        let invoked = tokio::time::timeout(budget, tool.invoke(arguments.clone())).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let (observation, outcome) = match invoked {
            Ok(Ok(result)) if result.success => (result.output, Outcome::Succeeded),
            Ok(Ok(result)) => (result.output, Outcome::Failed),
            Ok(Err(e)) => (e.to_string(), Outcome::Failed),
            Err(_) => (
                ToolError::Timeout {
                    tool_name: name.clone(),
                    timeout_ms: budget.as_millis() as u64,
                }
                .to_string(),
                Outcome::TimedOut,
            ),
        };

        if !outcome.is_success() {
            warn!(
                session_id = %ctx.session_id,
                tool = %name,
                outcome = outcome.as_str(),
                error = %observation,
                "Tool invocation failed"
            );
        }

        self.event_bus.publish(DomainEvent::ToolExecuted {
            tool_name: name.clone(),
            success: outcome.is_success(),
            duration_ms,
            timestamp: Utc::now(),
        });

        self.record(
            ctx,
            RecordedAction::ToolCall {
                tool: name.clone(),
                arguments,
            },
            observation.clone(),
            outcome,
            rationale,
        );

        // The decision itself was usable.
        ctx.consecutive_planning_errors = 0;
        ctx.last_error = None;

        if outcome.is_success() {
            ctx.consecutive_tool_failures = 0;
            return;
        }

        ctx.consecutive_tool_failures += 1;
        if ctx.consecutive_tool_failures > self.config.max_tool_failures {
            warn!(
                session_id = %ctx.session_id,
                failures = ctx.consecutive_tool_failures,
                "Too many consecutive tool failures"
            );
            ctx.error = Some(format!("{name}: {observation}"));
            ctx.terminate(TerminationReason::ToolFailuresExceeded);
        }
    }

    /// A recoverable planning error: record it, re-prompt unless retries are used up.
    fn planning_error(
        &self,
        ctx: &mut RunContext,
        action: RecordedAction,
        observation: String,
        outcome: Outcome,
        rationale: String,
    ) {
        warn!(
            session_id = %ctx.session_id,
            step = ctx.memory.next_step(),
            error = %observation,
            "Planning error"
        );
        self.record(ctx, action, observation.clone(), outcome, rationale);

        ctx.consecutive_planning_errors += 1;
        if ctx.consecutive_planning_errors > self.config.max_decide_retries {
            ctx.error = Some(observation);
            ctx.terminate(TerminationReason::PlanningFailed);
        } else {
            ctx.last_error = Some(observation);
        }
    }

    fn reasoner_failed(&self, ctx: &mut RunContext, error: ReasonerError) {
        let reason = match &error {
            ReasonerError::Unavailable { .. } => TerminationReason::ReasonerUnavailable,
            ReasonerError::Timeout(_) => TerminationReason::BudgetExceeded,
            ReasonerError::Rejected(_) | ReasonerError::Malformed(_) => {
                TerminationReason::ReasonerRejected
            }
        };
        warn!(
            session_id = %ctx.session_id,
            reason = reason.as_str(),
            error = %error,
            "Reasoner call failed"
        );
        ctx.error = Some(error.to_string());
        ctx.terminate(reason);
    }

    fn exhaust_budget(&self, ctx: &mut RunContext) {
        if ctx.error.is_none() {
            ctx.error = Some(if ctx.is_expired() {
                format!("time budget of {}s exhausted", self.config.max_time_secs)
            } else {
                format!("step budget of {} exhausted", self.config.max_steps)
            });
        }
        ctx.terminate(TerminationReason::BudgetExceeded);
    }

    /// Await a Reasoner call, abandoning it at the run's deadline.
    async fn bounded<T>(
        &self,
        ctx: &RunContext,
        call: impl Future<Output = Result<T, ReasonerError>>,
    ) -> Result<T, ReasonerError> {
        let remaining = ctx.remaining();
        tokio::time::timeout(remaining, call)
            .await
            .unwrap_or_else(|_| Err(ReasonerError::Timeout(remaining.as_millis() as u64)))
    }

    fn materials(&self, ctx: &RunContext) -> PromptMaterials {
        PromptMaterials {
            query: ctx.query.clone(),
            context: ctx.context.clone(),
            analysis: (!ctx.analysis.is_empty()).then(|| ctx.analysis.clone()),
            tools: self.tools.definitions(),
            memory: ctx
                .memory
                .window(WindowLimit::Records(self.config.memory_window)),
            step: ctx.memory.next_step(),
            max_steps: self.config.max_steps,
            last_error: ctx.last_error.clone(),
        }
    }

    fn record(
        &self,
        ctx: &mut RunContext,
        action: RecordedAction,
        observation: String,
        outcome: Outcome,
        rationale: impl Into<String>,
    ) {
        let session_id = ctx.session_id.clone();
        let record = ctx.record(action, observation, outcome, rationale);
        self.log_record(&session_id, record);
        self.event_bus.publish(DomainEvent::StepRecorded {
            session_id,
            step: record.step,
            summary: record.summary(),
            timestamp: Utc::now(),
        });
    }

    fn log_record(&self, session_id: &str, record: &MemoryRecord) {
        match self.config.verbosity {
            Verbosity::Verbose => info!(
                session_id,
                step = record.step,
                action = %record.action,
                outcome = record.outcome.as_str(),
                "Step recorded"
            ),
            Verbosity::Normal | Verbosity::Quiet => debug!(
                session_id,
                step = record.step,
                action = %record.action,
                outcome = record.outcome.as_str(),
                "Step recorded"
            ),
        }
    }

    /// Finalize: compose the result from the run's context.
    fn finalize(&self, ctx: RunContext) -> RunResult {
        let reason = ctx.termination().unwrap_or(TerminationReason::BudgetExceeded);
        let success = reason == TerminationReason::Completed;
        let execution_time = ctx.elapsed();
        let steps_taken = ctx.steps_taken();

        let final_output = match reason {
            TerminationReason::Completed => ctx.final_answer.clone().unwrap_or_default(),
            TerminationReason::ClarificationNeeded => ctx.clarification.clone().unwrap_or_default(),
            // Partial result: the best answer available is the base response.
            _ => ctx.base_response.clone(),
        };

        let elapsed_ms = execution_time.as_millis() as u64;
        if success {
            if self.config.verbosity != Verbosity::Quiet {
                info!(session_id = %ctx.session_id, steps = steps_taken, elapsed_ms, "Run completed");
            }
        } else {
            warn!(
                session_id = %ctx.session_id,
                steps = steps_taken,
                elapsed_ms,
                reason = reason.as_str(),
                "Run finished without an answer"
            );
        }

        self.event_bus.publish(DomainEvent::RunFinished {
            session_id: ctx.session_id.clone(),
            success,
            reason: reason.as_str().to_string(),
            steps: steps_taken,
            timestamp: Utc::now(),
        });

        RunResult {
            success,
            reason,
            query_analysis: ctx.analysis,
            base_response: ctx.base_response,
            final_output,
            execution_time,
            steps_taken,
            memory: ctx.memory.into_records(),
            clarification: ctx.clarification,
            error: if success { None } else { ctx.error },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use intentus_core::intention::IntentionType;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn registry(tool: impl Tool + 'static) -> Arc<ToolRegistry> {
        let registry = ToolRegistry::new();
        registry.register_tool(tool).unwrap();
        Arc::new(registry)
    }

    fn agent(reasoner: ScriptedReasoner, tools: Arc<ToolRegistry>, config: AgentConfig) -> Agent {
        Agent::new(Arc::new(reasoner), tools, config)
    }

    fn echo_registry() -> Arc<ToolRegistry> {
        registry(EchoTool)
    }

    #[tokio::test]
    async fn answers_directly_without_tools() {
        let agent = agent(
            ScriptedReasoner::decisions(vec![Decision::answer("Paris")]),
            echo_registry(),
            AgentConfig::default(),
        );

        let result = agent.run("What is the capital of France?", None).await.unwrap();

        assert!(result.success);
        assert_eq!(result.reason, TerminationReason::Completed);
        assert_eq!(result.final_output, "Paris");
        assert_eq!(result.base_response, "Base answer");
        assert_eq!(result.query_analysis, "The user wants a short factual answer.");
        assert_eq!(result.steps_taken, 1);
        assert_eq!(result.memory[0].action, RecordedAction::FinalAnswer);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn unbounded_time_budget_runs_normally() {
        let config = AgentConfig {
            max_time_secs: u64::MAX,
            ..Default::default()
        };
        let agent = agent(
            ScriptedReasoner::decisions(vec![
                Decision::invoke("echo", json!({"text": "hi"})),
                Decision::answer("Paris"),
            ]),
            echo_registry(),
            config,
        );

        let result = agent.run("What is the capital of France?", None).await.unwrap();

        assert!(result.success);
        assert_eq!(result.reason, TerminationReason::Completed);
        assert_eq!(result.final_output, "Paris");
        assert_eq!(result.steps_taken, 2);
    }

    #[tokio::test]
    async fn tool_observation_feeds_the_next_decision() {
        let reasoner = Arc::new(ScriptedReasoner::decisions(vec![
            Decision::invoke("echo", json!({"text": "hello"})),
            Decision::answer("The tool said hello"),
        ]));
        let agent = Agent::new(reasoner.clone(), echo_registry(), AgentConfig::default());

        let result = agent.run("Say hello", None).await.unwrap();

        assert!(result.success);
        assert_eq!(result.steps_taken, 2);
        let first = &result.memory[0];
        assert_eq!(first.step, 1);
        assert_eq!(first.outcome, Outcome::Succeeded);
        assert_eq!(first.observation, "hello");
        assert_eq!(
            first.action,
            RecordedAction::ToolCall {
                tool: "echo".into(),
                arguments: json!({"text": "hello"}),
            }
        );

        let seen = reasoner.seen();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].memory.is_empty());
        assert_eq!(seen[1].memory.len(), 1);
        assert_eq!(seen[1].step, 2);
    }

    #[tokio::test]
    async fn unknown_tool_is_recorded_and_reprompted() {
        let reasoner = Arc::new(ScriptedReasoner::decisions(vec![
            Decision::invoke("teleport", json!({})),
            Decision::answer("Done without teleporting"),
        ]));
        let agent = Agent::new(reasoner.clone(), echo_registry(), AgentConfig::default());

        let result = agent.run("Go to Mars", None).await.unwrap();

        assert!(result.success);
        assert_eq!(result.steps_taken, 2);
        assert_eq!(result.memory[0].outcome, Outcome::UnknownTool);
        assert!(result.memory[0].observation.contains("Unknown tool: teleport"));
        assert!(result.memory[0].observation.contains("echo"));

        let retry = &reasoner.seen()[1];
        let last_error = retry.last_error.as_deref().unwrap();
        assert!(last_error.contains("teleport"));
    }

    #[tokio::test]
    async fn step_budget_yields_partial_result() {
        let config = AgentConfig {
            max_steps: 3,
            ..Default::default()
        };
        let agent = agent(
            ScriptedReasoner::decisions(vec![
                Decision::invoke("echo", json!({"text": "1"})),
                Decision::invoke("echo", json!({"text": "2"})),
                Decision::invoke("echo", json!({"text": "3"})),
            ]),
            echo_registry(),
            config,
        );

        let result = agent.run("Loop forever", None).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.reason, TerminationReason::BudgetExceeded);
        assert_eq!(result.steps_taken, 3);
        assert_eq!(result.final_output, "Base answer");
        assert!(result.error.unwrap().contains("step budget"));
        let steps: Vec<u32> = result.memory.iter().map(|r| r.step).collect();
        assert_eq!(steps, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn single_step_budget_stops_after_first_tool() {
        let config = AgentConfig {
            max_steps: 1,
            ..Default::default()
        };
        let agent = agent(
            ScriptedReasoner::decisions(vec![Decision::invoke("echo", json!({"text": "once"}))]),
            echo_registry(),
            config,
        );

        let result = agent.run("Echo once", None).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.reason, TerminationReason::BudgetExceeded);
        assert_eq!(result.steps_taken, 1);
        assert_eq!(result.memory[0].outcome, Outcome::Succeeded);
    }

    #[tokio::test]
    async fn persistent_unknown_tool_forces_finalize() {
        let agent = agent(
            ScriptedReasoner::decisions(vec![
                Decision::invoke("teleport", json!({})),
                Decision::invoke("teleport", json!({})),
                Decision::invoke("teleport", json!({})),
            ]),
            echo_registry(),
            AgentConfig::default(),
        );

        let result = agent.run("Go to Mars", None).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.reason, TerminationReason::PlanningFailed);
        assert_eq!(result.steps_taken, 3);
        assert!(result.memory.iter().all(|r| r.outcome == Outcome::UnknownTool));
        assert_eq!(result.final_output, "Base answer");
    }

    #[tokio::test]
    async fn unreachable_reasoner_ends_the_run() {
        let agent = agent(
            ScriptedReasoner::unavailable(),
            echo_registry(),
            AgentConfig::default(),
        );

        let result = agent.run("Anything", None).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.reason, TerminationReason::ReasonerUnavailable);
        assert_eq!(result.steps_taken, 0);
        assert!(result.memory.is_empty());
        assert!(result.error.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let agent = agent(
            ScriptedReasoner::decisions(vec![]),
            echo_registry(),
            AgentConfig::default(),
        );
        assert!(matches!(
            agent.run("   ", None).await,
            Err(AgentError::EmptyQuery)
        ));
    }

    #[tokio::test]
    async fn clarification_ends_the_run() {
        let agent = agent(
            ScriptedReasoner::decisions(vec![Decision::clarify("Which city do you mean?")]),
            echo_registry(),
            AgentConfig::default(),
        );

        let result = agent.run("What's the weather there?", None).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.reason, TerminationReason::ClarificationNeeded);
        assert_eq!(result.final_output, "Which city do you mean?");
        assert_eq!(result.clarification.as_deref(), Some("Which city do you mean?"));
        assert_eq!(result.memory[0].action, RecordedAction::Clarification);
    }

    #[tokio::test]
    async fn malformed_decision_is_retried_with_error() {
        let reasoner = Arc::new(ScriptedReasoner::new(vec![
            Err(ReasonerError::Malformed("no JSON object found".into())),
            Ok(Decision::answer("42")),
        ]));
        let agent = Agent::new(reasoner.clone(), echo_registry(), AgentConfig::default());

        let result = agent.run("Meaning of life?", None).await.unwrap();

        assert!(result.success);
        assert_eq!(result.memory[0].action, RecordedAction::NoDecision);
        assert_eq!(result.memory[0].outcome, Outcome::Malformed);

        let seen = reasoner.seen();
        assert!(seen[0].last_error.is_none());
        assert!(seen[1]
            .last_error
            .as_deref()
            .unwrap()
            .contains("no JSON object found"));
    }

    #[tokio::test]
    async fn repeated_planning_errors_fail_the_run() {
        let config = AgentConfig {
            max_decide_retries: 1,
            ..Default::default()
        };
        let agent = agent(
            ScriptedReasoner::new(vec![
                Err(ReasonerError::Malformed("garbage".into())),
                Ok(Decision::invoke("nope", json!({}))),
            ]),
            echo_registry(),
            config,
        );

        let result = agent.run("Break it", None).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.reason, TerminationReason::PlanningFailed);
        assert_eq!(result.steps_taken, 2);
        assert!(result.error.unwrap().contains("nope"));
    }

    #[tokio::test]
    async fn successful_tool_call_resets_planning_errors() {
        let config = AgentConfig {
            max_decide_retries: 1,
            ..Default::default()
        };
        let agent = agent(
            ScriptedReasoner::new(vec![
                Err(ReasonerError::Malformed("garbage".into())),
                Ok(Decision::invoke("echo", json!({"text": "ok"}))),
                Err(ReasonerError::Malformed("garbage again".into())),
                Ok(Decision::answer("fine")),
            ]),
            echo_registry(),
            config,
        );

        let result = agent.run("Wobble", None).await.unwrap();

        assert!(result.success);
        assert_eq!(result.steps_taken, 4);
    }

    #[tokio::test]
    async fn consecutive_tool_failures_end_the_run() {
        let config = AgentConfig {
            max_tool_failures: 1,
            ..Default::default()
        };
        let agent = agent(
            ScriptedReasoner::decisions(vec![
                Decision::invoke("flaky", json!({})),
                Decision::invoke("flaky", json!({})),
            ]),
            registry(FailingTool),
            config,
        );

        let result = agent.run("Call the flaky service", None).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.reason, TerminationReason::ToolFailuresExceeded);
        assert_eq!(result.steps_taken, 2);
        assert!(result.memory.iter().all(|r| r.outcome == Outcome::Failed));
        assert!(result.memory[0].observation.contains("service unavailable"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_tool_is_abandoned_at_the_deadline() {
        let slow = SlowTool::new(Duration::from_secs(60));
        let finished = slow.finished.clone();
        let config = AgentConfig {
            max_time_secs: 5,
            ..Default::default()
        };
        let agent = agent(
            ScriptedReasoner::decisions(vec![Decision::invoke("slow", json!({}))]),
            registry(slow),
            config,
        );

        let result = agent.run("Wait for it", None).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.reason, TerminationReason::BudgetExceeded);
        assert_eq!(result.steps_taken, 1);
        assert_eq!(result.memory[0].outcome, Outcome::TimedOut);
        assert_eq!(result.final_output, "Base answer");
        assert!(result.execution_time <= Duration::from_secs(6));

        // The late result never lands.
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn tool_timeout_is_recorded_and_loop_continues() {
        let config = AgentConfig {
            tool_timeout_secs: 2,
            ..Default::default()
        };
        let agent = agent(
            ScriptedReasoner::decisions(vec![
                Decision::invoke("slow", json!({})),
                Decision::answer("Gave up on the slow tool"),
            ]),
            registry(SlowTool::new(Duration::from_secs(10))),
            config,
        );

        let result = agent.run("Try the slow tool", None).await.unwrap();

        assert!(result.success);
        assert_eq!(result.memory[0].outcome, Outcome::TimedOut);
        assert!(result.memory[0].observation.contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn decide_past_deadline_is_abandoned() {
        let config = AgentConfig {
            max_time_secs: 2,
            ..Default::default()
        };
        let agent = agent(
            ScriptedReasoner::decisions(vec![Decision::answer("too late")])
                .with_decide_delay(Duration::from_secs(10)),
            echo_registry(),
            config,
        );

        let result = agent.run("Think hard", None).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.reason, TerminationReason::BudgetExceeded);
        assert_eq!(result.memory.len(), 1);
        assert_eq!(result.memory[0].action, RecordedAction::NoDecision);
        assert_eq!(result.memory[0].outcome, Outcome::TimedOut);
        assert_eq!(result.final_output, "Base answer");
    }

    #[tokio::test]
    async fn registered_tool_is_visible_at_next_decide() {
        let tools = Arc::new(ToolRegistry::new());
        tools
            .register_tool(InstallerTool {
                registry: tools.clone(),
                calls: AtomicUsize::new(0),
            })
            .unwrap();
        let reasoner = Arc::new(ScriptedReasoner::decisions(vec![
            Decision::invoke("install_echo", json!({})),
            Decision::invoke("echo", json!({"text": "fresh"})),
            Decision::answer("fresh"),
        ]));
        let agent = Agent::new(reasoner.clone(), tools, AgentConfig::default());

        let result = agent.run("Install and use echo", None).await.unwrap();

        assert!(result.success);
        assert_eq!(result.memory[1].outcome, Outcome::Succeeded);
        let seen = reasoner.seen();
        assert!(!seen[0].offers_tool("echo"));
        assert!(seen[1].offers_tool("echo"));
    }

    #[tokio::test]
    async fn memory_window_bounds_prompt_history() {
        let config = AgentConfig {
            memory_window: 2,
            ..Default::default()
        };
        let reasoner = Arc::new(ScriptedReasoner::decisions(vec![
            Decision::invoke("echo", json!({"text": "a"})),
            Decision::invoke("echo", json!({"text": "b"})),
            Decision::invoke("echo", json!({"text": "c"})),
            Decision::answer("abc"),
        ]));
        let agent = Agent::new(reasoner.clone(), echo_registry(), config);

        let result = agent.run("Spell abc", None).await.unwrap();

        assert_eq!(result.memory.len(), 4);
        let last = &reasoner.seen()[3];
        let steps: Vec<u32> = last.memory.iter().map(|r| r.step).collect();
        assert_eq!(steps, vec![2, 3]);
    }

    #[tokio::test]
    async fn base_response_can_be_disabled() {
        let config = AgentConfig {
            generate_base_response: false,
            max_steps: 1,
            ..Default::default()
        };
        let agent = agent(
            ScriptedReasoner::decisions(vec![Decision::invoke("echo", json!({"text": "x"}))]),
            echo_registry(),
            config,
        );

        let result = agent.run("Echo x", None).await.unwrap();

        assert_eq!(result.reason, TerminationReason::BudgetExceeded);
        assert!(result.base_response.is_empty());
        assert!(result.final_output.is_empty());
    }

    #[tokio::test]
    async fn concurrent_runs_keep_separate_memory() {
        let agent = agent(
            ScriptedReasoner::decisions(vec![Decision::answer("one"), Decision::answer("two")]),
            echo_registry(),
            AgentConfig::default(),
        );

        let (a, b) = tokio::join!(agent.run("First", None), agent.run("Second", None));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(a.success && b.success);
        assert_eq!(a.memory.len(), 1);
        assert_eq!(b.memory.len(), 1);
        assert_eq!(a.memory[0].step, 1);
        assert_eq!(b.memory[0].step, 1);
    }

    #[tokio::test]
    async fn intention_runs_carry_session_and_context() {
        let bus = Arc::new(EventBus::new(16));
        let mut events = bus.subscribe();
        let reasoner = Arc::new(ScriptedReasoner::decisions(vec![Decision::answer(
            "Turn on the lights",
        )]));
        let agent = Agent::new(reasoner.clone(), echo_registry(), AgentConfig::default())
            .with_event_bus(bus);
        let intention = Intention {
            session_id: "session-42".into(),
            intention_type: IntentionType::VoiceCommand,
            description: "User wants more light".into(),
            confidence: 0.9,
            transcript: Some("it's too dark in here".into()),
            environment_context: None,
            timestamp: 1_700_000_000,
        };

        let result = agent.run_intention(&intention).await.unwrap();
        assert!(result.success);

        let seen = reasoner.seen();
        assert!(seen[0].query.contains("User said: \"it's too dark in here\""));
        assert_eq!(
            seen[0].context.as_ref().unwrap()["intention_type"],
            "voice_command"
        );

        let mut kinds = Vec::new();
        while let Ok(event) = events.try_recv() {
            match event.as_ref() {
                DomainEvent::RunStarted {
                    session_id,
                    intention_type,
                    ..
                } => {
                    assert_eq!(session_id, "session-42");
                    assert_eq!(intention_type.as_deref(), Some("voice_command"));
                    kinds.push("started");
                }
                DomainEvent::StepRecorded { step, .. } => {
                    assert_eq!(*step, 1);
                    kinds.push("step");
                }
                DomainEvent::ToolExecuted { .. } => kinds.push("tool"),
                DomainEvent::RunFinished {
                    success, reason, ..
                } => {
                    assert!(*success);
                    assert_eq!(reason, "completed");
                    kinds.push("finished");
                }
            }
        }
        assert_eq!(kinds, vec!["started", "step", "finished"]);
    }
}
