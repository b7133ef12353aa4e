//! Run supervisor — executes one crew on a background task and translates
//! everything it does into [`RunEvent`]s.
//!
//! `start_run` returns immediately with a [`RunHandle`]; all failures inside
//! the background task are caught and surfaced as a terminal `error` event,
//! never propagated. Every run ends with exactly one terminal event
//! (`final_result` xor `error`).

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::crew::{Capability, Crew, CrewAgent, CrewTask, ProcessKind};
use crate::error::CoreError;
use crate::run::broker::InputBroker;
use crate::run::events::{RunEvent, RunLogger};
use crate::runner::tools::{self, ToolDirective};
use crate::runner::{AgentMessage, AgentRunner};

/// Upper bound on directive/answer rounds within a single task.
const MAX_TURNS: usize = 8;

/// A live run. Dropping the handle does not stop the background task;
/// an abandoned run keeps executing (and keeps its channel growing unread).
pub struct RunHandle {
    pub id: String,
    pub events: mpsc::UnboundedReceiver<RunEvent>,
    pub task: JoinHandle<()>,
}

#[derive(Clone)]
struct RunContext {
    logger: RunLogger,
    broker: Arc<InputBroker>,
    runner: Arc<dyn AgentRunner>,
    http: reqwest::Client,
}

impl RunContext {
    /// Pause the run until a human delivers a value for a fresh token.
    ///
    /// There is deliberately no timeout here: absent a cancellation feature,
    /// a run blocks for as long as the caller takes to answer.
    async fn human_input(&self, prompt: &str) -> Result<String, CoreError> {
        let token = Uuid::new_v4().to_string();
        let rx = self.broker.register(&token);
        let _guard = PendingInputGuard {
            broker: self.broker.clone(),
            token: token.clone(),
        };
        self.logger.event(RunEvent::InputRequired {
            id: token.clone(),
            prompt: prompt.to_string(),
        });
        tracing::info!("[RunSupervisor] waiting for human input (id: {})", token);

        rx.await.map_err(|_| {
            CoreError::Runner("input request was dropped before a value arrived".to_string())
        })
    }
}

/// Unregisters a pending input token when the wait ends.
///
/// After a successful delivery the entry is already gone, so the drop is a
/// no-op; it matters when the waiting future is dropped mid-flight (a
/// parallel sibling failing aborts blocked tasks) — without it the token
/// would stay registered forever and a later submission would be swallowed.
struct PendingInputGuard {
    broker: Arc<InputBroker>,
    token: String,
}

impl Drop for PendingInputGuard {
    fn drop(&mut self) {
        self.broker.forget(&self.token);
    }
}

/// Launch a crew on a background task and hand back its event stream.
pub fn start_run(crew: Crew, runner: Arc<dyn AgentRunner>, broker: Arc<InputBroker>) -> RunHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let id = Uuid::new_v4().to_string();
    let run_id = id.clone();

    let task = tokio::spawn(async move {
        let ctx = RunContext {
            logger: RunLogger::new(tx),
            broker,
            runner,
            http: reqwest::Client::new(),
        };

        tracing::info!(
            "[RunSupervisor] run {} started: crew '{}', {} task(s), {:?}",
            run_id,
            crew.name,
            crew.tasks.len(),
            crew.process,
        );

        // Execution runs on its own task so a panic in a runner
        // implementation surfaces as a join error here instead of closing
        // the channel with no terminal event.
        let outcome = {
            let ctx = ctx.clone();
            tokio::spawn(async move { execute_crew(&crew, &ctx).await }).await
        };

        match outcome {
            Ok(Ok(result)) => {
                ctx.logger.event(RunEvent::FinalResult { result });
                tracing::info!("[RunSupervisor] run {} finished", run_id);
            }
            Ok(Err(e)) => {
                tracing::warn!("[RunSupervisor] run {} failed: {}", run_id, e);
                ctx.logger.event(RunEvent::Error { message: e.to_string() });
            }
            Err(e) => {
                tracing::error!("[RunSupervisor] run {} crashed: {}", run_id, e);
                ctx.logger.event(RunEvent::Error {
                    message: format!("crew execution failed: {}", e),
                });
            }
        }
    });

    RunHandle { id, events: rx, task }
}

async fn execute_crew(crew: &Crew, ctx: &RunContext) -> Result<String, CoreError> {
    match crew.process {
        ProcessKind::Sequential | ProcessKind::Hierarchical => {
            let mut previous: Option<String> = None;
            for task in &crew.tasks {
                let agent = &crew.agents[task.agent];
                let output = run_task(crew, agent, task, previous.as_deref(), ctx).await?;
                previous = Some(output);
            }
            Ok(previous.unwrap_or_default())
        }
        ProcessKind::Parallel => {
            let mut handles = Vec::new();
            for task in crew.tasks.clone() {
                let crew = crew.clone();
                let ctx = ctx.clone();
                handles.push(tokio::spawn(async move {
                    let agent = &crew.agents[task.agent];
                    run_task(&crew, agent, &task, None, &ctx).await
                }));
            }

            let mut outputs = Vec::new();
            let mut failure: Option<CoreError> = None;
            for handle in handles {
                if failure.is_some() {
                    handle.abort();
                    // Wait for the cancelled future to be dropped so its
                    // cleanup (pending-input guards included) has run before
                    // the terminal event is emitted.
                    let _ = handle.await;
                    continue;
                }
                match handle.await {
                    Ok(Ok(output)) => outputs.push(output),
                    Ok(Err(e)) => failure = Some(e),
                    Err(e) => failure = Some(CoreError::Runner(format!("task aborted: {}", e))),
                }
            }
            match failure {
                Some(e) => Err(e),
                None => Ok(outputs.join("\n\n")),
            }
        }
    }
}

/// Drive one task as a short conversation, honoring tool directives the
/// agent was granted at build time. Every assistant turn is logged; the
/// first non-directive turn is the task's output.
async fn run_task(
    crew: &Crew,
    agent: &CrewAgent,
    task: &CrewTask,
    previous: Option<&str>,
    ctx: &RunContext,
) -> Result<String, CoreError> {
    tracing::debug!("[RunSupervisor] task '{}' -> agent '{}'", task.id, agent.id);

    let mut prompt = String::new();
    if crew.process == ProcessKind::Hierarchical {
        prompt.push_str("The crew manager has assigned you this task.\n\n");
    }
    prompt.push_str(&task.description);
    if !task.expected_output.is_empty() {
        prompt.push_str("\n\nExpected output: ");
        prompt.push_str(&task.expected_output);
    }
    if let Some(context) = previous.filter(|c| !c.is_empty()) {
        prompt.push_str("\n\nContext from the previous task:\n");
        prompt.push_str(context);
    }

    let mut messages = vec![AgentMessage::user(prompt)];
    let mut reviewed = false;

    for _ in 0..MAX_TURNS {
        let text = ctx.runner.complete(agent, &messages).await?;
        ctx.logger.line(&text);

        match tools::parse_directive(&text) {
            Some(ToolDirective::AskHuman(question))
                if agent.has_capability(Capability::HumanInput) =>
            {
                let answer = ctx.human_input(&question).await?;
                messages.push(AgentMessage::assistant(text));
                messages.push(AgentMessage::user(format!("Human response: {}", answer)));
            }
            Some(ToolDirective::Search(query))
                if agent.has_capability(Capability::RemoteSearch) =>
            {
                let observation = match tools::remote_search(&ctx.http, &query).await {
                    Ok(observation) => observation,
                    Err(e) => format!("Search failed: {}", e),
                };
                messages.push(AgentMessage::assistant(text));
                messages.push(AgentMessage::user(format!("Observation:\n{}", observation)));
            }
            Some(ToolDirective::Fetch(url)) if agent.has_capability(Capability::PageFetch) => {
                let observation = match tools::fetch_page(&ctx.http, &url).await {
                    Ok(observation) => observation,
                    Err(e) => format!("Fetch failed: {}", e),
                };
                messages.push(AgentMessage::assistant(text));
                messages.push(AgentMessage::user(format!("Observation:\n{}", observation)));
            }
            // Ungranted directives fall through and count as plain output.
            _ => {
                if task.human_input && !reviewed {
                    reviewed = true;
                    let feedback = ctx
                        .human_input(&format!("Review the output of task '{}':\n{}", task.id, text))
                        .await?;
                    messages.push(AgentMessage::assistant(text));
                    messages.push(AgentMessage::user(format!(
                        "Human feedback: {}\nRevise your answer accordingly.",
                        feedback
                    )));
                } else {
                    return Ok(text);
                }
            }
        }
    }

    Err(CoreError::Runner(format!(
        "task '{}' exceeded {} turns without a final answer",
        task.id, MAX_TURNS
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::Role;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    enum Step {
        Say(&'static str),
        Fail(&'static str),
        /// Respond with the prefix followed by the latest user message.
        Incorporate(&'static str),
    }

    struct ScriptedRunner {
        script: Mutex<VecDeque<Step>>,
    }

    impl ScriptedRunner {
        fn new(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self { script: Mutex::new(steps.into()) })
        }
    }

    #[async_trait]
    impl AgentRunner for ScriptedRunner {
        async fn complete(
            &self,
            _agent: &CrewAgent,
            messages: &[AgentMessage],
        ) -> Result<String, CoreError> {
            let step = self
                .script
                .lock()
                .await
                .pop_front()
                .ok_or_else(|| CoreError::Runner("script exhausted".to_string()))?;
            match step {
                Step::Say(text) => Ok(text.to_string()),
                Step::Fail(message) => Err(CoreError::Runner(message.to_string())),
                Step::Incorporate(prefix) => {
                    let last_user = messages
                        .iter()
                        .rev()
                        .find(|m| m.role == Role::User)
                        .map(|m| m.content.clone())
                        .unwrap_or_default();
                    Ok(format!("{}{}", prefix, last_user))
                }
            }
        }
    }

    fn crew(process: ProcessKind, capabilities: Vec<Capability>, task_count: usize) -> Crew {
        let agent = CrewAgent {
            id: "worker".into(),
            role: "Worker".into(),
            goal: "Do the work".into(),
            backstory: String::new(),
            allow_delegation: false,
            capabilities,
        };
        let tasks = (0..task_count)
            .map(|i| CrewTask {
                id: format!("task-{}", i + 1),
                description: format!("do step {}", i + 1),
                expected_output: String::new(),
                agent: 0,
                human_input: false,
            })
            .collect();
        Crew { name: "test".into(), process, agents: vec![agent], tasks }
    }

    async fn collect(handle: &mut RunHandle) -> Vec<RunEvent> {
        let mut events = Vec::new();
        while let Some(event) = handle.events.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn events_arrive_in_emission_order_with_one_terminal() {
        let runner = ScriptedRunner::new(vec![Step::Say("step1 done"), Step::Say("step2 done")]);
        let broker = Arc::new(InputBroker::new());
        let mut handle = start_run(crew(ProcessKind::Sequential, vec![], 2), runner, broker);

        let events = collect(&mut handle).await;
        assert_eq!(
            events,
            vec![
                RunEvent::Log { message: "step1 done".into() },
                RunEvent::Log { message: "step2 done".into() },
                RunEvent::FinalResult { result: "step2 done".into() },
            ]
        );
        handle.task.await.unwrap();
    }

    #[tokio::test]
    async fn failure_surfaces_as_single_error_event() {
        let runner = ScriptedRunner::new(vec![Step::Say("step1 done"), Step::Fail("boom")]);
        let broker = Arc::new(InputBroker::new());
        let mut handle = start_run(crew(ProcessKind::Sequential, vec![], 2), runner, broker);

        let events = collect(&mut handle).await;
        assert_eq!(events[0], RunEvent::Log { message: "step1 done".into() });
        match events.last() {
            Some(RunEvent::Error { message }) => assert!(message.contains("boom")),
            other => panic!("expected terminal error, got {other:?}"),
        }
        assert_eq!(
            events.iter().filter(|e| matches!(e, RunEvent::Error { .. })).count(),
            1
        );
        handle.task.await.unwrap();
    }

    #[tokio::test]
    async fn multi_line_output_becomes_one_log_per_non_blank_line() {
        let runner = ScriptedRunner::new(vec![Step::Say("first\n\n   \nsecond")]);
        let broker = Arc::new(InputBroker::new());
        let mut handle = start_run(crew(ProcessKind::Sequential, vec![], 1), runner, broker);

        let events = collect(&mut handle).await;
        assert_eq!(events[0], RunEvent::Log { message: "first".into() });
        assert_eq!(events[1], RunEvent::Log { message: "second".into() });
        assert!(matches!(events[2], RunEvent::FinalResult { .. }));
    }

    #[tokio::test]
    async fn human_input_round_trip_unblocks_exactly_once() {
        let runner = ScriptedRunner::new(vec![
            Step::Say("ASK_HUMAN: What is the answer?"),
            Step::Incorporate("final: "),
        ]);
        let broker = Arc::new(InputBroker::new());
        let mut handle = start_run(
            crew(ProcessKind::Sequential, vec![Capability::HumanInput], 1),
            runner,
            broker.clone(),
        );

        let mut token = None;
        let mut final_result = None;
        while let Some(event) = handle.events.recv().await {
            match event {
                RunEvent::InputRequired { id, prompt } => {
                    assert_eq!(prompt, "What is the answer?");
                    broker.deliver(&id, "42".into()).unwrap();
                    token = Some(id);
                }
                RunEvent::FinalResult { result } => final_result = Some(result),
                RunEvent::Log { .. } => {}
                RunEvent::Error { message } => panic!("unexpected error: {message}"),
            }
        }

        let token = token.expect("no input_required event");
        assert!(final_result.expect("no final_result").contains("42"));

        // The token was consumed; a second submission is not-found.
        assert!(matches!(
            broker.deliver(&token, "43".into()),
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_runs_never_cross_deliver() {
        let broker = Arc::new(InputBroker::new());
        let mut handles = Vec::new();
        for _ in 0..2 {
            let runner = ScriptedRunner::new(vec![
                Step::Say("ASK_HUMAN: value?"),
                Step::Incorporate("got: "),
            ]);
            handles.push(start_run(
                crew(ProcessKind::Sequential, vec![Capability::HumanInput], 1),
                runner,
                broker.clone(),
            ));
        }

        let mut tokens = Vec::new();
        for handle in &mut handles {
            loop {
                match handle.events.recv().await {
                    Some(RunEvent::InputRequired { id, .. }) => {
                        tokens.push(id);
                        break;
                    }
                    Some(_) => {}
                    None => panic!("run ended before requesting input"),
                }
            }
        }

        // Deliver in reverse order to make cross-wiring visible.
        broker.deliver(&tokens[1], "for-second".into()).unwrap();
        broker.deliver(&tokens[0], "for-first".into()).unwrap();

        let expected = ["for-first", "for-second"];
        for (handle, want) in handles.iter_mut().zip(expected) {
            loop {
                match handle.events.recv().await {
                    Some(RunEvent::FinalResult { result }) => {
                        assert!(result.contains(want), "{result:?} missing {want}");
                        break;
                    }
                    Some(RunEvent::Error { message }) => panic!("unexpected error: {message}"),
                    Some(_) => {}
                    None => panic!("run ended without final result"),
                }
            }
        }
    }

    #[tokio::test]
    async fn ungranted_directive_is_plain_output() {
        // No HumanInput capability: the directive line is just text.
        let runner = ScriptedRunner::new(vec![Step::Say("ASK_HUMAN: anyone there?")]);
        let broker = Arc::new(InputBroker::new());
        let mut handle = start_run(crew(ProcessKind::Sequential, vec![], 1), runner, broker.clone());

        let events = collect(&mut handle).await;
        assert!(events.iter().all(|e| !matches!(e, RunEvent::InputRequired { .. })));
        assert_eq!(
            events.last(),
            Some(&RunEvent::FinalResult { result: "ASK_HUMAN: anyone there?".into() })
        );
        assert_eq!(broker.pending_count(), 0);
    }

    #[tokio::test]
    async fn panicking_runner_still_yields_terminal_error_event() {
        struct PanickingRunner;

        #[async_trait]
        impl AgentRunner for PanickingRunner {
            async fn complete(
                &self,
                _agent: &CrewAgent,
                _messages: &[AgentMessage],
            ) -> Result<String, CoreError> {
                panic!("runner blew up");
            }
        }

        let broker = Arc::new(InputBroker::new());
        let mut handle = start_run(
            crew(ProcessKind::Sequential, vec![], 1),
            Arc::new(PanickingRunner),
            broker,
        );

        let events = collect(&mut handle).await;
        match events.last() {
            Some(RunEvent::Error { message }) => assert!(message.contains("panicked")),
            other => panic!("expected terminal error, got {other:?}"),
        }
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, RunEvent::Error { .. } | RunEvent::FinalResult { .. }))
                .count(),
            1
        );
        handle.task.await.unwrap();
    }

    #[tokio::test]
    async fn parallel_sibling_failure_cleans_up_pending_input() {
        // Task 1 fails after a short delay; task 2 is blocked in a human
        // input wait by then and gets aborted.
        struct SplitRunner;

        #[async_trait]
        impl AgentRunner for SplitRunner {
            async fn complete(
                &self,
                _agent: &CrewAgent,
                messages: &[AgentMessage],
            ) -> Result<String, CoreError> {
                if messages[0].content.contains("step 1") {
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                    Err(CoreError::Runner("boom".to_string()))
                } else {
                    Ok("ASK_HUMAN: value?".to_string())
                }
            }
        }

        let broker = Arc::new(InputBroker::new());
        let mut handle = start_run(
            crew(ProcessKind::Parallel, vec![Capability::HumanInput], 2),
            Arc::new(SplitRunner),
            broker.clone(),
        );

        let events = collect(&mut handle).await;
        handle.task.await.unwrap();

        let token = events
            .iter()
            .find_map(|e| match e {
                RunEvent::InputRequired { id, .. } => Some(id.clone()),
                _ => None,
            })
            .expect("task 2 requested input before the abort");
        assert!(matches!(events.last(), Some(RunEvent::Error { .. })));

        // The aborted wait unregistered its token on the way out.
        assert_eq!(broker.pending_count(), 0);
        assert!(matches!(
            broker.deliver(&token, "late".into()),
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn parallel_process_joins_all_outputs() {
        let runner = ScriptedRunner::new(vec![Step::Say("alpha"), Step::Say("beta")]);
        let broker = Arc::new(InputBroker::new());
        let mut handle = start_run(crew(ProcessKind::Parallel, vec![], 2), runner, broker);

        let events = collect(&mut handle).await;
        match events.last() {
            Some(RunEvent::FinalResult { result }) => {
                assert!(result.contains("alpha"));
                assert!(result.contains("beta"));
            }
            other => panic!("expected final result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn human_review_task_incorporates_feedback() {
        let runner = ScriptedRunner::new(vec![Step::Say("draft v1"), Step::Incorporate("revised: ")]);
        let broker = Arc::new(InputBroker::new());

        let mut crew = crew(ProcessKind::Sequential, vec![], 1);
        crew.tasks[0].human_input = true;
        let mut handle = start_run(crew, runner, broker.clone());

        let mut final_result = None;
        while let Some(event) = handle.events.recv().await {
            match event {
                RunEvent::InputRequired { id, prompt } => {
                    assert!(prompt.contains("draft v1"));
                    broker.deliver(&id, "make it shorter".into()).unwrap();
                }
                RunEvent::FinalResult { result } => final_result = Some(result),
                RunEvent::Error { message } => panic!("unexpected error: {message}"),
                RunEvent::Log { .. } => {}
            }
        }
        assert!(final_result.expect("no final result").contains("make it shorter"));
    }
}
