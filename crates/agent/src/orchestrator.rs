//! Tool orchestration — select, fan out, merge.
//!
//! A run moves through `Idle → Selecting → Executing → Merging → Done`,
//! or ends in `Failed` when no selected tool produced output.
//!
//! Selected tools run concurrently in one `FuturesUnordered`. Each call is
//! bounded by the per-tool timeout, and the whole fan-out by the aggregate
//! deadline. Once one tool has answered, stragglers get only the partial
//! grace window. When either limit hits, unfinished calls are dropped and
//! recorded as timed out. Outputs are merged in ranking order, never in
//! completion order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use parley_config::ToolsConfig;
use parley_core::error::{ChatUiError, ToolError, ToolExecutionError};
use parley_core::tool::{Tool, ToolContext};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::selector::{SelectorWeights, ToolScore, ToolSelector};

/// Lifecycle of one orchestrated run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    #[default]
    Idle,
    Selecting,
    Executing,
    Merging,
    Done,
    Failed,
}

/// A selected tool that produced no output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub tool_name: String,
    pub reason: String,
}

/// Outcome of [`ToolOrchestrator::select_and_run`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolRun {
    /// Tools that contributed output, in ranking order.
    pub tools_used: Vec<String>,

    /// Merged output of the contributing tools.
    pub output: String,

    /// Scores of the selected tools, best first.
    pub scores: Vec<ToolScore>,

    pub failures: Vec<ToolFailure>,
    pub phase: RunPhase,
}

impl ToolRun {
    /// True when no tool contributed.
    pub fn is_empty(&self) -> bool {
        self.tools_used.is_empty()
    }
}

pub struct ToolOrchestrator {
    available_tools: HashMap<String, Arc<dyn Tool>>,
    selector: ToolSelector,
    min_score: f32,
    max_tools: usize,
    tool_timeout: Duration,
    aggregate_deadline: Duration,
    partial_grace: Duration,
}

impl ToolOrchestrator {
    pub fn new(config: &ToolsConfig) -> Self {
        Self {
            available_tools: HashMap::new(),
            selector: ToolSelector::new(SelectorWeights::from(&config.weights)),
            min_score: config.min_score,
            max_tools: config.max_tools.max(1),
            tool_timeout: config.timeout(),
            aggregate_deadline: config.aggregate_deadline(),
            partial_grace: config.partial_grace(),
        }
    }

    /// Register a tool under its name, replacing any tool of the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.selector.register_metadata(name.clone(), tool.metadata());
        if self.available_tools.insert(name.clone(), tool).is_some() {
            warn!(tool = %name, "Replacing previously registered tool");
        }
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn with_tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        for tool in tools {
            self.register(tool);
        }
        self
    }

    /// Registered tool names, sorted.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.available_tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.available_tools.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.available_tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available_tools.is_empty()
    }

    pub fn selector(&self) -> &ToolSelector {
        &self.selector
    }

    /// Pick the tools to run for a query, best first.
    ///
    /// Tools scoring at least `min_score` are kept, up to `max_tools`. When
    /// none qualifies the single top-ranked tool is used.
    pub fn select(&self, query: &str) -> Vec<ToolScore> {
        let ranked = self.selector.rank(query, self.tool_names().as_slice());
        let selected: Vec<ToolScore> = ranked
            .iter()
            .filter(|s| s.final_score >= self.min_score)
            .take(self.max_tools)
            .cloned()
            .collect();
        if selected.is_empty() {
            return ranked.into_iter().take(1).collect();
        }
        selected
    }

    /// Select tools for the query, run them concurrently and merge the output.
    pub async fn select_and_run(
        &self,
        query: &str,
        context: &ToolContext,
    ) -> Result<ToolRun, ChatUiError> {
        let scores = self.select(query);
        self.run(scores, query, context).await
    }

    /// Run an already-made selection, as returned by [`select`](Self::select).
    pub async fn run(
        &self,
        scores: Vec<ToolScore>,
        query: &str,
        context: &ToolContext,
    ) -> Result<ToolRun, ChatUiError> {
        let mut phase = RunPhase::Idle;
        transition(&mut phase, RunPhase::Selecting);

        if scores.is_empty() {
            transition(&mut phase, RunPhase::Done);
            return Ok(ToolRun {
                phase,
                ..ToolRun::default()
            });
        }

        info!(
            tools = ?scores.iter().map(|s| s.tool_name.as_str()).collect::<Vec<_>>(),
            "Tools selected"
        );
        transition(&mut phase, RunPhase::Executing);

        let (outcomes, cutoff) = self.fan_out(&scores, query, context).await;

        transition(&mut phase, RunPhase::Merging);
        let mut successes: Vec<(&str, String)> = Vec::new();
        let mut failures: Vec<ToolFailure> = Vec::new();
        for (score, outcome) in scores.iter().zip(outcomes) {
            match outcome {
                Some(Ok(output)) => successes.push((score.tool_name.as_str(), output)),
                Some(Err(reason)) => {
                    warn!(tool = %score.tool_name, error = %reason, "Tool execution failed");
                    failures.push(ToolFailure {
                        tool_name: score.tool_name.clone(),
                        reason,
                    });
                }
                None => {
                    let reason = match cutoff {
                        Cutoff::Grace => format!(
                            "result deadline exceeded: {}ms grace after the first answer",
                            self.partial_grace.as_millis()
                        ),
                        Cutoff::Aggregate => format!(
                            "aggregate deadline of {}ms exceeded",
                            self.aggregate_deadline.as_millis()
                        ),
                    };
                    warn!(tool = %score.tool_name, error = %reason, "Tool cancelled at deadline");
                    failures.push(ToolFailure {
                        tool_name: score.tool_name.clone(),
                        reason,
                    });
                }
            }
        }

        if successes.is_empty() {
            transition(&mut phase, RunPhase::Failed);
            let last = failures.last().cloned().unwrap_or(ToolFailure {
                tool_name: String::new(),
                reason: "no tool produced output".into(),
            });
            return Err(ToolExecutionError {
                tool_name: last.tool_name,
                reason: last.reason,
            }
            .into());
        }

        let tools_used: Vec<String> = successes.iter().map(|(name, _)| name.to_string()).collect();
        let output = merge_outputs(successes);
        transition(&mut phase, RunPhase::Done);

        Ok(ToolRun {
            tools_used,
            output,
            scores,
            failures,
            phase,
        })
    }

    /// Invoke every scored tool concurrently.
    ///
    /// Returns one slot per score, in score order; `None` marks a call that
    /// was still running when the fan-out was cut off.
    async fn fan_out(
        &self,
        scores: &[ToolScore],
        query: &str,
        context: &ToolContext,
    ) -> (Vec<Option<Result<String, String>>>, Cutoff) {
        let mut deadline = Instant::now() + self.aggregate_deadline;
        let mut cutoff = Cutoff::Aggregate;
        let timeout = self.tool_timeout;
        let mut outcomes: Vec<Option<Result<String, String>>> = vec![None; scores.len()];

        let mut pending = FuturesUnordered::new();
        for (rank, score) in scores.iter().enumerate() {
            let Some(tool) = self.get(&score.tool_name) else {
                outcomes[rank] = Some(Err(ToolError::NotFound(score.tool_name.clone()).to_string()));
                continue;
            };
            pending.push(async move {
                let outcome = match tokio::time::timeout(timeout, tool.invoke(query, context)).await
                {
                    Ok(Ok(output)) => Ok(output),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(_) => Err(ToolError::Timeout {
                        tool_name: tool.name().to_string(),
                        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    }
                    .to_string()),
                };
                (rank, outcome)
            });
        }

        loop {
            let next = tokio::time::timeout_at(deadline, pending.next()).await;
            match next {
                Ok(Some((rank, outcome))) => {
                    debug!(tool = %scores[rank].tool_name, ok = outcome.is_ok(), "Tool finished");
                    if outcome.is_ok() && cutoff == Cutoff::Aggregate {
                        let grace_end = Instant::now() + self.partial_grace;
                        if grace_end < deadline {
                            deadline = grace_end;
                            cutoff = Cutoff::Grace;
                        }
                    }
                    outcomes[rank] = Some(outcome);
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(still_running = pending.len(), ?cutoff, "Tool deadline reached");
                    break;
                }
            }
        }

        (outcomes, cutoff)
    }
}

impl Default for ToolOrchestrator {
    fn default() -> Self {
        Self::new(&ToolsConfig::default())
    }
}

/// Which limit ends a fan-out early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cutoff {
    Aggregate,
    Grace,
}

fn transition(phase: &mut RunPhase, next: RunPhase) {
    debug!(from = ?phase, to = ?next, "Tool run phase");
    *phase = next;
}

/// One output passes through untouched; several become labeled sections.
fn merge_outputs(successes: Vec<(&str, String)>) -> String {
    if successes.len() == 1 {
        return successes.into_iter().map(|(_, out)| out).collect();
    }
    successes
        .into_iter()
        .map(|(name, out)| format!("[{name}]\n{out}"))
        .collect::<Vec<_>>()
        .join("\n\n")
}
