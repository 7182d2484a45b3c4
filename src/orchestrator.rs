//! # Orchestrator
//!
//! Runs one user turn against a chat session: sends the message, executes
//! the function calls the model asks for, feeds the results back and repeats
//! until the model answers in plain text, the iteration budget runs out, or a
//! request fails for good.
//!
//! Within a turn, identical calls run once (see `ToolCallCache`), and a
//! keyword heuristic can keep the model going until it has called the
//! state-changing tools the request implies.

use crate::context::{ExecutionContext, ToolContext};
use crate::model::{ChatModel, ChatSession, FunctionCall, HistoryEntry, InlineData, ModelResponse, Part, SessionSpec};
use crate::observer::{ToolActivity, TurnObserver};
use crate::prompt_builder;
use crate::required_tools::{self, KeywordRule, RequiredToolSet};
use crate::retry::{RetryPolicy, with_backoff};
use crate::services::ResearchServices;
use crate::tool_cache::{CacheKey, ToolCallCache};
use crate::tool_collection::ToolCollection;
use crate::tools::{ToolMeta, ToolName, ToolOutput};
use anyhow::Result;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const FALLBACK_REPLY: &str = "I have completed the requested actions.";
pub const SUPERVISOR_TOOL_NAME: &str = "supervisor";
pub const DEFAULT_MAX_ITERATIONS: usize = 15;
pub const DEFAULT_THINKING_BUDGET: u32 = 24576;

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub max_iterations: usize,
    pub retry: RetryPolicy,
    pub thinking_budget: Option<u32>,
    /// Rules for the required-tool check; `None` disables it.
    pub required_tools: Option<Vec<KeywordRule>>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            retry: RetryPolicy::default(),
            thinking_budget: Some(DEFAULT_THINKING_BUDGET),
            required_tools: Some(required_tools::default_rules()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserMessage {
    pub text: String,
    pub attachments: Vec<InlineData>,
}

impl UserMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachments: Vec::new(),
        }
    }

    fn into_parts(self) -> Vec<Part> {
        let mut parts = Vec::with_capacity(self.attachments.len() + 1);
        parts.push(Part::Text(self.text));
        parts.extend(self.attachments.into_iter().map(Part::InlineData));
        parts
    }
}

fn supervisor_instruction(tool: ToolName) -> String {
    format!(
        "[Supervisor] The user's request requires the `{tool}` tool, but you have not called it in this turn. \
         Call `{tool}` now to carry out that part of the request, then give your final answer."
    )
}

/// How one call of a batch is resolved.
enum Slot {
    /// Run now; index into the batch's fresh calls.
    Fresh(usize),
    /// Served from the turn cache, either from an earlier batch or from an
    /// identical call earlier in this batch.
    Cached,
}

pub struct Orchestrator {
    session: Box<dyn ChatSession>,
    tools: Arc<ToolCollection>,
    services: Arc<dyn ResearchServices>,
    context: ExecutionContext,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    /// Opens a session on `model` for the tools enabled in `context`.
    /// `context` is a snapshot: build a new orchestrator to see later
    /// project changes.
    pub fn new(
        model: &dyn ChatModel,
        tools: Arc<ToolCollection>,
        services: Arc<dyn ResearchServices>,
        context: ExecutionContext,
        history: Vec<HistoryEntry>,
        settings: OrchestratorSettings,
    ) -> Result<Self> {
        let descriptions = tools.descriptions(&context.enabled_tools);
        let spec = SessionSpec {
            system_instruction: prompt_builder::system_prompt(&descriptions, &context),
            functions: tools.declarations(&context.enabled_tools),
            history,
            thinking_budget: settings.thinking_budget,
        };
        debug!(
            tools = spec.functions.len(),
            history = spec.history.len(),
            "starting chat session"
        );
        let session = model.start_session(spec)?;
        Ok(Self {
            session,
            tools,
            services,
            context,
            settings,
        })
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    async fn send(&self, parts: Vec<Part>) -> Result<ModelResponse> {
        with_backoff(&self.settings.retry, || self.session.send(parts.clone())).await
    }

    fn is_available(&self, tool: ToolName) -> bool {
        self.tools.contains(tool) && self.context.is_enabled(tool)
    }

    /// Runs one user turn and returns the model's final answer. Never fails:
    /// tool errors are reported to the model, and a request that fails after
    /// retries ends the turn with whatever text is available.
    pub async fn send_message(&mut self, message: UserMessage, observer: &dyn TurnObserver) -> String {
        let mut required = match &self.settings.required_tools {
            Some(rules) => RequiredToolSet::detect(&message.text, rules),
            None => RequiredToolSet::default(),
        };
        let mut cache = ToolCallCache::new();
        let mut last_text: Option<String> = None;
        let mut interventions = 0usize;

        let mut response = match self.send(message.into_parts()).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "failed to send user message");
                return FALLBACK_REPLY.to_string();
            }
        };

        let mut iterations = 0;
        loop {
            if let Some(text) = response.visible_text() {
                last_text = Some(text.to_string());
            }
            if iterations >= self.settings.max_iterations {
                warn!(
                    max_iterations = self.settings.max_iterations,
                    "iteration limit reached, ending turn"
                );
                break;
            }
            iterations += 1;

            let next_parts = if !response.function_calls.is_empty() {
                self.run_batch(&response.function_calls, &mut cache, &mut required, observer)
                    .await
            } else {
                let missing = required.missing(|tool| self.is_available(tool));
                let Some(tool) = missing.first().copied() else {
                    break;
                };
                interventions += 1;
                let id = format!("{SUPERVISOR_TOOL_NAME}-{interventions}");
                warn!(%tool, "model finished without a required tool, intervening");
                observer.on_tool_start(&id, SUPERVISOR_TOOL_NAME);
                vec![Part::Text(supervisor_instruction(tool))]
            };

            response = match self.send(next_parts).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(error = %e, iteration = iterations, "model request failed, ending turn");
                    break;
                }
            };
        }

        info!(
            iterations,
            cached_results = cache.len(),
            interventions,
            "turn finished"
        );
        last_text.unwrap_or_else(|| FALLBACK_REPLY.to_string())
    }

    /// Resolves every call of one model response and returns the function
    /// responses, in call order, with `meta` stripped.
    async fn run_batch(
        &self,
        calls: &[FunctionCall],
        cache: &mut ToolCallCache,
        required: &mut RequiredToolSet,
        observer: &dyn TurnObserver,
    ) -> Vec<Part> {
        let mut ctx = ToolContext::new(&self.context, self.services.as_ref());
        ctx.session_images = observer.session_images();
        if let Some(url) = observer.current_browser_url() {
            ctx.browser_url = Some(url);
        }

        let keys: Vec<CacheKey> = calls.iter().map(CacheKey::for_call).collect();
        let mut fresh: Vec<(&FunctionCall, &CacheKey)> = Vec::new();
        let mut slots = Vec::with_capacity(calls.len());
        for (call, key) in calls.iter().zip(&keys) {
            if cache.get(key).is_some() || fresh.iter().any(|(_, k)| *k == key) {
                debug!(tool = %call.name, call_id = %call.id, "reusing cached tool result");
                slots.push(Slot::Cached);
            } else {
                observer.on_tool_start(&call.id, &call.name);
                slots.push(Slot::Fresh(fresh.len()));
                fresh.push((call, key));
            }
        }

        let results = join_all(
            fresh
                .iter()
                .map(|(call, _)| self.tools.execute_call(call, &ctx)),
        )
        .await;

        let mut outputs: Vec<ToolOutput> = Vec::with_capacity(results.len());
        for ((_, key), dispatched) in fresh.iter().zip(results) {
            if let Some(tool) = dispatched.executed {
                required.mark_executed(tool);
            }
            match &dispatched.output.meta {
                Some(ToolMeta::Draft { content }) => observer.on_draft_update(content),
                Some(ToolMeta::Canvas { canvas }) => observer.on_canvas_update(canvas),
                Some(ToolMeta::Tables { tables }) => observer.on_tables_update(tables),
                _ => {}
            }
            cache.insert((*key).clone(), dispatched.output.clone());
            outputs.push(dispatched.output);
        }

        let mut parts = Vec::with_capacity(calls.len());
        for ((call, key), slot) in calls.iter().zip(&keys).zip(slots) {
            let output = match slot {
                Slot::Fresh(index) => &outputs[index],
                Slot::Cached => match cache.get(key) {
                    Some(output) => output,
                    None => continue,
                },
            };
            observer.on_tool_result(&ToolActivity {
                call_id: call.id.clone(),
                tool_name: call.name.clone(),
                input: call.args.clone(),
                text: output.display_text(),
                meta: output.meta.clone(),
            });
            parts.push(Part::FunctionResponse {
                id: call.id.clone(),
                name: call.name.clone(),
                response: output.for_model(),
            });
        }
        parts
    }
}
