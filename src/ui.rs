use crate::canvas::CanvasData;
use crate::config::Config;
use crate::context::SessionImages;
use crate::diff;
use crate::model::{ChatModel, HistoryEntry};
use crate::observer::{ToolActivity, TurnObserver};
use crate::orchestrator::{Orchestrator, UserMessage};
use crate::project::ProjectStore;
use crate::prompt_builder;
use crate::services::{GeneratedImage, ResearchServices};
use crate::tables::Table;
use crate::tool_collection::ToolCollection;
use crate::tools::ToolMeta;
use anyhow::Result;
use console::style;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

const PREVIEW_LINES: usize = 8;

#[derive(Debug)]
pub enum AppState {
    WaitingForUserInput,
    ProcessingPrompt(String),
    Shutdown,
}

fn preview(text: &str) -> String {
    let mut lines: Vec<&str> = text.lines().take(PREVIEW_LINES + 1).collect();
    if lines.len() > PREVIEW_LINES {
        lines.truncate(PREVIEW_LINES);
        lines.push("...");
    }
    lines.join("\n")
}

/// Prints the tool activity trace and persists tool effects to the project.
pub struct ConsoleObserver {
    store: Arc<ProjectStore>,
    images: Mutex<SessionImages>,
    debug_tool_calls: bool,
}

impl ConsoleObserver {
    pub fn new(store: Arc<ProjectStore>, debug_tool_calls: bool) -> Self {
        Self {
            store,
            images: Mutex::new(SessionImages::new()),
            debug_tool_calls,
        }
    }

    pub fn add_image(&self, id: String, image: crate::model::InlineData) {
        if let Ok(mut images) = self.images.lock() {
            images.insert(id, image);
        }
    }

    /// Saves a generated image unless it is already in the session. Cached
    /// results replay the meta of the call that produced the image.
    fn persist_image(&self, image: &GeneratedImage) -> Result<Option<PathBuf>> {
        let known = self
            .images
            .lock()
            .map(|images| images.contains_key(&image.id))
            .unwrap_or(false);
        if known {
            return Ok(None);
        }
        let path = self.store.save_image(image)?;
        self.add_image(image.id.clone(), image.data.clone());
        Ok(Some(path))
    }

    fn report(&self, what: &str, result: Result<()>) {
        if let Err(e) = result {
            eprintln!("{}", style(format!("Failed to save {what}: {e:#}")).red());
        }
    }
}

impl TurnObserver for ConsoleObserver {
    fn on_tool_start(&self, _call_id: &str, tool_name: &str) {
        println!("[{}]", style(format!("tool: {tool_name}")).magenta());
    }

    fn on_tool_result(&self, activity: &ToolActivity) {
        if self.debug_tool_calls {
            let pretty_args = serde_json::to_string_pretty(&activity.input)
                .unwrap_or_else(|_| activity.input.to_string());
            println!("{}", style(pretty_args).dim());
        }
        println!(
            "{} {}",
            style(format!("{} ->", activity.tool_name)).magenta(),
            style(preview(&activity.text)).dim()
        );

        if let Some(ToolMeta::Image { image }) = &activity.meta {
            match self.persist_image(image) {
                Ok(Some(path)) => {
                    println!("{}", style(format!("Saved {}", path.display())).dim());
                }
                Ok(None) => {}
                Err(e) => eprintln!("{}", style(format!("Failed to save image: {e:#}")).red()),
            }
        }
    }

    fn on_draft_update(&self, content: &str) {
        let old = self.store.draft().unwrap_or_default();
        println!("{}", diff::render_diff(&old, content));
        self.report("draft", self.store.save_draft(content));
    }

    fn on_canvas_update(&self, canvas: &CanvasData) {
        println!(
            "{}",
            style(format!(
                "Canvas: {} nodes, {} edges",
                canvas.nodes.len(),
                canvas.edges.len()
            ))
            .dim()
        );
        self.report("canvas", self.store.save_canvas(canvas));
    }

    fn on_tables_update(&self, tables: &[Table]) {
        println!("{}", style(format!("Tables: {}", tables.len())).dim());
        self.report("tables", self.store.save_tables(tables));
    }

    fn session_images(&self) -> SessionImages {
        self.images
            .lock()
            .map(|images| images.clone())
            .unwrap_or_default()
    }
}

pub struct App {
    pub config: Config,
    pub model: Box<dyn ChatModel>,
    pub tools: Arc<ToolCollection>,
    pub services: Arc<dyn ResearchServices>,
    pub store: Arc<ProjectStore>,
    pub observer: ConsoleObserver,
    pub state: AppState,
    pending_attachments: Vec<PathBuf>,
    uploads: usize,
    stdin_receiver: mpsc::Receiver<Option<String>>,
}

impl App {
    pub fn new(
        config: Config,
        model: Box<dyn ChatModel>,
        tools: Arc<ToolCollection>,
        services: Arc<dyn ResearchServices>,
        store: ProjectStore,
    ) -> Self {
        let store = Arc::new(store);
        Self {
            observer: ConsoleObserver::new(Arc::clone(&store), config.debug_tool_calls),
            config,
            model,
            tools,
            services,
            store,
            state: AppState::WaitingForUserInput,
            pending_attachments: Vec::new(),
            uploads: 0,
            stdin_receiver: spawn_stdin_channel(),
        }
    }

    pub async fn run(&mut self, initial_prompt: &str, attachments: Vec<PathBuf>) -> Result<()> {
        self.pending_attachments = attachments;
        self.state = if initial_prompt.is_empty() {
            AppState::WaitingForUserInput
        } else {
            AppState::ProcessingPrompt(initial_prompt.to_string())
        };

        let mut ctrl_c_pressed = false;

        loop {
            match &self.state {
                AppState::WaitingForUserInput => {
                    print!("\x07{} ", style("user>").cyan().bold());
                    io::stdout().flush()?;

                    tokio::select! {
                        biased;
                        _ = tokio::signal::ctrl_c() => {
                            if ctrl_c_pressed {
                                self.state = AppState::Shutdown;
                            } else {
                                println!("\nPress Ctrl+C again to exit.");
                                ctrl_c_pressed = true;
                            }
                        }
                        line_opt = self.stdin_receiver.recv() => {
                            // recv() returns None if channel is closed.
                            match line_opt.flatten() {
                                Some(input) => {
                                    if input.is_empty() {
                                        continue;
                                    }
                                    self.state = AppState::ProcessingPrompt(input);
                                    ctrl_c_pressed = false;
                                }
                                None => {
                                    // Ctrl+D was pressed
                                    println!();
                                    self.state = AppState::Shutdown;
                                }
                            }
                        }
                    }
                }
                AppState::ProcessingPrompt(prompt) => {
                    let prompt = prompt.clone();
                    self.process_prompt(&prompt).await?;
                    self.state = AppState::WaitingForUserInput;
                }
                AppState::Shutdown => {
                    println!("\nShutting down...");
                    return Ok(());
                }
            }
        }
    }

    /// One user message: a fresh project snapshot, a fresh orchestrator, one
    /// turn, then the exchange is appended to the project history.
    async fn process_prompt(&mut self, prompt: &str) -> Result<()> {
        let attachments = std::mem::take(&mut self.pending_attachments);
        let prepared = prompt_builder::prepare_prompt(prompt, &attachments);
        println!("[{}]", style("user").blue());
        println!("{}", style(prompt).cyan());
        for warning in &prepared.warnings {
            eprintln!("{}", style(warning).yellow());
        }

        let mut text = prepared.text;
        if !prepared.images.is_empty() {
            let mut ids = Vec::new();
            for image in &prepared.images {
                self.uploads += 1;
                let id = format!("upload-{}", self.uploads);
                self.observer.add_image(id.clone(), image.clone());
                ids.push(id);
            }
            println!("{}", style(format!("Attached images: {}", ids.join(", "))).dim());
            text.push_str(&format!("\n\nAttached images (ids): {}", ids.join(", ")));
        }

        let context = self.store.snapshot(
            self.config.enabled_tool_set(),
            self.config.image_generation.clone(),
        )?;
        let history = self.store.history()?;
        let mut orchestrator = Orchestrator::new(
            self.model.as_ref(),
            Arc::clone(&self.tools),
            Arc::clone(&self.services),
            context,
            history,
            self.config.orchestrator_settings(),
        )?;

        let message = UserMessage {
            text,
            attachments: prepared.images,
        };
        let answer = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\n{}", style("Request cancelled.").yellow());
                return Ok(());
            }
            answer = orchestrator.send_message(message, &self.observer) => answer,
        };

        println!("\n[{}]", style("assistant").blue());
        println!("{answer}");
        if let Err(e) = self
            .store
            .append_history(&[HistoryEntry::user(prompt), HistoryEntry::model(&answer)])
        {
            eprintln!("{}", style(format!("Failed to save history: {e:#}")).red());
        }
        Ok(())
    }
}

fn spawn_stdin_channel() -> mpsc::Receiver<Option<String>> {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        loop {
            let result = tokio::task::spawn_blocking(|| {
                let mut buffer = String::new();
                match io::stdin().read_line(&mut buffer) {
                    Ok(0) => Ok(None), // EOF (Ctrl+D)
                    Ok(_) => Ok(Some(buffer.trim().to_string())),
                    Err(e) => Err(e),
                }
            })
            .await;

            match result {
                Ok(Ok(line_opt)) => {
                    if tx.send(line_opt).await.is_err() {
                        // Receiver was dropped, so we can exit.
                        break;
                    }
                }
                _ => {
                    // An error occurred, signal EOF and exit the task.
                    tx.send(None).await.ok();
                    break;
                }
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_long_results() {
        let text = (1..=20).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let shown = preview(&text);
        assert_eq!(shown.lines().count(), PREVIEW_LINES + 1);
        assert!(shown.ends_with("8\n..."));
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn test_replayed_image_is_saved_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ProjectStore::open(dir.path()).unwrap());
        let observer = ConsoleObserver::new(Arc::clone(&store), false);
        let image = GeneratedImage {
            id: "img-1".to_string(),
            data: crate::model::InlineData {
                mime_type: "image/png".to_string(),
                data: "AQID".to_string(),
            },
            prompt: "a cat".to_string(),
        };

        let first = observer.persist_image(&image).unwrap();
        assert_eq!(first, Some(store.assets_dir().join("img-1.png")));
        assert_eq!(observer.persist_image(&image).unwrap(), None);
        assert!(observer.session_images().contains_key("img-1"));
    }
}
