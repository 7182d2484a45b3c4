pub mod backend;
pub mod canvas;
pub mod cli;
pub mod client;
pub mod config;
pub mod context;
pub mod diff;
pub mod draft;
pub mod error;
pub mod gemini;
pub mod model;
pub mod observer;
pub mod openrouter;
pub mod orchestrator;
pub mod project;
pub mod prompt_builder;
pub mod required_tools;
pub mod retry;
pub mod services;
pub mod streaming_executor;
pub mod tables;
pub mod tool_cache;
pub mod tool_collection;
pub mod tools;
pub mod ui;

pub use config::Config;
pub use orchestrator::Orchestrator;
pub use tool_collection::ToolCollection;
