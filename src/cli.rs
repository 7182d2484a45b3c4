use crate::backend::Backend;
use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// A research assistant that writes, searches and maps ideas in a project folder
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Model to chat with
    #[arg(long)]
    pub model: Option<String>,

    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// Project directory (created if missing)
    #[arg(long, default_value = ".")]
    pub project: PathBuf,

    /// File to attach to the first prompt; images are sent inline
    #[arg(long = "attach", value_name = "FILE")]
    pub attachments: Vec<PathBuf>,

    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Initial prompt; without one an interactive session starts
    pub prompt: Option<String>,
}

impl Cli {
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(backend) = self.backend {
            // A configured base URL belongs to the configured backend.
            if backend != config.backend {
                config.base_url = None;
            }
            config.backend = backend;
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(max_iterations) = self.max_iterations {
            config.max_iterations = max_iterations;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "platinium",
            "--backend",
            "openrouter",
            "--model",
            "google/gemini-2.5-pro",
            "--attach",
            "a.png",
            "--attach",
            "notes.md",
            "--max-iterations",
            "3",
            "Summarize the draft",
        ]);
        let mut config = Config::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.backend, Backend::Openrouter);
        assert_eq!(config.model, "google/gemini-2.5-pro");
        assert_eq!(config.max_iterations, 3);
        assert_eq!(cli.attachments.len(), 2);
        assert_eq!(cli.prompt.as_deref(), Some("Summarize the draft"));
        assert_eq!(cli.project, PathBuf::from("."));
    }
}
