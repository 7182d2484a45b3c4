//! # Project Store
//!
//! A research project on disk:
//!
//! ```text
//! project.toml   id, title, custom sources, browser URL
//! draft.md
//! canvas.json
//! tables.json
//! history.json   conversation as role + text
//! assets/        generated and imported images
//! ```
//!
//! Every write goes to a temporary file in the project directory first and is
//! then renamed over the target.

use crate::canvas::CanvasData;
use crate::context::{ExecutionContext, ImageGenSettings};
use crate::model::HistoryEntry;
use crate::services::GeneratedImage;
use crate::tables::Table;
use crate::tools::ToolName;
use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

const META_FILE: &str = "project.toml";
const DRAFT_FILE: &str = "draft.md";
const CANVAS_FILE: &str = "canvas.json";
const TABLES_FILE: &str = "tables.json";
const HISTORY_FILE: &str = "history.json";
const ASSETS_DIR: &str = "assets";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct ProjectMeta {
    pub id: String,
    pub title: String,
    pub custom_sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_url: Option<String>,
}

pub struct ProjectStore {
    root: PathBuf,
    meta: ProjectMeta,
}

impl ProjectStore {
    /// Opens the project at `root`, creating the directory layout and a
    /// fresh `project.toml` if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(ASSETS_DIR))
            .with_context(|| format!("Failed to create project at {}", root.display()))?;

        let meta_path = root.join(META_FILE);
        let meta = if meta_path.exists() {
            let text = fs::read_to_string(&meta_path)?;
            toml::from_str(&text)
                .with_context(|| format!("Invalid project file {}", meta_path.display()))?
        } else {
            let title = fs::canonicalize(&root)
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                .unwrap_or_else(|| "Untitled project".to_string());
            let meta = ProjectMeta {
                id: uuid::Uuid::new_v4().to_string(),
                title,
                ..Default::default()
            };
            write_atomic(&meta_path, toml::to_string_pretty(&meta)?.as_bytes())?;
            meta
        };
        Ok(Self { root, meta })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn meta(&self) -> &ProjectMeta {
        &self.meta
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join(ASSETS_DIR)
    }

    pub fn draft(&self) -> Result<String> {
        let path = self.root.join(DRAFT_FILE);
        if !path.exists() {
            return Ok(String::new());
        }
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
    }

    pub fn canvas(&self) -> Result<Option<CanvasData>> {
        self.read_json(CANVAS_FILE)
    }

    pub fn tables(&self) -> Result<Vec<Table>> {
        Ok(self.read_json(TABLES_FILE)?.unwrap_or_default())
    }

    pub fn history(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.read_json(HISTORY_FILE)?.unwrap_or_default())
    }

    fn read_json<T: DeserializeOwned>(&self, file: &str) -> Result<Option<T>> {
        let path = self.root.join(file);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        let value = serde_json::from_str(&text)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?;
        Ok(Some(value))
    }

    fn write_json<T: Serialize>(&self, file: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        write_atomic(&self.root.join(file), json.as_bytes())
    }

    /// Reads the current project state into an orchestrator snapshot.
    pub fn snapshot(
        &self,
        enabled_tools: BTreeSet<ToolName>,
        image_generation: ImageGenSettings,
    ) -> Result<ExecutionContext> {
        Ok(ExecutionContext {
            project_id: self.meta.id.clone(),
            assets_folder: Some(self.assets_dir()),
            draft_content: self.draft()?,
            canvas: self.canvas()?,
            tables: self.tables()?,
            custom_sources: self.meta.custom_sources.clone(),
            enabled_tools,
            current_browser_url: self.meta.browser_url.clone(),
            image_generation,
        })
    }

    pub fn save_draft(&self, content: &str) -> Result<()> {
        debug!(chars = content.len(), "saving draft");
        write_atomic(&self.root.join(DRAFT_FILE), content.as_bytes())
    }

    pub fn save_canvas(&self, canvas: &CanvasData) -> Result<()> {
        self.write_json(CANVAS_FILE, canvas)
    }

    pub fn save_tables(&self, tables: &[Table]) -> Result<()> {
        self.write_json(TABLES_FILE, &tables)
    }

    pub fn append_history(&self, entries: &[HistoryEntry]) -> Result<()> {
        let mut history = self.history()?;
        history.extend_from_slice(entries);
        self.write_json(HISTORY_FILE, &history)
    }

    /// Decodes `image` into the assets folder and returns the file path.
    pub fn save_image(&self, image: &GeneratedImage) -> Result<PathBuf> {
        let bytes = STANDARD
            .decode(image.data.data.as_bytes())
            .with_context(|| format!("Image {} is not valid base64", image.id))?;
        let extension = match image.data.mime_type.as_str() {
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "png",
        };
        let path = self.assets_dir().join(format!("{}.{extension}", image.id));
        write_atomic(&path, &bytes)?;
        Ok(path)
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.persist(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
