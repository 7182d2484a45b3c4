//! # Canvas
//!
//! The node graph shown on the project canvas. Only the data and the merge
//! rules live here; how it is drawn is up to the front end.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::collections::HashSet;

const GRID_COLUMNS: usize = 4;
const GRID_SPACING_X: f64 = 280.0;
const GRID_SPACING_Y: f64 = 180.0;

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CanvasNode {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CanvasEdge {
    pub source: String,
    pub target: String,
    pub label: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CanvasData {
    #[serde(default)]
    pub nodes: Vec<CanvasNode>,
    #[serde(default)]
    pub edges: Vec<CanvasEdge>,
}

impl CanvasData {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Checks that node ids are unique and every edge connects known nodes.
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for node in &self.nodes {
            if node.id.trim().is_empty() {
                bail!("Canvas node '{}' has an empty id.", node.label);
            }
            if !ids.insert(node.id.as_str()) {
                bail!("Duplicate canvas node id '{}'.", node.id);
            }
        }
        for edge in &self.edges {
            for endpoint in [&edge.source, &edge.target] {
                if !ids.contains(endpoint.as_str()) {
                    bail!(
                        "Edge {} -> {} references unknown node '{}'.",
                        edge.source,
                        edge.target,
                        endpoint
                    );
                }
            }
        }
        Ok(())
    }

    /// Merges `other` into `self`. Nodes with an existing id are updated in
    /// place, keeping their position unless `other` sets one; edges are
    /// appended unless an identical edge already exists.
    pub fn merge(&mut self, other: CanvasData) {
        for node in other.nodes {
            match self.nodes.iter_mut().find(|n| n.id == node.id) {
                Some(existing) => {
                    existing.label = node.label;
                    if node.description.is_some() {
                        existing.description = node.description;
                    }
                    if node.color.is_some() {
                        existing.color = node.color;
                    }
                    if node.x.is_some() && node.y.is_some() {
                        existing.x = node.x;
                        existing.y = node.y;
                    }
                }
                None => self.nodes.push(node),
            }
        }
        for edge in other.edges {
            if !self.edges.contains(&edge) {
                self.edges.push(edge);
            }
        }
    }

    /// Places every node without coordinates on a grid after the last
    /// positioned row.
    pub fn layout_unplaced(&mut self) {
        let max_y = self
            .nodes
            .iter()
            .filter_map(|n| n.y)
            .fold(None, |acc: Option<f64>, y| Some(acc.map_or(y, |a| a.max(y))));
        let origin_y = max_y.map_or(0.0, |y| y + GRID_SPACING_Y);

        let mut slot = 0;
        for node in self.nodes.iter_mut() {
            if node.x.is_some() && node.y.is_some() {
                continue;
            }
            node.x = Some((slot % GRID_COLUMNS) as f64 * GRID_SPACING_X);
            node.y = Some(origin_y + (slot / GRID_COLUMNS) as f64 * GRID_SPACING_Y);
            slot += 1;
        }
    }

    /// A plain-text outline for the model.
    pub fn outline(&self) -> String {
        if self.nodes.is_empty() {
            return "The canvas is empty.".to_string();
        }
        let mut out = format!(
            "Canvas with {} nodes and {} edges.\nNodes:\n",
            self.nodes.len(),
            self.edges.len()
        );
        for node in &self.nodes {
            match &node.description {
                Some(description) => {
                    out.push_str(&format!("- [{}] {}: {}\n", node.id, node.label, description))
                }
                None => out.push_str(&format!("- [{}] {}\n", node.id, node.label)),
            }
        }
        if !self.edges.is_empty() {
            out.push_str("Edges:\n");
            for edge in &self.edges {
                match &edge.label {
                    Some(label) => out.push_str(&format!(
                        "- {} -> {} ({})\n",
                        edge.source, edge.target, label
                    )),
                    None => out.push_str(&format!("- {} -> {}\n", edge.source, edge.target)),
                }
            }
        }
        out
    }
}
