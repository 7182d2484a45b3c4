//! # Tables
//!
//! Project data tables and the edits the `manageTables` tool can make to them.
//! Edits never touch the input slice; they return the complete new table set.

use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub id: String,
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn to_markdown(&self) -> String {
        let mut out = format!("### {} ({})\n", self.name, self.id);
        if self.columns.is_empty() {
            out.push_str("(no columns)\n");
            return out;
        }
        out.push_str(&format!("| {} |\n", self.columns.join(" | ")));
        out.push_str(&format!(
            "|{}\n",
            self.columns.iter().map(|_| "---|").collect::<String>()
        ));
        for row in &self.rows {
            out.push_str(&format!("| {} |\n", row.join(" | ")));
        }
        out
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
    }

    fn normalize_row(&self, mut row: Vec<String>) -> Vec<String> {
        row.resize(self.columns.len(), String::new());
        row
    }
}

/// One edit to the table set, tagged by `action`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TableAction {
    Create {
        name: String,
        columns: Vec<String>,
        #[serde(default)]
        rows: Vec<Vec<String>>,
    },
    AddRows {
        table: String,
        rows: Vec<Vec<String>>,
    },
    UpdateCell {
        table: String,
        /// 0-based row index.
        row: usize,
        column: String,
        value: String,
    },
    Delete {
        table: String,
    },
}

fn find_table(tables: &[Table], key: &str) -> Result<usize> {
    tables
        .iter()
        .position(|t| t.id == key || t.name.eq_ignore_ascii_case(key))
        .ok_or_else(|| anyhow!("No table named '{key}'."))
}

fn slug(name: &str) -> String {
    let slug: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "table".to_string()
    } else {
        slug
    }
}

fn unique_id(tables: &[Table], name: &str) -> String {
    let base = slug(name);
    let mut candidate = base.clone();
    let mut n = 2;
    while tables.iter().any(|t| t.id == candidate) {
        candidate = format!("{base}-{n}");
        n += 1;
    }
    candidate
}

/// Applies `action` and returns the new table set plus a short summary.
pub fn apply_action(tables: &[Table], action: TableAction) -> Result<(Vec<Table>, String)> {
    let mut tables = tables.to_vec();
    let summary = match action {
        TableAction::Create {
            name,
            columns,
            rows,
        } => {
            if columns.is_empty() {
                bail!("A table needs at least one column.");
            }
            if tables.iter().any(|t| t.name.eq_ignore_ascii_case(&name)) {
                bail!("A table named '{name}' already exists.");
            }
            let mut table = Table {
                id: unique_id(&tables, &name),
                name,
                columns,
                rows: Vec::new(),
            };
            table.rows = rows.into_iter().map(|r| table.normalize_row(r)).collect();
            let summary = format!(
                "Created table '{}' ({}) with {} columns and {} rows.",
                table.name,
                table.id,
                table.columns.len(),
                table.rows.len()
            );
            tables.push(table);
            summary
        }
        TableAction::AddRows { table, rows } => {
            let idx = find_table(&tables, &table)?;
            let target = &mut tables[idx];
            let added = rows.len();
            for row in rows {
                if row.len() > target.columns.len() {
                    bail!(
                        "Row has {} cells but table '{}' only has {} columns.",
                        row.len(),
                        target.name,
                        target.columns.len()
                    );
                }
                let row = target.normalize_row(row);
                target.rows.push(row);
            }
            format!(
                "Added {added} rows to '{}' (now {} rows).",
                target.name,
                target.rows.len()
            )
        }
        TableAction::UpdateCell {
            table,
            row,
            column,
            value,
        } => {
            let idx = find_table(&tables, &table)?;
            let target = &mut tables[idx];
            let col = target
                .column_index(&column)
                .ok_or_else(|| anyhow!("Table '{}' has no column '{column}'.", target.name))?;
            let row_count = target.rows.len();
            let cells = target.rows.get_mut(row).ok_or_else(|| {
                anyhow!("Row {row} is out of range; '{table}' has {row_count} rows.")
            })?;
            if cells.len() <= col {
                cells.resize(col + 1, String::new());
            }
            cells[col] = value;
            format!("Updated '{}' row {row}, column '{column}'.", target.name)
        }
        TableAction::Delete { table } => {
            let idx = find_table(&tables, &table)?;
            let removed = tables.remove(idx);
            format!("Deleted table '{}'.", removed.name)
        }
    };
    Ok((tables, summary))
}
