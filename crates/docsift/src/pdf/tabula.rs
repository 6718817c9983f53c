//! Table extraction through the tabula command-line jar.
//!
//! tabula is a Java program; it is run as a subprocess and its JSON output
//! parsed into grids. The call is bounded by the configured subprocess
//! timeout and the child is killed if the wait is abandoned.

use super::page::PageTable;
use crate::types::TableGrid;
use crate::{DocsiftError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{Duration, timeout};

#[derive(Debug, Deserialize)]
struct TabulaTable {
    #[serde(default)]
    page_number: Option<usize>,
    #[serde(default)]
    top: Option<f64>,
    #[serde(default)]
    left: Option<f64>,
    #[serde(default)]
    data: Vec<Vec<TabulaCell>>,
}

#[derive(Debug, Deserialize)]
struct TabulaCell {
    #[serde(default)]
    text: String,
}

/// Tables keyed by 1-based page number.
pub type PageTables = BTreeMap<usize, Vec<PageTable>>;

/// Run tabula over every page of `pdf`.
pub async fn extract_tables(java: &Path, jar: &Path, pdf: &Path, timeout_secs: u64) -> Result<PageTables> {
    let child = Command::new(java)
        .arg("-jar")
        .arg(jar)
        .arg("--pages")
        .arg("all")
        .arg("--format")
        .arg("JSON")
        .arg(pdf)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| DocsiftError::MissingDependency(format!("Failed to run java at '{}': {}", java.display(), e)))?;

    let output = match timeout(Duration::from_secs(timeout_secs), child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(DocsiftError::parsing(format!("Failed to wait for tabula: {}", e))),
        Err(_) => {
            return Err(DocsiftError::Timeout {
                operation: "tabula".to_string(),
                seconds: timeout_secs,
            });
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DocsiftError::parsing(format!(
            "tabula exited with code {}: {}",
            output.status.code().unwrap_or(-1),
            stderr.trim()
        )));
    }

    parse_output(&output.stdout)
}

/// Parse tabula's JSON. Tables without a page number are assigned in order,
/// one per page, starting at page 1.
pub fn parse_output(json: &[u8]) -> Result<PageTables> {
    let tables: Vec<TabulaTable> = serde_json::from_slice(json)?;
    let mut pages = PageTables::new();

    for (idx, table) in tables.into_iter().enumerate() {
        let rows: Vec<Vec<String>> = table
            .data
            .into_iter()
            .map(|row| row.into_iter().map(|cell| cell.text.trim().to_string()).collect())
            .filter(|row: &Vec<String>| row.iter().any(|cell| !cell.is_empty()))
            .collect();
        if rows.is_empty() {
            continue;
        }
        let page = table.page_number.unwrap_or(idx + 1);
        let position = match (table.top, table.left) {
            (Some(top), Some(left)) if top > 0.0 || left > 0.0 => Some((top, left)),
            _ => None,
        };
        pages.entry(page).or_default().push(PageTable {
            grid: TableGrid::new(rows, true),
            position,
        });
    }
    Ok(pages)
}
