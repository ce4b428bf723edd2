//! Structural audit of scraper results.
//!
//! `edimport check` scans every discovered result file for defects in its
//! piece list and rebuilds the tree as an import would, without writing
//! anything. Files that cannot be parsed or rebuilt are reported as errors.

use anyhow::{bail, Context, Result};

use editorial_core::allocator::IdAllocator;
use editorial_core::tree;
use editorial_core::validate::{scan_defects, verify_tree, Defect};

use crate::config::Config;
use crate::connector_fs::{scan_results, ResultFile};
use crate::models::{parse_timestamp, ContentView, ScraperResult};

/// Findings for one result file.
#[derive(Debug)]
pub struct FileReport {
    pub file: ResultFile,
    pub pieces: usize,
    pub defects: Vec<Defect>,
    /// Set when the file could not be read as a scraper result.
    pub error: Option<String>,
}

impl FileReport {
    pub fn is_clean(&self) -> bool {
        self.defects.is_empty() && self.error.is_none()
    }
}

/// Audit one file's contents.
pub fn check_bytes(file: &ResultFile, bytes: &[u8]) -> FileReport {
    let mut report = FileReport {
        file: file.clone(),
        pieces: 0,
        defects: Vec::new(),
        error: None,
    };

    let result = match ScraperResult::from_json(bytes) {
        Ok(result) => result,
        Err(e) => {
            report.error = Some(format!("{:#}", e));
            return report;
        }
    };
    if let Err(e) = result.wikipedia() {
        report.error = Some(e.to_string());
        return report;
    }
    match result.content() {
        Ok(Some(content)) => {
            report.pieces = content.pieces.len();
            report.defects = scan_defects(content.pieces);
            if let Err(e) = rebuild(&content, report.defects.is_empty()) {
                report.error = Some(format!("{:#}", e));
            }
        }
        Ok(None) => {}
        Err(e) => report.error = Some(e.to_string()),
    }
    report
}

/// Run the same reconstruction an import would, keeping nothing.
///
/// The tree is only built when the piece list is free of defects; those
/// are already reported individually.
fn rebuild(content: &ContentView<'_>, build: bool) -> Result<()> {
    if let Some(ts) = content.last_updated_on {
        parse_timestamp(ts)?;
    }
    if build {
        let nodes = tree::build(content.pieces, IdAllocator::new())?;
        verify_tree(&nodes)?;
    }
    Ok(())
}

/// Audit every discovered result file, in discovery order.
pub async fn check_all(config: &Config) -> Result<Vec<FileReport>> {
    let files = scan_results(config)?;
    let mut reports = Vec::with_capacity(files.len());
    for file in &files {
        let bytes = tokio::fs::read(&file.path)
            .await
            .with_context(|| format!("Failed to read {}", file.path.display()))?;
        reports.push(check_bytes(file, &bytes));
    }
    Ok(reports)
}

/// CLI entry point. With `strict`, any finding makes the command fail.
pub async fn run_check(config: &Config, strict: bool) -> Result<()> {
    let reports = check_all(config).await?;

    println!("{:<40} {:>7}  STATUS", "FILE", "PIECES");
    let mut flagged = 0;
    for report in &reports {
        let status = if let Some(error) = &report.error {
            format!("ERROR: {}", error)
        } else if report.defects.is_empty() {
            "OK".to_string()
        } else {
            format!("{} defect(s)", report.defects.len())
        };
        println!(
            "{:<40} {:>7}  {}",
            report.file.relative, report.pieces, status
        );
        for defect in &report.defects {
            println!("    {}", defect);
        }
        if !report.is_clean() {
            flagged += 1;
        }
    }

    println!();
    println!("{} file(s) checked, {} with findings", reports.len(), flagged);

    if strict && flagged > 0 {
        bail!("{} file(s) failed the structural check", flagged);
    }
    Ok(())
}
