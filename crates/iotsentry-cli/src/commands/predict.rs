//! Predict command - classify a traffic table and save the labelled copy.

use std::path::{Path, PathBuf};

use colored::Colorize;
use iotsentry::output::{DEFAULT_OUTPUT_FILE, write_table_to_path};
use iotsentry::{ExportFormat, LabelDistribution, Notice, RunOutcome, SentryError};

use super::load_sentry;

/// Widest cell printed in a preview before truncation.
const MAX_CELL_WIDTH: usize = 14;

/// Most columns printed in a preview.
const MAX_PREVIEW_COLUMNS: usize = 8;

pub fn run(
    file: PathBuf,
    output: Option<PathBuf>,
    format: ExportFormat,
    preview: usize,
    json: bool,
    model_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Validate input file exists
    if !file.exists() {
        return Err(format!("File not found: {}", file.display()).into());
    }

    let sentry = load_sentry(model_dir)?;
    let (table, source) = sentry.parser().parse_file(&file)?;

    if !json {
        println!(
            "{} {}",
            "Classifying".cyan().bold(),
            file.display().to_string().white()
        );
        println!(
            "  {} rows x {} columns ({})",
            source.row_count, source.column_count, source.format
        );
        println!();
        println!("{}", "Uploaded data:".yellow().bold());
        print_preview(&table.headers, table.head(preview));
    }

    let result = sentry.predict(table).map(|mut report| {
        report.source = Some(source);
        report
    });

    let report = match RunOutcome::from(result) {
        RunOutcome::Delivered { report } => report,
        other => {
            if json {
                println!("{}", serde_json::to_string_pretty(&other)?);
            }
            return Err(failure_message(other).into());
        }
    };

    let output_path = output.unwrap_or_else(|| default_output_path(&file, format));
    write_table_to_path(report.table.table(), format, &output_path)?;

    if json {
        let body = serde_json::json!({
            "status": "delivered",
            "output": output_path,
            "report": report.view(preview),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    if !report.notices.is_empty() {
        println!();
        for notice in &report.notices {
            print_notice(notice);
        }
    }

    println!();
    println!("{}", "Predictions:".yellow().bold());
    let augmented = report.table.table();
    print_preview(&augmented.headers, augmented.head(preview));

    println!();
    println!("{}", "Attack type distribution:".yellow().bold());
    print_distribution(&report.distribution);

    println!();
    println!(
        "{} {}",
        "Saved to".green().bold(),
        output_path.display().to_string().white()
    );

    Ok(())
}

/// `predictions.<ext>` in the input file's directory.
fn default_output_path(input: &Path, format: ExportFormat) -> PathBuf {
    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    dir.join(DEFAULT_OUTPUT_FILE)
        .with_extension(format.extension())
}

fn failure_message(outcome: RunOutcome) -> String {
    match outcome {
        RunOutcome::Rejected { missing } => SentryError::MissingFeatures { missing }.to_string(),
        RunOutcome::Failed { kind, message } if kind == "transform" || kind == "prediction" => {
            format!("Error during prediction: {}", message)
        }
        RunOutcome::Failed { message, .. } => message,
        RunOutcome::Delivered { .. } => String::new(),
    }
}

fn print_notice(notice: &Notice) {
    if notice.is_warning() {
        println!("{} {}", "Warning:".yellow().bold(), notice);
    } else {
        println!("{} {}", "Note:".blue(), notice);
    }
}

fn print_preview(headers: &[String], rows: &[Vec<String>]) {
    let shown = headers.len().min(MAX_PREVIEW_COLUMNS);
    let cell = |s: &str| -> String {
        if s.chars().count() > MAX_CELL_WIDTH {
            let cut: String = s.chars().take(MAX_CELL_WIDTH - 1).collect();
            format!("{}~", cut)
        } else {
            s.to_string()
        }
    };

    let mut header_line: Vec<String> = headers[..shown]
        .iter()
        .map(|h| format!("{:width$}", cell(h), width = MAX_CELL_WIDTH))
        .collect();
    if headers.len() > shown {
        header_line.push(format!("... (+{} columns)", headers.len() - shown));
    }
    println!("  {}", header_line.join(" ").bold());

    for row in rows {
        let line: Vec<String> = row
            .iter()
            .take(shown)
            .map(|v| format!("{:width$}", cell(v), width = MAX_CELL_WIDTH))
            .collect();
        println!("  {}", line.join(" "));
    }
}

fn print_distribution(distribution: &LabelDistribution) {
    let total = distribution.total().max(1);
    let label_width = distribution
        .iter()
        .map(|(label, _)| label.len())
        .max()
        .unwrap_or(0);

    for (label, count) in distribution.by_count() {
        let share = count as f64 / total as f64;
        let bar = "#".repeat((share * 40.0).round() as usize);
        println!(
            "  {:width$} {:>8} {:>6.1}% {}",
            label,
            count,
            share * 100.0,
            bar.red(),
            width = label_width
        );
    }
}
