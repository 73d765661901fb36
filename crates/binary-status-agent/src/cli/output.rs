//! Report rendering for the deploy hook
//!
//! Human-readable text with state-based coloring, or JSON for tooling.

use binary_status_core::{FunctionCheck, ReconcileState, Result, RunReport};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;

/// Output format options for CLI results
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors
    #[default]
    Text,
    /// JSON for machine processing
    Json,
}

/// Result of the read-only `check` command
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutput {
    pub api_name: String,
    pub passed: bool,
    pub checks: Vec<FunctionCheck>,
}

impl CheckOutput {
    pub fn new(api_name: impl Into<String>, checks: Vec<FunctionCheck>) -> Self {
        let passed = checks.iter().all(FunctionCheck::passed);
        Self {
            api_name: api_name.into(),
            passed,
            checks,
        }
    }
}

fn state_icon(state: ReconcileState) -> colored::ColoredString {
    match state {
        ReconcileState::Succeeded => "+".green(),
        ReconcileState::Reverted => "!".yellow(),
        ReconcileState::Failed => "x".red(),
        _ => "-".white(),
    }
}

fn yes_no(value: bool) -> colored::ColoredString {
    if value {
        "ok".green()
    } else {
        "failed".red()
    }
}

pub fn render_run<W: Write>(out: &mut W, report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(report)?)?;
        }
        OutputFormat::Text => render_run_text(out, report)?,
    }
    out.flush()?;
    Ok(())
}

fn render_run_text<W: Write>(out: &mut W, report: &RunReport) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "{} {} ({})",
        "Binary support on".cyan().bold(),
        report.api_name.bold(),
        report.rest_api_id.as_deref().unwrap_or("not located")
    )?;
    writeln!(out, "{}", "=".repeat(60))?;

    if report.functions.is_empty() {
        writeln!(out, "  No function declares content handling")?;
    }
    for outcome in &report.functions {
        write!(
            out,
            "  {} {} {} after {} round(s)",
            state_icon(outcome.state),
            outcome.function,
            outcome.state.as_str().dimmed(),
            outcome.rounds
        )?;
        match &outcome.error {
            Some(e) => writeln!(out, ": {}", e)?,
            None => writeln!(out)?,
        }
    }

    writeln!(out)?;
    writeln!(
        out,
        "End-to-end probe: before {}, after {}",
        yes_no(report.pre_check),
        yes_no(report.post_check)
    )?;
    writeln!(
        out,
        "Fixture: provisioned {}, torn down {}",
        yes_no(report.fixture_provisioned),
        yes_no(report.fixture_torn_down)
    )?;

    let elapsed = report.finished_at - report.started_at;
    let summary = format!(
        "{} succeeded, {} reverted, {} failed",
        report.count(ReconcileState::Succeeded),
        report.count(ReconcileState::Reverted),
        report.count(ReconcileState::Failed)
    );
    let icon = if report.converged() { "+".green() } else { "x".red() };
    writeln!(
        out,
        "{} {} in {} ms",
        icon,
        summary,
        elapsed.num_milliseconds().to_string().dimmed()
    )?;
    Ok(())
}

pub fn render_check<W: Write>(
    out: &mut W,
    output: &CheckOutput,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(output)?)?;
        }
        OutputFormat::Text => render_check_text(out, output)?,
    }
    out.flush()?;
    Ok(())
}

fn render_check_text<W: Write>(out: &mut W, output: &CheckOutput) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{} {}", "Binary support check on".cyan().bold(), output.api_name.bold())?;
    writeln!(out, "{}", "=".repeat(60))?;

    for check in &output.checks {
        let icon = if check.passed() { "+".green() } else { "x".red() };
        writeln!(out, "  {} {}", icon, check.function)?;
        if let Some(e) = &check.error {
            writeln!(out, "    {} {}", "error:".red(), e)?;
        }
        if let Some(verdict) = &check.verdict {
            writeln!(out, "    binary media type  {}", yes_no(verdict.binary_media_type))?;
            for handling in &verdict.content_handling {
                writeln!(
                    out,
                    "    {} {} {}  {}",
                    handling.method,
                    handling.path,
                    handling.expected.dimmed(),
                    yes_no(handling.matches)
                )?;
            }
            writeln!(out, "    end-to-end         {}", yes_no(verdict.end_to_end))?;
        }
    }
    Ok(())
}
