//! Report rendering
//!
//! Renders a [`ComparisonReport`] as a fixed multi-section text report or as
//! JSON. Rendering is deterministic for a given report.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::comparison::{ComparisonReport, SourceSummary};

/// Output format for rendered reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    /// Human readable sections
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Render a report in the requested format
pub fn render(report: &ComparisonReport, format: ReportFormat) -> serde_json::Result<String> {
    match format {
        ReportFormat::Text => Ok(render_text(report)),
        ReportFormat::Json => serde_json::to_string_pretty(report),
    }
}

/// Format with at most two decimals and no trailing zeros (`0.1`, `0.64`, `1`)
pub fn format_decimal(value: f32) -> String {
    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

fn format_percent(value: f32) -> String {
    format!("{}%", format_decimal(value * 100.0))
}

/// Render the human readable report
pub fn render_text(report: &ComparisonReport) -> String {
    TextReport(report).to_string()
}

/// Human readable view of a report
struct TextReport<'a>(pub &'a ComparisonReport);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_text(out, self.0)
    }
}

fn write_text(out: &mut fmt::Formatter<'_>, report: &ComparisonReport) -> fmt::Result {
    let sources = &report.sources;
    let categories = &report.categories;

    writeln!(out, "OCR QUALITY ANALYSIS & RANKING")?;
    writeln!(out, "{}", "=".repeat(50))?;
    writeln!(out)?;

    writeln!(out, "OVERALL WINNER FOR OCR: {}", report.winner)?;
    writeln!(out, "Score Difference: {}", format_decimal(report.score_gap))?;
    writeln!(out)?;

    writeln!(out, "DETAILED COMPARISON:")?;
    writeln!(out)?;

    writeln!(out, "Text Detection Results:")?;
    for s in sources {
        writeln!(
            out,
            "- {}: {} text blocks, {} chars",
            s.source, s.text_block_count, s.total_characters
        )?;
    }
    writeln!(out, "Winner: {} (More text detected)", categories.text_detection)?;
    writeln!(out)?;

    writeln!(out, "Confidence Scores:")?;
    write_values(out, sources, "", |s| format_percent(s.text_confidence))?;
    writeln!(out, "Winner: {}", categories.confidence)?;
    writeln!(out)?;

    writeln!(out, "Image Quality Metrics:")?;
    write_values(out, sources, " Sharpness", |s| format_decimal(s.sharpness))?;
    writeln!(out, "Winner: {}", categories.sharpness)?;
    writeln!(out)?;
    write_values(out, sources, " Contrast", |s| format_decimal(s.contrast))?;
    writeln!(out, "Winner: {}", categories.contrast)?;
    writeln!(out)?;

    writeln!(out, "Readability Scores:")?;
    write_values(out, sources, "", |s| format_percent(s.readability_score))?;
    writeln!(out, "Winner: {}", categories.readability)?;
    writeln!(out)?;

    writeln!(out, "FINAL RANKING:")?;
    for (place, s) in ["1st", "2nd"].iter().zip(&report.ranking) {
        writeln!(
            out,
            "{} Place: {} (Score: {})",
            place,
            s.source,
            format_decimal(s.overall_score)
        )?;
    }
    writeln!(out)?;

    writeln!(out, "RECOMMENDATIONS FOR OCR:")?;
    for line in &report.recommendations {
        writeln!(out, "- {}", line)?;
    }

    for sample in &report.samples {
        writeln!(out)?;
        writeln!(out, "Sample Extracted Text ({}):", sample.source)?;
        writeln!(out, "\"{}\"", sample.text)?;
    }

    Ok(())
}

fn write_values(
    out: &mut fmt::Formatter<'_>,
    sources: &[SourceSummary],
    suffix: &str,
    value: impl Fn(&SourceSummary) -> String,
) -> fmt::Result {
    for s in sources {
        writeln!(out, "- {}{}: {}", s.source, suffix, value(s))?;
    }
    Ok(())
}
