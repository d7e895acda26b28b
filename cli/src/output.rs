//! Output formatting for validation reports.

use serde::Serialize;

use nxvalidate_core::{Finding, FindingsLedger, PlotResolution, StatusKind, Summary};
use nxvalidate_db::{ReportFormat, ShowPreset};

/// Which report sections to produce.
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    pub show: ShowPreset,
    pub summary: bool,
    pub classpath: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClasspathRow {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classpath: Option<String>,
}

/// Validation outcome of one data file, reduced to what gets printed.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: String,
    pub default_plot: PlotResolution,
    pub show: ShowPreset,
    /// Findings let through by `show`.
    pub findings: Vec<Finding>,
    /// ERROR findings before filtering.
    pub errors: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classpaths: Vec<ClasspathRow>,
}

impl FileReport {
    pub fn new(
        file: impl Into<String>,
        ledger: &FindingsLedger,
        default_plot: PlotResolution,
        options: ReportOptions,
    ) -> Self {
        let classpaths = if options.classpath {
            ledger
                .classpaths()
                .into_iter()
                .map(|(address, classpath)| ClasspathRow {
                    address: address.to_string(),
                    classpath: classpath.map(str::to_string),
                })
                .collect()
        } else {
            Vec::new()
        };
        Self {
            file: file.into(),
            default_plot,
            show: options.show,
            findings: ledger.filtered(options.show.statuses()).cloned().collect(),
            errors: ledger.count(StatusKind::Error),
            summary: options.summary.then(|| ledger.summary()),
            classpaths,
        }
    }
}

/// Formats file reports in the requested output format.
pub fn format_reports(reports: &[FileReport], format: ReportFormat) -> Result<String, String> {
    match format {
        ReportFormat::Json => serde_json::to_string_pretty(reports)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        ReportFormat::Yaml => {
            serde_yaml::to_string(reports).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        ReportFormat::Markdown => Ok(reports
            .iter()
            .map(report_to_markdown)
            .collect::<Vec<_>>()
            .join("\n")),
        ReportFormat::Table => Ok(reports
            .iter()
            .map(report_to_table)
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

fn show_label(show: ShowPreset) -> &'static str {
    match show {
        ShowPreset::All => "all",
        ShowPreset::NotOk => "not-ok",
        ShowPreset::Errors => "errors",
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

fn report_to_markdown(report: &FileReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {}\n\n", report.file));
    out.push_str(&format!("**Default plot:** {}\n\n", report.default_plot));

    out.push_str(&format!("## Findings ({})\n\n", show_label(report.show)));
    if report.findings.is_empty() {
        out.push_str("No findings.\n\n");
    } else {
        out.push_str("| Status | Address | Test | Comment |\n");
        out.push_str("|--------|---------|------|---------|\n");
        for finding in &report.findings {
            out.push_str(&format!(
                "| {} | `{}` | {} | {} |\n",
                finding.status,
                finding.address,
                escape_cell(&finding.test_name),
                escape_cell(&finding.comment)
            ));
        }
        out.push('\n');
    }

    if let Some(ref summary) = report.summary {
        out.push_str("## Summary\n\n");
        out.push_str("| Status | Count | Description |\n");
        out.push_str("|--------|-------|-------------|\n");
        for (status, count) in &summary.counts {
            out.push_str(&format!(
                "| {status} | {count} | {} |\n",
                status.description()
            ));
        }
        out.push_str(&format!("| **total** | {} | |\n\n", summary.total));
    }

    if !report.classpaths.is_empty() {
        out.push_str("## Classpaths\n\n");
        out.push_str("| Address | Classpath |\n");
        out.push_str("|---------|-----------|\n");
        for row in &report.classpaths {
            out.push_str(&format!(
                "| `{}` | {} |\n",
                row.address,
                row.classpath.as_deref().unwrap_or("")
            ));
        }
        out.push('\n');
    }

    out
}

fn report_to_table(report: &FileReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("File: {}\n", report.file));
    out.push_str(&format!("Default plot: {}\n", report.default_plot));

    out.push_str(&format!("\nFindings ({}):\n", show_label(report.show)));
    if report.findings.is_empty() {
        out.push_str("  none\n");
    } else {
        let address_width = column_width(report.findings.iter().map(|f| f.address.len()), 7);
        let test_width = column_width(report.findings.iter().map(|f| f.test_name.len()), 4);
        out.push_str(&format!(
            "  {:<7} {:<address_width$}  {:<test_width$}  comment\n",
            "status", "address", "test"
        ));
        for finding in &report.findings {
            out.push_str(&format!(
                "  {:<7} {:<address_width$}  {:<test_width$}  {}\n",
                finding.status.key(),
                finding.address,
                finding.test_name,
                finding.comment
            ));
        }
    }

    if let Some(ref summary) = report.summary {
        out.push_str("\nSummary:\n");
        for (status, count) in &summary.counts {
            out.push_str(&format!(
                "  {:<7} {:>6}  {}\n",
                status.key(),
                count,
                status.description()
            ));
        }
        out.push_str(&format!("  {:<7} {:>6}\n", "total", summary.total));
    }

    if !report.classpaths.is_empty() {
        out.push_str("\nClasspaths:\n");
        let width = column_width(report.classpaths.iter().map(|r| r.address.len()), 7);
        for row in &report.classpaths {
            out.push_str(&format!(
                "  {:<width$}  {}\n",
                row.address,
                row.classpath.as_deref().unwrap_or("-")
            ));
        }
    }

    out
}

fn column_width(lengths: impl Iterator<Item = usize>, minimum: usize) -> usize {
    lengths.max().unwrap_or(minimum).max(minimum)
}
