//! Output formatting

use std::fmt::Write as _;

use miette::{IntoDiagnostic, Result};
use sqlgrade_core::{FileResult, Finding, Report, RuleKind, Severity};

use crate::args::OutputFormat;

/// Output formatter for reports
pub struct OutputFormatter {
    format: OutputFormat,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    /// Print the report in the configured format
    pub fn print_report(&self, report: &Report) -> Result<()> {
        let rendered = self.render(report)?;
        match self.format {
            // Human output goes to stderr so stdout stays machine-readable
            OutputFormat::Human => eprint!("{}", rendered),
            OutputFormat::Json | OutputFormat::Sarif => println!("{}", rendered),
        }
        Ok(())
    }

    pub fn render(&self, report: &Report) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(self.render_human(report)),
            OutputFormat::Json => render_json(report),
            OutputFormat::Sarif => render_sarif(report),
        }
    }

    fn render_human(&self, report: &Report) -> String {
        let mut out = String::new();

        if !self.quiet {
            for file in report.files.iter().filter(|f| !f.findings.is_empty()) {
                render_file(&mut out, file);
            }
        }

        let summary = &report.summary;
        let verdict = report.verdict();
        let status = if verdict.passed {
            "\x1b[32mPASSED\x1b[0m"
        } else {
            "\x1b[31mFAILED\x1b[0m"
        };

        if !self.quiet {
            let _ = writeln!(
                out,
                "Checked {} file(s): {} issue(s), {} critical",
                summary.total_files, summary.total_issues, summary.critical_issues
            );
            for (rule, count) in &summary.findings_by_rule {
                let _ = writeln!(out, "  {:<24} {}", rule.name(), count);
            }
        }
        let _ = writeln!(
            out,
            "Average score {} ({}), minimum {}: {}",
            summary.average_score, summary.grade, summary.minimum_score, status
        );
        out
    }
}

fn render_file(out: &mut String, file: &FileResult) {
    let _ = writeln!(
        out,
        "{}: score {} ({})",
        file.path.display(),
        file.score,
        file.grade
    );

    for finding in &file.findings {
        let _ = writeln!(
            out,
            "{}[{}]: {}",
            severity_label(finding.severity),
            finding.code(),
            finding.message
        );

        if let Some(span) = &finding.span {
            let _ = writeln!(
                out,
                "  --> {}:{}:{}",
                file.path.display(),
                span.line,
                span.column
            );
        }

        if let Some(excerpt) = &finding.excerpt {
            let _ = writeln!(out, "   |");
            let _ = writeln!(out, "   | {}", excerpt);
        }

        if finding.penalty > 0 {
            let _ = writeln!(out, "   = penalty: -{}", finding.penalty);
        }

        if let Some(help) = &finding.help {
            let _ = writeln!(out, "   = help: {}", help);
        }
    }

    let _ = writeln!(out);
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "\x1b[1;31mcritical\x1b[0m",
        Severity::High => "\x1b[31mhigh\x1b[0m",
        Severity::Medium => "\x1b[33mmedium\x1b[0m",
        Severity::Low => "\x1b[36mlow\x1b[0m",
        Severity::Note => "\x1b[34mnote\x1b[0m",
    }
}

pub fn render_json(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).into_diagnostic()
}

fn sarif_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical | Severity::High => "error",
        Severity::Medium | Severity::Low => "warning",
        Severity::Note => "note",
    }
}

fn sarif_result(file: &FileResult, finding: &Finding) -> serde_json::Value {
    let mut location = serde_json::json!({
        "physicalLocation": {
            "artifactLocation": {
                "uri": file.path.display().to_string()
            }
        }
    });
    if let Some(span) = &finding.span {
        location["physicalLocation"]["region"] = serde_json::json!({
            "startLine": span.line,
            "startColumn": span.column,
            "charOffset": span.offset,
            "charLength": span.length
        });
    }

    serde_json::json!({
        "ruleId": finding.code(),
        "level": sarif_level(finding.severity),
        "message": {
            "text": finding.message
        },
        "locations": [location],
        "properties": {
            "penalty": finding.penalty
        }
    })
}

fn render_sarif(report: &Report) -> Result<String> {
    let rules: Vec<serde_json::Value> = RuleKind::ALL
        .iter()
        .map(|kind| {
            serde_json::json!({
                "id": kind.code(),
                "name": kind.name(),
                "shortDescription": { "text": kind.description() },
                "defaultConfiguration": { "level": sarif_level(kind.severity()) },
                "properties": { "penalty": kind.penalty() }
            })
        })
        .collect();

    let results: Vec<serde_json::Value> = report
        .files
        .iter()
        .flat_map(|file| file.findings.iter().map(move |f| sarif_result(file, f)))
        .collect();

    let sarif = serde_json::json!({
        "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json",
        "version": "2.1.0",
        "runs": [{
            "tool": {
                "driver": {
                    "name": "sqlgrade",
                    "version": env!("CARGO_PKG_VERSION"),
                    "rules": rules
                }
            },
            "results": results,
            "properties": {
                "averageScore": report.summary.average_score,
                "minimumScore": report.summary.minimum_score,
                "passed": report.summary.passed
            }
        }]
    });

    serde_json::to_string_pretty(&sarif).into_diagnostic()
}
