//! sqlgrade CLI - SQL query-quality gate

mod args;
mod config;
mod output;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use miette::{IntoDiagnostic, Result, WrapErr};
use sqlgrade_core::config::DEFAULT_MAX_FILE_BYTES;
use sqlgrade_core::{split_statements_for, Analyzer, Report, RuleKind, SourceFile, SqlDialect};
use tracing_subscriber::EnvFilter;

use crate::args::{Args, CheckArgs, Command};
use crate::config::Config;
use crate::output::OutputFormatter;

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose, args.quiet);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::from(2)
        }
    }
}

/// `RUST_LOG` wins; otherwise -q/-v pick the level
fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: Args) -> Result<ExitCode> {
    match args.command {
        Command::Check(check) => run_check(check, args.quiet),
        Command::Rules => {
            print_rules();
            Ok(ExitCode::SUCCESS)
        }
        Command::Split { file, dialect } => {
            let dialect: SqlDialect = dialect.parse()?;
            print_split(&file, dialect)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_check(check: CheckArgs, quiet: bool) -> Result<ExitCode> {
    // Load configuration
    let config = if let Some(path) = &check.config {
        Config::from_file(path)?
    } else {
        Config::find_and_load()?.unwrap_or_default()
    };

    // Merge CLI args with config (CLI takes precedence)
    let config = config.merge_with_args(&check);
    let analysis = config.to_analysis_config()?;
    let output_format = config.output_format()?;

    let files = collect_files(&config.files)?;
    if files.is_empty() {
        miette::bail!(
            help = "pass files, directories or globs, or set `files` in sqlgrade.toml",
            "no SQL files to check"
        );
    }
    tracing::info!(
        files = files.len(),
        minimum = analysis.minimum_score(),
        policy = %analysis.policy(),
        dialect = %analysis.dialect(),
        "starting analysis"
    );

    let analyzer = Analyzer::new(&analysis);
    let results = analyzer.analyze_paths(&files);
    let report = Report::build(results, &analysis);

    OutputFormatter::new(output_format, quiet).print_report(&report)?;

    if let Some(path) = &config.report {
        write_report(&report, path)?;
    }

    let verdict = report.verdict();
    tracing::info!(%verdict, "analysis finished");
    Ok(ExitCode::from(verdict.exit_code()))
}

/// Expand the file arguments: directories become `dir/**/*.sql`, patterns are
/// globbed, plain paths are kept as given. Duplicates keep their first position.
fn collect_files(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |path: PathBuf| {
        if seen.insert(path.clone()) {
            files.push(path);
        }
    };

    for pattern in patterns {
        let path = Path::new(pattern);
        let glob_pattern = if path.is_dir() {
            Some(format!("{}/**/*.sql", pattern.trim_end_matches('/')))
        } else if pattern.contains(['*', '?', '[']) {
            Some(pattern.clone())
        } else {
            None
        };

        match glob_pattern {
            Some(glob_pattern) => {
                let entries = glob::glob(&glob_pattern)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("invalid glob pattern '{}'", glob_pattern))?;
                let mut matched = 0;
                for entry in entries.flatten().filter(|p| p.is_file()) {
                    matched += 1;
                    push(entry);
                }
                tracing::debug!(pattern = %glob_pattern, matched, "expanded pattern");
            }
            None => push(path.to_path_buf()),
        }
    }

    Ok(files)
}

fn write_report(report: &Report, path: &Path) -> Result<()> {
    let json = output::render_json(report)?;
    fs::write(path, json)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to write report to {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote report");
    Ok(())
}

fn print_rules() {
    println!("{:<6} {:<24} {:>7}  {:<9} DESCRIPTION", "CODE", "RULE", "PENALTY", "SEVERITY");
    for kind in RuleKind::RULES {
        println!(
            "{:<6} {:<24} {:>7}  {:<9} {}",
            kind.code(),
            kind.name(),
            kind.penalty(),
            kind.severity().as_str(),
            kind.description()
        );
    }
}

fn print_split(file: &Path, dialect: SqlDialect) -> Result<()> {
    let source = SourceFile::read(file, DEFAULT_MAX_FILE_BYTES)?;
    let outcome = split_statements_for(source.text(), dialect);

    for statement in &outcome.statements {
        println!(
            "Statement {} (line {}, column {}):",
            statement.ordinal, statement.span.line, statement.span.column
        );
        println!("{}", statement.text);
        println!();
    }

    if let Some(degradation) = outcome.degradation {
        eprintln!(
            "Warning: unterminated {} at line {}, column {}",
            degradation.construct, degradation.line, degradation.column
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sqlgrade-cli-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("nested")).unwrap();
        dir
    }

    #[test]
    fn test_directory_expands_to_sql_files() {
        let dir = scratch_dir("dir");
        fs::write(dir.join("a.sql"), "SELECT 1").unwrap();
        fs::write(dir.join("nested/b.sql"), "SELECT 1").unwrap();
        fs::write(dir.join("notes.txt"), "not sql").unwrap();

        let files = collect_files(&[dir.display().to_string()]).unwrap();
        assert_eq!(files, vec![dir.join("a.sql"), dir.join("nested/b.sql")]);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_plain_paths_kept_and_deduplicated() {
        let files = collect_files(&[
            "missing.sql".to_string(),
            "other.sql".to_string(),
            "missing.sql".to_string(),
        ])
        .unwrap();
        assert_eq!(
            files,
            vec![PathBuf::from("missing.sql"), PathBuf::from("other.sql")]
        );
    }
}
