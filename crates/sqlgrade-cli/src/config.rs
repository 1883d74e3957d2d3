//! Configuration file handling

use std::path::{Path, PathBuf};

use miette::{IntoDiagnostic, Result, WrapErr};
use serde::{Deserialize, Serialize};
use sqlgrade_core::{AnalysisConfig, FileScorePolicy, SqlDialect};

use crate::args::{CheckArgs, OutputFormat};

pub const CONFIG_FILE_NAME: &str = "sqlgrade.toml";

/// Configuration for sqlgrade
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// SQL files, directories or glob patterns to check
    #[serde(default)]
    pub files: Vec<String>,

    /// Minimum average score required to pass
    pub minimum_score: Option<i64>,

    /// Penalty at or above which a finding counts as critical
    pub critical_threshold: Option<i64>,

    /// File score policy (worst, mean)
    pub policy: Option<String>,

    /// SQL dialect (postgresql, mysql)
    pub dialect: Option<String>,

    /// Output format (human, json, sarif)
    pub format: Option<String>,

    /// Path the JSON report is written to
    pub report: Option<PathBuf>,

    /// Rules to disable (e.g., ["select-star", "Q008"])
    #[serde(default)]
    pub disable: Vec<String>,

    /// Files larger than this are skipped with a note
    pub max_file_bytes: Option<usize>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .into_diagnostic()
            .wrap_err_with(|| format!("invalid configuration in {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Try to find and load sqlgrade.toml in current directory or parent directories
    pub fn find_and_load() -> Result<Option<Self>> {
        let mut current_dir = std::env::current_dir().into_diagnostic()?;

        loop {
            let config_path = current_dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Ok(Some(Self::from_file(&config_path)?));
            }

            // Try parent directory
            if !current_dir.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Merge CLI arguments into configuration
    /// CLI arguments take precedence over config file values
    pub fn merge_with_args(mut self, args: &CheckArgs) -> Self {
        if !args.files.is_empty() {
            self.files = args.files.clone();
        }

        if args.min_score.is_some() {
            self.minimum_score = args.min_score;
        }

        if args.critical_threshold.is_some() {
            self.critical_threshold = args.critical_threshold;
        }

        if args.policy.is_some() {
            self.policy = args.policy.clone();
        }

        if args.dialect.is_some() {
            self.dialect = args.dialect.clone();
        }

        if let Some(fmt) = args.format {
            self.format = Some(format!("{:?}", fmt).to_lowercase());
        }

        if args.report.is_some() {
            self.report = args.report.clone();
        }

        if !args.disable.is_empty() {
            self.disable = args.disable.clone();
        }

        self
    }

    /// Validate and convert into the analysis configuration
    pub fn to_analysis_config(&self) -> Result<AnalysisConfig> {
        let mut builder = AnalysisConfig::builder();

        if let Some(score) = self.minimum_score {
            builder = builder.minimum_score(score);
        }
        if let Some(threshold) = self.critical_threshold {
            builder = builder.critical_threshold(threshold);
        }
        if let Some(policy) = &self.policy {
            builder = builder.policy(policy.parse::<FileScorePolicy>()?);
        }
        if let Some(dialect) = &self.dialect {
            builder = builder.dialect(dialect.parse::<SqlDialect>()?);
        }
        if let Some(bytes) = self.max_file_bytes {
            builder = builder.max_file_bytes(bytes);
        }
        for rule in &self.disable {
            builder = builder.disable(rule.as_str());
        }

        Ok(builder.build()?)
    }

    /// Resolved output format, human when unset
    pub fn output_format(&self) -> Result<OutputFormat> {
        match &self.format {
            Some(name) => name.parse::<OutputFormat>().map_err(|_| {
                miette::miette!(
                    help = "supported formats: human, json, sarif",
                    "unknown output format '{}'",
                    name
                )
            }),
            None => Ok(OutputFormat::Human),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqlgrade_core::RuleKind;

    fn parse(toml_text: &str) -> Config {
        toml::from_str(toml_text).unwrap()
    }

    #[test]
    fn test_parse_full_file() {
        let config = parse(
            r#"
files = ["queries/**/*.sql"]
minimum_score = 80
critical_threshold = 20
policy = "mean"
dialect = "mysql"
format = "json"
report = "sqlgrade-report.json"
disable = ["select-star", "Q008"]
max_file_bytes = 4096
"#,
        );
        assert_eq!(config.files, vec!["queries/**/*.sql".to_string()]);
        assert_eq!(config.minimum_score, Some(80));
        assert_eq!(config.output_format().unwrap(), OutputFormat::Json);

        let analysis = config.to_analysis_config().unwrap();
        assert_eq!(analysis.minimum_score(), 80);
        assert_eq!(analysis.critical_threshold(), 20);
        assert_eq!(analysis.policy(), FileScorePolicy::Mean);
        assert_eq!(analysis.dialect(), SqlDialect::MySQL);
        assert_eq!(analysis.max_file_bytes(), 4096);
        assert_eq!(
            analysis.disabled(),
            &[RuleKind::SelectStar, RuleKind::MissingLimit]
        );
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let analysis = parse("").to_analysis_config().unwrap();
        assert_eq!(analysis.minimum_score(), 70);
        assert_eq!(analysis.critical_threshold(), 15);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(toml::from_str::<Config>("min_score = 80").is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let config = parse("minimum_score = 80\nfiles = [\"a.sql\"]\ndisable = [\"select-star\"]");
        let args = CheckArgs {
            files: vec!["b.sql".into()],
            min_score: Some(90),
            format: Some(OutputFormat::Sarif),
            ..CheckArgs::default()
        };
        let merged = config.merge_with_args(&args);
        assert_eq!(merged.files, vec!["b.sql".to_string()]);
        assert_eq!(merged.minimum_score, Some(90));
        assert_eq!(merged.disable, vec!["select-star".to_string()]);
        assert_eq!(merged.output_format().unwrap(), OutputFormat::Sarif);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(parse("minimum_score = 101").to_analysis_config().is_err());
        assert!(parse("critical_threshold = 0").to_analysis_config().is_err());
        assert!(parse("policy = \"median\"").to_analysis_config().is_err());
        assert!(parse("dialect = \"oracle\"").to_analysis_config().is_err());
        assert!(parse("disable = [\"no-such-rule\"]").to_analysis_config().is_err());
        assert!(parse("format = \"xml\"").output_format().is_err());
    }
}
