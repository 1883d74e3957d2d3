//! Repository-wide aggregation

use indexmap::IndexMap;
use serde::Serialize;

use crate::analyzer::{rounded_mean, FileResult, Grade, PERFECT_SCORE};
use crate::config::AnalysisConfig;
use crate::error::RuleKind;
use crate::gate::Verdict;

/// Totals over every analyzed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_files: usize,
    /// Mean file score rounded half up; 100 when no files were analyzed
    pub average_score: u32,
    /// Every finding, notes included
    pub total_issues: usize,
    /// Findings whose penalty meets the critical threshold
    pub critical_issues: usize,
    pub minimum_score: u32,
    pub passed: bool,
    pub grade: Grade,
    /// Finding counts per kind, in rule-table order, zero counts omitted
    pub findings_by_rule: IndexMap<RuleKind, usize>,
}

impl Summary {
    /// Fold file results into a summary. The result does not depend on the
    /// order of `results`.
    pub fn aggregate(results: &[FileResult], config: &AnalysisConfig) -> Self {
        let scores: Vec<u32> = results.iter().map(|r| r.score).collect();
        let average_score = rounded_mean(&scores).unwrap_or(PERFECT_SCORE);

        let findings = || results.iter().flat_map(|r| r.findings.iter());
        let total_issues = findings().count();
        let critical_issues = findings()
            .filter(|f| f.penalty >= config.critical_threshold())
            .count();

        let findings_by_rule = RuleKind::ALL
            .into_iter()
            .map(|kind| (kind, findings().filter(|f| f.rule == kind).count()))
            .filter(|&(_, count)| count > 0)
            .collect();

        let mut summary = Self {
            total_files: results.len(),
            average_score,
            total_issues,
            critical_issues,
            minimum_score: config.minimum_score(),
            passed: false,
            grade: Grade::from_score(average_score),
            findings_by_rule,
        };
        summary.passed = Verdict::evaluate(&summary, config.minimum_score()).passed;
        summary
    }
}

/// The final report: summary plus per-file results in input order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub summary: Summary,
    pub files: Vec<FileResult>,
}

impl Report {
    pub fn build(files: Vec<FileResult>, config: &AnalysisConfig) -> Self {
        let summary = Summary::aggregate(&files, config);
        Self { summary, files }
    }

    pub fn verdict(&self) -> Verdict {
        Verdict::evaluate(&self.summary, self.summary.minimum_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Finding;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn result(path: &str, score: u32, kinds: &[RuleKind]) -> FileResult {
        FileResult {
            path: PathBuf::from(path),
            score,
            grade: Grade::from_score(score),
            statements: 1,
            findings: kinds.iter().map(|&k| Finding::new(k, "test")).collect(),
        }
    }

    #[test]
    fn test_empty_aggregation() {
        let summary = Summary::aggregate(&[], &AnalysisConfig::default());
        assert_eq!(summary.total_files, 0);
        assert_eq!(summary.average_score, 100);
        assert_eq!(summary.total_issues, 0);
        assert!(summary.passed);
    }

    #[test]
    fn test_counts_and_average() {
        let results = vec![
            result("a.sql", 70, &[RuleKind::MissingWhere, RuleKind::MissingLimit]),
            result("b.sql", 85, &[RuleKind::LeadingWildcardLike]),
            result("c.sql", 100, &[RuleKind::EmptyInput]),
        ];
        let summary = Summary::aggregate(&results, &AnalysisConfig::default());
        assert_eq!(summary.total_files, 3);
        assert_eq!(summary.average_score, 85);
        assert_eq!(summary.total_issues, 4);
        // missing-where (20) and leading-wildcard-like (15) meet the default threshold
        assert_eq!(summary.critical_issues, 2);
        assert_eq!(
            summary.findings_by_rule.keys().copied().collect::<Vec<_>>(),
            vec![
                RuleKind::MissingWhere,
                RuleKind::LeadingWildcardLike,
                RuleKind::MissingLimit,
                RuleKind::EmptyInput
            ]
        );
    }

    #[test]
    fn test_custom_critical_threshold() {
        let config = AnalysisConfig::builder()
            .critical_threshold(10)
            .build()
            .unwrap();
        let results = vec![result(
            "a.sql",
            65,
            &[RuleKind::SelectStar, RuleKind::UnionNotAll, RuleKind::MissingWhere],
        )];
        assert_eq!(Summary::aggregate(&results, &config).critical_issues, 2);
    }

    #[test]
    fn test_below_minimum_fails() {
        let results = vec![result("a.sql", 60, &[]), result("b.sql", 79, &[])];
        let summary = Summary::aggregate(&results, &AnalysisConfig::default());
        assert_eq!(summary.average_score, 70);
        assert!(summary.passed);

        let results = vec![result("a.sql", 60, &[]), result("b.sql", 78, &[])];
        let summary = Summary::aggregate(&results, &AnalysisConfig::default());
        assert_eq!(summary.average_score, 69);
        assert!(!summary.passed);
    }

    #[test]
    fn test_aggregation_is_order_independent() {
        let a = result("a.sql", 40, &[RuleKind::MissingWhere]);
        let b = result("b.sql", 95, &[RuleKind::UnionNotAll]);
        let c = result("c.sql", 71, &[RuleKind::SelectStar, RuleKind::OrderByNoLimit]);
        let config = AnalysisConfig::default();

        let forward = Summary::aggregate(&[a.clone(), b.clone(), c.clone()], &config);
        for permutation in [
            vec![a.clone(), c.clone(), b.clone()],
            vec![b.clone(), a.clone(), c.clone()],
            vec![b.clone(), c.clone(), a.clone()],
            vec![c.clone(), a.clone(), b.clone()],
            vec![c.clone(), b.clone(), a.clone()],
        ] {
            assert_eq!(Summary::aggregate(&permutation, &config), forward);
        }
    }

    #[test]
    fn test_report_keeps_file_order() {
        let files = vec![result("z.sql", 100, &[]), result("a.sql", 100, &[])];
        let report = Report::build(files, &AnalysisConfig::default());
        assert_eq!(report.files[0].path, PathBuf::from("z.sql"));
        assert_eq!(report.verdict().exit_code(), 0);
    }
}
