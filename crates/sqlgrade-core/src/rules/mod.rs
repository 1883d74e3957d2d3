//! Rule engine
//!
//! Each rule inspects one statement and yields at most one finding. A
//! [`RuleSet`] applies its rules in table order, collecting every finding.

mod filter;
mod pattern;
mod shape;

use sqlparser::tokenizer::Token;

use crate::error::{Finding, RuleKind};
use crate::lexer::StatementView;

pub use filter::{ExcessiveOr, FunctionOnColumn, MissingWhere, NotInSubquery};
pub use pattern::{LeadingWildcardLike, TrailingWildcardLike};
pub use shape::{DistinctStar, ExcessiveJoins, MissingLimit, OrderByNoLimit, SelectStar, UnionNotAll};

/// A single anti-pattern check. Implementations must be total: a statement
/// they cannot make sense of yields `None`.
pub trait Rule: Send + Sync {
    fn kind(&self) -> RuleKind;

    fn evaluate(&self, view: &StatementView) -> Option<Finding>;
}

/// An ordered collection of rules
pub struct RuleSet {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl RuleSet {
    /// All twelve rules, in report order
    pub fn standard() -> Self {
        let rules: Vec<Box<dyn Rule>> = vec![
            Box::new(SelectStar),
            Box::new(MissingWhere),
            Box::new(LeadingWildcardLike),
            Box::new(TrailingWildcardLike),
            Box::new(FunctionOnColumn),
            Box::new(ExcessiveJoins),
            Box::new(NotInSubquery),
            Box::new(MissingLimit),
            Box::new(ExcessiveOr),
            Box::new(DistinctStar),
            Box::new(UnionNotAll),
            Box::new(OrderByNoLimit),
        ];
        Self { rules }
    }

    /// The standard set minus `disabled`
    pub fn without(disabled: &[RuleKind]) -> Self {
        let mut set = Self::standard();
        set.rules.retain(|rule| !disabled.contains(&rule.kind()));
        set
    }

    pub fn kinds(&self) -> impl Iterator<Item = RuleKind> + '_ {
        self.rules.iter().map(|rule| rule.kind())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule against one statement, tagging findings with the
    /// statement's ordinal and location
    pub fn evaluate(&self, view: &StatementView) -> Vec<Finding> {
        self.rules
            .iter()
            .filter_map(|rule| rule.evaluate(view))
            .map(|finding| finding.with_statement(view.ordinal()).with_span(view.span()))
            .collect()
    }
}

/// The text of a string literal token
fn string_literal(token: Option<&Token>) -> Option<&str> {
    match token? {
        Token::SingleQuotedString(s)
        | Token::DoubleQuotedString(s)
        | Token::NationalStringLiteral(s)
        | Token::EscapedStringLiteral(s) => Some(s),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::dialect::SqlDialect;
    use crate::error::{Finding, RuleKind};
    use crate::lexer::StatementView;
    use crate::splitter::split_statements;

    use super::RuleSet;

    /// Findings for the first statement of `sql`
    pub fn findings(sql: &str) -> Vec<Finding> {
        let outcome = split_statements(sql);
        let view = StatementView::new(&outcome.statements[0], SqlDialect::PostgreSQL);
        RuleSet::standard().evaluate(&view)
    }

    pub fn kinds(sql: &str) -> Vec<RuleKind> {
        findings(sql).into_iter().map(|f| f.rule).collect()
    }

    pub fn fires(sql: &str, kind: RuleKind) -> bool {
        kinds(sql).contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_findings_follow_table_order() {
        let sql = "SELECT * FROM orders WHERE id NOT IN (SELECT user_id FROM x)";
        assert_eq!(
            kinds(sql),
            vec![
                RuleKind::SelectStar,
                RuleKind::NotInSubquery,
                RuleKind::MissingLimit
            ]
        );
    }

    #[test]
    fn test_findings_carry_statement_location() {
        let found = findings("SELECT id, name FROM t");
        assert!(found.iter().all(|f| f.statement == Some(1)));
        assert!(found.iter().all(|f| f.span.is_some_and(|s| s.line == 1)));
    }

    #[test]
    fn test_clean_statement() {
        assert!(kinds("SELECT id FROM t WHERE id = 1 LIMIT 10").is_empty());
    }

    #[test]
    fn test_keyword_casing_and_newlines() {
        let sql = "select\n  *\nfrom t\nwhere id = 1\nlimit 10";
        assert_eq!(kinds(sql), vec![RuleKind::SelectStar]);
    }

    #[test]
    fn test_without_removes_rules() {
        let set = RuleSet::without(&[RuleKind::MissingLimit, RuleKind::SelectStar]);
        assert_eq!(set.len(), 10);
        assert!(!set.kinds().any(|k| k == RuleKind::MissingLimit));
        assert_eq!(set.kinds().next(), Some(RuleKind::MissingWhere));
    }

    #[test]
    fn test_standard_matches_rule_table() {
        let kinds: Vec<_> = RuleSet::standard().kinds().collect();
        assert_eq!(kinds, RuleKind::RULES.to_vec());
    }

    #[test]
    fn test_untokenizable_statement_has_no_findings() {
        assert!(kinds("SELECT * FROM t WHERE name = 'open").is_empty());
    }
}
