//! Rules about row filtering

use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::Token;

use super::Rule;
use crate::error::{Finding, RuleKind};
use crate::lexer::{StatementKind, StatementView};

const MAX_OR_CONDITIONS: usize = 3;

/// SELECT over a table, UPDATE or DELETE with no WHERE
pub struct MissingWhere;

impl Rule for MissingWhere {
    fn kind(&self) -> RuleKind {
        RuleKind::MissingWhere
    }

    fn evaluate(&self, view: &StatementView) -> Option<Finding> {
        let lead = view.lead()?;
        let until = match view.kind() {
            StatementKind::Select => view
                .positions(Keyword::FROM)
                .find(|&i| view.depth(i) == view.level())?
                .saturating_add(1),
            StatementKind::Update | StatementKind::Delete => lead + 2,
            _ => return None,
        };
        if view.has_statement_level(Keyword::WHERE) {
            return None;
        }
        Some(
            Finding::new(self.kind(), "query without WHERE clause touches every row")
                .with_excerpt(view.excerpt(lead, until))
                .with_help("add a WHERE clause to filter rows"),
        )
    }
}

/// `NOT IN (SELECT ...)`
pub struct NotInSubquery;

impl Rule for NotInSubquery {
    fn kind(&self) -> RuleKind {
        RuleKind::NotInSubquery
    }

    fn evaluate(&self, view: &StatementView) -> Option<Finding> {
        let not = view.positions(Keyword::NOT).find(|&i| {
            view.is_keyword(i + 1, Keyword::IN)
                && view.token(i + 2) == Some(&Token::LParen)
                && matches!(view.keyword(i + 3), Some(Keyword::SELECT | Keyword::WITH))
        })?;
        Some(
            Finding::new(
                self.kind(),
                "NOT IN with a subquery is slow and returns nothing if the subquery yields NULL",
            )
            .with_excerpt(view.excerpt(not, not + 3))
            .with_help("use NOT EXISTS or a LEFT JOIN with an IS NULL check"),
        )
    }
}

/// Long OR chains on one level of a WHERE clause
pub struct ExcessiveOr;

impl Rule for ExcessiveOr {
    fn kind(&self) -> RuleKind {
        RuleKind::ExcessiveOr
    }

    fn evaluate(&self, view: &StatementView) -> Option<Finding> {
        view.where_clauses().into_iter().find_map(|(w, range)| {
            let depth = view.depth(w);
            let ors = range
                .filter(|&i| view.depth(i) == depth && view.is_keyword(i, Keyword::OR))
                .count();
            (ors > MAX_OR_CONDITIONS).then(|| {
                Finding::new(
                    self.kind(),
                    format!("WHERE clause has {} OR conditions", ors),
                )
                .with_help("rewrite equality chains with IN, or split into UNION ALL branches")
            })
        })
    }
}

/// Names that take a parenthesis without being a scalar function call
const NOT_FUNCTIONS: &[Keyword] = &[
    Keyword::EXISTS,
    Keyword::NOT,
    Keyword::IN,
    Keyword::ANY,
    Keyword::ALL,
    Keyword::SOME,
    Keyword::SELECT,
    Keyword::ROW,
    Keyword::VALUES,
];

/// Words inside call arguments that are not column references
const NOT_COLUMNS: &[Keyword] = &[
    Keyword::NULL,
    Keyword::TRUE,
    Keyword::FALSE,
    Keyword::AS,
    Keyword::FROM,
    Keyword::FOR,
    Keyword::BOTH,
    Keyword::LEADING,
    Keyword::TRAILING,
    Keyword::DISTINCT,
    Keyword::INTERVAL,
    Keyword::CURRENT_DATE,
    Keyword::CURRENT_TIME,
    Keyword::CURRENT_TIMESTAMP,
    Keyword::LOCALTIME,
    Keyword::LOCALTIMESTAMP,
    Keyword::YEAR,
    Keyword::MONTH,
    Keyword::WEEK,
    Keyword::DAY,
    Keyword::HOUR,
    Keyword::MINUTE,
    Keyword::SECOND,
    Keyword::EPOCH,
    Keyword::DATE,
    Keyword::TIME,
    Keyword::TIMESTAMP,
    Keyword::INT,
    Keyword::INTEGER,
    Keyword::TEXT,
    Keyword::VARCHAR,
];

/// A function call on the left-hand side of a WHERE comparison
pub struct FunctionOnColumn;

impl FunctionOnColumn {
    /// `name (` where `name` can be a function
    fn is_call(view: &StatementView, i: usize) -> bool {
        let Some(Token::Word(word)) = view.token(i) else {
            return false;
        };
        if word.quote_style.is_some() || view.token(i + 1) != Some(&Token::LParen) {
            return false;
        }
        !view.keyword(i).is_some_and(|kw| NOT_FUNCTIONS.contains(&kw))
    }

    /// Whether the call at `i` opens a predicate: preceded, past any `(` and
    /// `NOT`, by the WHERE keyword at `clause_start` or by AND/OR
    fn opens_predicate(view: &StatementView, i: usize, clause_start: usize) -> bool {
        let mut j = i;
        while j > clause_start {
            j -= 1;
            if view.token(j) == Some(&Token::LParen) || view.is_keyword(j, Keyword::NOT) {
                continue;
            }
            return j == clause_start
                || view.is_keyword(j, Keyword::AND)
                || view.is_keyword(j, Keyword::OR);
        }
        false
    }

    fn references_column(view: &StatementView, open: usize, close: usize) -> bool {
        let args = open + 1..close;
        if args.clone().any(|i| view.is_keyword(i, Keyword::SELECT)) {
            return false;
        }
        args.into_iter().any(|i| match view.token(i) {
            Some(Token::Word(word)) => {
                view.token(i + 1) != Some(&Token::LParen)
                    && (word.quote_style.is_some()
                        || !view.keyword(i).is_some_and(|kw| NOT_COLUMNS.contains(&kw)))
            }
            _ => false,
        })
    }

    fn is_comparison(view: &StatementView, i: usize) -> bool {
        match view.token(i) {
            Some(
                Token::Eq
                | Token::DoubleEq
                | Token::Neq
                | Token::Lt
                | Token::Gt
                | Token::LtEq
                | Token::GtEq
                | Token::Spaceship,
            ) => true,
            Some(Token::Word(_)) => matches!(
                view.keyword(i),
                Some(
                    Keyword::LIKE
                        | Keyword::ILIKE
                        | Keyword::IN
                        | Keyword::BETWEEN
                        | Keyword::IS
                        | Keyword::NOT
                )
            ),
            _ => false,
        }
    }
}

impl Rule for FunctionOnColumn {
    fn kind(&self) -> RuleKind {
        RuleKind::FunctionOnColumn
    }

    fn evaluate(&self, view: &StatementView) -> Option<Finding> {
        view.where_clauses().into_iter().find_map(|(w, range)| {
            range.clone().find_map(|i| {
                if !Self::is_call(view, i) || !Self::opens_predicate(view, i, w) {
                    return None;
                }
                let close = view.matching_paren(i + 1)?;
                if close >= range.end
                    || !Self::references_column(view, i + 1, close)
                    || !Self::is_comparison(view, close + 1)
                {
                    return None;
                }
                Some(
                    Finding::new(
                        self.kind(),
                        "function on a column in WHERE prevents index usage",
                    )
                    .with_excerpt(view.excerpt(i, close))
                    .with_help(
                        "apply the function to the compared value instead, or index the expression",
                    ),
                )
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{findings, fires};
    use crate::error::RuleKind;

    #[test]
    fn test_missing_where() {
        assert!(fires("SELECT id, name FROM t", RuleKind::MissingWhere));
        assert!(fires("UPDATE t SET a = 1", RuleKind::MissingWhere));
        assert!(fires("DELETE FROM t", RuleKind::MissingWhere));
        assert!(!fires("DELETE FROM t WHERE id = 1", RuleKind::MissingWhere));
        assert!(!fires("SELECT 1", RuleKind::MissingWhere));
        assert!(!fires("INSERT INTO t VALUES (1)", RuleKind::MissingWhere));
    }

    #[test]
    fn test_missing_where_excerpt() {
        let found = findings("UPDATE accounts SET active = false");
        assert_eq!(found[0].rule, RuleKind::MissingWhere);
        assert_eq!(found[0].excerpt.as_deref(), Some("UPDATE accounts SET"));
    }

    #[test]
    fn test_where_only_in_subquery_does_not_count() {
        assert!(fires(
            "SELECT id FROM t JOIN (SELECT id FROM u WHERE u.ok) s ON s.id = t.id",
            RuleKind::MissingWhere
        ));
    }

    #[test]
    fn test_cte_main_query() {
        let sql = "WITH recent AS (SELECT id FROM t WHERE d > 1) SELECT id FROM recent";
        assert!(fires(sql, RuleKind::MissingWhere));
    }

    #[test]
    fn test_not_in_subquery() {
        assert!(fires(
            "SELECT id FROM t WHERE id NOT IN (SELECT user_id FROM x) LIMIT 1",
            RuleKind::NotInSubquery
        ));
        assert!(fires(
            "select id from t where id not in (\n  select user_id from x) limit 1",
            RuleKind::NotInSubquery
        ));
        assert!(!fires(
            "SELECT id FROM t WHERE id NOT IN (1, 2, 3) LIMIT 1",
            RuleKind::NotInSubquery
        ));
        assert!(!fires(
            "SELECT id FROM t WHERE id IN (SELECT user_id FROM x) LIMIT 1",
            RuleKind::NotInSubquery
        ));
    }

    #[test]
    fn test_excessive_or() {
        let four = "SELECT id FROM t WHERE a = 1 OR a = 2 OR a = 3 OR a = 4 OR a = 5 LIMIT 1";
        let found = findings(four);
        let or = found.iter().find(|f| f.rule == RuleKind::ExcessiveOr).unwrap();
        assert_eq!(or.message, "WHERE clause has 4 OR conditions");

        let three = "SELECT id FROM t WHERE a = 1 OR a = 2 OR a = 3 OR a = 4 LIMIT 1";
        assert!(!fires(three, RuleKind::ExcessiveOr));
    }

    #[test]
    fn test_nested_or_is_not_top_level() {
        let sql = "SELECT id FROM t WHERE x = 1 AND (a = 1 OR a = 2 OR a = 3 OR a = 4 OR a = 5) LIMIT 1";
        assert!(!fires(sql, RuleKind::ExcessiveOr));
    }

    #[test]
    fn test_function_on_column() {
        assert!(fires(
            "SELECT id FROM users WHERE UPPER(email) = 'A@B.COM' LIMIT 1",
            RuleKind::FunctionOnColumn
        ));
        assert!(fires(
            "SELECT id FROM orders WHERE status = 1 AND YEAR(order_date) = 2024 LIMIT 1",
            RuleKind::FunctionOnColumn
        ));
        assert!(fires(
            "SELECT id FROM users WHERE (lower(u.name) LIKE 'bob%') LIMIT 1",
            RuleKind::FunctionOnColumn
        ));
        assert!(fires(
            "SELECT id FROM users WHERE DATE(created_at) BETWEEN '2024-01-01' AND '2024-02-01' LIMIT 1",
            RuleKind::FunctionOnColumn
        ));
    }

    #[test]
    fn test_function_on_column_excerpt() {
        let found = findings("SELECT id FROM users WHERE LOWER(u.email) = 'x' LIMIT 1");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].excerpt.as_deref(), Some("LOWER(u.email)"));
    }

    #[test]
    fn test_function_on_value_side_is_fine() {
        assert!(!fires(
            "SELECT id FROM users WHERE email = LOWER('A@B.COM') LIMIT 1",
            RuleKind::FunctionOnColumn
        ));
        assert!(!fires(
            "SELECT id FROM t WHERE created_at > NOW() LIMIT 1",
            RuleKind::FunctionOnColumn
        ));
    }

    #[test]
    fn test_subqueries_and_exists_are_not_functions() {
        assert!(!fires(
            "SELECT id FROM t WHERE EXISTS (SELECT 1 FROM u WHERE u.id = t.id) LIMIT 1",
            RuleKind::FunctionOnColumn
        ));
        assert!(!fires(
            "SELECT id FROM t WHERE COALESCE((SELECT MAX(x) FROM u), 0) > 1 LIMIT 1",
            RuleKind::FunctionOnColumn
        ));
    }

    #[test]
    fn test_function_in_select_list_is_fine() {
        assert!(!fires(
            "SELECT UPPER(name) FROM t WHERE id = 1 LIMIT 1",
            RuleKind::FunctionOnColumn
        ));
    }
}
