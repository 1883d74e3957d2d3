//! Rules about the shape of a query: projection, joins, set operations, row bounds

use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::Token;

use super::Rule;
use crate::error::{Finding, RuleKind};
use crate::lexer::{StatementKind, StatementView};

const MAX_JOINS: usize = 6;

/// Keywords that end a SELECT column list on its own depth
const PROJECTION_END: &[Keyword] = &[
    Keyword::FROM,
    Keyword::INTO,
    Keyword::WHERE,
    Keyword::UNION,
    Keyword::EXCEPT,
    Keyword::INTERSECT,
];

/// `SELECT *` with an unqualified star item
pub struct SelectStar;

impl SelectStar {
    /// Index of the first unqualified `*` item in the column list opened by `select`
    fn star_item(view: &StatementView, select: usize) -> Option<usize> {
        let depth = view.depth(select);
        let mut item_start = true;
        let mut i = select + 1;

        // `DISTINCT *` belongs to distinct-star
        if view.is_keyword(i, Keyword::DISTINCT) && view.token(i + 1) == Some(&Token::Mul) {
            return None;
        }

        while i < view.len() {
            let d = view.depth(i);
            if d < depth {
                break;
            }
            if d == depth {
                if view
                    .keyword(i)
                    .is_some_and(|kw| PROJECTION_END.contains(&kw))
                {
                    break;
                }
                match view.token(i) {
                    Some(Token::Mul) if item_start => return Some(i),
                    Some(Token::Comma) => item_start = true,
                    Some(_) if item_start && i == select + 1 => {
                        // set quantifiers before the first item
                        item_start = matches!(
                            view.keyword(i),
                            Some(Keyword::DISTINCT | Keyword::ALL)
                        );
                    }
                    _ => item_start = false,
                }
            }
            i += 1;
        }
        None
    }
}

impl Rule for SelectStar {
    fn kind(&self) -> RuleKind {
        RuleKind::SelectStar
    }

    fn evaluate(&self, view: &StatementView) -> Option<Finding> {
        view.positions(Keyword::SELECT).find_map(|select| {
            Self::star_item(view, select).map(|star| {
                Finding::new(
                    self.kind(),
                    "SELECT * returns all columns, including ones nobody reads",
                )
                .with_excerpt(view.excerpt(select, star))
                .with_help("list the columns the query actually needs")
            })
        })
    }
}

/// `DISTINCT *`
pub struct DistinctStar;

impl Rule for DistinctStar {
    fn kind(&self) -> RuleKind {
        RuleKind::DistinctStar
    }

    fn evaluate(&self, view: &StatementView) -> Option<Finding> {
        let distinct = view
            .positions(Keyword::DISTINCT)
            .find(|&i| view.token(i + 1) == Some(&Token::Mul))?;
        Some(
            Finding::new(self.kind(), "DISTINCT * compares every column of every row")
                .with_excerpt(view.excerpt(distinct, distinct + 1))
                .with_help("apply DISTINCT to specific columns, or use GROUP BY"),
        )
    }
}

/// More than six JOINs in one statement
pub struct ExcessiveJoins;

impl Rule for ExcessiveJoins {
    fn kind(&self) -> RuleKind {
        RuleKind::ExcessiveJoins
    }

    fn evaluate(&self, view: &StatementView) -> Option<Finding> {
        let joins = view.count(Keyword::JOIN);
        (joins > MAX_JOINS).then(|| {
            Finding::new(
                self.kind(),
                format!("statement has {} JOINs (recommended: at most {})", joins, MAX_JOINS),
            )
            .with_help("split the query or precompute with a materialized view")
        })
    }
}

/// SELECT without LIMIT, FETCH or TOP
pub struct MissingLimit;

impl Rule for MissingLimit {
    fn kind(&self) -> RuleKind {
        RuleKind::MissingLimit
    }

    fn evaluate(&self, view: &StatementView) -> Option<Finding> {
        if view.kind() != StatementKind::Select || view.has_row_limit() {
            return None;
        }
        Some(
            Finding::new(self.kind(), "query without LIMIT may return excessive rows")
                .with_help("add a LIMIT clause to bound the result set"),
        )
    }
}

/// `UNION` without `ALL`
pub struct UnionNotAll;

impl Rule for UnionNotAll {
    fn kind(&self) -> RuleKind {
        RuleKind::UnionNotAll
    }

    fn evaluate(&self, view: &StatementView) -> Option<Finding> {
        let union = view
            .positions(Keyword::UNION)
            .find(|&i| !view.is_keyword(i + 1, Keyword::ALL))?;
        Some(
            Finding::new(self.kind(), "UNION removes duplicates with an extra sort")
                .with_excerpt(view.excerpt(union, union))
                .with_help("use UNION ALL if duplicates are acceptable"),
        )
    }
}

/// Statement-level `ORDER BY` with no row bound
pub struct OrderByNoLimit;

impl Rule for OrderByNoLimit {
    fn kind(&self) -> RuleKind {
        RuleKind::OrderByNoLimit
    }

    fn evaluate(&self, view: &StatementView) -> Option<Finding> {
        if view.has_row_limit() {
            return None;
        }
        let order = view.positions(Keyword::ORDER).find(|&i| {
            view.depth(i) <= view.level() && view.is_keyword(i + 1, Keyword::BY)
        })?;
        Some(
            Finding::new(self.kind(), "ORDER BY without LIMIT sorts the entire result set")
                .with_excerpt(view.excerpt(order, order + 1))
                .with_help("add a LIMIT clause to allow a top-N sort"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::fires;
    use crate::error::RuleKind;

    #[test]
    fn test_select_star() {
        assert!(fires("SELECT * FROM t", RuleKind::SelectStar));
        assert!(fires("select *, id from t", RuleKind::SelectStar));
        assert!(fires("SELECT id, * FROM t", RuleKind::SelectStar));
        assert!(fires("SELECT ALL * FROM t", RuleKind::SelectStar));
        assert!(fires(
            "SELECT id FROM t WHERE EXISTS (SELECT * FROM u WHERE u.id = t.id)",
            RuleKind::SelectStar
        ));
    }

    #[test]
    fn test_select_star_ignores_qualified_and_arithmetic() {
        assert!(!fires("SELECT t.* FROM t", RuleKind::SelectStar));
        assert!(!fires("SELECT COUNT(*) FROM t", RuleKind::SelectStar));
        assert!(!fires("SELECT price * qty FROM t", RuleKind::SelectStar));
        assert!(!fires("SELECT DISTINCT * FROM t", RuleKind::SelectStar));
    }

    #[test]
    fn test_distinct_star() {
        assert!(fires("SELECT DISTINCT * FROM t", RuleKind::DistinctStar));
        assert!(!fires("SELECT DISTINCT id FROM t", RuleKind::DistinctStar));
    }

    #[test]
    fn test_excessive_joins_threshold() {
        let six = "SELECT a.id FROM a JOIN b ON a.id = b.id JOIN c ON a.id = c.id \
                   JOIN d ON a.id = d.id JOIN e ON a.id = e.id LEFT JOIN f ON a.id = f.id \
                   INNER JOIN g ON a.id = g.id WHERE a.id = 1 LIMIT 1";
        assert!(!fires(six, RuleKind::ExcessiveJoins));

        let seven = six.replace("WHERE", "JOIN h ON a.id = h.id WHERE");
        assert!(fires(&seven, RuleKind::ExcessiveJoins));
    }

    #[test]
    fn test_missing_limit() {
        assert!(fires("SELECT id FROM t WHERE id = 1", RuleKind::MissingLimit));
        assert!(!fires("SELECT id FROM t WHERE id = 1 LIMIT 1", RuleKind::MissingLimit));
        assert!(!fires(
            "SELECT id FROM t WHERE id = 1 FETCH FIRST 10 ROWS ONLY",
            RuleKind::MissingLimit
        ));
        assert!(!fires("UPDATE t SET a = 1 WHERE id = 1", RuleKind::MissingLimit));
        assert!(!fires(
            "INSERT INTO t SELECT id FROM u WHERE id > 3",
            RuleKind::MissingLimit
        ));
    }

    #[test]
    fn test_limit_inside_subquery_does_not_count() {
        assert!(fires(
            "SELECT id FROM (SELECT id FROM t WHERE id > 1 LIMIT 5) s WHERE id < 3",
            RuleKind::MissingLimit
        ));
    }

    #[test]
    fn test_union_not_all() {
        assert!(fires("SELECT a FROM t UNION SELECT a FROM u", RuleKind::UnionNotAll));
        assert!(fires(
            "SELECT a FROM t UNION DISTINCT SELECT a FROM u",
            RuleKind::UnionNotAll
        ));
        assert!(!fires(
            "SELECT a FROM t UNION ALL SELECT a FROM u",
            RuleKind::UnionNotAll
        ));
    }

    #[test]
    fn test_column_named_top_is_not_a_limit() {
        assert!(fires("SELECT top FROM t WHERE id = 1", RuleKind::MissingLimit));
        assert!(fires(
            "SELECT id, top FROM t WHERE id > 1 ORDER BY top",
            RuleKind::OrderByNoLimit
        ));
        assert!(!fires("SELECT TOP 5 id FROM t WHERE id > 1", RuleKind::MissingLimit));
    }

    #[test]
    fn test_order_by_without_limit() {
        assert!(fires("SELECT a FROM t WHERE a > 1 ORDER BY a", RuleKind::OrderByNoLimit));
        assert!(!fires(
            "SELECT a FROM t WHERE a > 1 ORDER BY a LIMIT 3",
            RuleKind::OrderByNoLimit
        ));
    }

    #[test]
    fn test_window_order_by_is_not_statement_level() {
        let sql = "SELECT ROW_NUMBER() OVER (ORDER BY a) FROM t WHERE a > 1";
        assert!(!fires(sql, RuleKind::OrderByNoLimit));
    }
}
