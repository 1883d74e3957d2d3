//! LIKE pattern rules

use sqlparser::keywords::Keyword;

use super::{string_literal, Rule};
use crate::error::{Finding, RuleKind};
use crate::lexer::StatementView;

/// Every `LIKE`/`ILIKE` whose right-hand side is a string literal, with that literal
fn like_patterns(view: &StatementView) -> impl Iterator<Item = (usize, &str)> + '_ {
    (0..view.len()).filter_map(move |i| {
        match view.keyword(i) {
            Some(Keyword::LIKE | Keyword::ILIKE) => {}
            _ => return None,
        }
        string_literal(view.token(i + 1)).map(|pattern| (i, pattern))
    })
}

/// `LIKE '%...'`
pub struct LeadingWildcardLike;

impl Rule for LeadingWildcardLike {
    fn kind(&self) -> RuleKind {
        RuleKind::LeadingWildcardLike
    }

    fn evaluate(&self, view: &StatementView) -> Option<Finding> {
        let (like, _) = like_patterns(view).find(|(_, pattern)| pattern.starts_with('%'))?;
        let excerpt = view.excerpt(like, like + 1);
        Some(
            Finding::new(
                self.kind(),
                format!("leading wildcard in LIKE prevents index usage: {}", excerpt),
            )
            .with_excerpt(excerpt)
            .with_help("use a trailing wildcard (text%) or full-text search"),
        )
    }
}

/// `LIKE '...%'`, a prefix match
pub struct TrailingWildcardLike;

impl Rule for TrailingWildcardLike {
    fn kind(&self) -> RuleKind {
        RuleKind::TrailingWildcardLike
    }

    fn evaluate(&self, view: &StatementView) -> Option<Finding> {
        let (like, _) = like_patterns(view)
            .find(|(_, pattern)| pattern.ends_with('%') && !pattern.starts_with('%'))?;
        Some(
            Finding::new(self.kind(), "trailing wildcard may still scan many rows")
                .with_excerpt(view.excerpt(like, like + 1))
                .with_help("use an exact match if possible"),
        )
    }
}
