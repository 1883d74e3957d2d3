//! Token view over a single statement
//!
//! Rules never look at raw text. They see the statement as a flat sequence
//! of significant tokens (whitespace and comments removed), each tagged with
//! its parenthesis depth, produced by the sqlparser tokenizer.

use std::ops::Range;

use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer};

use crate::dialect::SqlDialect;
use crate::error::Span;
use crate::splitter::Statement;

/// A significant token and the number of enclosing parentheses.
/// Parentheses themselves sit at the depth outside them.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub depth: usize,
}

/// What the statement does, judged from its leading keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Other,
}

/// A statement prepared for rule evaluation
#[derive(Debug, Clone)]
pub struct StatementView {
    ordinal: usize,
    span: Span,
    lexemes: Vec<Lexeme>,
    kind: StatementKind,
    lead: Option<usize>,
    level: usize,
    tokenized: bool,
}

impl StatementView {
    /// Tokenize `statement`. A tokenizer error leaves the view empty, so
    /// every rule finds nothing.
    pub fn new(statement: &Statement<'_>, dialect: SqlDialect) -> Self {
        let parser_dialect = dialect.parser_dialect();
        let tokens = match Tokenizer::new(&*parser_dialect, statement.text).tokenize() {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::debug!(
                    statement = statement.ordinal,
                    error = %e,
                    "statement could not be tokenized; rules skipped"
                );
                return Self {
                    ordinal: statement.ordinal,
                    span: statement.span,
                    lexemes: Vec::new(),
                    kind: StatementKind::Other,
                    lead: None,
                    level: 0,
                    tokenized: false,
                };
            }
        };

        let lexemes = with_depths(tokens);
        let lead = leading_keyword(&lexemes);
        let kind = lead
            .and_then(|i| keyword_of(&lexemes[i]))
            .and_then(kind_of)
            .unwrap_or(StatementKind::Other);
        let level = lead.map_or(0, |i| lexemes[i].depth);
        Self {
            ordinal: statement.ordinal,
            span: statement.span,
            lexemes,
            kind,
            lead,
            level,
            tokenized: true,
        }
    }

    /// 1-based position of the statement within its file
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn lexemes(&self) -> &[Lexeme] {
        &self.lexemes
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Index of the keyword that decided the statement kind
    pub fn lead(&self) -> Option<usize> {
        self.lead
    }

    /// Depth of the statement's leading keyword
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn is_tokenized(&self) -> bool {
        self.tokenized
    }

    pub fn len(&self) -> usize {
        self.lexemes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lexemes.is_empty()
    }

    pub fn token(&self, i: usize) -> Option<&Token> {
        self.lexemes.get(i).map(|l| &l.token)
    }

    pub fn depth(&self, i: usize) -> usize {
        self.lexemes.get(i).map_or(0, |l| l.depth)
    }

    /// The unquoted keyword at `i`, if any
    pub fn keyword(&self, i: usize) -> Option<Keyword> {
        match self.token(i)? {
            Token::Word(w) if w.quote_style.is_none() && w.keyword != Keyword::NoKeyword => {
                Some(w.keyword)
            }
            _ => None,
        }
    }

    pub fn is_keyword(&self, i: usize, keyword: Keyword) -> bool {
        self.keyword(i) == Some(keyword)
    }

    /// Indices of every occurrence of `keyword`
    pub fn positions(&self, keyword: Keyword) -> impl Iterator<Item = usize> + '_ {
        (0..self.lexemes.len()).filter(move |&i| self.is_keyword(i, keyword))
    }

    pub fn count(&self, keyword: Keyword) -> usize {
        self.positions(keyword).count()
    }

    /// Whether `keyword` appears no deeper than the leading keyword
    pub fn has_statement_level(&self, keyword: Keyword) -> bool {
        self.positions(keyword).any(|i| self.depth(i) <= self.level)
    }

    /// Whether the statement bounds its row count: `LIMIT`, `FETCH FIRST|NEXT`,
    /// or `TOP n` / `TOP (n)` right after SELECT or DISTINCT
    pub fn has_row_limit(&self) -> bool {
        (0..self.lexemes.len())
            .filter(|&i| self.depth(i) <= self.level)
            .any(|i| match self.keyword(i) {
                Some(Keyword::LIMIT) => true,
                Some(Keyword::FETCH) => {
                    matches!(self.keyword(i + 1), Some(Keyword::FIRST | Keyword::NEXT))
                }
                Some(Keyword::TOP) => {
                    i > 0
                        && matches!(
                            self.keyword(i - 1),
                            Some(Keyword::SELECT | Keyword::DISTINCT | Keyword::ALL)
                        )
                        && matches!(self.token(i + 1), Some(Token::Number(..) | Token::LParen))
                }
                _ => false,
            })
    }

    /// Index of the `)` closing the `(` at `open`
    pub fn matching_paren(&self, open: usize) -> Option<usize> {
        if self.token(open) != Some(&Token::LParen) {
            return None;
        }
        let depth = self.depth(open);
        (open + 1..self.lexemes.len())
            .find(|&i| self.token(i) == Some(&Token::RParen) && self.depth(i) == depth)
    }

    /// Token ranges of every WHERE clause, the WHERE keyword excluded.
    ///
    /// A clause ends at the next clause keyword on its own depth or when its
    /// enclosing parenthesis closes.
    pub fn where_clauses(&self) -> Vec<(usize, Range<usize>)> {
        self.positions(Keyword::WHERE)
            .map(|w| {
                let depth = self.depth(w);
                let end = (w + 1..self.lexemes.len())
                    .find(|&i| {
                        self.depth(i) < depth
                            || (self.depth(i) == depth
                                && self
                                    .keyword(i)
                                    .is_some_and(|kw| CLAUSE_KEYWORDS.contains(&kw)))
                    })
                    .unwrap_or(self.lexemes.len());
                (w, w + 1..end)
            })
            .collect()
    }

    /// Tokens `from..=to` rendered back to SQL
    pub fn excerpt(&self, from: usize, to: usize) -> String {
        let end = to.min(self.lexemes.len().saturating_sub(1));
        let mut out = String::new();
        let mut prev: Option<&Token> = None;
        for lexeme in self.lexemes.get(from..=end).unwrap_or_default() {
            let glued = match (prev, &lexeme.token) {
                (None, _) => true,
                (_, Token::RParen | Token::Comma | Token::Period) => true,
                (Some(Token::LParen | Token::Period), _) => true,
                (Some(Token::Word(w)), Token::LParen) => !SPACED_BEFORE_PAREN.contains(&w.keyword),
                _ => false,
            };
            if !glued {
                out.push(' ');
            }
            out.push_str(&lexeme.token.to_string());
            prev = Some(&lexeme.token);
        }
        out
    }
}

/// Keywords that start a clause following WHERE
const CLAUSE_KEYWORDS: &[Keyword] = &[
    Keyword::GROUP,
    Keyword::HAVING,
    Keyword::ORDER,
    Keyword::LIMIT,
    Keyword::OFFSET,
    Keyword::FETCH,
    Keyword::UNION,
    Keyword::EXCEPT,
    Keyword::INTERSECT,
    Keyword::WINDOW,
    Keyword::RETURNING,
    Keyword::FOR,
];

/// Keywords written with a space before a following `(`
const SPACED_BEFORE_PAREN: &[Keyword] = &[
    Keyword::IN,
    Keyword::EXISTS,
    Keyword::ANY,
    Keyword::ALL,
    Keyword::SOME,
    Keyword::AS,
    Keyword::ON,
    Keyword::USING,
    Keyword::VALUES,
    Keyword::FROM,
    Keyword::JOIN,
    Keyword::WHERE,
    Keyword::AND,
    Keyword::OR,
    Keyword::NOT,
    Keyword::SELECT,
];

fn with_depths(tokens: Vec<Token>) -> Vec<Lexeme> {
    let mut depth = 0usize;
    let mut lexemes = Vec::with_capacity(tokens.len());
    for token in tokens {
        match token {
            Token::Whitespace(_) | Token::EOF => continue,
            Token::LParen => {
                lexemes.push(Lexeme { token, depth });
                depth += 1;
            }
            Token::RParen => {
                depth = depth.saturating_sub(1);
                lexemes.push(Lexeme { token, depth });
            }
            _ => lexemes.push(Lexeme { token, depth }),
        }
    }
    lexemes
}

fn keyword_of(lexeme: &Lexeme) -> Option<Keyword> {
    match &lexeme.token {
        Token::Word(w) if w.quote_style.is_none() => Some(w.keyword),
        _ => None,
    }
}

fn kind_of(keyword: Keyword) -> Option<StatementKind> {
    match keyword {
        Keyword::SELECT => Some(StatementKind::Select),
        Keyword::INSERT | Keyword::REPLACE => Some(StatementKind::Insert),
        Keyword::UPDATE => Some(StatementKind::Update),
        Keyword::DELETE => Some(StatementKind::Delete),
        _ => None,
    }
}

/// Find the keyword that decides the statement kind, skipping opening
/// parentheses and looking through a `WITH` clause
fn leading_keyword(lexemes: &[Lexeme]) -> Option<usize> {
    let first = lexemes.iter().position(|l| l.token != Token::LParen)?;
    let lead = &lexemes[first];

    if keyword_of(lead) == Some(Keyword::WITH) {
        return lexemes
            .iter()
            .enumerate()
            .skip(first + 1)
            .find(|(_, l)| l.depth == lead.depth && keyword_of(l).and_then(kind_of).is_some())
            .map(|(i, _)| i);
    }
    Some(first)
}
