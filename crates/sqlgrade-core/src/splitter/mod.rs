//! Statement splitting
//!
//! A byte-level scanner that cuts SQL text on `;` while skipping string
//! literals, quoted identifiers and comments. Every delimiter it looks for is
//! ASCII, so scanning bytes never splits a multi-byte character.

use crate::dialect::SqlDialect;
use crate::error::Span;

/// One statement of a source file, comments included, surrounding whitespace trimmed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statement<'a> {
    /// 1-based position within the file
    pub ordinal: usize,
    pub text: &'a str,
    pub span: Span,
}

impl<'a> Statement<'a> {
    /// The statement cut before the absolute byte `offset`, trailing whitespace
    /// trimmed. Ordinal and span are kept.
    pub fn truncated(&self, offset: usize) -> Statement<'a> {
        let cut = offset.saturating_sub(self.span.offset).min(self.text.len());
        Statement {
            text: self.text[..cut].trim_end(),
            ..*self
        }
    }

    /// Whether the absolute byte `offset` falls inside this statement
    pub fn contains(&self, offset: usize) -> bool {
        (self.span.offset..self.span.offset + self.text.len()).contains(&offset)
    }
}

/// The construct left open at end of input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unterminated {
    BlockComment,
    StringLiteral,
    QuotedIdentifier,
    DollarQuote,
}

impl std::fmt::Display for Unterminated {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unterminated::BlockComment => write!(f, "block comment"),
            Unterminated::StringLiteral => write!(f, "string literal"),
            Unterminated::QuotedIdentifier => write!(f, "quoted identifier"),
            Unterminated::DollarQuote => write!(f, "dollar-quoted string"),
        }
    }
}

/// Where best-effort splitting kicked in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Degradation {
    pub construct: Unterminated,
    /// Byte offset where the unterminated construct opens
    pub offset: usize,
    /// Line (1-indexed) where the unterminated construct opens
    pub line: usize,
    pub column: usize,
}

/// Result of splitting one file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SplitOutcome<'a> {
    pub statements: Vec<Statement<'a>>,
    pub degradation: Option<Degradation>,
}

/// Split with PostgreSQL quoting rules
pub fn split_statements(text: &str) -> SplitOutcome<'_> {
    split_statements_for(text, SqlDialect::PostgreSQL)
}

/// Split with the quoting and comment rules of `dialect`
pub fn split_statements_for(text: &str, dialect: SqlDialect) -> SplitOutcome<'_> {
    let mut scanner = Scanner::new(text, dialect);
    scanner.run();
    scanner.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State<'a> {
    Normal,
    SingleQuote,
    /// PostgreSQL `E'...'`, where a backslash escapes the next byte
    EscapeString,
    DoubleQuote,
    Backtick,
    DollarQuote(&'a str),
    LineComment,
    BlockComment,
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    offset: usize,
    line: usize,
    column: usize,
}

struct Scanner<'a> {
    text: &'a str,
    dialect: SqlDialect,
    pos: usize,
    line: usize,
    column: usize,
    state: State<'a>,
    /// Where the current quote or comment opened
    opened: Anchor,
    /// First non-whitespace byte of the current statement
    anchor: Option<Anchor>,
    has_code: bool,
    statements: Vec<Statement<'a>>,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str, dialect: SqlDialect) -> Self {
        let start = Anchor {
            offset: 0,
            line: 1,
            column: 1,
        };
        Self {
            text,
            dialect,
            pos: 0,
            line: 1,
            column: 1,
            state: State::Normal,
            opened: start,
            anchor: None,
            has_code: false,
            statements: Vec::new(),
        }
    }

    fn here(&self) -> Anchor {
        Anchor {
            offset: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    /// Move past `n` bytes, tracking line and (character) column
    fn consume(&mut self, n: usize) {
        let text = self.text;
        let bytes = text.as_bytes();
        let end = (self.pos + n).min(bytes.len());
        for &b in &bytes[self.pos..end] {
            if b == b'\n' {
                self.line += 1;
                self.column = 1;
            } else if b & 0xC0 != 0x80 {
                self.column += 1;
            }
        }
        self.pos = end;
    }

    fn open(&mut self, state: State<'a>, width: usize, is_code: bool) {
        if self.anchor.is_none() {
            self.anchor = Some(self.here());
        }
        self.has_code |= is_code;
        self.opened = self.here();
        self.state = state;
        self.consume(width);
    }

    fn run(&mut self) {
        let text = self.text;
        let bytes = text.as_bytes();
        while self.pos < bytes.len() {
            let b = bytes[self.pos];
            let next = bytes.get(self.pos + 1).copied();
            let state = self.state;
            match state {
                State::Normal => match b {
                    b';' => {
                        self.close(self.pos);
                        self.consume(1);
                    }
                    b'\'' if self.dialect == SqlDialect::PostgreSQL
                        && escape_prefix(&bytes[..self.pos]) =>
                    {
                        self.open(State::EscapeString, 1, true)
                    }
                    b'\'' => self.open(State::SingleQuote, 1, true),
                    b'"' => self.open(State::DoubleQuote, 1, true),
                    b'`' if self.dialect == SqlDialect::MySQL => {
                        self.open(State::Backtick, 1, true)
                    }
                    b'-' if next == Some(b'-') => self.open(State::LineComment, 2, false),
                    b'#' if self.dialect == SqlDialect::MySQL => {
                        self.open(State::LineComment, 1, false)
                    }
                    b'/' if next == Some(b'*') => self.open(State::BlockComment, 2, false),
                    b'$' if self.dialect == SqlDialect::PostgreSQL => {
                        match dollar_tag(&text[self.pos..]) {
                            Some(tag) => self.open(State::DollarQuote(tag), tag.len(), true),
                            None => self.mark_code(),
                        }
                    }
                    _ if b.is_ascii_whitespace() => self.consume(1),
                    _ => self.mark_code(),
                },
                State::SingleQuote | State::EscapeString | State::DoubleQuote | State::Backtick => {
                    let quote = match state {
                        State::SingleQuote | State::EscapeString => b'\'',
                        State::DoubleQuote => b'"',
                        _ => b'`',
                    };
                    let backslash_escapes = state == State::EscapeString
                        || (self.dialect == SqlDialect::MySQL && quote != b'`');
                    if (b == b'\\' && backslash_escapes) || (b == quote && next == Some(quote)) {
                        self.consume(2);
                    } else {
                        if b == quote {
                            self.state = State::Normal;
                        }
                        self.consume(1);
                    }
                }
                State::DollarQuote(tag) => {
                    if text[self.pos..].starts_with(tag) {
                        self.state = State::Normal;
                        self.consume(tag.len());
                    } else {
                        self.consume(1);
                    }
                }
                State::LineComment => {
                    if b == b'\n' {
                        self.state = State::Normal;
                    }
                    self.consume(1);
                }
                State::BlockComment => {
                    if b == b'*' && next == Some(b'/') {
                        self.state = State::Normal;
                        self.consume(2);
                    } else {
                        self.consume(1);
                    }
                }
            }
        }
    }

    fn mark_code(&mut self) {
        if self.anchor.is_none() {
            self.anchor = Some(self.here());
        }
        self.has_code = true;
        self.consume(1);
    }

    /// End the current statement at byte `end` (exclusive)
    fn close(&mut self, end: usize) {
        if let (Some(anchor), true) = (self.anchor, self.has_code) {
            let source: &'a str = self.text;
            let text = source[anchor.offset..end].trim_end();
            self.statements.push(Statement {
                ordinal: self.statements.len() + 1,
                text,
                span: Span::new(anchor.offset, text.len(), anchor.line, anchor.column),
            });
        }
        self.anchor = None;
        self.has_code = false;
    }

    fn finish(mut self) -> SplitOutcome<'a> {
        let construct = match self.state {
            State::Normal | State::LineComment => None,
            State::SingleQuote | State::EscapeString => Some(Unterminated::StringLiteral),
            State::DoubleQuote | State::Backtick => Some(Unterminated::QuotedIdentifier),
            State::DollarQuote(_) => Some(Unterminated::DollarQuote),
            State::BlockComment => Some(Unterminated::BlockComment),
        };
        let degradation = construct.map(|construct| Degradation {
            construct,
            offset: self.opened.offset,
            line: self.opened.line,
            column: self.opened.column,
        });

        self.close(self.text.len());
        SplitOutcome {
            statements: self.statements,
            degradation,
        }
    }
}

/// Whether `before` ends in a standalone `E`/`e`, making the quote that
/// follows an escape string
fn escape_prefix(before: &[u8]) -> bool {
    match before {
        [b'E' | b'e'] => true,
        [.., prev, b'E' | b'e'] => !(prev.is_ascii_alphanumeric() || matches!(prev, b'_' | b'$')),
        _ => false,
    }
}

/// Match a PostgreSQL dollar-quote tag (`$$` or `$name$`) at the start of `rest`
fn dollar_tag(rest: &str) -> Option<&str> {
    let bytes = rest.as_bytes();
    let mut end = 1;
    while end < bytes.len() {
        let b = bytes[end];
        if b == b'$' {
            return Some(&rest[..=end]);
        }
        let valid = b == b'_' || b.is_ascii_alphabetic() || (end > 1 && b.is_ascii_digit());
        if !valid {
            return None;
        }
        end += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(outcome: &SplitOutcome<'_>) -> Vec<String> {
        outcome.statements.iter().map(|s| s.text.to_string()).collect()
    }

    #[test]
    fn test_splits_on_semicolons() {
        let outcome = split_statements("SELECT 1; SELECT 2;\nSELECT 3");
        assert_eq!(texts(&outcome), vec!["SELECT 1", "SELECT 2", "SELECT 3"]);
        assert!(outcome.degradation.is_none());
    }

    #[test]
    fn test_semicolon_inside_string_literal() {
        let outcome = split_statements("SELECT 'a;b' FROM t; SELECT 2");
        assert_eq!(texts(&outcome), vec!["SELECT 'a;b' FROM t", "SELECT 2"]);
    }

    #[test]
    fn test_doubled_quote_escape() {
        let outcome = split_statements("SELECT 'it''s; fine'; SELECT 2");
        assert_eq!(texts(&outcome), vec!["SELECT 'it''s; fine'", "SELECT 2"]);
    }

    #[test]
    fn test_semicolon_inside_comments() {
        let sql = "-- first; not a split\nSELECT 1 /* still; one */ FROM t;\nSELECT 2;";
        let outcome = split_statements(sql);
        assert_eq!(
            texts(&outcome),
            vec![
                "-- first; not a split\nSELECT 1 /* still; one */ FROM t",
                "SELECT 2"
            ]
        );
    }

    #[test]
    fn test_comment_only_segments_dropped() {
        let outcome = split_statements(";;  -- nothing here\n; /* nor here */ ;\n");
        assert!(outcome.statements.is_empty());
        assert!(outcome.degradation.is_none());
    }

    #[test]
    fn test_ordinals_and_locations() {
        let outcome = split_statements("SELECT 1;\n\n  SELECT 2;");
        assert_eq!(outcome.statements[0].ordinal, 1);
        assert_eq!(outcome.statements[1].ordinal, 2);
        assert_eq!(outcome.statements[1].span.line, 3);
        assert_eq!(outcome.statements[1].span.column, 3);
        assert_eq!(outcome.statements[1].span.offset, 13);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let outcome = split_statements("SELECT 1;\nSELECT 2 /* open; SELECT 3;");
        assert_eq!(
            texts(&outcome),
            vec!["SELECT 1", "SELECT 2 /* open; SELECT 3;"]
        );
        assert_eq!(
            outcome.degradation,
            Some(Degradation {
                construct: Unterminated::BlockComment,
                offset: 19,
                line: 2,
                column: 10,
            })
        );
    }

    #[test]
    fn test_unterminated_string() {
        let outcome = split_statements("SELECT 'abc; SELECT 2;");
        assert_eq!(texts(&outcome), vec!["SELECT 'abc; SELECT 2;"]);
        assert_eq!(
            outcome.degradation.map(|d| d.construct),
            Some(Unterminated::StringLiteral)
        );
    }

    #[test]
    fn test_dollar_quoted_body() {
        let sql = "CREATE FUNCTION f() RETURNS int AS $body$ SELECT 1; $body$ LANGUAGE sql; SELECT 2";
        let outcome = split_statements(sql);
        assert_eq!(outcome.statements.len(), 2);
        assert_eq!(outcome.statements[1].text, "SELECT 2");
    }

    #[test]
    fn test_positional_parameter_is_not_a_dollar_tag() {
        let outcome = split_statements("SELECT $1; SELECT $2");
        assert_eq!(texts(&outcome), vec!["SELECT $1", "SELECT $2"]);
    }

    #[test]
    fn test_mysql_backslash_escape_and_hash_comment() {
        let sql = "SELECT 'it\\'s;' FROM t; # note; here\nSELECT `a;b` FROM t";
        let outcome = split_statements_for(sql, SqlDialect::MySQL);
        assert_eq!(
            texts(&outcome),
            vec!["SELECT 'it\\'s;' FROM t", "# note; here\nSELECT `a;b` FROM t"]
        );
    }

    #[test]
    fn test_escape_string_backslash_quote() {
        let outcome = split_statements("SELECT E'a\\'; b' FROM t; SELECT 2");
        assert_eq!(texts(&outcome), vec!["SELECT E'a\\'; b' FROM t", "SELECT 2"]);
        assert!(outcome.degradation.is_none());
        let outcome = split_statements("SELECT e'it''s \\'; ok'; SELECT 2");
        assert_eq!(outcome.statements.len(), 2);
        assert!(outcome.degradation.is_none());
    }

    #[test]
    fn test_e_suffix_is_not_an_escape_prefix() {
        // backslash is an ordinary character in a plain literal
        let outcome = split_statements("SELECT 'a\\'; SELECT 2");
        assert_eq!(texts(&outcome), vec!["SELECT 'a\\'", "SELECT 2"]);
        let outcome = split_statements("SELECT some'x\\'; SELECT 2");
        assert_eq!(outcome.statements.len(), 2);
    }

    #[test]
    fn test_truncated_statement() {
        let outcome = split_statements("SELECT 1;\nDELETE FROM users /* todo");
        let degradation = outcome.degradation.unwrap();
        let last = outcome.statements[1];
        assert!(last.contains(degradation.offset));
        assert!(!outcome.statements[0].contains(degradation.offset));
        let cut = last.truncated(degradation.offset);
        assert_eq!(cut.text, "DELETE FROM users");
        assert_eq!(cut.span, last.span);
        assert_eq!(cut.ordinal, 2);
    }

    #[test]
    fn test_multibyte_columns() {
        let outcome = split_statements("SELECT 'é'; SELECT 2");
        assert_eq!(outcome.statements[1].span.column, 13);
    }
}
