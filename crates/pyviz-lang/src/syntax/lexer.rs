//! Byte-oriented tokenizer for the Python subset.
//! Produces `Newline`/`Indent`/`Dedent` layout tokens from leading whitespace,
//! so the parser never has to look at columns.

use crate::error::{Error, ErrorCode};
use crate::syntax::token::{Token, TokenKind, keyword_or_ident};

const TAB_WIDTH: usize = 8;

pub struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
    indent_stack: Vec<usize>,
    depth: usize, // open brackets; layout is ignored while > 0
    base_depth: usize,
    at_line_start: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            indent_stack: vec![0],
            depth: 0,
            base_depth: 0,
            at_line_start: true,
        }
    }

    /// Lexes a fragment that is already inside brackets (f-string fields).
    pub(crate) fn nested(source: &'a str, line: usize, column: usize) -> Self {
        Self { line, column, depth: 1, base_depth: 1, at_line_start: false, ..Self::new(source) }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, Vec<Error>> {
        let mut tokens: Vec<Token> = Vec::new();
        let mut errors = Vec::new();

        loop {
            if self.at_line_start && self.depth == 0 {
                self.at_line_start = false;
                if let Err(e) = self.read_indentation(&mut tokens) {
                    errors.push(e);
                }
            }

            self.skip_inline_whitespace();

            if self.is_at_end() {
                break;
            }

            match self.peek() {
                b'\n' => {
                    let (line, col) = (self.line, self.column);
                    self.advance();
                    if self.depth == 0 {
                        push_newline(&mut tokens, line, col);
                        self.at_line_start = true;
                    }
                    continue;
                }
                b'#' => {
                    self.skip_line();
                    continue;
                }
                b'\\' if matches!(self.peek_next(), b'\n' | b'\r') => {
                    self.advance();
                    if self.peek() == b'\r' { self.advance(); }
                    if self.peek() == b'\n' { self.advance(); }
                    continue;
                }
                _ => {}
            }

            match self.next_token() {
                Ok(tok) => tokens.push(tok),
                Err(e) => errors.push(e),
            }
        }

        if self.depth > self.base_depth {
            errors.push(Error::new(ErrorCode::L005, self.line, self.column,
                "unexpected end of input inside brackets"));
        }

        push_newline(&mut tokens, self.line, self.column);
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            tokens.push(Token::new(TokenKind::Dedent, self.line, self.column));
        }
        tokens.push(Token::new(TokenKind::Eof, self.line, self.column));

        if errors.is_empty() { Ok(tokens) } else { Err(errors) }
    }

    fn next_token(&mut self) -> Result<Token, Error> {
        let line = self.line;
        let col = self.column;
        let ch = self.advance();

        let kind = match ch {
            b'+' => self.with_eq(TokenKind::Plus, TokenKind::PlusEq),
            b'-' => {
                if self.peek() == b'>' { self.advance(); TokenKind::Arrow }
                else { self.with_eq(TokenKind::Minus, TokenKind::MinusEq) }
            }
            b'*' => {
                if self.peek() == b'*' {
                    self.advance();
                    self.with_eq(TokenKind::DoubleStar, TokenKind::DoubleStarEq)
                } else {
                    self.with_eq(TokenKind::Star, TokenKind::StarEq)
                }
            }
            b'/' => {
                if self.peek() == b'/' {
                    self.advance();
                    self.with_eq(TokenKind::DoubleSlash, TokenKind::DoubleSlashEq)
                } else {
                    self.with_eq(TokenKind::Slash, TokenKind::SlashEq)
                }
            }
            b'%' => self.with_eq(TokenKind::Percent, TokenKind::PercentEq),
            b'@' => self.with_eq(TokenKind::At, TokenKind::AtEq),
            b'&' => self.with_eq(TokenKind::Amp, TokenKind::AmpEq),
            b'|' => self.with_eq(TokenKind::Pipe, TokenKind::PipeEq),
            b'^' => self.with_eq(TokenKind::Caret, TokenKind::CaretEq),
            b'~' => TokenKind::Tilde,
            b'=' => self.with_eq(TokenKind::Eq, TokenKind::EqEq),
            b'!' => {
                if self.peek() == b'=' { self.advance(); TokenKind::BangEq }
                else {
                    return Err(Error::new(ErrorCode::L001, line, col,
                        "expected `!=`, bare `!` is not valid"));
                }
            }
            b'<' => {
                if self.peek() == b'<' {
                    self.advance();
                    self.with_eq(TokenKind::LtLt, TokenKind::LtLtEq)
                } else {
                    self.with_eq(TokenKind::Lt, TokenKind::LtEq)
                }
            }
            b'>' => {
                if self.peek() == b'>' {
                    self.advance();
                    self.with_eq(TokenKind::GtGt, TokenKind::GtGtEq)
                } else {
                    self.with_eq(TokenKind::Gt, TokenKind::GtEq)
                }
            }
            b':' => self.with_eq(TokenKind::Colon, TokenKind::Walrus),
            b',' => TokenKind::Comma,
            b';' => TokenKind::Semicolon,
            b'.' => {
                if self.peek().is_ascii_digit() {
                    self.read_number(ch, line, col)?
                } else if self.peek() == b'.' && self.peek_next() == b'.' {
                    self.advance();
                    self.advance();
                    TokenKind::Ellipsis
                } else {
                    TokenKind::Dot
                }
            }

            b'(' => { self.depth += 1; TokenKind::LParen }
            b'[' => { self.depth += 1; TokenKind::LBracket }
            b'{' => { self.depth += 1; TokenKind::LBrace }
            b')' | b']' | b'}' => {
                if self.depth == 0 {
                    return Err(Error::new(ErrorCode::L005, line, col,
                        format!("unmatched `{}`", ch as char)));
                }
                self.depth -= 1;
                match ch {
                    b')' => TokenKind::RParen,
                    b']' => TokenKind::RBracket,
                    _ => TokenKind::RBrace,
                }
            }

            b'"' | b'\'' => TokenKind::Str(self.read_string(ch, false, line, col)?),
            b'0'..=b'9' => self.read_number(ch, line, col)?,
            b'a'..=b'z' | b'A'..=b'Z' | b'_' | 0x80..=0xff => {
                let ident = self.read_ident(ch);
                match string_prefix(&ident) {
                    Some(prefix) if matches!(self.peek(), b'"' | b'\'') => {
                        let quote = self.advance();
                        let body = self.read_string(quote, prefix.raw, line, col)?;
                        if prefix.format { TokenKind::FString(body) } else { TokenKind::Str(body) }
                    }
                    _ => keyword_or_ident(ident),
                }
            }

            other => {
                return Err(Error::new(ErrorCode::L001, line, col,
                    format!("unexpected character `{}`", other as char)));
            }
        };

        Ok(Token::new(kind, line, col))
    }

    // ─── Layout ──────────────────────────────────────────────────────────────

    /// Measures the indentation of the line under the cursor and emits
    /// `Indent`/`Dedent` tokens. Blank and comment-only lines leave the stack alone.
    fn read_indentation(&mut self, tokens: &mut Vec<Token>) -> Result<(), Error> {
        let mut width = 0;
        while !self.is_at_end() {
            match self.peek() {
                b' ' => width += 1,
                b'\t' => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
                b'\x0c' => width = 0,
                _ => break,
            }
            self.advance();
        }

        if self.is_blank_rest() {
            return Ok(());
        }

        let line = self.line;
        let col = self.column;
        let current = self.indent_stack.last().copied().unwrap_or(0);

        if width > current {
            self.indent_stack.push(width);
            tokens.push(Token::new(TokenKind::Indent, line, col));
        } else if width < current {
            while self.indent_stack.last().is_some_and(|&top| top > width) {
                self.indent_stack.pop();
                tokens.push(Token::new(TokenKind::Dedent, line, col));
            }
            if self.indent_stack.last().copied().unwrap_or(0) != width {
                self.indent_stack.push(width);
                return Err(Error::new(ErrorCode::L004, line, col,
                    "unindent does not match any outer indentation level"));
            }
        }
        Ok(())
    }

    /// True when the rest of the physical line holds no tokens.
    fn is_blank_rest(&self) -> bool {
        let mut i = self.pos;
        while i < self.source.len() {
            match self.source[i] {
                b' ' | b'\t' | b'\r' | b'\x0c' => i += 1,
                b'\n' | b'#' => return true,
                _ => return false,
            }
        }
        true
    }

    // ─── Primitives ──────────────────────────────────────────────────────────

    fn advance(&mut self) -> u8 {
        let ch = self.source[self.pos];
        self.pos += 1;
        // columns count characters, so UTF-8 continuation bytes do not advance
        if ch == b'\n' { self.line += 1; self.column = 1; }
        else if ch & 0xC0 != 0x80 { self.column += 1; }
        ch
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() { 0 } else { self.source[self.pos] }
    }

    fn peek_next(&self) -> u8 {
        if self.pos + 1 >= self.source.len() { 0 } else { self.source[self.pos + 1] }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn with_eq(&mut self, plain: TokenKind, with_eq: TokenKind) -> TokenKind {
        if self.peek() == b'=' { self.advance(); with_eq } else { plain }
    }

    fn skip_inline_whitespace(&mut self) {
        while !self.is_at_end() {
            match self.peek() {
                b' ' | b'\t' | b'\r' | b'\x0c' => { self.advance(); }
                b'\n' if self.depth > 0 => { self.advance(); }
                _ => break,
            }
        }
    }

    fn skip_line(&mut self) {
        while !self.is_at_end() && self.peek() != b'\n' { self.advance(); }
    }

    // ─── Readers ─────────────────────────────────────────────────────────────

    fn read_string(&mut self, quote: u8, raw: bool, start_line: usize, start_col: usize)
        -> Result<String, Error>
    {
        let triple = self.peek() == quote && self.peek_next() == quote;
        if triple {
            self.advance();
            self.advance();
        }

        let mut buf: Vec<u8> = Vec::new();
        loop {
            if self.is_at_end() || (!triple && self.peek() == b'\n') {
                return Err(Error::new(ErrorCode::L002, start_line, start_col,
                    "unterminated string literal"));
            }
            let ch = self.advance();
            if ch == quote {
                if !triple { break; }
                if self.peek() == quote && self.peek_next() == quote {
                    self.advance();
                    self.advance();
                    break;
                }
                buf.push(ch);
                continue;
            }
            if ch != b'\\' {
                buf.push(ch);
                continue;
            }
            if self.is_at_end() {
                continue;
            }
            if raw {
                buf.push(b'\\');
                buf.push(self.advance());
                continue;
            }
            let esc_line = self.line;
            let esc_col = self.column;
            match self.advance() {
                b'\n' => {}
                b'n'  => buf.push(b'\n'),
                b't'  => buf.push(b'\t'),
                b'r'  => buf.push(b'\r'),
                b'0'  => buf.push(0),
                b'a'  => buf.push(0x07),
                b'b'  => buf.push(0x08),
                b'f'  => buf.push(0x0c),
                b'v'  => buf.push(0x0b),
                b'\\' => buf.push(b'\\'),
                b'\'' => buf.push(b'\''),
                b'"'  => buf.push(b'"'),
                b'x'  => self.read_code_point(2, &mut buf, esc_line, esc_col)?,
                b'u'  => self.read_code_point(4, &mut buf, esc_line, esc_col)?,
                b'U'  => self.read_code_point(8, &mut buf, esc_line, esc_col)?,
                other => {
                    // unknown escapes are kept verbatim
                    buf.push(b'\\');
                    buf.push(other);
                }
            }
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn read_code_point(&mut self, digits: usize, buf: &mut Vec<u8>, line: usize, col: usize)
        -> Result<(), Error>
    {
        let end = self.pos + digits;
        let hex = self.source.get(self.pos..end)
            .and_then(|b| std::str::from_utf8(b).ok())
            .filter(|s| s.bytes().all(|b| b.is_ascii_hexdigit()));
        let Some(hex) = hex else {
            return Err(Error::new(ErrorCode::L003, line, col,
                format!("truncated \\{} escape", if digits == 2 { 'x' } else { 'u' })));
        };
        let code = u32::from_str_radix(hex, 16).unwrap_or(0);
        let Some(c) = char::from_u32(code) else {
            return Err(Error::new(ErrorCode::L003, line, col,
                format!("invalid code point U+{code:X}")));
        };
        for _ in 0..digits { self.advance(); }
        let mut tmp = [0u8; 4];
        buf.extend_from_slice(c.encode_utf8(&mut tmp).as_bytes());
        Ok(())
    }

    fn read_number(&mut self, first: u8, line: usize, col: usize) -> Result<TokenKind, Error> {
        if first == b'0' && matches!(self.peek(), b'x' | b'X' | b'o' | b'O' | b'b' | b'B') {
            let radix = match self.advance() {
                b'x' | b'X' => 16,
                b'o' | b'O' => 8,
                _ => 2,
            };
            let mut digits = String::new();
            while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
                let d = self.advance();
                if d != b'_' { digits.push(d as char); }
            }
            return i64::from_str_radix(&digits, radix).map(TokenKind::Int).map_err(|_| {
                Error::new(ErrorCode::L001, line, col, format!("invalid integer literal `0{digits}`"))
            });
        }

        let mut s = String::new();
        s.push(first as char);
        let mut is_float = first == b'.';
        self.read_digits(&mut s);

        if !is_float && self.peek() == b'.' && self.peek_next() != b'.'
            && !self.peek_next().is_ascii_alphabetic() && self.peek_next() != b'_'
        {
            is_float = true;
            s.push(self.advance() as char);
            self.read_digits(&mut s);
        }

        if matches!(self.peek(), b'e' | b'E') {
            let sign = matches!(self.peek_next(), b'+' | b'-');
            let digit_at = if sign { self.pos + 2 } else { self.pos + 1 };
            if self.source.get(digit_at).is_some_and(|b| b.is_ascii_digit()) {
                is_float = true;
                s.push(self.advance() as char);
                if sign { s.push(self.advance() as char); }
                self.read_digits(&mut s);
            }
        }

        if is_float {
            return Ok(TokenKind::Float(s.parse().unwrap_or(0.0)));
        }
        // integers past i64 fall back to floats
        Ok(match s.parse::<i64>() {
            Ok(i) => TokenKind::Int(i),
            Err(_) => TokenKind::Float(s.parse().unwrap_or(f64::INFINITY)),
        })
    }

    fn read_digits(&mut self, s: &mut String) {
        while self.peek().is_ascii_digit() || (self.peek() == b'_' && self.peek_next().is_ascii_digit()) {
            let d = self.advance();
            if d != b'_' { s.push(d as char); }
        }
    }

    fn read_ident(&mut self, first: u8) -> String {
        let mut bytes = vec![first];
        while !self.is_at_end()
            && (self.peek().is_ascii_alphanumeric() || self.peek() == b'_' || self.peek() >= 0x80)
        {
            bytes.push(self.advance());
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

struct StringPrefix {
    raw: bool,
    format: bool,
}

fn string_prefix(ident: &str) -> Option<StringPrefix> {
    let lower = ident.to_ascii_lowercase();
    match lower.as_str() {
        "r" | "br" | "rb" => Some(StringPrefix { raw: true, format: false }),
        "b" | "u" => Some(StringPrefix { raw: false, format: false }),
        "f" => Some(StringPrefix { raw: false, format: true }),
        "rf" | "fr" => Some(StringPrefix { raw: true, format: true }),
        _ => None,
    }
}

fn push_newline(tokens: &mut Vec<Token>, line: usize, column: usize) {
    let needed = tokens.last().is_some_and(|t| {
        !matches!(t.kind, TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent)
    });
    if needed {
        tokens.push(Token::new(TokenKind::Newline, line, column));
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn lex_err(src: &str) -> Vec<Error> {
        Lexer::new(src).tokenize().unwrap_err()
    }

    fn ident(s: &str) -> TokenKind {
        TokenKind::Ident(s.into())
    }

    #[test]
    fn empty() {
        assert_eq!(lex(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn integer_and_float_are_distinct() {
        assert_eq!(lex("42"), vec![TokenKind::Int(42), TokenKind::Newline, TokenKind::Eof]);
        assert_eq!(lex("3.5"), vec![TokenKind::Float(3.5), TokenKind::Newline, TokenKind::Eof]);
        assert_eq!(lex("1e3"), vec![TokenKind::Float(1000.0), TokenKind::Newline, TokenKind::Eof]);
        assert_eq!(lex(".5"), vec![TokenKind::Float(0.5), TokenKind::Newline, TokenKind::Eof]);
        assert_eq!(lex("1_000"), vec![TokenKind::Int(1000), TokenKind::Newline, TokenKind::Eof]);
        assert_eq!(lex("0xff"), vec![TokenKind::Int(255), TokenKind::Newline, TokenKind::Eof]);
    }

    #[test]
    fn huge_integer_becomes_float() {
        assert_eq!(
            lex("100000000000000000000"),
            vec![TokenKind::Float(1e20), TokenKind::Newline, TokenKind::Eof]
        );
    }

    #[test]
    fn dot_not_consumed_by_number() {
        assert_eq!(
            lex("s.x"),
            vec![ident("s"), TokenKind::Dot, ident("x"), TokenKind::Newline, TokenKind::Eof]
        );
    }

    #[test]
    fn python_keywords() {
        assert_eq!(lex("True")[0], TokenKind::True);
        assert_eq!(lex("None")[0], TokenKind::None);
        assert_eq!(lex("elif")[0], TokenKind::Elif);
        assert_eq!(lex("import")[0], TokenKind::Import);
        assert_eq!(lex("true")[0], ident("true"));
    }

    #[test]
    fn compound_operators() {
        assert_eq!(lex("**")[0], TokenKind::DoubleStar);
        assert_eq!(lex("//")[0], TokenKind::DoubleSlash);
        assert_eq!(lex("//=")[0], TokenKind::DoubleSlashEq);
        assert_eq!(lex("**=")[0], TokenKind::DoubleStarEq);
        assert_eq!(lex("!=")[0], TokenKind::BangEq);
        assert_eq!(lex("<<=")[0], TokenKind::LtLtEq);
        assert_eq!(lex("->")[0], TokenKind::Arrow);
    }

    #[test]
    fn comment_skipped() {
        assert_eq!(lex("# note\n42  # trailing"), vec![TokenKind::Int(42), TokenKind::Newline, TokenKind::Eof]);
    }

    #[test]
    fn indent_and_dedent() {
        assert_eq!(
            lex("if x:\n    a = 1\nb = 2\n"),
            vec![
                TokenKind::If, ident("x"), TokenKind::Colon, TokenKind::Newline,
                TokenKind::Indent,
                ident("a"), TokenKind::Eq, TokenKind::Int(1), TokenKind::Newline,
                TokenKind::Dedent,
                ident("b"), TokenKind::Eq, TokenKind::Int(2), TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn dedents_closed_at_eof() {
        let kinds = lex("for i in x:\n    if i:\n        y = i");
        let dedents = kinds.iter().filter(|k| **k == TokenKind::Dedent).count();
        assert_eq!(dedents, 2);
        assert_eq!(kinds.last(), Some(&TokenKind::Eof));
    }

    #[test]
    fn blank_and_comment_lines_keep_indentation() {
        let kinds = lex("while x:\n    a = 1\n\n        # deep comment\n    b = 2\n");
        assert_eq!(kinds.iter().filter(|k| **k == TokenKind::Indent).count(), 1);
        assert_eq!(kinds.iter().filter(|k| **k == TokenKind::Dedent).count(), 1);
    }

    #[test]
    fn brackets_join_lines() {
        assert_eq!(
            lex("x = [1,\n     2]\n"),
            vec![
                ident("x"), TokenKind::Eq, TokenKind::LBracket,
                TokenKind::Int(1), TokenKind::Comma, TokenKind::Int(2),
                TokenKind::RBracket, TokenKind::Newline, TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn backslash_continuation() {
        assert_eq!(
            lex("x = 1 + \\\n    2"),
            vec![
                ident("x"), TokenKind::Eq, TokenKind::Int(1), TokenKind::Plus,
                TokenKind::Int(2), TokenKind::Newline, TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn inconsistent_dedent_error() {
        let errs = lex_err("if x:\n        a = 1\n    b = 2\n");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, ErrorCode::L004);
    }

    #[test]
    fn string_literals() {
        assert_eq!(lex("'hi'")[0], TokenKind::Str("hi".into()));
        assert_eq!(lex(r#""a\nb""#)[0], TokenKind::Str("a\nb".into()));
        assert_eq!(lex(r#""\d""#)[0], TokenKind::Str("\\d".into()));
        assert_eq!(lex(r#"r"\n""#)[0], TokenKind::Str("\\n".into()));
        assert_eq!(lex("'''a\nb'''")[0], TokenKind::Str("a\nb".into()));
        assert_eq!(lex(r#""\u00e9""#)[0], TokenKind::Str("é".into()));
        assert_eq!(lex("'héllo'")[0], TokenKind::Str("héllo".into()));
    }

    #[test]
    fn fstring_keeps_body() {
        assert_eq!(lex(r#"f"y={y}""#)[0], TokenKind::FString("y={y}".into()));
        assert_eq!(lex(r#"F'{a:>5}'"#)[0], TokenKind::FString("{a:>5}".into()));
    }

    #[test]
    fn prefix_letters_without_quote_are_identifiers() {
        assert_eq!(lex("f")[0], ident("f"));
        assert_eq!(lex("rb")[0], ident("rb"));
    }

    #[test]
    fn unterminated_string_error() {
        let errs = lex_err(r#""oops"#);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, ErrorCode::L002);
    }

    #[test]
    fn bad_hex_escape_error() {
        let errs = lex_err(r#""\xZZ""#);
        assert_eq!(errs[0].code, ErrorCode::L003);
    }

    #[test]
    fn unmatched_bracket_error() {
        assert_eq!(lex_err(")")[0].code, ErrorCode::L005);
        assert_eq!(lex_err("(1,")[0].code, ErrorCode::L005);
    }

    #[test]
    fn bare_bang_error() {
        let errs = lex_err("!");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, ErrorCode::L001);
    }

    #[test]
    fn line_and_column_tracking() {
        let tokens = Lexer::new("a\nb").tokenize().unwrap();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[2].line, tokens[2].column), (2, 1));
    }

    #[test]
    fn columns_count_characters_not_bytes() {
        let tokens = Lexer::new("s = \"héllo\" + '🎉' + t").tokenize().unwrap();
        assert!(matches!(tokens[3].kind, TokenKind::Plus));
        assert_eq!(tokens[3].column, 13);
        assert!(matches!(tokens[6].kind, TokenKind::Ident(ref n) if n == "t"));
        assert_eq!(tokens[6].column, 21);
    }
}
