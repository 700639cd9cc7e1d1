use crate::error::{Error, ErrorCode};
use crate::syntax::ast::*;
use crate::syntax::lexer::Lexer;
use crate::syntax::token::{Token, TokenKind};

/// Deepest nesting of brackets, unary operators and blocks one program may use.
pub const MAX_NESTING: usize = 64;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0, depth: 0 }
    }

    pub fn parse(mut self) -> Result<Module, Vec<Error>> {
        let mut errors = Vec::new();
        let mut body = Vec::new();

        while !self.is_at_end() {
            let pos_before = self.pos;

            match self.peek_kind() {
                TokenKind::Newline | TokenKind::Dedent => { self.advance(); }
                TokenKind::Indent => {
                    errors.push(self.unexpected_at_peek("unexpected indent"));
                    self.advance();
                    self.recover();
                }
                _ => match self.parse_statement() {
                    Ok(stmts) => body.extend(stmts),
                    Err(e) => { errors.push(e); self.recover(); }
                },
            }

            // guarantee progress on unrecognised tokens
            if self.pos == pos_before {
                self.advance();
            }
        }

        if errors.is_empty() { Ok(Module { body }) } else { Err(errors) }
    }

    /// Parses exactly one expression list followed by end of input.
    pub fn parse_single_expression(mut self) -> Result<Expr, Error> {
        let expr = self.parse_testlist()?;
        self.matches(TokenKind::Newline);
        if !self.is_at_end() {
            return Err(self.unexpected("end of expression"));
        }
        Ok(expr)
    }

    // ─── Statements ──────────────────────────────────────────────────────────

    /// One logical line. Simple statements joined by `;` yield several nodes.
    fn parse_statement(&mut self) -> Result<Vec<Stmt>, Error> {
        let kind = self.peek_kind();
        let stmt = match kind {
            TokenKind::If => self.parse_if()?,
            TokenKind::While => self.parse_while()?,
            TokenKind::For => self.parse_for()?,
            TokenKind::Def => self.parse_def()?,
            TokenKind::At => self.parse_unsupported("decorator")?,
            ref k if k.is_unsupported_keyword() => {
                let keyword = k.lexeme().unwrap_or("statement");
                self.parse_unsupported(keyword)?
            }
            _ => return self.parse_simple_line(),
        };
        Ok(vec![stmt])
    }

    fn parse_simple_line(&mut self) -> Result<Vec<Stmt>, Error> {
        let mut stmts = vec![self.parse_simple_statement()?];
        while self.matches(TokenKind::Semicolon) {
            if self.check(TokenKind::Newline) || self.is_at_end() { break; }
            stmts.push(self.parse_simple_statement()?);
        }
        if !self.matches(TokenKind::Newline) && !self.is_at_end() {
            return Err(self.unexpected("end of line"));
        }
        Ok(stmts)
    }

    fn parse_simple_statement(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        match self.peek_kind() {
            TokenKind::Pass => { self.advance(); return Ok(Stmt::Pass { span }); }
            TokenKind::Break => { self.advance(); return Ok(Stmt::Break { span }); }
            TokenKind::Continue => { self.advance(); return Ok(Stmt::Continue { span }); }
            TokenKind::Return => {
                self.advance();
                let value = if self.at_statement_end() { None } else { Some(self.parse_testlist()?) };
                return Ok(Stmt::Return { value, span });
            }
            ref k if k.is_unsupported_keyword() => {
                let keyword = k.lexeme().unwrap_or("statement");
                let text = self.collect_line_text();
                return Ok(Stmt::Unsupported { keyword: keyword.into(), text, span });
            }
            _ => {}
        }

        let first = self.parse_testlist_star()?;

        if self.peek_kind().is_augmented_assign() {
            let op_tok = self.advance();
            let op = augmented_op(&op_tok.kind);
            let target = match to_target(&first) {
                Ok(Target::Unpack(_)) | Err(_) => {
                    return Err(Error::new(ErrorCode::P003, span.line, span.column,
                        format!("'{first}' is an illegal expression for augmented assignment")));
                }
                Ok(t) => t,
            };
            let value = self.parse_testlist()?;
            return Ok(Stmt::AugAssign { target, op, value, span });
        }

        // annotated assignment: `x: int = 5`
        if self.check(TokenKind::Colon) {
            self.advance();
            let target = match to_target(&first) {
                Ok(Target::Unpack(_)) | Err(_) => {
                    return Err(Error::new(ErrorCode::P003, span.line, span.column,
                        "only single target can be annotated"));
                }
                Ok(t) => t,
            };
            self.parse_test()?;
            if self.matches(TokenKind::Eq) {
                let value = self.parse_testlist_star()?;
                return Ok(Stmt::Assign { targets: vec![target], value, span });
            }
            return Ok(Stmt::Pass { span });
        }

        if self.check(TokenKind::Eq) {
            let mut exprs = vec![first];
            while self.matches(TokenKind::Eq) {
                exprs.push(self.parse_testlist_star()?);
            }
            let value = exprs.pop().unwrap_or(Expr::NoneLit(span));
            let targets = exprs.iter().map(to_target).collect::<Result<Vec<_>, _>>()?;
            return Ok(Stmt::Assign { targets, value, span });
        }

        Ok(Stmt::Expr { expr: first, span })
    }

    /// Body of a compound statement: an indented block, or simple
    /// statements on the same line as the colon.
    fn parse_suite(&mut self) -> Result<Vec<Stmt>, Error> {
        self.nested(Self::parse_block)
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, Error> {
        self.expect(TokenKind::Colon)?;
        if !self.matches(TokenKind::Newline) {
            return self.parse_simple_line();
        }
        if !self.matches(TokenKind::Indent) {
            return Err(self.unexpected_at_peek("expected an indented block"));
        }
        let mut body = Vec::new();
        while !self.check(TokenKind::Dedent) && !self.is_at_end() {
            if self.matches(TokenKind::Newline) { continue; }
            body.extend(self.parse_statement()?);
        }
        self.matches(TokenKind::Dedent);
        Ok(body)
    }

    /// Handles both `if` and `elif`; an elif chain nests in `orelse`.
    fn parse_if(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.advance(); // `if` or `elif`
        let test = self.parse_named_test()?;
        let body = self.parse_suite()?;
        let orelse = if self.check(TokenKind::Elif) {
            vec![self.nested(Self::parse_if)?]
        } else if self.matches(TokenKind::Else) {
            self.parse_suite()?
        } else {
            Vec::new()
        };
        Ok(Stmt::If { test, body, orelse, span })
    }

    fn parse_while(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::While)?;
        let test = self.parse_named_test()?;
        let body = self.parse_suite()?;
        let orelse = if self.matches(TokenKind::Else) { self.parse_suite()? } else { Vec::new() };
        Ok(Stmt::While { test, body, orelse, span })
    }

    fn parse_for(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::For)?;
        let target_expr = self.parse_target_list()?;
        let target = to_target(&target_expr)?;
        self.expect(TokenKind::In)?;
        let iter = self.parse_testlist()?;
        let body = self.parse_suite()?;
        let orelse = if self.matches(TokenKind::Else) { self.parse_suite()? } else { Vec::new() };
        Ok(Stmt::For { target, iter, body, orelse, span })
    }

    fn parse_def(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Def)?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.check(TokenKind::RParen) && !self.is_at_end() {
            let prefix = if self.matches(TokenKind::DoubleStar) {
                "**"
            } else if self.matches(TokenKind::Star) {
                "*"
            } else {
                ""
            };
            if self.matches(TokenKind::Slash) {
                params.push("/".to_string());
            } else if self.check(TokenKind::Comma) && prefix == "*" {
                params.push("*".to_string());
            } else {
                let param = self.expect_ident()?;
                if self.matches(TokenKind::Colon) { self.parse_test()?; }
                if self.matches(TokenKind::Eq) { self.parse_test()?; }
                params.push(format!("{prefix}{param}"));
            }
            if !self.matches(TokenKind::Comma) { break; }
        }
        self.expect(TokenKind::RParen)?;
        if self.matches(TokenKind::Arrow) { self.parse_test()?; }
        let body = self.parse_suite()?;
        Ok(Stmt::FunctionDef { name, params, body, span })
    }

    /// Keeps the header text of a statement the interpreter does not model
    /// and skips any indented block attached to it.
    fn parse_unsupported(&mut self, keyword: &str) -> Result<Stmt, Error> {
        let span = self.span();
        let text = self.collect_line_text();
        let opens_block = self.pos > 0 && self.tokens[self.pos - 1].kind == TokenKind::Colon;
        if !self.matches(TokenKind::Newline) && !self.is_at_end() {
            return Err(self.unexpected("end of line"));
        }
        if opens_block && self.check(TokenKind::Indent) {
            self.skip_block();
        }
        Ok(Stmt::Unsupported { keyword: keyword.to_string(), text, span })
    }

    // ─── Expressions (precedence climbing) ───────────────────────────────────

    /// Comma-separated expressions; more than one (or a trailing comma) makes a tuple.
    fn parse_testlist(&mut self) -> Result<Expr, Error> {
        self.parse_sequence(Self::parse_test)
    }

    /// Like `parse_testlist`, but elements may be starred (`a, *rest = xs`).
    fn parse_testlist_star(&mut self) -> Result<Expr, Error> {
        self.parse_sequence(Self::parse_test_or_star)
    }

    /// `for` targets stop before `in`, so they are parsed below comparison level.
    fn parse_target_list(&mut self) -> Result<Expr, Error> {
        self.parse_sequence(|p| {
            if p.check(TokenKind::Star) {
                let span = p.span();
                p.advance();
                p.parse_bitor()?;
                return Ok(Expr::Unsupported("Starred", span));
            }
            p.parse_bitor()
        })
    }

    fn parse_sequence(&mut self, mut item: impl FnMut(&mut Self) -> Result<Expr, Error>)
        -> Result<Expr, Error>
    {
        let span = self.span();
        let first = item(self)?;
        if !self.check(TokenKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.matches(TokenKind::Comma) {
            if !self.starts_expression() { break; }
            items.push(item(self)?);
        }
        Ok(Expr::Tuple(items, span))
    }

    fn parse_test_or_star(&mut self) -> Result<Expr, Error> {
        if self.check(TokenKind::Star) {
            let span = self.span();
            self.advance();
            self.parse_bitor()?;
            return Ok(Expr::Unsupported("Starred", span));
        }
        self.parse_test()
    }

    /// A test that may be a walrus assignment (`while (n := f()):`).
    fn parse_named_test(&mut self) -> Result<Expr, Error> {
        let span = self.span();
        let expr = self.parse_test()?;
        if self.matches(TokenKind::Walrus) {
            self.parse_test()?;
            return Ok(Expr::Unsupported("NamedExpr", span));
        }
        Ok(expr)
    }

    fn parse_test(&mut self) -> Result<Expr, Error> {
        self.nested(Self::parse_conditional)
    }

    fn parse_conditional(&mut self) -> Result<Expr, Error> {
        if self.check(TokenKind::Lambda) {
            return self.parse_lambda();
        }
        let span = self.span();
        let body = self.parse_or()?;
        if self.matches(TokenKind::If) {
            let test = self.parse_or()?;
            self.expect(TokenKind::Else)?;
            let orelse = self.parse_test()?;
            return Ok(Expr::IfExp {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
                span,
            });
        }
        Ok(body)
    }

    fn parse_lambda(&mut self) -> Result<Expr, Error> {
        let span = self.span();
        self.expect(TokenKind::Lambda)?;
        while !self.check(TokenKind::Colon) && !self.is_at_end() {
            if self.matches(TokenKind::Eq) {
                self.parse_test()?;
            } else {
                self.advance();
            }
        }
        self.expect(TokenKind::Colon)?;
        self.parse_test()?;
        Ok(Expr::Unsupported("Lambda", span))
    }

    fn parse_or(&mut self) -> Result<Expr, Error> {
        self.parse_bool_chain(TokenKind::Or, BoolOp::Or, Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<Expr, Error> {
        self.parse_bool_chain(TokenKind::And, BoolOp::And, Self::parse_not)
    }

    fn parse_bool_chain(
        &mut self,
        token: TokenKind,
        op: BoolOp,
        operand: fn(&mut Self) -> Result<Expr, Error>,
    ) -> Result<Expr, Error> {
        let span = self.span();
        let first = operand(self)?;
        if !self.check(token.clone()) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.matches(token.clone()) {
            values.push(operand(self)?);
        }
        Ok(Expr::BoolOp { op, values, span })
    }

    fn parse_not(&mut self) -> Result<Expr, Error> {
        let span = self.span();
        if self.matches(TokenKind::Not) {
            let operand = self.nested(Self::parse_not)?;
            return Ok(Expr::UnaryOp { op: UnaryOp::Not, operand: Box::new(operand), span });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, Error> {
        let span = self.span();
        let left = self.parse_bitor()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => CmpOp::Eq,
                TokenKind::BangEq => CmpOp::NotEq,
                TokenKind::Lt => CmpOp::Lt,
                TokenKind::LtEq => CmpOp::LtEq,
                TokenKind::Gt => CmpOp::Gt,
                TokenKind::GtEq => CmpOp::GtEq,
                TokenKind::In => CmpOp::In,
                TokenKind::Not if self.peek_next_is(TokenKind::In) => {
                    self.advance();
                    CmpOp::NotIn
                }
                TokenKind::Is if self.peek_next_is(TokenKind::Not) => {
                    self.advance();
                    CmpOp::IsNot
                }
                TokenKind::Is => CmpOp::Is,
                _ => break,
            };
            self.advance();
            ops.push(op);
            comparators.push(self.parse_bitor()?);
        }
        if ops.is_empty() {
            return Ok(left);
        }
        Ok(Expr::Compare { left: Box::new(left), ops, comparators, span })
    }

    fn parse_bitor(&mut self) -> Result<Expr, Error> {
        self.parse_binary_level(&[(TokenKind::Pipe, BinOp::BitOr)], Self::parse_bitxor)
    }

    fn parse_bitxor(&mut self) -> Result<Expr, Error> {
        self.parse_binary_level(&[(TokenKind::Caret, BinOp::BitXor)], Self::parse_bitand)
    }

    fn parse_bitand(&mut self) -> Result<Expr, Error> {
        self.parse_binary_level(&[(TokenKind::Amp, BinOp::BitAnd)], Self::parse_shift)
    }

    fn parse_shift(&mut self) -> Result<Expr, Error> {
        self.parse_binary_level(
            &[(TokenKind::LtLt, BinOp::LShift), (TokenKind::GtGt, BinOp::RShift)],
            Self::parse_arith,
        )
    }

    fn parse_arith(&mut self) -> Result<Expr, Error> {
        self.parse_binary_level(
            &[(TokenKind::Plus, BinOp::Add), (TokenKind::Minus, BinOp::Sub)],
            Self::parse_term,
        )
    }

    fn parse_term(&mut self) -> Result<Expr, Error> {
        self.parse_binary_level(
            &[
                (TokenKind::Star, BinOp::Mul),
                (TokenKind::Slash, BinOp::Div),
                (TokenKind::DoubleSlash, BinOp::FloorDiv),
                (TokenKind::Percent, BinOp::Mod),
                (TokenKind::At, BinOp::MatMul),
            ],
            Self::parse_factor,
        )
    }

    /// Left-associative binary level.
    fn parse_binary_level(
        &mut self,
        table: &[(TokenKind, BinOp)],
        operand: fn(&mut Self) -> Result<Expr, Error>,
    ) -> Result<Expr, Error> {
        let mut left = operand(self)?;
        loop {
            let kind = self.peek_kind();
            let Some(op) = table.iter().find(|(k, _)| *k == kind).map(|(_, op)| *op) else {
                break;
            };
            let span = left.span();
            self.advance();
            let right = operand(self)?;
            left = Expr::BinOp { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr, Error> {
        let span = self.span();
        let op = match self.peek_kind() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Pos,
            TokenKind::Tilde => UnaryOp::Invert,
            _ => return self.parse_power(),
        };
        self.advance();
        let operand = self.nested(Self::parse_factor)?;
        Ok(Expr::UnaryOp { op, operand: Box::new(operand), span })
    }

    /// `**` binds tighter than a unary operator on its left and is right-associative.
    fn parse_power(&mut self) -> Result<Expr, Error> {
        if self.check(TokenKind::Await) {
            self.advance();
        }
        let base = self.parse_postfix()?;
        if self.matches(TokenKind::DoubleStar) {
            let span = base.span();
            let exponent = self.nested(Self::parse_factor)?;
            return Ok(Expr::BinOp { left: Box::new(base), op: BinOp::Pow, right: Box::new(exponent), span });
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_primary()?;
        loop {
            let span = expr.span();
            match self.peek_kind() {
                TokenKind::LParen => {
                    self.advance();
                    let (args, keywords) = self.parse_call_args()?;
                    self.expect(TokenKind::RParen)?;
                    expr = Expr::Call { func: Box::new(expr), args, keywords, span };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_subscript()?;
                    self.expect(TokenKind::RBracket)?;
                    expr = Expr::Subscript { value: Box::new(expr), index: Box::new(index), span };
                }
                TokenKind::Dot => {
                    self.advance();
                    let attr = self.expect_ident()?;
                    expr = Expr::Attribute { value: Box::new(expr), attr, span };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        let tok = self.advance();
        let span = Span::new(tok.line, tok.column);

        match tok.kind.clone() {
            TokenKind::Int(i) => Ok(Expr::Int(i, span)),
            TokenKind::Float(x) => Ok(Expr::Float(x, span)),
            TokenKind::Str(_) | TokenKind::FString(_) => self.parse_string_run(tok),
            TokenKind::True => Ok(Expr::Bool(true, span)),
            TokenKind::False => Ok(Expr::Bool(false, span)),
            TokenKind::None => Ok(Expr::NoneLit(span)),
            TokenKind::Ident(name) => Ok(Expr::Name(name, span)),
            TokenKind::Ellipsis => Ok(Expr::Unsupported("Ellipsis", span)),
            TokenKind::LParen => self.parse_paren(span),
            TokenKind::LBracket => self.parse_list(span),
            TokenKind::LBrace => self.parse_brace(span),
            TokenKind::Yield => {
                if !self.check(TokenKind::RParen) { self.parse_testlist()?; }
                Ok(Expr::Unsupported("Yield", span))
            }
            other => Err(Error::new(ErrorCode::P001, tok.line, tok.column,
                format!("expected expression, found {}", describe(&other)))),
        }
    }

    /// `(` already consumed: empty tuple, parenthesised expression, tuple or generator.
    fn parse_paren(&mut self, span: Span) -> Result<Expr, Error> {
        if self.matches(TokenKind::RParen) {
            return Ok(Expr::Tuple(Vec::new(), span));
        }
        let first = self.parse_named_or_star()?;
        if self.check(TokenKind::For) {
            self.skip_to_closer(TokenKind::RParen)?;
            return Ok(Expr::Unsupported("GeneratorExp", span));
        }
        if !self.check(TokenKind::Comma) {
            self.expect(TokenKind::RParen)?;
            return Ok(first);
        }
        let mut items = vec![first];
        while self.matches(TokenKind::Comma) {
            if self.check(TokenKind::RParen) { break; }
            items.push(self.parse_named_or_star()?);
        }
        self.expect(TokenKind::RParen)?;
        Ok(Expr::Tuple(items, span))
    }

    fn parse_list(&mut self, span: Span) -> Result<Expr, Error> {
        let mut items = Vec::new();
        if self.matches(TokenKind::RBracket) {
            return Ok(Expr::List(items, span));
        }
        items.push(self.parse_named_or_star()?);
        if self.check(TokenKind::For) {
            self.skip_to_closer(TokenKind::RBracket)?;
            return Ok(Expr::Unsupported("ListComp", span));
        }
        while self.matches(TokenKind::Comma) {
            if self.check(TokenKind::RBracket) { break; }
            items.push(self.parse_named_or_star()?);
        }
        self.expect(TokenKind::RBracket)?;
        Ok(Expr::List(items, span))
    }

    /// `{` already consumed: dict, set, or a comprehension of either.
    fn parse_brace(&mut self, span: Span) -> Result<Expr, Error> {
        if self.matches(TokenKind::RBrace) {
            return Ok(Expr::Dict(Vec::new(), span));
        }
        if self.check(TokenKind::DoubleStar) {
            self.skip_to_closer(TokenKind::RBrace)?;
            return Ok(Expr::Unsupported("DictUnpack", span));
        }
        let first = self.parse_test_or_star()?;
        if !self.matches(TokenKind::Colon) {
            // set display
            self.skip_to_closer(TokenKind::RBrace)?;
            return Ok(Expr::Unsupported("Set", span));
        }
        let value = self.parse_test()?;
        if self.check(TokenKind::For) {
            self.skip_to_closer(TokenKind::RBrace)?;
            return Ok(Expr::Unsupported("DictComp", span));
        }
        let mut pairs = vec![(first, value)];
        while self.matches(TokenKind::Comma) {
            if self.check(TokenKind::RBrace) { break; }
            if self.check(TokenKind::DoubleStar) {
                self.skip_to_closer(TokenKind::RBrace)?;
                return Ok(Expr::Unsupported("DictUnpack", span));
            }
            let key = self.parse_test()?;
            self.expect(TokenKind::Colon)?;
            let value = self.parse_test()?;
            pairs.push((key, value));
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Expr::Dict(pairs, span))
    }

    fn parse_named_or_star(&mut self) -> Result<Expr, Error> {
        if self.check(TokenKind::Star) {
            return self.parse_test_or_star();
        }
        self.parse_named_test()
    }

    fn parse_subscript(&mut self) -> Result<Expr, Error> {
        let span = self.span();
        let mut is_slice = false;
        let mut items = Vec::new();
        loop {
            if !self.check(TokenKind::Colon) {
                items.push(self.parse_test()?);
            }
            while self.matches(TokenKind::Colon) {
                is_slice = true;
                if self.starts_expression() { self.parse_test()?; }
            }
            if !self.matches(TokenKind::Comma) || self.check(TokenKind::RBracket) { break; }
        }
        if is_slice {
            return Ok(Expr::Unsupported("Slice", span));
        }
        if items.len() == 1 {
            return Ok(items.remove(0));
        }
        Ok(Expr::Tuple(items, span))
    }

    // ─── Argument lists ──────────────────────────────────────────────────────

    /// Positional and `name=value` arguments; `(` already consumed, `)` left in place.
    fn parse_call_args(&mut self) -> Result<(Vec<Expr>, Vec<(String, Expr)>), Error> {
        let mut args = Vec::new();
        let mut keywords = Vec::new();
        while !self.check(TokenKind::RParen) && !self.is_at_end() {
            let span = self.span();
            if self.matches(TokenKind::DoubleStar) || self.matches(TokenKind::Star) {
                self.parse_test()?;
                args.push(Expr::Unsupported("Starred", span));
            } else if matches!(self.peek_kind(), TokenKind::Ident(_)) && self.peek_next_is(TokenKind::Eq) {
                let name = self.expect_ident()?;
                self.advance(); // =
                keywords.push((name, self.parse_test()?));
            } else {
                let arg = self.parse_named_test()?;
                if self.check(TokenKind::For) {
                    self.skip_until_closer(TokenKind::RParen)?;
                    args.push(Expr::Unsupported("GeneratorExp", span));
                    break;
                }
                args.push(arg);
            }
            if !self.matches(TokenKind::Comma) { break; }
        }
        Ok((args, keywords))
    }

    // ─── Strings ─────────────────────────────────────────────────────────────

    /// Adjacent literals concatenate; any f-string in the run makes the whole run one.
    fn parse_string_run(&mut self, first: Token) -> Result<Expr, Error> {
        let span = Span::new(first.line, first.column);
        let mut pieces = vec![first];
        while matches!(self.peek_kind(), TokenKind::Str(_) | TokenKind::FString(_)) {
            pieces.push(self.advance());
        }

        if pieces.iter().all(|t| matches!(t.kind, TokenKind::Str(_))) {
            let joined = pieces.into_iter().map(|t| match t.kind {
                TokenKind::Str(s) => s,
                _ => String::new(),
            }).collect();
            return Ok(Expr::Str(joined, span));
        }

        let mut parts = Vec::new();
        for tok in pieces {
            match tok.kind {
                TokenKind::Str(s) => parts.push(FStringPart::Literal(s)),
                TokenKind::FString(body) => parts.extend(parse_fstring(&body, tok.line, tok.column, self.depth)?),
                _ => {}
            }
        }
        Ok(Expr::FString(merge_literals(parts), span))
    }

    /// Runs `f` one nesting level deeper, failing once [`MAX_NESTING`] is reached.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        if self.depth >= MAX_NESTING {
            let tok = self.peek();
            return Err(Error::new(ErrorCode::P005, tok.line, tok.column, "too many nested expressions or blocks"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    // ─── Token primitives ────────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> TokenKind {
        self.tokens[self.pos].kind.clone()
    }

    fn peek_next_is(&self, kind: TokenKind) -> bool {
        self.tokens.get(self.pos + 1).is_some_and(|t| t.kind == kind)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() { self.pos += 1; }
        tok
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) { self.advance(); true } else { false }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, Error> {
        if self.check(kind.clone()) {
            Ok(self.advance())
        } else {
            let tok = self.peek();
            Err(Error::new(
                ErrorCode::P002,
                tok.line,
                tok.column,
                format!("expected {}, found {}", describe(&kind), describe(&tok.kind)),
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<String, Error> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Ident(s) => Ok(s),
            other => Err(Error::new(ErrorCode::P001, tok.line, tok.column,
                format!("expected identifier, found {}", describe(&other)))),
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof)
    }

    fn starts_expression(&self) -> bool {
        !matches!(
            self.peek().kind,
            TokenKind::Newline | TokenKind::Eof | TokenKind::Eq | TokenKind::Semicolon
                | TokenKind::Colon | TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace
                | TokenKind::In | TokenKind::Indent | TokenKind::Dedent
        ) && !self.peek().kind.is_augmented_assign()
    }

    fn span(&self) -> Span {
        let tok = self.peek();
        Span::new(tok.line, tok.column)
    }

    fn unexpected(&self, expected: &str) -> Error {
        let tok = self.peek();
        Error::new(
            ErrorCode::P001,
            tok.line,
            tok.column,
            format!("expected {}, found {}", expected, describe(&tok.kind)),
        )
    }

    fn unexpected_at_peek(&self, msg: &str) -> Error {
        let tok = self.peek();
        Error::new(ErrorCode::P001, tok.line, tok.column, msg)
    }

    /// Consumes tokens up to (not including) the end of the logical line and
    /// renders them back to text.
    fn collect_line_text(&mut self) -> String {
        let mut text = String::new();
        let mut prev: Option<TokenKind> = None;
        while !self.at_line_end() {
            let tok = self.advance();
            if let Some(p) = &prev {
                if needs_space(p, &tok.kind) { text.push(' '); }
            }
            text.push_str(&token_text(&tok.kind));
            prev = Some(tok.kind);
        }
        text
    }

    fn at_line_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Newline | TokenKind::Eof)
    }

    /// Skips a balanced `Indent ... Dedent` block.
    fn skip_block(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.advance().kind {
                TokenKind::Indent => depth += 1,
                TokenKind::Dedent => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 { break; }
                }
                TokenKind::Eof => break,
                _ => {}
            }
            if self.is_at_end() { break; }
        }
    }

    /// Skips to and consumes the bracket closing the current group.
    fn skip_to_closer(&mut self, closer: TokenKind) -> Result<(), Error> {
        self.skip_until_closer(closer.clone())?;
        self.expect(closer).map(|_| ())
    }

    /// Skips to the bracket closing the current group, leaving it in place.
    fn skip_until_closer(&mut self, closer: TokenKind) -> Result<(), Error> {
        let mut depth = 0usize;
        loop {
            let kind = self.peek_kind();
            match kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    if depth == 0 {
                        return if kind == closer { Ok(()) } else { Err(self.unexpected(&describe(&closer))) };
                    }
                    depth -= 1;
                }
                TokenKind::Eof => return Err(self.unexpected(&describe(&closer))),
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip to the start of the next logical line after a parse error,
    /// along with any block the broken line opened.
    fn recover(&mut self) {
        while !self.at_line_end() {
            self.advance();
        }
        self.matches(TokenKind::Newline);
        if self.check(TokenKind::Indent) {
            self.skip_block();
        }
    }
}

// ─── Public helpers ──────────────────────────────────────────────────────────

/// Parses one expression (or bare tuple) from source text.
pub fn parse_expression(source: &str) -> Result<Expr, Vec<Error>> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse_single_expression().map_err(|e| vec![e])
}

// ─── Conversions ─────────────────────────────────────────────────────────────

fn to_target(expr: &Expr) -> Result<Target, Error> {
    match expr {
        Expr::Name(name, _) => Ok(Target::Name(name.clone())),
        Expr::Tuple(items, _) | Expr::List(items, _) => {
            Ok(Target::Unpack(items.iter().map(to_target).collect::<Result<_, _>>()?))
        }
        Expr::Attribute { .. } | Expr::Subscript { .. } | Expr::Unsupported("Starred", _) => {
            Ok(Target::Other(expr.clone()))
        }
        other => {
            let span = other.span();
            Err(Error::new(ErrorCode::P003, span.line, span.column,
                format!("cannot assign to {other}")))
        }
    }
}

fn augmented_op(kind: &TokenKind) -> BinOp {
    match kind {
        TokenKind::MinusEq => BinOp::Sub,
        TokenKind::StarEq => BinOp::Mul,
        TokenKind::DoubleStarEq => BinOp::Pow,
        TokenKind::SlashEq => BinOp::Div,
        TokenKind::DoubleSlashEq => BinOp::FloorDiv,
        TokenKind::PercentEq => BinOp::Mod,
        TokenKind::AtEq => BinOp::MatMul,
        TokenKind::AmpEq => BinOp::BitAnd,
        TokenKind::PipeEq => BinOp::BitOr,
        TokenKind::CaretEq => BinOp::BitXor,
        TokenKind::LtLtEq => BinOp::LShift,
        TokenKind::GtGtEq => BinOp::RShift,
        _ => BinOp::Add,
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Int(i) => format!("integer `{i}`"),
        TokenKind::Float(x) => format!("number `{x}`"),
        TokenKind::Str(_) | TokenKind::FString(_) => "string".into(),
        TokenKind::Ident(name) => format!("name `{name}`"),
        TokenKind::Newline => "end of line".into(),
        TokenKind::Indent => "indent".into(),
        TokenKind::Dedent => "dedent".into(),
        TokenKind::Eof => "end of input".into(),
        other => format!("`{}`", other.lexeme().unwrap_or("?")),
    }
}

fn token_text(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Int(i) => i.to_string(),
        TokenKind::Float(x) => crate::runtime::value::format_float(*x),
        TokenKind::Str(s) => crate::runtime::value::quote_str(s),
        TokenKind::FString(s) => format!("f\"{s}\""),
        TokenKind::Ident(name) => name.clone(),
        other => other.lexeme().unwrap_or("").to_string(),
    }
}

fn needs_space(prev: &TokenKind, next: &TokenKind) -> bool {
    let tight_before = matches!(
        next,
        TokenKind::Dot | TokenKind::Comma | TokenKind::Colon | TokenKind::RParen
            | TokenKind::RBracket | TokenKind::LParen | TokenKind::LBracket
    );
    let tight_after = matches!(prev, TokenKind::Dot | TokenKind::LParen | TokenKind::LBracket | TokenKind::At);
    let call_paren = matches!(next, TokenKind::LParen | TokenKind::LBracket)
        && !matches!(prev, TokenKind::Ident(_) | TokenKind::RParen | TokenKind::RBracket);
    call_paren || !(tight_before || tight_after)
}

// ─── f-strings ───────────────────────────────────────────────────────────────

/// Splits an f-string body into literal runs and `{expr!conv:spec}` fields.
/// `depth` is the nesting level of the enclosing expression.
pub(crate) fn parse_fstring(body: &str, line: usize, column: usize, depth: usize) -> Result<Vec<FStringPart>, Error> {
    let err = |msg: &str| Error::new(ErrorCode::P004, line, column, format!("f-string: {msg}"));
    if depth >= MAX_NESTING {
        return Err(err("expressions nested too deeply"));
    }
    let chars: Vec<char> = body.chars().collect();
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '{' if chars.get(i + 1) == Some(&'{') => { literal.push('{'); i += 2; }
            '}' if chars.get(i + 1) == Some(&'}') => { literal.push('}'); i += 2; }
            '}' => return Err(err("single '}' is not allowed")),
            '{' => {
                let field_start = i + 1;
                let expr_end = scan_field_expr(&chars, field_start).ok_or_else(|| err("expecting '}'"))?;
                let mut source: String = chars[field_start..expr_end].iter().collect();
                i = expr_end;

                // `{x=}` prints the expression text before the value
                let mut debug_label = None;
                let trimmed = source.trim_end();
                if trimmed.ends_with('=')
                    && !["==", "!=", "<=", ">="].iter().any(|op| trimmed.ends_with(op))
                {
                    debug_label = Some(source.clone());
                    source = trimmed[..trimmed.len() - 1].to_string();
                }

                if source.trim().is_empty() {
                    return Err(err("empty expression not allowed"));
                }

                let mut conversion = None;
                if chars.get(i) == Some(&'!') {
                    let c = chars.get(i + 1).copied().ok_or_else(|| err("missing conversion"))?;
                    if !matches!(c, 'r' | 's' | 'a') {
                        return Err(err("invalid conversion character"));
                    }
                    conversion = Some(c);
                    i += 2;
                }

                let mut spec = Vec::new();
                if chars.get(i) == Some(&':') {
                    let spec_start = i + 1;
                    let spec_end = scan_spec(&chars, spec_start).ok_or_else(|| err("expecting '}'"))?;
                    let spec_src: String = chars[spec_start..spec_end].iter().collect();
                    spec = parse_fstring(&spec_src, line, column, depth + 1)?;
                    i = spec_end;
                }

                if chars.get(i) != Some(&'}') {
                    return Err(err("expecting '}'"));
                }
                i += 1;

                let tokens = Lexer::nested(&source, line, column)
                    .tokenize()
                    .map_err(|errs| err(&errs.first().map(|e| e.message.clone()).unwrap_or_default()))?;
                let expr = Parser { tokens, pos: 0, depth: depth + 1 }.parse_single_expression()
                    .map_err(|e| err(&e.message))?;

                if let Some(label) = debug_label {
                    literal.push_str(&label);
                    if conversion.is_none() && spec.is_empty() {
                        conversion = Some('r');
                    }
                }
                if !literal.is_empty() {
                    parts.push(FStringPart::Literal(std::mem::take(&mut literal)));
                }
                parts.push(FStringPart::Field {
                    expr: Box::new(expr),
                    conversion,
                    spec,
                    source: source.trim().to_string(),
                });
            }
            c => { literal.push(c); i += 1; }
        }
    }
    if !literal.is_empty() {
        parts.push(FStringPart::Literal(literal));
    }
    Ok(parts)
}

/// Finds the end of a replacement-field expression: the first top-level
/// `}`, `:` or `!` (not `!=`) outside brackets and quotes.
fn scan_field_expr(chars: &[char], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut i = start;
    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            if c == q { quote = None; }
        } else {
            match c {
                '\'' | '"' => quote = Some(c),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                '}' if depth == 0 => return Some(i),
                '}' => depth -= 1,
                ':' if depth == 0 => return Some(i),
                '!' if depth == 0 && chars.get(i + 1) != Some(&'=') => return Some(i),
                _ => {}
            }
        }
        i += 1;
    }
    None
}

/// Finds the `}` closing a format spec, allowing nested `{...}` fields.
fn scan_spec(chars: &[char], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, &c) in chars.iter().enumerate().skip(start) {
        match c {
            '{' => depth += 1,
            '}' if depth == 0 => return Some(i),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn merge_literals(parts: Vec<FStringPart>) -> Vec<FStringPart> {
    let mut merged: Vec<FStringPart> = Vec::with_capacity(parts.len());
    for part in parts {
        match (merged.last_mut(), part) {
            (Some(FStringPart::Literal(prev)), FStringPart::Literal(next)) => prev.push_str(&next),
            (_, part) => merged.push(part),
        }
    }
    merged
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Module {
        let tokens = Lexer::new(src).tokenize().expect("lex failed");
        Parser::new(tokens).parse().expect("parse failed")
    }

    fn parse_expr_src(src: &str) -> Expr {
        parse_expression(src).expect("parse_expression failed")
    }

    fn parse_err(src: &str) -> Vec<Error> {
        let tokens = Lexer::new(src).tokenize().expect("lex failed");
        Parser::new(tokens).parse().expect_err("expected parse error")
    }

    // ── assignments ─────────────────────────────────────────────────────────

    #[test]
    fn simple_assignment() {
        let m = parse("x = 42");
        match &m.body[0] {
            Stmt::Assign { targets, value: Expr::Int(42, _), .. } => {
                assert!(matches!(&targets[..], [Target::Name(n)] if n == "x"));
            }
            other => panic!("expected Assign, got {other:?}"),
        }
    }

    #[test]
    fn chained_assignment() {
        let m = parse("a = b = 0");
        match &m.body[0] {
            Stmt::Assign { targets, .. } => assert_eq!(targets.len(), 2),
            other => panic!("expected Assign, got {other:?}"),
        }
    }

    #[test]
    fn tuple_unpack_assignment() {
        let m = parse("a, b = 1, 2");
        match &m.body[0] {
            Stmt::Assign { targets, value: Expr::Tuple(items, _), .. } => {
                assert!(matches!(&targets[0], Target::Unpack(t) if t.len() == 2));
                assert_eq!(items.len(), 2);
            }
            other => panic!("expected unpacking Assign, got {other:?}"),
        }
    }

    #[test]
    fn augmented_assignment() {
        let m = parse("total += 5");
        match &m.body[0] {
            Stmt::AugAssign { target: Target::Name(n), op: BinOp::Add, .. } => assert_eq!(n, "total"),
            other => panic!("expected AugAssign, got {other:?}"),
        }
    }

    #[test]
    fn annotated_assignment() {
        let m = parse("x: int = 5\ny: str");
        assert!(matches!(&m.body[0], Stmt::Assign { .. }));
        assert!(matches!(&m.body[1], Stmt::Pass { .. }));
    }

    #[test]
    fn subscript_target_is_kept() {
        let m = parse("xs[0] = 1");
        match &m.body[0] {
            Stmt::Assign { targets, .. } => assert!(matches!(targets[0], Target::Other(_))),
            other => panic!("expected Assign, got {other:?}"),
        }
    }

    #[test]
    fn literal_target_is_error() {
        let errs = parse_err("1 = x");
        assert_eq!(errs[0].code, ErrorCode::P003);
    }

    #[test]
    fn semicolons_split_statements() {
        let m = parse("a = 1; b = 2;");
        assert_eq!(m.body.len(), 2);
    }

    // ── compound statements ─────────────────────────────────────────────────

    #[test]
    fn if_elif_else_chain() {
        let m = parse("if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n");
        match &m.body[0] {
            Stmt::If { orelse, .. } => match &orelse[..] {
                [Stmt::If { orelse: inner, .. }] => assert_eq!(inner.len(), 1),
                other => panic!("expected nested elif, got {other:?}"),
            },
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn single_line_suites() {
        let m = parse("if 5 > 3: a = 1\nelse: a = 2");
        match &m.body[0] {
            Stmt::If { body, orelse, .. } => {
                assert_eq!(body.len(), 1);
                assert_eq!(orelse.len(), 1);
            }
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn for_with_tuple_target() {
        let m = parse("for i, x in pairs:\n    print(i)\n");
        match &m.body[0] {
            Stmt::For { target: Target::Unpack(t), body, .. } => {
                assert_eq!(t.len(), 2);
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected For, got {other:?}"),
        }
    }

    #[test]
    fn while_with_else() {
        let m = parse("while n > 0:\n    n -= 1\nelse:\n    done = True\n");
        match &m.body[0] {
            Stmt::While { orelse, .. } => assert_eq!(orelse.len(), 1),
            other => panic!("expected While, got {other:?}"),
        }
    }

    #[test]
    fn def_records_params() {
        let m = parse("def add(a, b=2, *rest, **kw) -> int:\n    return a + b\n");
        match &m.body[0] {
            Stmt::FunctionDef { name, params, body, .. } => {
                assert_eq!(name, "add");
                assert_eq!(params, &["a", "b", "*rest", "**kw"]);
                assert!(matches!(body[0], Stmt::Return { .. }));
            }
            other => panic!("expected FunctionDef, got {other:?}"),
        }
    }

    #[test]
    fn unsupported_statements_keep_header() {
        let m = parse("import math\nclass Foo(Base):\n    x = 1\n    def f(self): pass\ny = 2\n");
        assert_eq!(m.body.len(), 3);
        match &m.body[0] {
            Stmt::Unsupported { keyword, text, .. } => {
                assert_eq!(keyword, "import");
                assert_eq!(text, "import math");
            }
            other => panic!("expected Unsupported, got {other:?}"),
        }
        match &m.body[1] {
            Stmt::Unsupported { text, .. } => assert_eq!(text, "class Foo(Base):"),
            other => panic!("expected Unsupported, got {other:?}"),
        }
        assert!(matches!(&m.body[2], Stmt::Assign { .. }));
    }

    #[test]
    fn try_except_blocks_skipped() {
        let m = parse("try:\n    x = 1\nexcept ValueError as e:\n    x = 2\nfinally:\n    pass\n");
        assert_eq!(m.body.len(), 3);
        assert!(m.body.iter().all(|s| matches!(s, Stmt::Unsupported { .. })));
    }

    #[test]
    fn missing_indent_is_error() {
        let errs = parse_err("if x:\ny = 1\n");
        assert_eq!(errs[0].code, ErrorCode::P001);
    }

    #[test]
    fn unexpected_indent_is_error() {
        let errs = parse_err("x = 1\n    y = 2\n");
        assert!(!errs.is_empty());
    }

    #[test]
    fn errors_are_collected_per_line() {
        let errs = parse_err("x = (1 +\n)\ny = = 2\nz = 3 4\n");
        assert!(errs.len() >= 2);
    }

    // ── expressions ─────────────────────────────────────────────────────────

    #[test]
    fn power_is_right_associative() {
        match parse_expr_src("2 ** 3 ** 2") {
            Expr::BinOp { op: BinOp::Pow, right, .. } => {
                assert!(matches!(*right, Expr::BinOp { op: BinOp::Pow, .. }));
            }
            other => panic!("expected Pow, got {other:?}"),
        }
    }

    #[test]
    fn unary_minus_binds_looser_than_power() {
        match parse_expr_src("-2 ** 2") {
            Expr::UnaryOp { op: UnaryOp::Neg, operand, .. } => {
                assert!(matches!(*operand, Expr::BinOp { op: BinOp::Pow, .. }));
            }
            other => panic!("expected Neg, got {other:?}"),
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(parse_expr_src("1 + 2 * 3").to_string(), "1 + 2 * 3");
        assert_eq!(parse_expr_src("(1 + 2) * 3").to_string(), "(1 + 2) * 3");
    }

    #[test]
    fn chained_comparison() {
        match parse_expr_src("a < b <= c") {
            Expr::Compare { ops, comparators, .. } => {
                assert_eq!(ops, vec![CmpOp::Lt, CmpOp::LtEq]);
                assert_eq!(comparators.len(), 2);
            }
            other => panic!("expected Compare, got {other:?}"),
        }
    }

    #[test]
    fn not_in_and_is_not() {
        match parse_expr_src("x not in xs") {
            Expr::Compare { ops, .. } => assert_eq!(ops, vec![CmpOp::NotIn]),
            other => panic!("expected Compare, got {other:?}"),
        }
        match parse_expr_src("x is not None") {
            Expr::Compare { ops, .. } => assert_eq!(ops, vec![CmpOp::IsNot]),
            other => panic!("expected Compare, got {other:?}"),
        }
    }

    #[test]
    fn bool_ops_collect_operands() {
        match parse_expr_src("a and b and c") {
            Expr::BoolOp { op: BoolOp::And, values, .. } => assert_eq!(values.len(), 3),
            other => panic!("expected BoolOp, got {other:?}"),
        }
    }

    #[test]
    fn conditional_expression() {
        assert!(matches!(parse_expr_src("a if c else b"), Expr::IfExp { .. }));
    }

    #[test]
    fn call_with_keywords() {
        match parse_expr_src("print(a, b, sep='-')") {
            Expr::Call { args, keywords, .. } => {
                assert_eq!(args.len(), 2);
                assert_eq!(keywords[0].0, "sep");
            }
            other => panic!("expected Call, got {other:?}"),
        }
    }

    #[test]
    fn collections() {
        assert!(matches!(parse_expr_src("[1, 2, 3]"), Expr::List(ref v, _) if v.len() == 3));
        assert!(matches!(parse_expr_src("(1,)"), Expr::Tuple(ref v, _) if v.len() == 1));
        assert!(matches!(parse_expr_src("()"), Expr::Tuple(ref v, _) if v.is_empty()));
        assert!(matches!(parse_expr_src("{'a': 1, 'b': 2}"), Expr::Dict(ref v, _) if v.len() == 2));
        assert!(matches!(parse_expr_src("{1, 2}"), Expr::Unsupported("Set", _)));
    }

    #[test]
    fn comprehensions_and_lambdas_are_unsupported_nodes() {
        assert!(matches!(parse_expr_src("[x * 2 for x in xs if x]"), Expr::Unsupported("ListComp", _)));
        assert!(matches!(parse_expr_src("lambda a, b=1: a + b"), Expr::Unsupported("Lambda", _)));
        assert!(matches!(parse_expr_src("sum(x for x in xs)"), Expr::Call { .. }));
        assert!(matches!(parse_expr_src("xs[1:3]"), Expr::Subscript { .. }));
    }

    #[test]
    fn adjacent_strings_concatenate() {
        assert!(matches!(parse_expr_src("'a' 'b'"), Expr::Str(ref s, _) if s == "ab"));
    }

    #[test]
    fn fstring_fields() {
        match parse_expr_src(r#"f"y={y} and {{braces}}""#) {
            Expr::FString(parts, _) => {
                assert_eq!(parts.len(), 3);
                assert!(matches!(&parts[0], FStringPart::Literal(s) if s == "y="));
                assert!(matches!(&parts[2], FStringPart::Literal(s) if s == " and {braces}"));
            }
            other => panic!("expected FString, got {other:?}"),
        }
    }

    #[test]
    fn fstring_spec_and_conversion() {
        match parse_expr_src(r#"f"{value!r:>{width}}""#) {
            Expr::FString(parts, _) => match &parts[0] {
                FStringPart::Field { conversion, spec, .. } => {
                    assert_eq!(*conversion, Some('r'));
                    assert_eq!(spec.len(), 2);
                }
                other => panic!("expected Field, got {other:?}"),
            },
            other => panic!("expected FString, got {other:?}"),
        }
    }

    #[test]
    fn fstring_debug_specifier() {
        match parse_expr_src(r#"f"{x=}""#) {
            Expr::FString(parts, _) => {
                assert!(matches!(&parts[0], FStringPart::Literal(s) if s == "x="));
                assert!(matches!(&parts[1], FStringPart::Field { conversion: Some('r'), .. }));
            }
            other => panic!("expected FString, got {other:?}"),
        }
    }

    #[test]
    fn fstring_single_brace_is_error() {
        let errs = parse_expression(r#"f"oops}""#).unwrap_err();
        assert_eq!(errs[0].code, ErrorCode::P004);
    }

    #[test]
    fn expressions_render_as_source() {
        assert_eq!(parse_expr_src("x>5 and not y").to_string(), "x > 5 and not y");
        assert_eq!(parse_expr_src("range(0,10,2)").to_string(), "range(0, 10, 2)");
        assert_eq!(parse_expr_src("d['k']").to_string(), "d['k']");
        assert_eq!(parse_expr_src("-(a+b)").to_string(), "-(a + b)");
    }

    // ── nesting ─────────────────────────────────────────────────────────────

    fn nesting_errors(src: &str) -> Vec<Error> {
        let errs = parse_err(src);
        assert!(errs.iter().any(|e| e.code == ErrorCode::P005), "expected P005, got {errs:?}");
        errs
    }

    #[test]
    fn moderate_nesting_parses() {
        let src = format!("{}1{}", "(".repeat(60), ")".repeat(60));
        assert!(matches!(parse_expr_src(&src), Expr::Int(1, _)));
        assert!(matches!(parse_expr_src(&format!("{}1", "-".repeat(60))), Expr::UnaryOp { .. }));
    }

    #[test]
    fn deep_expressions_are_syntax_errors() {
        nesting_errors(&format!("x = {}1{}", "(".repeat(5000), ")".repeat(5000)));
        nesting_errors(&format!("x = {}1", "-".repeat(200_000)));
        nesting_errors(&format!("x = {}True", "not ".repeat(500)));
        nesting_errors(&format!("x = {}2", "2 ** ".repeat(500)));
        nesting_errors(&format!("x = {}1{}", "[".repeat(500), "]".repeat(500)));
    }

    #[test]
    fn deep_blocks_are_syntax_errors() {
        let mut src = String::new();
        for level in 0..150 {
            src.push_str(&format!("{}if x:\n", "    ".repeat(level)));
        }
        src.push_str(&format!("{}pass\n", "    ".repeat(150)));
        let errs = nesting_errors(&src);
        assert_eq!(errs[0].line, MAX_NESTING + 1);
    }

    #[test]
    fn nesting_resets_after_an_error() {
        let src = format!("x = {}1\ny = (((2)))\n", "-".repeat(1000));
        let errs = nesting_errors(&src);
        assert!(errs.iter().all(|e| e.line == 1), "{errs:?}");
    }
}
