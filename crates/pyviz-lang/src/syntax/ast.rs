use std::fmt;

/// Source location attached to every node for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

// ─── Top level ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Module {
    pub body: Vec<Stmt>,
}

// ─── Statements ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Stmt {
    /// `x = 1`, `a, b = 1, 2`, `a = b = 0`
    Assign { targets: Vec<Target>, value: Expr, span: Span },
    /// `x += 1`
    AugAssign { target: Target, op: BinOp, value: Expr, span: Span },
    /// Any expression on its own line; `print(...)` lands here.
    Expr { expr: Expr, span: Span },
    /// `for target in iter: body [else: orelse]`
    For { target: Target, iter: Expr, body: Vec<Stmt>, orelse: Vec<Stmt>, span: Span },
    /// `while test: body [else: orelse]`
    While { test: Expr, body: Vec<Stmt>, orelse: Vec<Stmt>, span: Span },
    /// `if test: body [elif ...] [else: orelse]`; elif chains nest in `orelse`.
    If { test: Expr, body: Vec<Stmt>, orelse: Vec<Stmt>, span: Span },
    /// `def name(params): body`: registered by name, never called.
    FunctionDef { name: String, params: Vec<String>, body: Vec<Stmt>, span: Span },
    Return { value: Option<Expr>, span: Span },
    Pass { span: Span },
    Break { span: Span },
    Continue { span: Span },
    /// `import`, `class`, `try`, ... kept as the header text only.
    Unsupported { keyword: String, text: String, span: Span },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Assign { span, .. }
            | Stmt::AugAssign { span, .. }
            | Stmt::Expr { span, .. }
            | Stmt::For { span, .. }
            | Stmt::While { span, .. }
            | Stmt::If { span, .. }
            | Stmt::FunctionDef { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::Pass { span }
            | Stmt::Break { span }
            | Stmt::Continue { span }
            | Stmt::Unsupported { span, .. } => *span,
        }
    }
}

/// Left-hand side of an assignment or a `for` loop.
#[derive(Debug, Clone)]
pub enum Target {
    Name(String),
    /// `a, b` or `[a, b]`
    Unpack(Vec<Target>),
    /// `xs[0]`, `obj.attr`: parsed but not bound by the interpreter.
    Other(Expr),
}

// ─── Expressions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Expr {
    Int(i64, Span),
    Float(f64, Span),
    Str(String, Span),
    Bool(bool, Span),
    NoneLit(Span),
    Name(String, Span),
    BinOp { left: Box<Expr>, op: BinOp, right: Box<Expr>, span: Span },
    UnaryOp { op: UnaryOp, operand: Box<Expr>, span: Span },
    /// `a and b and c`: one node per run of the same operator.
    BoolOp { op: BoolOp, values: Vec<Expr>, span: Span },
    /// `a < b <= c`
    Compare { left: Box<Expr>, ops: Vec<CmpOp>, comparators: Vec<Expr>, span: Span },
    /// `body if test else orelse`
    IfExp { test: Box<Expr>, body: Box<Expr>, orelse: Box<Expr>, span: Span },
    List(Vec<Expr>, Span),
    Tuple(Vec<Expr>, Span),
    Dict(Vec<(Expr, Expr)>, Span),
    Call { func: Box<Expr>, args: Vec<Expr>, keywords: Vec<(String, Expr)>, span: Span },
    Attribute { value: Box<Expr>, attr: String, span: Span },
    Subscript { value: Box<Expr>, index: Box<Expr>, span: Span },
    FString(Vec<FStringPart>, Span),
    /// Parsed for syntax only: lambda, comprehension, set, slice, starred, ...
    Unsupported(&'static str, Span),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Int(_, s)
            | Expr::Float(_, s)
            | Expr::Str(_, s)
            | Expr::Bool(_, s)
            | Expr::NoneLit(s)
            | Expr::Name(_, s)
            | Expr::List(_, s)
            | Expr::Tuple(_, s)
            | Expr::Dict(_, s)
            | Expr::FString(_, s)
            | Expr::Unsupported(_, s) => *s,
            Expr::BinOp { span, .. }
            | Expr::UnaryOp { span, .. }
            | Expr::BoolOp { span, .. }
            | Expr::Compare { span, .. }
            | Expr::IfExp { span, .. }
            | Expr::Call { span, .. }
            | Expr::Attribute { span, .. }
            | Expr::Subscript { span, .. } => *span,
        }
    }

    /// Name of a plain `name(...)` callee.
    pub fn callee_name(&self) -> Option<&str> {
        match self {
            Expr::Call { func, .. } => match func.as_ref() {
                Expr::Name(name, _) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum FStringPart {
    Literal(String),
    Field {
        expr: Box<Expr>,
        conversion: Option<char>,
        /// The format spec is itself an f-string, so `{x:{width}}` works.
        spec: Vec<FStringPart>,
        /// Source text of the field, used when rendering the expression back.
        source: String,
    },
}

// ─── Operators ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add, Sub, Mul, Div, FloorDiv, Mod, Pow, MatMul,
    BitAnd, BitOr, BitXor, LShift, RShift,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::MatMul => "@",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::LShift => "<<",
            BinOp::RShift => ">>",
        }
    }

    /// Binding strength used when rendering; higher binds tighter.
    fn precedence(self) -> u8 {
        match self {
            BinOp::BitOr => 4,
            BinOp::BitXor => 5,
            BinOp::BitAnd => 6,
            BinOp::LShift | BinOp::RShift => 7,
            BinOp::Add | BinOp::Sub => 8,
            BinOp::Mul | BinOp::Div | BinOp::FloorDiv | BinOp::Mod | BinOp::MatMul => 9,
            BinOp::Pow => 11,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp { Pos, Neg, Not, Invert }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp { And, Or }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp { Eq, NotEq, Lt, LtEq, Gt, GtEq, In, NotIn, Is, IsNot }

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtEq => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtEq => ">=",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
            CmpOp::Is => "is",
            CmpOp::IsNot => "is not",
        }
    }
}

// ─── Rendering ───────────────────────────────────────────────────────────────
//
// Expressions print back as Python source. Labels for conditions, loop
// headers and call echoes are built from this.

impl Expr {
    fn precedence(&self) -> u8 {
        match self {
            Expr::IfExp { .. } => 0,
            Expr::BoolOp { op: BoolOp::Or, .. } => 1,
            Expr::BoolOp { op: BoolOp::And, .. } => 2,
            Expr::UnaryOp { op: UnaryOp::Not, .. } => 3,
            Expr::Compare { .. } => 3,
            Expr::BinOp { op, .. } => op.precedence(),
            Expr::UnaryOp { .. } => 10,
            _ => 12,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        if self.precedence() < min { write!(f, "({self})") } else { write!(f, "{self}") }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 { write!(f, ", ")?; }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int(i, _) => write!(f, "{i}"),
            Expr::Float(x, _) => write!(f, "{}", crate::runtime::value::format_float(*x)),
            Expr::Str(s, _) => write!(f, "{}", crate::runtime::value::quote_str(s)),
            Expr::Bool(b, _) => write!(f, "{}", if *b { "True" } else { "False" }),
            Expr::NoneLit(_) => write!(f, "None"),
            Expr::Name(n, _) => write!(f, "{n}"),
            Expr::BinOp { left, op, right, .. } => {
                let p = op.precedence();
                // ** is right-associative
                let (lp, rp) = if *op == BinOp::Pow { (p + 1, p) } else { (p, p + 1) };
                left.fmt_operand(f, lp)?;
                write!(f, " {} ", op.symbol())?;
                right.fmt_operand(f, rp)
            }
            Expr::UnaryOp { op, operand, .. } => match op {
                UnaryOp::Not => { write!(f, "not ")?; operand.fmt_operand(f, 3) }
                UnaryOp::Neg => { write!(f, "-")?; operand.fmt_operand(f, 10) }
                UnaryOp::Pos => { write!(f, "+")?; operand.fmt_operand(f, 10) }
                UnaryOp::Invert => { write!(f, "~")?; operand.fmt_operand(f, 10) }
            },
            Expr::BoolOp { op, values, .. } => {
                let (word, p) = match op { BoolOp::And => ("and", 2), BoolOp::Or => ("or", 1) };
                for (i, v) in values.iter().enumerate() {
                    if i > 0 { write!(f, " {word} ")?; }
                    v.fmt_operand(f, p + 1)?;
                }
                Ok(())
            }
            Expr::Compare { left, ops, comparators, .. } => {
                left.fmt_operand(f, 4)?;
                for (op, rhs) in ops.iter().zip(comparators) {
                    write!(f, " {} ", op.symbol())?;
                    rhs.fmt_operand(f, 4)?;
                }
                Ok(())
            }
            Expr::IfExp { test, body, orelse, .. } => {
                body.fmt_operand(f, 1)?;
                write!(f, " if ")?;
                test.fmt_operand(f, 1)?;
                write!(f, " else {orelse}")
            }
            Expr::List(items, _) => {
                write!(f, "[")?;
                write_joined(f, items)?;
                write!(f, "]")
            }
            Expr::Tuple(items, _) => {
                write!(f, "(")?;
                write_joined(f, items)?;
                if items.len() == 1 { write!(f, ",")?; }
                write!(f, ")")
            }
            Expr::Dict(pairs, _) => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Expr::Call { func, args, keywords, .. } => {
                func.fmt_operand(f, 12)?;
                write!(f, "(")?;
                write_joined(f, args)?;
                for (i, (name, value)) in keywords.iter().enumerate() {
                    if i > 0 || !args.is_empty() { write!(f, ", ")?; }
                    write!(f, "{name}={value}")?;
                }
                write!(f, ")")
            }
            Expr::Attribute { value, attr, .. } => {
                value.fmt_operand(f, 12)?;
                write!(f, ".{attr}")
            }
            Expr::Subscript { value, index, .. } => {
                value.fmt_operand(f, 12)?;
                write!(f, "[{index}]")
            }
            Expr::FString(parts, _) => {
                write!(f, "f\"")?;
                write_fstring_parts(f, parts)?;
                write!(f, "\"")
            }
            Expr::Unsupported(kind, _) => write!(f, "<{kind}>"),
        }
    }
}

fn write_fstring_parts(f: &mut fmt::Formatter<'_>, parts: &[FStringPart]) -> fmt::Result {
    for part in parts {
        match part {
            FStringPart::Literal(s) => write!(f, "{}", s.replace('{', "{{").replace('}', "}}"))?,
            FStringPart::Field { conversion, spec, source, .. } => {
                write!(f, "{{{source}")?;
                if let Some(c) = conversion { write!(f, "!{c}")?; }
                if !spec.is_empty() {
                    write!(f, ":")?;
                    write_fstring_parts(f, spec)?;
                }
                write!(f, "}}")?;
            }
        }
    }
    Ok(())
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Name(n) => write!(f, "{n}"),
            Target::Unpack(items) => {
                for (i, t) in items.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{t}")?;
                }
                Ok(())
            }
            Target::Other(e) => write!(f, "{e}"),
        }
    }
}
