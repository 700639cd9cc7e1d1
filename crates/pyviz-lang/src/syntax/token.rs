#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Int(i64),
    Float(f64),
    Str(String),
    FString(String), // raw body, split into parts by the parser
    Ident(String),

    // Keywords the interpreter understands
    True,
    False,
    None,
    And,
    Or,
    Not,
    In,
    Is,
    If,
    Elif,
    Else,
    For,
    While,
    Def,
    Return,
    Pass,
    Break,
    Continue,
    Lambda,

    // Keywords that only introduce unsupported statements
    Import,
    From,
    Class,
    Try,
    Except,
    Finally,
    With,
    As,
    Del,
    Global,
    Nonlocal,
    Raise,
    Assert,
    Async,
    Await,
    Yield,

    // Operators
    Plus,        // +
    Minus,       // -
    Star,        // *
    DoubleStar,  // **
    Slash,       // /
    DoubleSlash, // //
    Percent,     // %
    At,          // @
    Amp,         // &
    Pipe,        // |
    Caret,       // ^
    Tilde,       // ~
    LtLt,        // <<
    GtGt,        // >>
    Walrus,      // :=

    // Augmented assignment
    PlusEq,        // +=
    MinusEq,       // -=
    StarEq,        // *=
    DoubleStarEq,  // **=
    SlashEq,       // /=
    DoubleSlashEq, // //=
    PercentEq,     // %=
    AtEq,          // @=
    AmpEq,         // &=
    PipeEq,        // |=
    CaretEq,       // ^=
    LtLtEq,        // <<=
    GtGtEq,        // >>=

    // Comparison
    Eq,     // =
    EqEq,   // ==
    BangEq, // !=
    Lt,     // <
    LtEq,   // <=
    Gt,     // >
    GtEq,   // >=

    // Punctuation
    Arrow,     // ->
    Colon,     // :
    Comma,     // ,
    Semicolon, // ;
    Dot,       // .
    Ellipsis,  // ...
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }
    LBracket,  // [
    RBracket,  // ]

    // Layout
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl TokenKind {
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Self::Int(_) | Self::Float(_) | Self::Str(_) | Self::FString(_)
                | Self::True | Self::False | Self::None
        )
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::EqEq | Self::BangEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
                | Self::In | Self::Is
        )
    }

    pub fn is_augmented_assign(&self) -> bool {
        matches!(
            self,
            Self::PlusEq | Self::MinusEq | Self::StarEq | Self::DoubleStarEq | Self::SlashEq
                | Self::DoubleSlashEq | Self::PercentEq | Self::AtEq | Self::AmpEq | Self::PipeEq
                | Self::CaretEq | Self::LtLtEq | Self::GtGtEq
        )
    }

    /// Keywords that begin a statement the interpreter does not model.
    pub fn is_unsupported_keyword(&self) -> bool {
        matches!(
            self,
            Self::Import | Self::From | Self::Class | Self::Try | Self::Except | Self::Finally
                | Self::With | Self::Del | Self::Global | Self::Nonlocal | Self::Raise
                | Self::Assert | Self::Async | Self::Yield
        )
    }

    /// Source spelling of keyword and operator tokens; `None` for literals and layout.
    pub fn lexeme(&self) -> Option<&'static str> {
        let s = match self {
            Self::True => "True",
            Self::False => "False",
            Self::None => "None",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::In => "in",
            Self::Is => "is",
            Self::If => "if",
            Self::Elif => "elif",
            Self::Else => "else",
            Self::For => "for",
            Self::While => "while",
            Self::Def => "def",
            Self::Return => "return",
            Self::Pass => "pass",
            Self::Break => "break",
            Self::Continue => "continue",
            Self::Lambda => "lambda",
            Self::Import => "import",
            Self::From => "from",
            Self::Class => "class",
            Self::Try => "try",
            Self::Except => "except",
            Self::Finally => "finally",
            Self::With => "with",
            Self::As => "as",
            Self::Del => "del",
            Self::Global => "global",
            Self::Nonlocal => "nonlocal",
            Self::Raise => "raise",
            Self::Assert => "assert",
            Self::Async => "async",
            Self::Await => "await",
            Self::Yield => "yield",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::DoubleStar => "**",
            Self::Slash => "/",
            Self::DoubleSlash => "//",
            Self::Percent => "%",
            Self::At => "@",
            Self::Amp => "&",
            Self::Pipe => "|",
            Self::Caret => "^",
            Self::Tilde => "~",
            Self::LtLt => "<<",
            Self::GtGt => ">>",
            Self::Walrus => ":=",
            Self::PlusEq => "+=",
            Self::MinusEq => "-=",
            Self::StarEq => "*=",
            Self::DoubleStarEq => "**=",
            Self::SlashEq => "/=",
            Self::DoubleSlashEq => "//=",
            Self::PercentEq => "%=",
            Self::AtEq => "@=",
            Self::AmpEq => "&=",
            Self::PipeEq => "|=",
            Self::CaretEq => "^=",
            Self::LtLtEq => "<<=",
            Self::GtGtEq => ">>=",
            Self::Eq => "=",
            Self::EqEq => "==",
            Self::BangEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Arrow => "->",
            Self::Colon => ":",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::Dot => ".",
            Self::Ellipsis => "...",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LBracket => "[",
            Self::RBracket => "]",
            _ => return None,
        };
        Some(s)
    }
}

/// Maps an identifier string to its keyword token, or returns `Ident`.
pub fn keyword_or_ident(s: String) -> TokenKind {
    match s.as_str() {
        "True"     => TokenKind::True,
        "False"    => TokenKind::False,
        "None"     => TokenKind::None,
        "and"      => TokenKind::And,
        "or"       => TokenKind::Or,
        "not"      => TokenKind::Not,
        "in"       => TokenKind::In,
        "is"       => TokenKind::Is,
        "if"       => TokenKind::If,
        "elif"     => TokenKind::Elif,
        "else"     => TokenKind::Else,
        "for"      => TokenKind::For,
        "while"    => TokenKind::While,
        "def"      => TokenKind::Def,
        "return"   => TokenKind::Return,
        "pass"     => TokenKind::Pass,
        "break"    => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "lambda"   => TokenKind::Lambda,
        "import"   => TokenKind::Import,
        "from"     => TokenKind::From,
        "class"    => TokenKind::Class,
        "try"      => TokenKind::Try,
        "except"   => TokenKind::Except,
        "finally"  => TokenKind::Finally,
        "with"     => TokenKind::With,
        "as"       => TokenKind::As,
        "del"      => TokenKind::Del,
        "global"   => TokenKind::Global,
        "nonlocal" => TokenKind::Nonlocal,
        "raise"    => TokenKind::Raise,
        "assert"   => TokenKind::Assert,
        "async"    => TokenKind::Async,
        "await"    => TokenKind::Await,
        "yield"    => TokenKind::Yield,
        _          => TokenKind::Ident(s),
    }
}

// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }
}
