//! Tokenizer for declarative-function strings (`fn:Name(args...)`), links and
//! literal values found in Arlington schema columns.
//!
//! Several token patterns overlap: a bare `*` is both a wildcard key name and
//! the multiply operator, `2*` is an array-index wildcard, `3DView` starts like
//! an integer. Matching is therefore an ordered list of anchored candidates and
//! the first candidate that matches at the cursor wins. The order of
//! `PATTERNS` is part of the grammar.

use std::fmt;

use once_cell::sync::Lazy;
use ordered_float::OrderedFloat;
use regex::Regex;
use thiserror::Error;

// ------------------------------- Tokens ---------------------------------- //

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    FuncName,
    PdfTrue,
    PdfFalse,
    PdfString,
    Mod,
    Ellipsis,
    KeyValue,
    KeyPath,
    KeyName,
    PdfPath,
    ArrayStart,
    ArrayEnd,
    Eq,
    Ne,
    Ge,
    Le,
    LogicalAnd,
    LogicalOr,
    Gt,
    Lt,
    Real,
    Integer,
    Plus,
    Minus,
    Times,
    Divide,
    LParen,
    RParen,
    Comma,
}

impl TokenKind {
    pub fn is_comparison(self) -> bool {
        matches!(self, Self::Eq | Self::Ne | Self::Ge | Self::Le | Self::Gt | Self::Lt)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Self::LogicalAnd | Self::LogicalOr)
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(self, Self::Plus | Self::Minus | Self::Times | Self::Divide | Self::Mod)
    }

    pub fn is_operator(self) -> bool {
        self.is_comparison() || self.is_logical() || self.is_arithmetic()
    }
}

/// Parsed value carried by literal-bearing tokens.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Literal {
    Integer(i64),
    Real(OrderedFloat<f64>),
    Bool(bool),
    String(String),
    KeyName(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Token {
    pub kind: TokenKind,
    pub raw: String,
    /// Only set for `Integer`, `Real`, `PdfTrue`/`PdfFalse`, `PdfString` and `KeyName`.
    pub literal: Option<Literal>,
}

impl Token {
    pub fn new(kind: TokenKind, raw: impl Into<String>) -> Self {
        Self { kind, raw: raw.into(), literal: None }
    }

    /// Function name without the `fn:` prefix and trailing `(`.
    pub fn function_name(&self) -> Option<&str> {
        if self.kind != TokenKind::FuncName {
            return None;
        }
        self.raw.strip_prefix("fn:").and_then(|s| s.strip_suffix('('))
    }

    pub fn as_integer(&self) -> Option<i64> {
        match &self.literal {
            Some(Literal::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn as_key_name(&self) -> Option<&str> {
        match &self.literal {
            Some(Literal::KeyName(s)) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unrecognized input at offset {offset}: `{rest}`")]
    Unrecognized { offset: usize, rest: String },
    #[error("numeric literal `{raw}` is out of range")]
    NumberOutOfRange { raw: String },
}

// ------------------------------ Patterns --------------------------------- //

/// `Word` candidates must not run straight into an identifier character, so
/// `trueType` or `modDate` fall through to `KeyName`.
#[derive(Clone, Copy, Debug)]
enum Boundary {
    Free,
    Word,
}

const PATTERNS: &[(TokenKind, &str, Boundary)] = &[
    (TokenKind::FuncName,   r"fn:[A-Z][a-zA-Z0-9]+\(", Boundary::Free),
    (TokenKind::PdfTrue,    r"(?i:true)", Boundary::Word),
    (TokenKind::PdfFalse,   r"(?i:false)", Boundary::Word),
    (TokenKind::PdfString,  r"'[^']+'", Boundary::Free),
    (TokenKind::Mod,        r"mod", Boundary::Word),
    (TokenKind::Ellipsis,   r"\.\.\.", Boundary::Free),
    (TokenKind::KeyValue,   r"@(\*|[0-9]+\*|[a-zA-Z0-9_.\-]+)", Boundary::Free),
    (TokenKind::KeyPath,    r"(parent::)?(([a-zA-Z]|[a-zA-Z][0-9]*|[0-9]*\*|[0-9]*[a-zA-Z])[a-zA-Z0-9_.\-]*::)+", Boundary::Free),
    (TokenKind::KeyName,    r"([_a-zA-Z]|[_a-zA-Z][0-9]*|[0-9]*\*|[0-9]*[_a-zA-Z])[a-zA-Z0-9_:.\-]*", Boundary::Free),
    (TokenKind::PdfPath,    r"::", Boundary::Free),
    (TokenKind::ArrayStart, r"\[", Boundary::Free),
    (TokenKind::ArrayEnd,   r"\]", Boundary::Free),
    (TokenKind::Eq,         r"==", Boundary::Free),
    (TokenKind::Ne,         r"!=", Boundary::Free),
    (TokenKind::Ge,         r">=", Boundary::Free),
    (TokenKind::Le,         r"<=", Boundary::Free),
    (TokenKind::LogicalAnd, r"&&", Boundary::Free),
    (TokenKind::LogicalOr,  r"\|\|", Boundary::Free),
    (TokenKind::Gt,         r">", Boundary::Free),
    (TokenKind::Lt,         r"<", Boundary::Free),
    (TokenKind::Real,       r"-?[0-9]+\.[0-9]+", Boundary::Free),
    (TokenKind::Integer,    r"-?[0-9]+", Boundary::Free),
    (TokenKind::Plus,       r"\+", Boundary::Free),
    (TokenKind::Minus,      r"-", Boundary::Free),
    (TokenKind::Times,      r"\*", Boundary::Free),
    (TokenKind::Divide,     r"/", Boundary::Free),
    (TokenKind::LParen,     r"\(", Boundary::Free),
    (TokenKind::RParen,     r"\)", Boundary::Free),
    (TokenKind::Comma,      r",", Boundary::Free),
];

struct Candidate {
    kind: TokenKind,
    regex: Regex,
    boundary: Boundary,
}

static CANDIDATES: Lazy<Vec<Candidate>> = Lazy::new(|| {
    PATTERNS
        .iter()
        .map(|(kind, pattern, boundary)| Candidate {
            kind: *kind,
            regex: Regex::new(&format!("^(?:{pattern})")).unwrap(),
            boundary: *boundary,
        })
        .collect()
});

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

// -------------------------------- Lexer ---------------------------------- //

/// Tokenize a complete column value. Whitespace between tokens is ignored.
pub fn tokenize(src: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < src.len() {
        let rest = &src[pos..];
        let trimmed = rest.trim_start();
        if trimmed.is_empty() {
            break;
        }
        pos += rest.len() - trimmed.len();

        let (kind, len) = next_match(trimmed).ok_or_else(|| LexError::Unrecognized {
            offset: pos,
            rest: trimmed.to_string(),
        })?;
        let raw = &trimmed[..len];
        tokens.push(make_token(kind, raw)?);
        pos += len;
    }

    Ok(tokens)
}

fn next_match(input: &str) -> Option<(TokenKind, usize)> {
    CANDIDATES.iter().find_map(|c| {
        let m = c.regex.find(input)?;
        if m.end() == 0 {
            return None;
        }
        if let Boundary::Word = c.boundary {
            if input[m.end()..].chars().next().is_some_and(is_ident_char) {
                return None;
            }
        }
        Some((c.kind, m.end()))
    })
}

fn make_token(kind: TokenKind, raw: &str) -> Result<Token, LexError> {
    let out_of_range = || LexError::NumberOutOfRange { raw: raw.to_string() };
    let literal = match kind {
        TokenKind::Integer => Some(Literal::Integer(raw.parse().map_err(|_| out_of_range())?)),
        TokenKind::Real => {
            let f: f64 = raw.parse().map_err(|_| out_of_range())?;
            if !f.is_finite() {
                return Err(out_of_range());
            }
            Some(Literal::Real(OrderedFloat(f)))
        }
        TokenKind::PdfTrue => Some(Literal::Bool(true)),
        TokenKind::PdfFalse => Some(Literal::Bool(false)),
        TokenKind::PdfString => Some(Literal::String(raw[1..raw.len() - 1].to_string())),
        TokenKind::KeyName => Some(Literal::KeyName(raw.to_string())),
        _ => None,
    };
    Ok(Token { kind, raw: raw.to_string(), literal })
}

// ------------------------------- Tests ------------------------------------ //
