//! Shallow nesting of a token stream.
//!
//! Parentheses, brackets and `fn:Name(` calls open a group, the matching close
//! token ends it, commas are dropped. Operators are *not* organised by
//! precedence: `@a==1 && @b==2` stays a flat run of seven leaves inside its
//! enclosing group. Downstream consumers only inspect call arguments and
//! operand/operator alternation, so no deeper tree is built.

use thiserror::Error;

use crate::lexer::{LexError, Token, TokenKind, tokenize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// Top level of one column value.
    Root,
    /// `[FuncName leaf, Args group]`.
    Call,
    Args,
    Paren,
    Bracket,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Group {
    pub kind: GroupKind,
    pub children: Vec<AstNode>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AstNode {
    Leaf(Token),
    Group(Group),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unmatched `{0}`")]
    UnmatchedClose(String),
    #[error("`{open}` closed by `{close}`")]
    MismatchedClose { open: &'static str, close: String },
    #[error("unclosed `{0}` at end of input")]
    Unclosed(&'static str),
}

/// Either front-end stage failing on one column value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredicateError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

// ---------------------------- Accessors ---------------------------------- //

impl AstNode {
    pub fn leaf(&self) -> Option<&Token> {
        match self {
            AstNode::Leaf(t) => Some(t),
            AstNode::Group(_) => None,
        }
    }

    pub fn group(&self) -> Option<&Group> {
        match self {
            AstNode::Group(g) => Some(g),
            AstNode::Leaf(_) => None,
        }
    }

    pub fn is_leaf_of(&self, kind: TokenKind) -> bool {
        self.leaf().is_some_and(|t| t.kind == kind)
    }

    /// `(name, args)` for a function call, name without the `fn:` prefix.
    pub fn as_call(&self) -> Option<(&str, &[AstNode])> {
        let g = self.group()?;
        if g.kind != GroupKind::Call {
            return None;
        }
        let name = g.children.first()?.leaf()?.function_name()?;
        let args = match g.children.get(1) {
            Some(AstNode::Group(Group { kind: GroupKind::Args, children })) => children.as_slice(),
            _ => &[],
        };
        Some((name, args))
    }

    /// Depth-first visit of every node, this one included.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a AstNode)) {
        f(self);
        if let AstNode::Group(g) = self {
            for c in &g.children {
                c.walk(f);
            }
        }
    }

    /// All leaves in source order.
    pub fn leaves(&self) -> Vec<&Token> {
        let mut out = Vec::new();
        self.walk(&mut |n| {
            if let AstNode::Leaf(t) = n {
                out.push(t);
            }
        });
        out
    }

    /// Source-like rendering used in diagnostics.
    pub fn render(&self) -> String {
        match self {
            AstNode::Leaf(t) => t.raw.clone(),
            AstNode::Group(g) => {
                let body = render_run(&g.children);
                match g.kind {
                    GroupKind::Root | GroupKind::Args => body,
                    GroupKind::Call => {
                        let head = g.children.first().map(AstNode::render).unwrap_or_default();
                        let args = g.children.get(1).map(AstNode::render).unwrap_or_default();
                        format!("{head}{args})")
                    }
                    GroupKind::Paren => format!("({body})"),
                    GroupKind::Bracket => format!("[{body}]"),
                }
            }
        }
    }
}

fn is_operator_leaf(n: &AstNode) -> bool {
    n.leaf().is_some_and(|t| t.kind.is_operator())
}

/// Operands are comma separated, operators glue to their neighbours.
fn render_run(children: &[AstNode]) -> String {
    let mut out = String::new();
    for (i, c) in children.iter().enumerate() {
        if i > 0 && !is_operator_leaf(c) && !is_operator_leaf(&children[i - 1]) {
            out.push(',');
        }
        out.push_str(&c.render());
    }
    out
}

// ------------------------------ Parser ----------------------------------- //

fn open_label(kind: GroupKind) -> &'static str {
    match kind {
        GroupKind::Call => "fn:(",
        GroupKind::Paren => "(",
        GroupKind::Bracket => "[",
        GroupKind::Root | GroupKind::Args => "",
    }
}

/// Build the nested form of `tokens`. The result is always a `Root` group.
pub fn nest(tokens: Vec<Token>) -> Result<AstNode, ParseError> {
    // Each frame is the group under construction. A call frame collects its
    // arguments directly and is split into `[name, Args]` on close.
    let mut stack: Vec<(GroupKind, Option<Token>, Vec<AstNode>)> =
        vec![(GroupKind::Root, None, Vec::new())];

    for tok in tokens {
        match tok.kind {
            TokenKind::Comma => {}
            TokenKind::FuncName => stack.push((GroupKind::Call, Some(tok), Vec::new())),
            TokenKind::LParen => stack.push((GroupKind::Paren, None, Vec::new())),
            TokenKind::ArrayStart => stack.push((GroupKind::Bracket, None, Vec::new())),
            TokenKind::RParen | TokenKind::ArrayEnd => {
                if stack.len() == 1 {
                    return Err(ParseError::UnmatchedClose(tok.raw));
                }
                let Some((kind, head, children)) = stack.pop() else {
                    return Err(ParseError::UnmatchedClose(tok.raw));
                };
                let closes = match kind {
                    GroupKind::Call | GroupKind::Paren => tok.kind == TokenKind::RParen,
                    GroupKind::Bracket => tok.kind == TokenKind::ArrayEnd,
                    GroupKind::Root | GroupKind::Args => false,
                };
                if !closes {
                    return Err(ParseError::MismatchedClose { open: open_label(kind), close: tok.raw });
                }
                let node = match head {
                    Some(name) => AstNode::Group(Group {
                        kind: GroupKind::Call,
                        children: vec![
                            AstNode::Leaf(name),
                            AstNode::Group(Group { kind: GroupKind::Args, children }),
                        ],
                    }),
                    None => AstNode::Group(Group { kind, children }),
                };
                if let Some(parent) = stack.last_mut() {
                    parent.2.push(node);
                }
            }
            _ => {
                if let Some(top) = stack.last_mut() {
                    top.2.push(AstNode::Leaf(tok));
                }
            }
        }
    }

    if stack.len() > 1 {
        let kind = stack.last().map(|f| f.0).unwrap_or(GroupKind::Root);
        return Err(ParseError::Unclosed(open_label(kind)));
    }
    let (_, _, children) = stack.pop().unwrap_or((GroupKind::Root, None, Vec::new()));
    Ok(AstNode::Group(Group { kind: GroupKind::Root, children }))
}

/// Tokenize and nest one column value.
pub fn parse(src: &str) -> Result<AstNode, PredicateError> {
    Ok(nest(tokenize(src)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(src: &str) -> Result<AstNode, ParseError> {
        nest(tokenize(src).unwrap())
    }

    #[test]
    fn lex_failures_surface_through_parse() {
        assert!(matches!(super::parse("fn:Eval(#)"), Err(PredicateError::Lex(_))));
        assert!(matches!(super::parse("fn:Eval(1"), Err(PredicateError::Parse(_))));
    }

    #[test]
    fn call_wraps_args() {
        let root = parse("fn:SinceVersion(1.5,fn:BitSet(3))").unwrap();
        let top = &root.group().unwrap().children;
        assert_eq!(top.len(), 1);
        let (name, args) = top[0].as_call().unwrap();
        assert_eq!(name, "SinceVersion");
        assert_eq!(args.len(), 2);
        assert_eq!(args[1].as_call().unwrap().0, "BitSet");
    }

    #[test]
    fn operators_stay_flat() {
        let root = parse("fn:Eval(@a==1 && @b==2)").unwrap();
        let (_, args) = root.group().unwrap().children[0].as_call().unwrap();
        assert_eq!(args.len(), 7);
        assert!(args.iter().all(|a| a.leaf().is_some()));
    }

    #[test]
    fn commas_are_dropped_in_brackets() {
        let root = parse("[a,b,c]").unwrap();
        let br = root.group().unwrap().children[0].group().unwrap();
        assert_eq!(br.kind, GroupKind::Bracket);
        assert_eq!(br.children.len(), 3);
    }

    #[test]
    fn empty_call_has_empty_args() {
        let root = parse("fn:NoCycle()").unwrap();
        let (name, args) = root.group().unwrap().children[0].as_call().unwrap();
        assert_eq!((name, args.len()), ("NoCycle", 0));
    }

    #[test]
    fn unbalanced_input_fails() {
        assert_eq!(parse(")"), Err(ParseError::UnmatchedClose(")".into())));
        assert_eq!(parse("[a"), Err(ParseError::Unclosed("[")));
        assert!(matches!(parse("[a)"), Err(ParseError::MismatchedClose { open: "[", .. })));
        assert_eq!(parse("fn:Eval(@a"), Err(ParseError::Unclosed("fn:(")));
    }

    #[test]
    fn render_restores_source_shape() {
        let root = parse("fn:IsRequired(@Subtype==Link)").unwrap();
        assert_eq!(root.render(), "fn:IsRequired(@Subtype==Link)");
        let root = parse("fn:SinceVersion(1.5,[a,b])").unwrap();
        assert_eq!(root.render(), "fn:SinceVersion(1.5,[a,b])");
    }
}
