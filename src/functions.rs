//! Argument-shape checkers for every recognised declarative function.
//!
//! A checker sees the flat argument list of one call (commas already gone)
//! and answers whether it has the positional shape the function expects.
//! Nothing is evaluated. Nested calls are checked on their own by
//! [`check_tree`], so a checker only needs to accept a call node where the
//! function allows a nested call.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use thiserror::Error;

use crate::ast::{AstNode, GroupKind};
use crate::config;
use crate::lexer::TokenKind;

pub type Checker = fn(&[AstNode]) -> bool;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("unknown function `fn:{0}`")]
    UnknownFunction(String),
    #[error("`fn:{name}` has malformed arguments: {rendered}")]
    BadArguments { name: String, rendered: String },
}

// ---- Table ---- //

const ZERO_ARGS: &[&str] = &[
    "AlwaysUnencrypted",
    "FileSize",
    "FontHasLatinChars",
    "ImageIsStructContentItem",
    "ImplementationDependent",
    "IsAssociatedFile",
    "IsEncryptedWrapper",
    "IsHexString",
    "IsPDFTagged",
    "KeyNameIsColorant",
    "NoCycle",
    "NotStandard14Font",
    "NumberOfPages",
    "PageContainsStructContentItems",
];

const SINGLE_KEY: &[&str] = &[
    "HasProcessColorants",
    "HasSpotColorants",
    "InKeyMap",
    "InNameTree",
    "IsFieldName",
    "IsLastInNumberFormatArray",
    "RectHeight",
    "RectWidth",
    "StreamLength",
    "StringLength",
];

const VERSIONED: &[&str] = &["BeforeVersion", "Deprecated", "IsPDFVersion", "SinceVersion"];

const EXPRESSION: &[&str] = &["Eval", "IsMeaningful", "IsRequired", "Not"];

static CHECKERS: Lazy<HashMap<&'static str, Checker>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, Checker> = HashMap::new();
    for &name in ZERO_ARGS {
        m.insert(name, |a| a.is_empty());
    }
    for &name in SINGLE_KEY {
        m.insert(name, |a| key_ref_len(a) == Some(a.len()));
    }
    for &name in VERSIONED {
        m.insert(name, versioned);
    }
    for &name in EXPRESSION {
        m.insert(name, is_expression);
    }
    m.insert("BitSet", single_bit);
    m.insert("BitClear", single_bit);
    m.insert("BitsSet", bit_range);
    m.insert("BitsClear", bit_range);
    m.insert("ArrayLength", array_length);
    m.insert("ArraySortAscending", array_sort_ascending);
    m.insert("Extension", extension);
    m.insert("DefaultValue", default_value);
    m.insert("Ignore", |a| a.is_empty() || is_expression(a));
    m.insert("IsPresent", presence);
    m.insert("NotPresent", presence);
    m.insert("MustBeDirect", |a| a.is_empty() || is_expression(a));
    m.insert("MustBeIndirect", |a| a.is_empty() || is_expression(a));
    m.insert("PageProperty", page_property);
    m.insert("RequiredValue", required_value);
    m.insert("Contains", contains);
    m
});

pub fn is_known(name: &str) -> bool {
    CHECKERS.contains_key(name)
}

pub fn known_functions() -> Vec<&'static str> {
    let mut names: Vec<_> = CHECKERS.keys().copied().collect();
    names.sort_unstable();
    names
}

/// Check one call's arguments against its shape.
pub fn check_call(name: &str, args: &[AstNode]) -> Result<(), ShapeError> {
    let checker = CHECKERS.get(name).ok_or_else(|| ShapeError::UnknownFunction(name.to_string()))?;
    if checker(args) {
        Ok(())
    } else {
        let rendered = args.iter().map(AstNode::render).collect::<Vec<_>>().join(",");
        Err(ShapeError::BadArguments { name: name.to_string(), rendered })
    }
}

/// Check every call reachable from `node`, outermost first.
pub fn check_tree(node: &AstNode) -> Vec<ShapeError> {
    let mut errors = Vec::new();
    node.walk(&mut |n| {
        if let Some((name, args)) = n.as_call() {
            if let Err(e) = check_call(name, args) {
                errors.push(e);
            }
        }
    });
    errors
}

// ---- Argument pieces ---- //

fn leaf_kind(node: &AstNode) -> Option<TokenKind> {
    node.leaf().map(|t| t.kind)
}

fn is_value_leaf(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::KeyName
            | TokenKind::KeyValue
            | TokenKind::Integer
            | TokenKind::Real
            | TokenKind::PdfTrue
            | TokenKind::PdfFalse
            | TokenKind::PdfString
    )
}

/// Length of the single operand starting at `args[0]`, where a `KeyPath`
/// prefix glues to the key after it.
fn operand_len(args: &[AstNode]) -> Option<usize> {
    let first = args.first()?;
    match first {
        AstNode::Group(g) => match g.kind {
            GroupKind::Paren => is_expression(&g.children).then_some(1),
            GroupKind::Call | GroupKind::Bracket => Some(1),
            GroupKind::Root | GroupKind::Args => None,
        },
        AstNode::Leaf(t) if t.kind == TokenKind::KeyPath => {
            let next = leaf_kind(args.get(1)?)?;
            matches!(next, TokenKind::KeyName | TokenKind::KeyValue | TokenKind::Integer).then_some(2)
        }
        AstNode::Leaf(t) => is_value_leaf(t.kind).then_some(1),
    }
}

/// Length of a key reference at the start of `args`: optional `KeyPath`
/// followed by a key name, array index or `@key` value.
fn key_ref_len(args: &[AstNode]) -> Option<usize> {
    let skip = usize::from(args.first().is_some_and(|a| a.is_leaf_of(TokenKind::KeyPath)));
    let kind = leaf_kind(args.get(skip)?)?;
    matches!(kind, TokenKind::KeyName | TokenKind::Integer | TokenKind::KeyValue).then_some(skip + 1)
}

fn is_single_operand(args: &[AstNode]) -> bool {
    operand_len(args) == Some(args.len())
}

/// Operands alternating with binary operators, starting and ending with an
/// operand.
fn is_expression(args: &[AstNode]) -> bool {
    let mut rest = args;
    loop {
        let Some(n) = operand_len(rest) else {
            return false;
        };
        rest = &rest[n..];
        match rest.split_first() {
            None => return true,
            Some((op, tail)) => {
                if !leaf_kind(op).is_some_and(TokenKind::is_operator) {
                    return false;
                }
                rest = tail;
            }
        }
    }
}

fn is_version(node: &AstNode) -> bool {
    node.leaf()
        .is_some_and(|t| t.kind == TokenKind::Real && config::is_pdf_version(&t.raw))
}

fn bit(node: &AstNode) -> Option<i64> {
    node.leaf()?.as_integer().filter(|b| (1..=32).contains(b))
}

// ---- Checkers ---- //

fn single_bit(args: &[AstNode]) -> bool {
    matches!(args, [b] if bit(b).is_some())
}

fn bit_range(args: &[AstNode]) -> bool {
    match args {
        [lo, hi] => matches!((bit(lo), bit(hi)), (Some(l), Some(h)) if l <= h),
        _ => false,
    }
}

fn versioned(args: &[AstNode]) -> bool {
    match args.split_first() {
        Some((v, rest)) => is_version(v) && (rest.is_empty() || is_expression(rest)),
        None => false,
    }
}

fn extension(args: &[AstNode]) -> bool {
    match args.split_first() {
        Some((name, rest)) => {
            name.is_leaf_of(TokenKind::KeyName) && (rest.is_empty() || is_expression(rest))
        }
        None => false,
    }
}

fn array_length(args: &[AstNode]) -> bool {
    match args {
        [call] if call.as_call().is_some() => true,
        _ => key_ref_len(args) == Some(args.len()),
    }
}

fn array_sort_ascending(args: &[AstNode]) -> bool {
    key_ref_len(args).is_some_and(|n| matches!(&args[n..], [step] if step.is_leaf_of(TokenKind::Integer)))
}

fn default_value(args: &[AstNode]) -> bool {
    match args.split_last() {
        Some((value, cond)) => !cond.is_empty() && is_single_operand(std::slice::from_ref(value)) && is_expression(cond),
        None => false,
    }
}

fn presence(args: &[AstNode]) -> bool {
    if is_expression(args) {
        return true;
    }
    key_ref_len(args).is_some_and(|n| is_expression(&args[n..]))
}

fn page_property(args: &[AstNode]) -> bool {
    key_ref_len(args).is_some_and(|n| matches!(&args[n..], [p] if p.is_leaf_of(TokenKind::KeyName)))
}

fn contains(args: &[AstNode]) -> bool {
    key_ref_len(args).is_some_and(|n| is_single_operand(&args[n..]))
}

fn required_value(args: &[AstNode]) -> bool {
    let Some((value, cond)) = args.split_last() else {
        return false;
    };
    if !is_single_operand(std::slice::from_ref(value)) {
        return false;
    }
    let grouped = |n: &AstNode| n.group().is_some_and(|g| matches!(g.kind, GroupKind::Paren | GroupKind::Call));
    match cond {
        [lhs, op, rhs] if leaf_kind(op).is_some_and(TokenKind::is_comparison) => {
            is_single_operand(std::slice::from_ref(lhs)) && is_single_operand(std::slice::from_ref(rhs))
        }
        [group] => grouped(group),
        // boolean combination of grouped conditions
        _ => {
            cond.len() > 1
                && is_expression(cond)
                && cond.iter().enumerate().all(|(i, n)| {
                    if i % 2 == 1 { leaf_kind(n).is_some_and(TokenKind::is_logical) } else { grouped(n) }
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse;
    use pretty_assertions::assert_eq;

    fn check(src: &str) -> Vec<ShapeError> {
        check_tree(&parse(src).unwrap())
    }

    fn ok(src: &str) {
        assert_eq!(check(src), vec![], "{src}");
    }

    fn bad(src: &str) {
        assert!(!check(src).is_empty(), "{src} should fail");
    }

    #[test]
    fn table_covers_every_function() {
        assert_eq!(known_functions().len(), 48);
        assert!(is_known("SinceVersion"));
        assert!(!is_known("Deprecate"));
    }

    #[test]
    fn bits() {
        ok("fn:BitSet(3)");
        ok("fn:BitsClear(1,32)");
        bad("fn:BitSet(0)");
        bad("fn:BitSet(33)");
        bad("fn:BitsSet(1,33)");
        bad("fn:BitsSet(5,2)");
        bad("fn:BitClear(1,2)");
    }

    #[test]
    fn bits_set_out_of_range_reports_bad_arguments() {
        let errs = check("fn:BitsSet(1,33)");
        assert_eq!(
            errs,
            vec![ShapeError::BadArguments { name: "BitsSet".into(), rendered: "1,33".into() }]
        );
    }

    #[test]
    fn versions_wrap_values_and_calls() {
        ok("fn:SinceVersion(1.2,FilterFlateDecode)");
        ok("fn:SinceVersion(2.0)");
        ok("fn:Deprecated(1.4,array)");
        ok("fn:IsPDFVersion(1.0,fn:BitSet(3))");
        ok("fn:BeforeVersion(1.3,@Subtype==Link)");
        bad("fn:SinceVersion(1.9,array)");
        bad("fn:SinceVersion(array)");
    }

    #[test]
    fn nested_failures_are_found() {
        let errs = check("fn:SinceVersion(1.5,fn:BitSet(40))");
        assert_eq!(errs.len(), 1);
        assert!(matches!(&errs[0], ShapeError::BadArguments { name, .. } if name == "BitSet"));
    }

    #[test]
    fn unknown_function() {
        assert_eq!(check("fn:Predicate(x)"), vec![ShapeError::UnknownFunction("Predicate".into())]);
    }

    #[test]
    fn expressions() {
        ok("fn:IsRequired(@Subtype==Link)");
        ok("fn:Eval((@a==1) && (@b!=2))");
        ok("fn:Eval(@Length<=fn:FileSize())");
        ok("fn:Not(fn:IsPresent(AP))");
        ok("fn:IsRequired(fn:IsPresent(RD::@0))");
        bad("fn:Eval(@a==)");
        bad("fn:IsRequired()");
        bad("fn:Eval(== @a)");
    }

    #[test]
    fn key_functions() {
        ok("fn:ArrayLength(DecodeParms)");
        ok("fn:ArrayLength(fn:Eval(@a))");
        ok("fn:RectWidth(Rect)");
        ok("fn:InNameTree(trailer::Catalog::Names::Dests)");
        ok("fn:PageProperty(@P,Annots)");
        ok("fn:ArraySortAscending(Nums,2)");
        ok("fn:Contains(@Filter,Crypt)");
        bad("fn:RectWidth()");
        bad("fn:StringLength(a,b)");
        bad("fn:ArraySortAscending(Nums)");
    }

    #[test]
    fn presence_and_misc() {
        ok("fn:IsPresent(StructParent)");
        ok("fn:IsPresent(Encrypt, @V>=2)");
        ok("fn:NotPresent(@Type==Sig)");
        ok("fn:MustBeDirect()");
        ok("fn:MustBeIndirect(fn:IsPresent(ID))");
        ok("fn:Ignore()");
        ok("fn:Extension(ADBE_Extn3,1.7)");
        ok("fn:DefaultValue(@Subtype==Link,Invert)");
        ok("fn:NoCycle()");
        bad("fn:NoCycle(x)");
        bad("fn:DefaultValue(Invert)");
        bad("fn:Extension(1.7)");
    }

    #[test]
    fn required_value_shapes() {
        ok("fn:RequiredValue(@CS==DeviceGray,1)");
        ok("fn:RequiredValue(fn:IsPresent(X),true)");
        ok("fn:RequiredValue((@A==1) || (@B==2),0)");
        bad("fn:RequiredValue(@CS,1)");
        bad("fn:RequiredValue(@CS + 2,1)");
    }
}
