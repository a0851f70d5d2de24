use indexmap::IndexMap;

use crate::ast::{AstNode, GroupKind};
use crate::config;
use crate::lexer::{Token, TokenKind};

// ———————————————————————————————————————————————————————————————————————————
// TYPES
// ———————————————————————————————————————————————————————————————————————————

/// The closed set of concrete Arlington type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PdfType {
    Array,
    Bitmask,
    Boolean,
    Date,
    Dictionary,
    Integer,
    Matrix,
    Name,
    NameTree,
    Null,
    Number,
    NumberTree,
    Rectangle,
    Stream,
    String,
    StringAscii,
    StringByte,
    StringText,
}

impl PdfType {
    pub const ALL: [PdfType; 18] = [
        Self::Array,
        Self::Bitmask,
        Self::Boolean,
        Self::Date,
        Self::Dictionary,
        Self::Integer,
        Self::Matrix,
        Self::Name,
        Self::NameTree,
        Self::Null,
        Self::Number,
        Self::NumberTree,
        Self::Rectangle,
        Self::Stream,
        Self::String,
        Self::StringAscii,
        Self::StringByte,
        Self::StringText,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Array => "array",
            Self::Bitmask => "bitmask",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Dictionary => "dictionary",
            Self::Integer => "integer",
            Self::Matrix => "matrix",
            Self::Name => "name",
            Self::NameTree => "name-tree",
            Self::Null => "null",
            Self::Number => "number",
            Self::NumberTree => "number-tree",
            Self::Rectangle => "rectangle",
            Self::Stream => "stream",
            Self::String => "string",
            Self::StringAscii => "string-ascii",
            Self::StringByte => "string-byte",
            Self::StringText => "string-text",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    pub fn requires_link(self) -> bool {
        config::requires_link(self.as_str())
    }

    pub fn is_string_like(self) -> bool {
        matches!(self, Self::String | Self::StringAscii | Self::StringByte | Self::StringText | Self::Date)
    }
}

/// One member of a `Type` cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeAlternative {
    Named(String),
    /// A version wrapper such as `fn:SinceVersion(1.5,stream)`.
    Predicate(AstNode),
}

impl TypeAlternative {
    /// Concrete type name, looking through a wrapper to the type it guards.
    pub fn reduce(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::Predicate(node) => last_key_name(node),
        }
    }

    pub fn pdf_type(&self) -> Option<PdfType> {
        self.reduce().and_then(PdfType::parse)
    }
}

fn last_key_name(node: &AstNode) -> Option<&str> {
    node.leaves()
        .into_iter()
        .rev()
        .find(|t| t.kind == TokenKind::KeyName)
        .map(|t| t.raw.as_str())
}

/// A `Required` / `IndirectReference` / `Inheritable` cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Flag {
    Literal(bool),
    Predicate(AstNode),
    /// Neither `TRUE`/`FALSE` nor a function. Kept so validation can name it.
    Invalid(String),
}

impl Flag {
    pub fn is_true(&self) -> bool {
        matches!(self, Self::Literal(true))
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Self::Literal(false))
    }

    pub fn predicate(&self) -> Option<&AstNode> {
        match self {
            Self::Predicate(node) => Some(node),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionSpec {
    Version(String),
    Predicate(AstNode),
}

/// A literal or function value from `DefaultValue`, `PossibleValues`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Scalar(Token),
    /// PDF string literal written as `(text)`.
    Text(String),
    Array(Vec<Value>),
    Expr(AstNode),
}

impl Value {
    pub fn is_literal(&self) -> bool {
        match self {
            Self::Scalar(_) | Self::Text(_) => true,
            Self::Array(items) => items.iter().all(Value::is_literal),
            Self::Expr(_) => false,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Self::Scalar(t) => t.raw.clone(),
            Self::Text(s) => s.clone(),
            Self::Array(items) => {
                format!("[{}]", items.iter().map(Value::render).collect::<Vec<_>>().join(" "))
            }
            Self::Expr(node) => node.render(),
        }
    }

    /// Build a value from an already nested node.
    pub fn from_node(node: AstNode) -> Self {
        match node {
            AstNode::Leaf(t) => Self::Scalar(t),
            AstNode::Group(g) if g.kind == GroupKind::Bracket => {
                Self::Array(g.children.into_iter().map(Value::from_node).collect())
            }
            other => Self::Expr(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LinkTarget {
    Object(String),
    /// Version-guarded target, e.g. `fn:SinceVersion(1.2,FilterFlateDecode)`.
    Predicate(AstNode),
}

impl LinkTarget {
    /// Object names this target may lead to. Only the guarded operand of a
    /// predicate counts, so the name in `fn:Extension(name,link)` does not.
    pub fn object_names(&self) -> Vec<&str> {
        match self {
            Self::Object(name) => vec![name.as_str()],
            Self::Predicate(node) => link_operand(node).into_iter().collect(),
        }
    }

    pub fn render(&self) -> String {
        match self {
            Self::Object(name) => name.clone(),
            Self::Predicate(node) => node.render(),
        }
    }
}

fn link_operand(node: &AstNode) -> Option<&str> {
    match node.as_call() {
        Some((name, args)) if config::LINK_WRAPPERS.contains(&name) => link_operand(args.last()?),
        Some(("Extension", args)) => link_operand(args.get(1)?),
        Some(_) => None,
        None => node.leaf().filter(|t| t.kind == TokenKind::KeyName).map(|t| t.raw.as_str()),
    }
}

// ———————————————————————————————————————————————————————————————————————————
// DOM
// ———————————————————————————————————————————————————————————————————————————

/// One key of one object. Per-alternative columns are index aligned with
/// `types`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRow {
    pub types: Vec<TypeAlternative>,
    pub since_version: VersionSpec,
    pub deprecated_in: Option<String>,
    pub required: Vec<Flag>,
    pub indirect_reference: Vec<Flag>,
    pub inheritable: Flag,
    pub default_value: Option<Vec<Option<Value>>>,
    pub possible_values: Option<Vec<Option<Vec<Value>>>>,
    pub special_case: Option<Vec<Option<AstNode>>>,
    pub link: Option<Vec<Option<Vec<LinkTarget>>>>,
    pub note: Option<String>,
}

impl SchemaRow {
    pub fn is_required(&self) -> bool {
        self.required.iter().any(Flag::is_true)
    }

    /// `false` only when every `Required` entry is literally `FALSE`.
    pub fn may_be_required(&self) -> bool {
        !self.required.iter().all(Flag::is_false)
    }

    pub fn links_for(&self, alternative: usize) -> &[LinkTarget] {
        self.link
            .as_ref()
            .and_then(|l| l.get(alternative))
            .and_then(|l| l.as_deref())
            .unwrap_or(&[])
    }

    /// Every parsed declarative function in the row, with its column name.
    pub fn predicates(&self) -> Vec<(&'static str, &AstNode)> {
        let mut out = Vec::new();
        for t in &self.types {
            if let TypeAlternative::Predicate(n) = t {
                out.push(("Type", n));
            }
        }
        if let VersionSpec::Predicate(n) = &self.since_version {
            out.push(("SinceVersion", n));
        }
        out.extend(self.required.iter().filter_map(Flag::predicate).map(|n| ("Required", n)));
        out.extend(
            self.indirect_reference
                .iter()
                .filter_map(Flag::predicate)
                .map(|n| ("IndirectReference", n)),
        );
        if let Some(n) = self.inheritable.predicate() {
            out.push(("Inheritable", n));
        }
        for v in self.default_value.iter().flatten().flatten() {
            collect_value_exprs(v, "DefaultValue", &mut out);
        }
        for v in self.possible_values.iter().flatten().flatten().flatten() {
            collect_value_exprs(v, "PossibleValues", &mut out);
        }
        for n in self.special_case.iter().flatten().flatten() {
            out.push(("SpecialCase", n));
        }
        for target in self.link.iter().flatten().flatten().flatten() {
            if let LinkTarget::Predicate(n) = target {
                out.push(("Link", n));
            }
        }
        out
    }
}

fn collect_value_exprs<'a>(v: &'a Value, column: &'static str, out: &mut Vec<(&'static str, &'a AstNode)>) {
    match v {
        Value::Expr(n) => out.push((column, n)),
        Value::Array(items) => items.iter().for_each(|i| collect_value_exprs(i, column, out)),
        Value::Scalar(_) | Value::Text(_) => {}
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaObject {
    pub name: String,
    /// Key name, array index or wildcard (`*`, `2*`) to its row, in file order.
    pub keys: IndexMap<String, SchemaRow>,
}

impl SchemaObject {
    pub fn wildcard(&self) -> Option<&SchemaRow> {
        self.keys.get("*")
    }

    /// Array-shaped objects are keyed by `0`, `1`, ... rather than names.
    pub fn is_array_like(&self) -> bool {
        self.keys.keys().next().is_some_and(|k| k.starts_with(|c: char| c.is_ascii_digit()))
    }
}

/// Object name to object. Built once by the ingester, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaDom {
    pub objects: IndexMap<String, SchemaObject>,
}

impl SchemaDom {
    pub fn get(&self, name: &str) -> Option<&SchemaObject> {
        self.objects.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse;

    fn call(src: &str) -> AstNode {
        parse(src).unwrap().group().unwrap().children[0].clone()
    }

    #[test]
    fn reduce_looks_through_wrappers() {
        let t = TypeAlternative::Predicate(call("fn:SinceVersion(1.5,stream)"));
        assert_eq!(t.reduce(), Some("stream"));
        assert_eq!(t.pdf_type(), Some(PdfType::Stream));
        assert_eq!(TypeAlternative::Named("name-tree".into()).pdf_type(), Some(PdfType::NameTree));
    }

    #[test]
    fn pdf_type_names_match_policy() {
        let names: Vec<_> = PdfType::ALL.iter().map(|t| t.as_str()).collect();
        assert_eq!(names, config::KNOWN_TYPES);
    }

    #[test]
    fn link_predicate_names() {
        let l = LinkTarget::Predicate(call("fn:SinceVersion(1.2,FilterFlateDecode)"));
        assert_eq!(l.object_names(), vec!["FilterFlateDecode"]);
    }

    #[test]
    fn link_through_extension_names_only_the_link() {
        let l = LinkTarget::Predicate(call("fn:SinceVersion(2.0,fn:Extension(ISO_19005_3,Foo))"));
        assert_eq!(l.object_names(), vec!["Foo"]);
        let l = LinkTarget::Predicate(call("fn:Extension(ADBE_Extn3)"));
        assert!(l.object_names().is_empty());
    }

    #[test]
    fn value_from_bracket_is_array() {
        let node = parse("[0 0 1 1]").unwrap().group().unwrap().children[0].clone();
        let v = Value::from_node(node);
        assert!(matches!(&v, Value::Array(items) if items.len() == 4));
        assert!(v.is_literal());
        assert_eq!(v.render(), "[0 0 1 1]");
    }
}
