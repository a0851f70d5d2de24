//! JSON export of the schema Dom for inspection tooling.
//!
//! Object name -> key name -> row. Function calls become
//! `{"function": name, "args": [...]}` and are not meant to be re-parsed.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value as Json, json};

use super::types::*;
use crate::ast::{AstNode, GroupKind};
use crate::lexer::{Literal, Token};

pub fn dom_to_json(dom: &SchemaDom) -> Json {
    let mut objects = Map::new();
    for (name, object) in &dom.objects {
        let mut keys = Map::new();
        for (key, row) in &object.keys {
            keys.insert(key.clone(), row_to_json(row));
        }
        objects.insert(name.clone(), Json::Object(keys));
    }
    Json::Object(objects)
}

pub fn save_json(dom: &SchemaDom, path: &Path) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(&dom_to_json(dom))?;
    fs::write(path, text)?;
    Ok(())
}

pub fn row_to_json(row: &SchemaRow) -> Json {
    json!({
        "Type": row.types.iter().map(type_to_json).collect::<Vec<_>>(),
        "SinceVersion": match &row.since_version {
            VersionSpec::Version(v) => json!(v),
            VersionSpec::Predicate(n) => node_to_json(n),
        },
        "DeprecatedIn": row.deprecated_in,
        "Required": row.required.iter().map(flag_to_json).collect::<Vec<_>>(),
        "IndirectReference": row.indirect_reference.iter().map(flag_to_json).collect::<Vec<_>>(),
        "Inheritable": flag_to_json(&row.inheritable),
        "DefaultValue": row.default_value.as_ref().map(|dv| {
            dv.iter().map(|v| v.as_ref().map(value_to_json)).collect::<Vec<_>>()
        }),
        "PossibleValues": row.possible_values.as_ref().map(|pv| {
            pv.iter()
                .map(|alt| alt.as_ref().map(|vs| vs.iter().map(value_to_json).collect::<Vec<_>>()))
                .collect::<Vec<_>>()
        }),
        "SpecialCase": row.special_case.as_ref().map(|sc| {
            sc.iter().map(|n| n.as_ref().map(node_to_json)).collect::<Vec<_>>()
        }),
        "Link": row.link.as_ref().map(|links| {
            links
                .iter()
                .map(|alt| alt.as_ref().map(|ts| ts.iter().map(link_to_json).collect::<Vec<_>>()))
                .collect::<Vec<_>>()
        }),
        "Note": row.note,
    })
}

fn type_to_json(t: &TypeAlternative) -> Json {
    match t {
        TypeAlternative::Named(name) => json!(name),
        TypeAlternative::Predicate(n) => node_to_json(n),
    }
}

fn flag_to_json(f: &Flag) -> Json {
    match f {
        Flag::Literal(b) => json!(b),
        Flag::Predicate(n) => node_to_json(n),
        Flag::Invalid(s) => json!(s),
    }
}

fn link_to_json(l: &LinkTarget) -> Json {
    match l {
        LinkTarget::Object(name) => json!(name),
        LinkTarget::Predicate(n) => node_to_json(n),
    }
}

pub fn value_to_json(v: &Value) -> Json {
    match v {
        Value::Scalar(t) => token_to_json(t),
        Value::Text(s) => json!(s),
        Value::Array(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Expr(n) => node_to_json(n),
    }
}

fn token_to_json(t: &Token) -> Json {
    match &t.literal {
        Some(Literal::Integer(i)) => json!(i),
        Some(Literal::Real(f)) => json!(f.into_inner()),
        Some(Literal::Bool(b)) => json!(b),
        Some(Literal::String(s)) | Some(Literal::KeyName(s)) => json!(s),
        None => json!(t.raw),
    }
}

pub fn node_to_json(node: &AstNode) -> Json {
    if let Some((name, args)) = node.as_call() {
        return json!({
            "function": name,
            "args": args.iter().map(node_to_json).collect::<Vec<_>>(),
        });
    }
    match node {
        AstNode::Leaf(t) => token_to_json(t),
        AstNode::Group(g) => {
            let items: Vec<_> = g.children.iter().map(node_to_json).collect();
            match g.kind {
                GroupKind::Paren => json!({ "group": items }),
                _ => Json::Array(items),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ingest::ingest;
    use crate::tsv::read_str;
    use pretty_assertions::assert_eq;

    const HEADER: &str = "Key\tType\tSinceVersion\tDeprecatedIn\tRequired\tIndirectReference\tInheritable\tDefaultValue\tPossibleValues\tSpecialCase\tLink\tNote";

    fn dom(rows: &[&str]) -> SchemaDom {
        let raw = read_str("Obj", &format!("{HEADER}\n{}\n", rows.join("\n"))).unwrap();
        ingest(&[raw]).dom
    }

    #[test]
    fn function_calls_are_structured() {
        let d = dom(&["A\tinteger\tfn:SinceVersion(1.5,fn:Extension(ADBE))\t\tFALSE\tFALSE\tFALSE\t\t\t\t\t"]);
        let out = dom_to_json(&d);
        assert_eq!(
            out["Obj"]["A"]["SinceVersion"],
            json!({
                "function": "SinceVersion",
                "args": [1.5, { "function": "Extension", "args": ["ADBE"] }],
            })
        );
    }

    #[test]
    fn literal_fields_survive_export() {
        let d = dom(&[
            "Count\tinteger\t1.0\t\tTRUE\tFALSE\tFALSE\t3\t[1,2,3]\t\t\tpage count",
            "Kids\tarray\t1.3\t2.0\tFALSE\tTRUE\tFALSE\t\t\t\t[Pages]\t",
        ]);
        let out = dom_to_json(&d);
        let text = serde_json::to_string(&out).unwrap();
        let back: Json = serde_json::from_str(&text).unwrap();

        let count = &back["Obj"]["Count"];
        assert_eq!(count["Type"], json!(["integer"]));
        assert_eq!(count["Required"], json!([true]));
        assert_eq!(count["DefaultValue"], json!([3]));
        assert_eq!(count["PossibleValues"], json!([[1, 2, 3]]));
        assert_eq!(count["Link"], Json::Null);
        assert_eq!(count["Note"], json!("page count"));

        let kids = &back["Obj"]["Kids"];
        assert_eq!(kids["DeprecatedIn"], json!("2.0"));
        assert_eq!(kids["Link"], json!([["Pages"]]));
    }

    #[test]
    fn save_writes_pretty_json() {
        let d = dom(&["A\tname\t1.0\t\tFALSE\tFALSE\tFALSE\t\t\t\t\t"]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dom.json");
        save_json(&d, &path).unwrap();
        let back: Json = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back["Obj"]["A"]["Type"], json!(["name"]));
    }
}
