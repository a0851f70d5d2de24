//! Parsed document object graph, as consumed by the matcher.
//!
//! The byte-level PDF parser lives outside this crate. Documents arrive as
//! JSON with this encoding:
//!
//! ```json
//! {
//!   "trailer": { "Root": { "$ref": "1 0" }, "Size": 4 },
//!   "objects": {
//!     "1 0": { "Type": "/Catalog", "Pages": { "$ref": "2 0" } },
//!     "3 0": { "$stream": { "Length": 12 }, "$length": 12 }
//!   }
//! }
//! ```
//!
//! Strings starting with `/` are names, `{"$ref": "N G"}` is an indirect
//! reference and `{"$stream": {...}, "$length": n}` is a stream.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::path_de::{self, PathError};

// ———————————————————————————————————————————————————————————————————————————
// TYPES
// ———————————————————————————————————————————————————————————————————————————

/// Object number and generation of an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefId {
    pub num: u32,
    pub generation: u16,
}

impl RefId {
    pub fn new(num: u32, generation: u16) -> Self {
        Self { num, generation }
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.num, self.generation)
    }
}

impl FromStr for RefId {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || DocumentError::BadRefId(s.to_string());
        let mut parts = s.split_whitespace();
        let num = parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
        let generation = match parts.next() {
            Some(g) => g.parse().map_err(|_| bad())?,
            None => 0,
        };
        if parts.next().is_some() {
            return Err(bad());
        }
        Ok(Self { num, generation })
    }
}

pub type Dict = IndexMap<String, PdfObject>;

#[derive(Debug, Clone, PartialEq)]
pub enum PdfObject {
    Dictionary(Dict),
    Stream { dict: Dict, length: u64 },
    Array(Vec<PdfObject>),
    Name(String),
    String(String),
    Boolean(bool),
    Integer(i64),
    Number(OrderedFloat<f64>),
    Null,
    Reference(RefId),
}

/// Runtime kind of a resolved node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Dictionary,
    Stream,
    Array,
    Name,
    String,
    Boolean,
    Integer,
    Number,
    Null,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dictionary => "dictionary",
            Self::Stream => "stream",
            Self::Array => "array",
            Self::Name => "name",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Null => "null",
        }
    }

    pub fn is_container(self) -> bool {
        matches!(self, Self::Dictionary | Self::Stream | Self::Array)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PdfObject {
    /// Kind of this node. A reference has no kind until resolved, and is
    /// reported as `Null` here.
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Dictionary(_) => NodeKind::Dictionary,
            Self::Stream { .. } => NodeKind::Stream,
            Self::Array(_) => NodeKind::Array,
            Self::Name(_) => NodeKind::Name,
            Self::String(_) => NodeKind::String,
            Self::Boolean(_) => NodeKind::Boolean,
            Self::Integer(_) => NodeKind::Integer,
            Self::Number(_) => NodeKind::Number,
            Self::Null | Self::Reference(_) => NodeKind::Null,
        }
    }

    /// Dictionary entries, for both dictionaries and streams.
    pub fn dict(&self) -> Option<&Dict> {
        match self {
            Self::Dictionary(d) | Self::Stream { dict: d, .. } => Some(d),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&PdfObject> {
        self.dict()?.get(key)
    }

    pub fn items(&self) -> Option<&[PdfObject]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Number(_))
    }
}

/// A resolved node and the indirect object it came from, if any.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    pub ref_id: Option<RefId>,
    pub object: &'a PdfObject,
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("cannot read `{path}`: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("malformed document `{path}`: {source}")]
    Json { path: PathBuf, #[source] source: PathError },
    #[error("jq pre-filter failed on `{path}`: {message}")]
    Jq { path: PathBuf, message: String },
    #[error("`{0}` is not an object reference (expected \"N G\")")]
    BadRefId(String),
    #[error("trailer must be a dictionary or a stream, found {0}")]
    BadTrailer(NodeKind),
}

#[derive(Debug)]
pub struct Document {
    pub trailer: PdfObject,
    pub objects: HashMap<RefId, PdfObject>,
}

// ———————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ———————————————————————————————————————————————————————————————————————————

#[derive(Deserialize)]
struct RawDocument {
    trailer: PdfObject,
    #[serde(default)]
    objects: IndexMap<String, PdfObject>,
}

impl Document {
    pub fn load(path: &Path, jq_expr: Option<&str>) -> Result<Self, DocumentError> {
        let bytes = fs::read(path).map_err(|source| DocumentError::Io { path: path.to_path_buf(), source })?;
        let json_err = |source| DocumentError::Json { path: path.to_path_buf(), source };
        let raw: RawDocument = match jq_expr {
            None => path_de::from_slice_with_path(&bytes).map_err(json_err)?,
            Some(filter) => {
                let value: serde_json::Value = path_de::from_slice_with_path(&bytes).map_err(json_err)?;
                let filtered = crate::jq_exec::apply_single(filter, &value)
                    .map_err(|e| DocumentError::Jq { path: path.to_path_buf(), message: e.to_string() })?;
                path_de::from_value_with_path(filtered).map_err(json_err)?
            }
        };
        let doc = Self::from_raw(raw)?;
        debug!(path = %path.display(), objects = doc.objects.len(), "document loaded");
        Ok(doc)
    }

    pub fn from_json_str(text: &str) -> Result<Self, DocumentError> {
        let raw = path_de::from_str_with_path(text)
            .map_err(|source| DocumentError::Json { path: PathBuf::from("<inline>"), source })?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawDocument) -> Result<Self, DocumentError> {
        if !matches!(raw.trailer.kind(), NodeKind::Dictionary | NodeKind::Stream) {
            return Err(DocumentError::BadTrailer(raw.trailer.kind()));
        }
        let mut objects = HashMap::with_capacity(raw.objects.len());
        for (id, object) in raw.objects {
            objects.insert(id.parse()?, object);
        }
        Ok(Self { trailer: raw.trailer, objects })
    }

    /// Follow references until a direct object. `Err` carries the first
    /// reference that points nowhere.
    pub fn resolve<'a>(&'a self, object: &'a PdfObject) -> Result<NodeRef<'a>, RefId> {
        let mut current = NodeRef { ref_id: None, object };
        // a chain longer than the object table must loop
        for _ in 0..=self.objects.len() {
            let PdfObject::Reference(id) = current.object else {
                return Ok(current);
            };
            let target = self.objects.get(id).ok_or(*id)?;
            current = NodeRef { ref_id: Some(*id), object: target };
        }
        match current.object {
            PdfObject::Reference(id) => Err(*id),
            _ => Ok(current),
        }
    }

    /// Trailers of cross-reference streams are streams or carry `/Type /XRef`.
    pub fn is_xref_stream(&self) -> bool {
        matches!(self.trailer, PdfObject::Stream { .. })
            || self.trailer.get("Type").and_then(PdfObject::as_name) == Some("XRef")
    }
}

// ———————————————————————————————————————————————————————————————————————————
// JSON DECODING
// ———————————————————————————————————————————————————————————————————————————

impl<'de> Deserialize<'de> for PdfObject {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PdfObjectVisitor)
    }
}

struct PdfObjectVisitor;

impl<'de> Visitor<'de> for PdfObjectVisitor {
    type Value = PdfObject;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON-encoded PDF object")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<PdfObject, E> {
        Ok(PdfObject::Boolean(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<PdfObject, E> {
        Ok(PdfObject::Integer(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<PdfObject, E> {
        i64::try_from(v)
            .map(PdfObject::Integer)
            .map_err(|_| E::custom(format!("integer {v} is out of range")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<PdfObject, E> {
        Ok(PdfObject::Number(OrderedFloat(v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<PdfObject, E> {
        Ok(match v.strip_prefix('/') {
            Some(name) => PdfObject::Name(name.to_string()),
            None => PdfObject::String(v.to_string()),
        })
    }

    fn visit_unit<E: de::Error>(self) -> Result<PdfObject, E> {
        Ok(PdfObject::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<PdfObject, E> {
        Ok(PdfObject::Null)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<PdfObject, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(PdfObject::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<PdfObject, A::Error> {
        let mut dict = Dict::new();
        let mut reference: Option<String> = None;
        let mut stream: Option<Dict> = None;
        let mut length: Option<u64> = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "$ref" => reference = Some(map.next_value()?),
                "$stream" => {
                    let PdfObject::Dictionary(d) = map.next_value::<PdfObject>()? else {
                        return Err(de::Error::custom("`$stream` must hold a dictionary"));
                    };
                    stream = Some(d);
                }
                "$length" => length = Some(map.next_value()?),
                _ => {
                    let value = map.next_value()?;
                    dict.insert(key, value);
                }
            }
        }

        match (reference, stream) {
            (Some(r), None) if dict.is_empty() => r.parse().map(PdfObject::Reference).map_err(de::Error::custom),
            (Some(_), _) => Err(de::Error::custom("`$ref` cannot carry other keys")),
            (None, Some(d)) if dict.is_empty() => Ok(PdfObject::Stream { dict: d, length: length.unwrap_or(0) }),
            (None, Some(_)) => Err(de::Error::custom("`$stream` cannot carry other keys")),
            (None, None) => Ok(PdfObject::Dictionary(dict)),
        }
    }
}
