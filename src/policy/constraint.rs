//! Constraint grammar shared by the wire role format and the rule model.
//!
//! Wire shape:
//! - `{"and": [c1, c2, ...]}`
//! - `{"equals": [{"doc": "sys.type"}, "Entry"]}`
//! - `{"paths": [{"doc": "fields.title.en-US"}]}`
//!
//! Any other JSON is kept as an opaque [`Constraint::Other`] node so it can be
//! written back unchanged.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

pub const SYS_TYPE_PATH: &str = "sys.type";
pub const CONTENT_TYPE_PATH: &str = "sys.contentType.sys.id";
pub const ENTITY_ID_PATH: &str = "sys.id";
pub const CREATED_BY_PATH: &str = "sys.createdBy.sys.id";
pub const CURRENT_USER: &str = "User.current()";

const FIELDS_PREFIX: &str = "fields";
const PATH_WILDCARD: &str = "%";

// ─── Sentinels ──────────────────────────────────────────────────────────

/// Either "every id" or one concrete id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    Any,
    Exact(String),
}

/// Any content type.
pub const ALL_CTS: Pattern = Pattern::Any;
/// Any field.
pub const ALL_FIELDS: Pattern = Pattern::Any;
/// Any locale.
pub const ALL_LOCALES: Pattern = Pattern::Any;

impl Pattern {
    pub fn exact(id: impl Into<String>) -> Self {
        Pattern::Exact(id.into())
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Pattern::Any)
    }

    pub fn as_exact(&self) -> Option<&str> {
        match self {
            Pattern::Any => None,
            Pattern::Exact(id) => Some(id),
        }
    }

    pub fn matches(&self, id: &str) -> bool {
        match self {
            Pattern::Any => true,
            Pattern::Exact(expected) => expected == id,
        }
    }

    fn from_segment(segment: &str) -> Self {
        if segment == PATH_WILDCARD {
            Pattern::Any
        } else {
            Pattern::Exact(segment.to_string())
        }
    }

    fn as_segment(&self) -> &str {
        self.as_exact().unwrap_or(PATH_WILDCARD)
    }
}

pub fn matches_field(pattern: &Pattern, field_id: &str) -> bool {
    pattern.matches(field_id)
}

pub fn matches_locale(pattern: &Pattern, locale_code: &str) -> bool {
    pattern.matches(locale_code)
}

/// A `fields.<field>.<locale>` path template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldPath {
    pub field: Pattern,
    pub locale: Pattern,
}

impl FieldPath {
    pub fn new(field: Pattern, locale: Pattern) -> Self {
        Self { field, locale }
    }

    /// Parse `fields.<field>.<locale>`; anything else yields `None`.
    pub fn parse(path: &str) -> Option<Self> {
        let mut segments = path.split('.');
        let prefix = segments.next()?;
        let field = segments.next()?;
        let locale = segments.next()?;
        if prefix != FIELDS_PREFIX || field.is_empty() || locale.is_empty() {
            return None;
        }
        if segments.next().is_some() {
            return None;
        }
        Some(Self {
            field: Pattern::from_segment(field),
            locale: Pattern::from_segment(locale),
        })
    }

    pub fn covers(&self, field_id: &str, locale_code: &str) -> bool {
        matches_field(&self.field, field_id) && matches_locale(&self.locale, locale_code)
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{FIELDS_PREFIX}.{}.{}",
            self.field.as_segment(),
            self.locale.as_segment()
        )
    }
}

// ─── AST ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    And(Vec<Constraint>),
    Equals { path: String, value: String },
    Paths { path: String },
    /// Unrecognized JSON, preserved verbatim.
    Other(Value),
}

impl Constraint {
    pub fn equals(path: impl Into<String>, value: impl Into<String>) -> Self {
        Constraint::Equals {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn paths(path: &FieldPath) -> Self {
        Constraint::Paths {
            path: path.to_string(),
        }
    }

    pub fn from_value(value: Value) -> Self {
        if let Value::Object(map) = &value {
            if map.len() == 1 {
                if let Some(Value::Array(children)) = map.get("and") {
                    return Constraint::And(children.iter().cloned().map(Self::from_value).collect());
                }
                if let Some(Value::Array(args)) = map.get("equals") {
                    if let [lhs, Value::String(literal)] = args.as_slice() {
                        if let Some(path) = doc_path(lhs) {
                            return Constraint::equals(path, literal.as_str());
                        }
                    }
                }
                if let Some(Value::Array(args)) = map.get("paths") {
                    if let [lhs] = args.as_slice() {
                        if let Some(path) = doc_path(lhs) {
                            return Constraint::Paths {
                                path: path.to_string(),
                            };
                        }
                    }
                }
            }
        }
        Constraint::Other(value)
    }

    pub fn to_value(&self) -> Value {
        match self {
            Constraint::And(children) => {
                json!({ "and": children.iter().map(Self::to_value).collect::<Vec<_>>() })
            }
            Constraint::Equals { path, value } => json!({ "equals": [{ "doc": path }, value] }),
            Constraint::Paths { path } => json!({ "paths": [{ "doc": path }] }),
            Constraint::Other(raw) => raw.clone(),
        }
    }
}

fn doc_path(value: &Value) -> Option<&str> {
    match value {
        Value::Object(map) if map.len() == 1 => map.get("doc").and_then(Value::as_str),
        _ => None,
    }
}

impl Serialize for Constraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Constraint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_of_equals_and_paths() {
        let c = Constraint::from_value(json!({
            "and": [
                { "equals": [{ "doc": "sys.type" }, "Entry"] },
                { "paths": [{ "doc": "fields.title.%" }] }
            ]
        }));
        assert_eq!(
            c,
            Constraint::And(vec![
                Constraint::equals("sys.type", "Entry"),
                Constraint::Paths {
                    path: "fields.title.%".into()
                },
            ])
        );
    }

    #[test]
    fn test_unknown_operator_is_preserved() {
        let raw = json!({ "or": [{ "equals": [{ "doc": "sys.type" }, "Entry"] }] });
        let c = Constraint::from_value(raw.clone());
        assert_eq!(c, Constraint::Other(raw.clone()));
        assert_eq!(c.to_value(), raw);
    }

    #[test]
    fn test_malformed_equals_is_opaque() {
        // non-string literal
        let raw = json!({ "equals": [{ "doc": "sys.version" }, 3] });
        assert!(matches!(Constraint::from_value(raw), Constraint::Other(_)));

        // extra key next to the operator
        let raw = json!({ "equals": [{ "doc": "sys.type" }, "Entry"], "not": true });
        assert!(matches!(Constraint::from_value(raw), Constraint::Other(_)));
    }

    #[test]
    fn test_serde_round_trip_keeps_wire_shape() {
        let raw = json!({
            "and": [
                { "equals": [{ "doc": "sys.type" }, "Asset"] },
                { "equals": [{ "doc": "sys.createdBy.sys.id" }, "User.current()"] }
            ]
        });
        let c: Constraint = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&c).unwrap(), raw);
    }

    #[test]
    fn test_field_path_wildcards() {
        let p = FieldPath::parse("fields.%.en-US").unwrap();
        assert_eq!(p.field, ALL_FIELDS);
        assert_eq!(p.locale, Pattern::exact("en-US"));

        let p = FieldPath::parse("fields.test.%").unwrap();
        assert_eq!(p.field, Pattern::exact("test"));
        assert_eq!(p.locale, ALL_LOCALES);
        assert_eq!(p.to_string(), "fields.test.%");
    }

    #[test]
    fn test_field_path_rejects_other_shapes() {
        assert!(FieldPath::parse("fields.title").is_none());
        assert!(FieldPath::parse("fields.title.en-US.extra").is_none());
        assert!(FieldPath::parse("metadata.title.en-US").is_none());
        assert!(FieldPath::parse("fields..en-US").is_none());
    }

    #[test]
    fn test_matchers() {
        assert!(matches_field(&ALL_FIELDS, "anything"));
        assert!(matches_field(&Pattern::exact("title"), "title"));
        assert!(!matches_field(&Pattern::exact("title"), "body"));
        assert!(matches_locale(&ALL_LOCALES, "de-DE"));
        assert!(!matches_locale(&Pattern::exact("en-US"), "de-DE"));
    }
}
