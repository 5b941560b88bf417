//! Raw-row transforms driven by static per-field mapping tables.
//!
//! Each entity type declares a table of [`FieldSpec`]s: a target field name,
//! an ordered fallback chain of source columns (dotted paths reach into
//! embedded relations), and a default used when every source is null or
//! absent. The transform is total apart from a missing required id.

use crate::error::Result;
use crate::types::{RawRow, ViewEntity};
use serde_json::Value;

/// Default substituted when no source column yields a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldDefault {
    EmptyString,
    Zero,
    False,
    Null,
}

impl FieldDefault {
    fn value(self) -> Value {
        match self {
            FieldDefault::EmptyString => Value::String(String::new()),
            FieldDefault::Zero => Value::from(0),
            FieldDefault::False => Value::Bool(false),
            FieldDefault::Null => Value::Null,
        }
    }
}

/// One row of a per-entity field mapping table.
pub struct FieldSpec {
    /// Field name in the projected output.
    pub target: &'static str,
    /// Source columns tried in order; dotted paths traverse embedded
    /// relations (`"checklists.name"`), taking the first element of an
    /// embedded array.
    pub sources: &'static [&'static str],
    /// Substituted when every source is null or absent.
    pub default: FieldDefault,
}

/// Resolve a dotted path against a raw row.
fn lookup_path<'a>(row: &'a RawRow, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = row.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.first()?.as_object()?.get(part)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Evaluate a mapping table against a raw row, producing a flat map of
/// target fields. Never fails: unresolvable fields take their default.
pub fn project_row(row: &RawRow, fields: &[FieldSpec]) -> RawRow {
    let mut out = RawRow::new();
    for spec in fields {
        let mut value = Value::Null;
        for source in spec.sources {
            if let Some(found) = lookup_path(row, source) {
                if !found.is_null() {
                    value = found.clone();
                    break;
                }
            }
        }
        if value.is_null() {
            value = spec.default.value();
        }
        out.insert(spec.target.to_string(), value);
    }
    out
}

/// Read a string field from a projected row. Numbers stringify; anything
/// else defaults to empty.
pub fn str_field(fields: &RawRow, key: &str) -> String {
    match fields.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Read an integer field from a projected row, accepting numeric strings.
pub fn i64_field(fields: &RawRow, key: &str) -> i64 {
    match fields.get(key) {
        Some(Value::Number(n)) => n.as_i64().unwrap_or_else(|| {
            n.as_f64().map(|f| f as i64).unwrap_or(0)
        }),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

/// Read a float field from a projected row, accepting numeric strings.
pub fn f64_field(fields: &RawRow, key: &str) -> f64 {
    match fields.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Read a timestamp field from a projected row.
pub fn ts_field(fields: &RawRow, key: &str) -> Option<crate::types::Timestamp> {
    fields.get(key).and_then(crate::types::Timestamp::from_value)
}

/// A pure, total transform from a [`RawRow`] to a typed entity.
///
/// Must never fail on a missing optional field; only a missing required id
/// is an error.
pub trait RowTransform {
    type Entity: ViewEntity;

    fn transform(&self, row: &RawRow) -> Result<Self::Entity>;
}
