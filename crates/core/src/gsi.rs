//! Game State Integration payload helpers.
//!
//! The game client posts a JSON document whose schema we do not own. We only
//! look at `added.round.bomb`, which appears when the bomb gets planted.

use serde_json::{Map, Value};

/// A section we need to descend into is present but is not an object.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected `{path}` to be an object, found {found}")]
pub struct PayloadShapeError {
    pub path: &'static str,
    pub found: &'static str,
}

/// Truthiness as the game client's tooling understands it: empty and zero
/// values are false, everything else is true.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Returns whether the payload reports a newly planted bomb.
///
/// Absent `added` or `added.round` sections mean "not planted". A section
/// that is present with any other type than an object, including `null`, is
/// a malformed payload.
pub fn bomb_planted(payload: &Value) -> Result<bool, PayloadShapeError> {
    let root = as_object(payload, "payload")?;
    let Some(added) = root.get("added") else {
        return Ok(false);
    };
    let Some(round) = as_object(added, "added")?.get("round") else {
        return Ok(false);
    };
    let round = as_object(round, "added.round")?;
    Ok(round.get("bomb").is_some_and(is_truthy))
}

fn as_object<'a>(value: &'a Value, path: &'static str) -> Result<&'a Map<String, Value>, PayloadShapeError> {
    value.as_object().ok_or(PayloadShapeError { path, found: type_name(value) })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
