use serde_json::{Map, Value};
use std::fmt;


/// Keys with fixed meaning on every entity record.
pub const RESERVED_KEYS: [&str; 3] = ["id", "type", "location"];

/// Entity represents one context-data record as fetched from the broker.
///
/// `id` and `type` are required; everything else is carried as an ordered
/// list of `(key, raw value)` pairs in record order. Whether a value is a
/// usable Property is decided later by [`Property::from_json`].
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    /// Entity URN (e.g., "urn:ngsi-ld:Station:central")
    pub id: String,

    /// Entity type (e.g., "Station", "WeatherObserved")
    pub entity_type: String,

    /// Raw GeoJSON geometry taken from the `location` GeoProperty
    pub location: Option<Value>,

    /// Remaining keys in record order
    pub extras: Vec<(String, Value)>,
}

/// Reasons a record cannot be read as an entity at all.
#[derive(Debug, Clone, PartialEq)]
pub enum MalformedEntity {
    NotAnObject,
    MissingId,
    MissingType,
}

impl fmt::Display for MalformedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedEntity::NotAnObject => write!(f, "entity record must be a JSON object"),
            MalformedEntity::MissingId => write!(f, "entity record has no string 'id'"),
            MalformedEntity::MissingType => write!(f, "entity record has no string 'type'"),
        }
    }
}

impl std::error::Error for MalformedEntity {}

impl Entity {
    /// Read an entity from a decoded JSON record.
    pub fn from_json(record: &Value) -> Result<Self, MalformedEntity> {
        let object = record.as_object().ok_or(MalformedEntity::NotAnObject)?;

        let id = non_empty_str(object, "id").ok_or(MalformedEntity::MissingId)?;
        let entity_type = non_empty_str(object, "type").ok_or(MalformedEntity::MissingType)?;

        let location = object
            .get("location")
            .and_then(|l| l.get("value"))
            .filter(|g| g.is_object())
            .cloned();

        let extras = object
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Self {
            id: id.to_string(),
            entity_type: entity_type.to_string(),
            location,
            extras,
        })
    }

    /// Raw value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extras.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Property stored under `key`, if the value is Property-shaped.
    pub fn property(&self, key: &str) -> Option<Property> {
        self.get(key).and_then(Property::from_json)
    }

    /// Non-empty display text under `key`, read from a Property value or
    /// from a bare string.
    pub fn text(&self, key: &str) -> Option<String> {
        let raw = self.get(key)?;
        let text = match Property::from_json(raw) {
            Some(property) => display_string(&property.value),
            None => raw.as_str().map(str::to_string)?,
        };
        Some(text).filter(|t| !t.is_empty())
    }
}

fn non_empty_str<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

/// A Property-shaped attribute: an object carrying a defined `value`.
#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    pub value: Value,
    /// Unit annotation, normalized to a bare string
    pub unit_code: Option<String>,
}

impl Property {
    /// Shape check for Property-like values.
    ///
    /// Accepts any object with a non-null `value`. A `unitCode` may be a
    /// bare string or a `{ "value": "..." }` object.
    pub fn from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let inner = object.get("value").filter(|v| !v.is_null())?;

        let unit_code = object.get("unitCode").and_then(|u| match u {
            Value::String(s) => Some(s.clone()),
            Value::Object(o) => o.get("value").and_then(|v| v.as_str()).map(str::to_string),
            _ => None,
        });

        Some(Self {
            value: inner.clone(),
            unit_code: unit_code.filter(|u| !u.is_empty()),
        })
    }
}

/// Unwrap a JSON-LD `{ "@value": ... }` wrapper, returning the input when it
/// is not one.
pub fn unwrap_json_ld(value: &Value) -> &Value {
    match value.as_object().and_then(|o| o.get("@value")) {
        Some(inner) => inner,
        None => value,
    }
}

/// Render a value for display.
///
/// Scalars become their plain text form (integral floats drop the
/// fractional part), arrays are joined with `", "`, `@value` wrappers are
/// unwrapped and any other object is rendered as compact JSON. `null`
/// renders as the empty string.
pub fn display_string(value: &Value) -> String {
    match unwrap_json_ld(value) {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => display_number(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_string)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Floats follow the JavaScript number-to-string rules: plain digits for
/// magnitudes in `[1e-6, 1e21)`, otherwise exponent form with a signed
/// exponent (`1e+21`, `1e-7`).
fn display_number(n: &serde_json::Number) -> String {
    let f = match n.as_f64() {
        Some(f) if n.is_f64() => f,
        _ => return n.to_string(),
    };
    if f == 0.0 {
        return "0".to_string();
    }
    if (1e-6..1e21).contains(&f.abs()) {
        return format!("{}", f);
    }

    let exponent_form = format!("{:e}", f);
    match exponent_form.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => exponent_form,
    }
}
