use chrono::{DateTime, FixedOffset, NaiveDate};
use serde_json::{Map, Value};

static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();

/// Read-only view over one JSON object from the GO API.
///
/// Every accessor returns `None` for a missing key, a `null`, or a value of a
/// type it cannot interpret. Record construction goes through this type only.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    /// Views `value` as an object. Anything that is not an object reads as empty.
    pub fn new(value: &'a Value) -> Self {
        match value {
            Value::Object(map) => Self { map },
            _ => Self::empty(),
        }
    }

    pub fn from_map(map: &'a Map<String, Value>) -> Self {
        Self { map }
    }

    fn empty() -> Self {
        Self {
            map: EMPTY.get_or_init(Map::new),
        }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    /// Nested object under `key`, e.g. `country` in an appeal.
    pub fn nested(&self, key: &str) -> Fields<'a> {
        self.get(key).map(Fields::new).unwrap_or_else(Fields::empty)
    }

    /// String value. Numbers are rendered in decimal since GO serializes
    /// some identifiers either way.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Like `text`, but matches the key ignoring ASCII case.
    pub fn text_any_case(&self, key: &str) -> Option<String> {
        if let Some(found) = self.text(key) {
            return Some(found);
        }
        let (actual, _) = self.map.iter().find(|(k, _)| k.eq_ignore_ascii_case(key))?;
        self.text(actual)
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Monetary amount. Decimal fields arrive as numbers or as strings.
    pub fn amount(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// RFC 3339 timestamp, or a bare date taken as midnight UTC.
    pub fn timestamp(&self, key: &str) -> Option<DateTime<FixedOffset>> {
        let raw = match self.get(key)? {
            Value::String(s) => s.trim(),
            _ => return None,
        };

        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts);
        }

        match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(date.and_hms_opt(0, 0, 0)?.and_utc().fixed_offset()),
            Err(_) => {
                tracing::debug!(key, value = raw, "Unparsable timestamp, treating as absent");
                None
            }
        }
    }
}
