use std::fmt;

use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::{Map, Value};

pub const DEFAULT_UID: &str = "default-uid";
pub const DEFAULT_MODEL_ID: &str = "default-model";
pub const DEFAULT_SW_REVISION: &str = "default-sw-revision";
pub const DEFAULT_HW_VERSION: &str = "default-hw-version";

const ALARM_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One poll cycle's flattened key/value readout.
///
/// A key absent from the snapshot is unknown, which is different from a key
/// that is present with a `null`, `false` or zero value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot(Map<String, Value>);

impl TelemetrySnapshot {
    pub fn new(data: Map<String, Value>) -> Self {
        Self(data)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// True iff `key` exists, whatever its value.
    pub fn has_data(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// True iff `key` exists and is not `null`.
    pub fn is_present(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_null())
    }

    pub fn f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(value_as_f64)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for TelemetrySnapshot {
    fn from(data: Map<String, Value>) -> Self {
        Self(data)
    }
}

/// Identity of the controller, read once from `sysParams`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub uid: String,
    pub model_id: String,
    pub software_revision: String,
    pub hardware_version: String,
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            uid: DEFAULT_UID.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            software_revision: DEFAULT_SW_REVISION.to_string(),
            hardware_version: DEFAULT_HW_VERSION.to_string(),
        }
    }
}

/// Server-reported edit bounds for a settable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Limits {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Limits {
    pub fn from_json(entry: &Value) -> Self {
        Self {
            min: entry.get("min").and_then(value_as_f64),
            max: entry.get("max").and_then(value_as_f64),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

/// A value written through `rmCurrNewParam`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
}

impl ParamValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            ParamValue::Int(v) => *v as f64,
            ParamValue::Float(v) => *v,
        }
    }

    /// Whole floats collapse to integers so the cache mirrors the wire form.
    pub fn to_json(&self) -> Value {
        match *self {
            ParamValue::Int(v) => Value::from(v),
            ParamValue::Float(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
                Value::from(v as i64)
            }
            ParamValue::Float(v) => Value::from(v),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v.into())
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Int(v.into())
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Int(i64::from(v))
    }
}

/// Entry of the `alarms` array reported in `sysParams`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Alarm {
    pub code: i64,
    #[serde(rename = "fromDate", default)]
    pub from_date: Option<String>,
    #[serde(rename = "toDate", default)]
    pub to_date: Option<String>,
}

impl Alarm {
    pub fn started_at(&self) -> Option<NaiveDateTime> {
        parse_alarm_date(self.from_date.as_deref())
    }

    pub fn ended_at(&self) -> Option<NaiveDateTime> {
        parse_alarm_date(self.to_date.as_deref())
    }

    pub fn is_active(&self) -> bool {
        self.to_date.is_none()
    }
}

impl fmt::Display for Alarm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.from_date {
            Some(from) => write!(f, "alarm {} since {from}", self.code),
            None => write!(f, "alarm {}", self.code),
        }
    }
}

fn parse_alarm_date(s: Option<&str>) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s?, ALARM_DATE_FORMAT).ok()
}

/// Device descriptor entities attach to in the host registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub configuration_url: String,
    pub sw_version: Option<String>,
    pub hw_version: Option<String>,
    pub via_device: Option<String>,
}

/// Normalized state of an entity after value processing.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl NativeValue {
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(NativeValue::Bool(*b)),
            Value::Number(n) => n.as_f64().map(NativeValue::Number),
            Value::String(s) => Some(NativeValue::Text(s.clone())),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NativeValue::Number(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Number(v) => write!(f, "{v}"),
            NativeValue::Text(s) => write!(f, "{s}"),
            NativeValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Numbers arrive as JSON numbers or, on some firmwares, numeric strings.
pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(v: Value) -> TelemetrySnapshot {
        match v {
            Value::Object(m) => TelemetrySnapshot::new(m),
            _ => panic!("snapshot must be an object"),
        }
    }

    #[test]
    fn presence_distinguishes_null_from_missing() {
        let snap = snapshot(json!({"tempCO": 65, "tempCWU": null, "pump": false}));
        assert!(snap.has_data("tempCWU"));
        assert!(!snap.is_present("tempCWU"));
        assert!(snap.is_present("pump"));
        assert!(!snap.has_data("fanPower"));
    }

    #[test]
    fn numeric_strings_are_read_as_numbers() {
        let snap = snapshot(json!({"a": "21.5", "b": 3, "c": "off"}));
        assert_eq!(snap.f64("a"), Some(21.5));
        assert_eq!(snap.f64("b"), Some(3.0));
        assert_eq!(snap.f64("c"), None);
    }

    #[test]
    fn limits_open_bounds() {
        let limits = Limits::from_json(&json!({"min": 20, "max": null}));
        assert_eq!(limits.min, Some(20.0));
        assert!(limits.contains(500.0));
        assert!(!limits.contains(19.0));
    }

    #[test]
    fn param_value_wire_form() {
        assert_eq!(ParamValue::from(60).to_string(), "60");
        assert_eq!(ParamValue::from(21.5).to_string(), "21.5");
        assert_eq!(ParamValue::from(60.0).to_json(), json!(60));
        assert_eq!(ParamValue::from(true).to_json(), json!(1));
    }

    #[test]
    fn alarm_dates() {
        let alarm: Alarm = serde_json::from_value(json!({
            "code": 2,
            "fromDate": "2024-01-15 06:30:00",
            "toDate": null
        }))
        .unwrap();
        assert!(alarm.is_active());
        let started = alarm.started_at().unwrap();
        assert_eq!(started.to_string(), "2024-01-15 06:30:00");
        assert_eq!(alarm.ended_at(), None);
    }
}
