//! Field mapping at the ingestion boundary.
//!
//! Two back-ends feed the dashboard and they disagree on field names:
//! - observatory API: `lat`, `lng`, `date`, `time` (`2024.03.01`)
//! - feed API: `lat`, `lon`, `date`, `time` (`2024-03-01`)
//! - combined variant: `lat`, `lon`, `date_time` (`2024-03-01 12:04:55`)
//!
//! Everything downstream works on [`EarthquakeRecord`] only.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::normalize::InvalidRecord;
use crate::core::record::EarthquakeRecord;

/// Magnitude placeholder the observatory prints when none was computed.
const MISSING_MAGNITUDE: &str = "-.-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceSchema {
    #[default]
    Auto,
    Observatory,
    Feed,
    Combined,
}

impl SourceSchema {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Observatory => "observatory",
            Self::Feed => "feed",
            Self::Combined => "combined",
        }
    }

    fn resolve(self, object: &Map<String, Value>) -> Self {
        match self {
            Self::Auto if object.contains_key("date_time") => Self::Combined,
            Self::Auto if object.contains_key("lon") => Self::Feed,
            Self::Auto => Self::Observatory,
            explicit => explicit,
        }
    }

    fn longitude_key(self) -> &'static str {
        match self {
            Self::Observatory | Self::Auto => "lng",
            Self::Feed | Self::Combined => "lon",
        }
    }
}

impl std::fmt::Display for SourceSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceSchema {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "observatory" | "flask" => Ok(Self::Observatory),
            "feed" | "fastapi" => Ok(Self::Feed),
            "combined" | "date_time" | "date-time" => Ok(Self::Combined),
            _ => Err(format!("unsupported source schema: {value}")),
        }
    }
}

/// Map one raw JSON object onto the canonical record shape.
pub fn adapt(value: &Value, schema: SourceSchema) -> Result<EarthquakeRecord, InvalidRecord> {
    let object = value.as_object().ok_or_else(|| InvalidRecord::InvalidField {
        field: "record",
        reason: format!("expected object, got {}", json_kind(value)),
    })?;
    let schema = schema.resolve(object);

    let (date, time) = match schema {
        SourceSchema::Combined => split_date_time(&required_string(object, "date_time")?),
        SourceSchema::Feed => (
            required_string(object, "date")?.replace('.', "-"),
            required_string(object, "time")?,
        ),
        _ => (
            required_string(object, "date")?,
            required_string(object, "time")?,
        ),
    };

    Ok(EarthquakeRecord {
        magnitude: magnitude(object)?,
        depth_km: required_number(object, "depth")?,
        latitude: required_number(object, "lat")?,
        longitude: required_number(object, schema.longitude_key())?,
        location: required_string(object, "location")?,
        date,
        time,
        is_anomaly: optional_flag(object, "is_anomaly")?,
        is_prediction: optional_flag(object, "is_prediction")?,
    })
}

fn split_date_time(raw: &str) -> (String, String) {
    match raw.find([' ', 'T']) {
        Some(idx) => (raw[..idx].to_string(), raw[idx + 1..].trim().to_string()),
        None => (raw.to_string(), String::new()),
    }
}

fn field<'a>(object: &'a Map<String, Value>, key: &'static str) -> Result<&'a Value, InvalidRecord> {
    match object.get(key) {
        None | Some(Value::Null) => Err(InvalidRecord::MissingField(key)),
        Some(value) => Ok(value),
    }
}

fn required_string(object: &Map<String, Value>, key: &'static str) -> Result<String, InvalidRecord> {
    match field(object, key)? {
        Value::String(text) => Ok(text.trim().to_string()),
        other => Err(InvalidRecord::InvalidField {
            field: key,
            reason: format!("expected string, got {}", json_kind(other)),
        }),
    }
}

fn required_number(object: &Map<String, Value>, key: &'static str) -> Result<f64, InvalidRecord> {
    match field(object, key)? {
        Value::Number(number) => number.as_f64().ok_or(InvalidRecord::NonFinite(key)),
        Value::String(text) => text.trim().parse::<f64>().map_err(|e| InvalidRecord::InvalidField {
            field: key,
            reason: format!("{text:?}: {e}"),
        }),
        other => Err(InvalidRecord::InvalidField {
            field: key,
            reason: format!("expected number, got {}", json_kind(other)),
        }),
    }
}

fn magnitude(object: &Map<String, Value>) -> Result<f64, InvalidRecord> {
    if let Some(Value::String(text)) = object.get("mag") {
        if text.trim() == MISSING_MAGNITUDE {
            return Ok(0.0);
        }
    }
    required_number(object, "mag")
}

fn optional_flag(object: &Map<String, Value>, key: &'static str) -> Result<bool, InvalidRecord> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(other) => Err(InvalidRecord::InvalidField {
            field: key,
            reason: format!("expected bool, got {}", json_kind(other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
