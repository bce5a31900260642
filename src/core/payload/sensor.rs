// src/core/payload/sensor.rs

//! Parses RealtimeData frames into `(device id, value)` pairs.
//!
//! JSON frames map device ids to strings or numbers, e.g.
//! `{"21001A0012505037": "1195.0"}`. The simple format is `dev:value,dev:value`.

use crate::core::BridgeError;
use serde_json::Value;
use std::fmt;

/// A sensor value. Numeric-looking text is always stored as `Number`.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorValue {
    Number(f64),
    Text(String),
}

impl SensorValue {
    /// Coerces text to a float where possible.
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<f64>() {
            Ok(n) => SensorValue::Number(n),
            Err(_) => SensorValue::Text(trimmed.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SensorValue::Number(n) => Some(*n),
            SensorValue::Text(_) => None,
        }
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Number(n) => write!(f, "{n}"),
            SensorValue::Text(s) => f.write_str(s),
        }
    }
}

/// Parses one frame into its readings, in the order they appear on the wire.
pub fn parse_sensor_frame(text: &str) -> Result<Vec<(String, SensorValue)>, BridgeError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(BridgeError::MalformedPayload("empty sensor frame".into()));
    }

    let readings = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => map
            .into_iter()
            .map(|(device_id, value)| json_reading(device_id, value))
            .collect::<Result<Vec<_>, _>>()?,
        Ok(other) => {
            return Err(BridgeError::MalformedPayload(format!(
                "sensor frame must be a JSON object, got {other}"
            )));
        }
        Err(_) => parse_simple(trimmed)?,
    };

    if readings.is_empty() {
        return Err(BridgeError::MalformedPayload(
            "sensor frame carries no readings".into(),
        ));
    }
    Ok(readings)
}

fn json_reading(device_id: String, value: Value) -> Result<(String, SensorValue), BridgeError> {
    let value = match value {
        Value::Number(n) => n.as_f64().map(SensorValue::Number).ok_or_else(|| {
            BridgeError::MalformedPayload(format!("value for '{device_id}' is out of range"))
        })?,
        Value::String(s) => SensorValue::from_text(&s),
        other => {
            return Err(BridgeError::MalformedPayload(format!(
                "value for '{device_id}' must be a string or number, got {other}"
            )));
        }
    };
    Ok((device_id, value))
}

fn parse_simple(text: &str) -> Result<Vec<(String, SensorValue)>, BridgeError> {
    text.split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(|entry| {
            let (device_id, raw) = entry.split_once(':').ok_or_else(|| {
                BridgeError::MalformedPayload(format!("sensor entry '{entry}' has no ':'"))
            })?;
            let device_id = device_id.trim();
            if device_id.is_empty() {
                return Err(BridgeError::MalformedPayload(format!(
                    "sensor entry '{entry}' has an empty id"
                )));
            }
            Ok((device_id.to_string(), SensorValue::from_text(raw)))
        })
        .collect()
}
